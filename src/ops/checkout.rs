use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::object::tree::MODE_EXECUTABLE;
use crate::object::{find, read_object, Kind, Object};
use crate::oid::Oid;
use crate::ops::absolutize;
use crate::refs;
use crate::repo::Repository;

#[derive(Clone, Copy, Debug, Default)]
pub struct CheckoutOptions {
    /// overwrite local modifications
    pub force: bool,
}

/// what a checkout did, for the driver to report
#[derive(Clone, Debug)]
pub struct CheckoutOutcome {
    pub oid: Oid,
    /// branch HEAD was attached to, when the target named one
    pub branch: Option<String>,
    /// commit summary when HEAD was detached instead
    pub detached: Option<String>,
}

/// materialize a commit's tree, into the worktree or an explicit path
///
/// a worktree checkout first scans for files whose bytes differ from
/// the target tree and aborts unless forced; it then moves HEAD,
/// symbolically for a branch name and detached for anything else. an
/// explicit path must be an empty (or freshly created) directory.
pub fn checkout(
    repo: &Repository,
    target: &str,
    path: Option<&Path>,
    options: CheckoutOptions,
) -> Result<CheckoutOutcome> {
    let oid = find(repo, target, Some(Kind::Commit), true)?;
    let Object::Commit(commit) = read_object(repo, &oid)? else {
        return Err(Error::Malformed(format!("{} is not a commit", oid)));
    };
    let tree_oid = commit.tree()?;

    let dest = match path {
        None => repo.worktree().to_path_buf(),
        Some(p) => {
            let abs = absolutize(p)?;
            if abs == repo.worktree() {
                abs
            } else {
                prepare_destination(abs)?
            }
        }
    };
    let into_worktree = dest == repo.worktree();

    if into_worktree && !options.force {
        let mut conflicts = Vec::new();
        scan_conflicts(repo, &tree_oid, &dest, "", &mut conflicts)?;
        if !conflicts.is_empty() {
            return Err(Error::CheckoutConflict(conflicts));
        }
    }

    materialize(repo, &tree_oid, &dest, repo.config().filemode())?;

    let mut outcome = CheckoutOutcome {
        oid,
        branch: None,
        detached: None,
    };
    if into_worktree {
        if refs::is_branch_name(repo, target) {
            refs::update_ref(repo, &oid, Some(target))?;
            outcome.branch = Some(target.to_string());
        } else {
            refs::detach_head(repo, &oid)?;
            outcome.detached = Some(commit.summary());
        }
    }
    Ok(outcome)
}

/// an explicit checkout destination: created if missing, else an
/// existing empty directory
fn prepare_destination(abs: PathBuf) -> Result<PathBuf> {
    if abs.exists() {
        if !abs.is_dir() {
            return Err(Error::NotADirectory(abs));
        }
        let mut entries = fs::read_dir(&abs).with_path(&abs)?;
        if entries.next().is_some() {
            return Err(Error::TargetNotEmpty(abs));
        }
    } else {
        fs::create_dir_all(&abs).with_path(&abs)?;
    }
    Ok(abs)
}

/// collect repo-relative paths whose on-disk bytes differ from the
/// target tree's blobs
fn scan_conflicts(
    repo: &Repository,
    tree_oid: &Oid,
    dir: &Path,
    prefix: &str,
    conflicts: &mut Vec<String>,
) -> Result<()> {
    let Object::Tree(tree) = read_object(repo, tree_oid)? else {
        return Err(Error::Malformed(format!("{} is not a tree", tree_oid)));
    };

    for entry in tree.entries() {
        let target = dir.join(&entry.path);
        let full = if prefix.is_empty() {
            entry.path.clone()
        } else {
            format!("{}/{}", prefix, entry.path)
        };

        match read_object(repo, &entry.oid)? {
            Object::Tree(_) => {
                if target.is_dir() {
                    scan_conflicts(repo, &entry.oid, &target, &full, conflicts)?;
                }
            }
            Object::Blob(blob) => {
                if target.exists() {
                    let existing = fs::read(&target).with_path(&target)?;
                    if existing != blob.data() {
                        conflicts.push(full);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// write a tree's contents under a directory
fn materialize(repo: &Repository, tree_oid: &Oid, dir: &Path, filemode: bool) -> Result<()> {
    let Object::Tree(tree) = read_object(repo, tree_oid)? else {
        return Err(Error::Malformed(format!("{} is not a tree", tree_oid)));
    };

    for entry in tree.entries() {
        let target = dir.join(&entry.path);
        match read_object(repo, &entry.oid)? {
            Object::Tree(_) => {
                if !target.exists() {
                    fs::create_dir(&target).with_path(&target)?;
                }
                materialize(repo, &entry.oid, &target, filemode)?;
            }
            Object::Blob(blob) => {
                fs::write(&target, blob.data()).with_path(&target)?;
                if filemode && entry.mode == MODE_EXECUTABLE {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(&target, fs::Permissions::from_mode(0o755))
                        .with_path(&target)?;
                }
            }
            // gitlinks have no loose representation to materialize
            _ => {}
        }
    }
    Ok(())
}
