use std::collections::BTreeMap;
use std::os::unix::fs::MetadataExt;

use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};
use crate::ignore::Ignore;
use crate::index::Index;
use crate::object::{find, Blob, Object};
use crate::oid::Oid;
use crate::ops::{tree_to_map, worktree_rel};
use crate::refs;
use crate::repo::Repository;

/// how a path differs between two snapshots
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// a changed path with its change kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEntry {
    pub kind: ChangeKind,
    pub path: String,
}

impl StatusEntry {
    fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// the working tree status: branch plus three change lists
#[derive(Clone, Debug, Default)]
pub struct Status {
    /// current branch, or None when HEAD is detached
    pub branch: Option<String>,
    /// resolved HEAD commit, when one exists
    pub head: Option<Oid>,
    /// HEAD vs index ("changes to be committed")
    pub staged: Vec<StatusEntry>,
    /// index vs worktree ("changes not staged")
    pub unstaged: Vec<StatusEntry>,
    /// files in the worktree that are neither staged nor ignored
    pub untracked: Vec<String>,
}

/// compute the full status of the working tree
pub fn status(repo: &Repository) -> Result<Status> {
    let index = Index::read(repo)?;
    let mut result = Status {
        branch: refs::current_branch(repo)?,
        head: optional(find(repo, "HEAD", None, true))?,
        ..Status::default()
    };

    compare_head_index(repo, &index, &mut result)?;
    compare_index_worktree(repo, &index, &mut result)?;

    Ok(result)
}

/// head-vs-index: flatten HEAD's tree and diff against index entries
fn compare_head_index(repo: &Repository, index: &Index, result: &mut Status) -> Result<()> {
    let mut head = match optional(tree_to_map(repo, "HEAD"))? {
        Some(map) => map,
        None => BTreeMap::new(),
    };

    for entry in index.entries() {
        match head.remove(&entry.name) {
            Some(oid) if oid != entry.oid => result
                .staged
                .push(StatusEntry::new(ChangeKind::Modified, &entry.name)),
            Some(_) => {}
            None => result
                .staged
                .push(StatusEntry::new(ChangeKind::Added, &entry.name)),
        }
    }
    for path in head.into_keys() {
        result.staged.push(StatusEntry::new(ChangeKind::Deleted, path));
    }
    Ok(())
}

/// index-vs-worktree: stat-cache comparison, re-hashing on mismatch
fn compare_index_worktree(repo: &Repository, index: &Index, result: &mut Status) -> Result<()> {
    let mut all_files = worktree_files(repo)?;

    for entry in index.entries() {
        let path = repo.fs().work_path(&entry.name);
        all_files.remove(&entry.name);

        if !path.exists() {
            result
                .unstaged
                .push(StatusEntry::new(ChangeKind::Deleted, &entry.name));
            continue;
        }

        let meta = std::fs::metadata(&path).with_path(&path)?;
        let stat_matches = (meta.ctime() as u32, meta.ctime_nsec() as u32) == entry.ctime
            && (meta.mtime() as u32, meta.mtime_nsec() as u32) == entry.mtime;
        if stat_matches {
            continue;
        }

        // stat changed: confirm by re-hashing the content
        let data = std::fs::read(&path).with_path(&path)?;
        let oid = Object::Blob(Blob::new(data)).oid();
        if oid != entry.oid {
            result
                .unstaged
                .push(StatusEntry::new(ChangeKind::Modified, &entry.name));
        }
    }

    let ignore = Ignore::read(repo)?;
    for file in all_files {
        if !ignore.check(&file)? {
            result.untracked.push(file);
        }
    }
    Ok(())
}

/// every file under the worktree, metadata directory excluded
fn worktree_files(repo: &Repository) -> Result<std::collections::BTreeSet<String>> {
    let mut files = std::collections::BTreeSet::new();
    for entry in WalkDir::new(repo.worktree())
        .into_iter()
        .filter_entry(|e| e.file_name() != crate::repo::GITDIR_NAME)
    {
        let entry = entry.map_err(|e| Error::Io {
            path: repo.worktree().to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() {
            files.insert(worktree_rel(repo, entry.path())?);
        }
    }
    Ok(files)
}

/// treat "nothing there yet" resolution failures as None
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::ObjectNotFound(_)) | Err(Error::RefNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
