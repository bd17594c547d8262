use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};
use crate::index::Index;
use crate::ops::{absolutize, worktree_rel};
use crate::repo::Repository;

#[derive(Clone, Copy, Debug, Default)]
pub struct RmOptions {
    /// only unstage; leave the working tree alone
    pub cached: bool,
    /// allow directory arguments
    pub recursive: bool,
}

/// remove paths from the index and (unless cached) the working tree
///
/// every argument must resolve to staged content: a tracked file, or a
/// directory containing tracked files when `-r` is given. emptied
/// directories are cleaned up afterwards.
pub fn rm(repo: &Repository, paths: &[PathBuf], options: RmOptions) -> Result<()> {
    let mut index = Index::read(repo)?;
    let mut names_to_drop: BTreeSet<String> = BTreeSet::new();
    let mut dirs: Vec<PathBuf> = Vec::new();

    for path in paths {
        let abs = absolutize(path)?;
        let rel = worktree_rel(repo, &abs)?;

        if abs.is_dir() {
            if !options.recursive {
                return Err(Error::RecursiveRemovalRefused(path.display().to_string()));
            }
            let prefix = format!("{}/", rel);
            let matched: Vec<String> = index
                .entries()
                .iter()
                .filter(|e| rel.is_empty() || e.name.starts_with(&prefix))
                .map(|e| e.name.clone())
                .collect();
            if matched.is_empty() {
                return Err(Error::PathspecUnmatched(path.display().to_string()));
            }
            names_to_drop.extend(matched);
            dirs.push(abs);
        } else if index.get(&rel).is_some() {
            names_to_drop.insert(rel);
        } else {
            return Err(Error::PathspecUnmatched(path.display().to_string()));
        }
    }

    if !options.cached {
        for name in &names_to_drop {
            let target = repo.fs().work_path(name);
            if target.is_file() {
                log::info!("removing {}", name);
                fs::remove_file(&target).with_path(&target)?;
            }
        }
        // sweep emptied directories bottom-up; non-empty ones stay
        for dir in &dirs {
            for entry in WalkDir::new(dir)
                .contents_first(true)
                .into_iter()
                .filter_entry(|e| e.file_name() != crate::repo::GITDIR_NAME)
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_dir() {
                    let _ = fs::remove_dir(entry.path());
                }
            }
        }
    }

    index.retain(|e| !names_to_drop.contains(&e.name));
    index.write(repo)
}
