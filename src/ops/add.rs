use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};
use crate::ignore::Ignore;
use crate::index::{Index, IndexEntry};
use crate::object::{write_object, Blob, Object};
use crate::ops::{absolutize, worktree_rel};
use crate::repo::Repository;

/// stage files: write their blobs and record stat-cache entries
///
/// directory arguments are walked (skipping the metadata directory);
/// ignored paths are filtered out. entries replace any existing entry
/// of the same name and the index is rewritten sorted.
pub fn add(repo: &Repository, paths: &[PathBuf]) -> Result<()> {
    let ignore = Ignore::read(repo)?;
    let mut files: BTreeSet<PathBuf> = BTreeSet::new();

    for path in paths {
        let abs = absolutize(path)?;
        let rel = worktree_rel(repo, &abs)?;

        if abs.is_dir() {
            for entry in WalkDir::new(&abs)
                .into_iter()
                .filter_entry(|e| e.file_name() != crate::repo::GITDIR_NAME)
            {
                let entry = entry.map_err(|e| Error::Io {
                    path: abs.clone(),
                    source: e.into(),
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let rel = worktree_rel(repo, entry.path())?;
                if !ignore.check(&rel)? {
                    files.insert(entry.path().to_path_buf());
                }
            }
        } else if abs.is_file() {
            if !ignore.check(&rel)? {
                files.insert(abs);
            }
        } else {
            return Err(Error::PathspecUnmatched(path.display().to_string()));
        }
    }

    let mut index = Index::read(repo)?;
    let filemode = repo.config().filemode();

    for abs in files {
        let rel = worktree_rel(repo, &abs)?;
        stage_file(repo, &mut index, &abs, rel, filemode)?;
    }

    index.write(repo)
}

fn stage_file(
    repo: &Repository,
    index: &mut Index,
    abs: &Path,
    name: String,
    filemode: bool,
) -> Result<()> {
    let data = fs::read(abs).with_path(abs)?;
    let oid = write_object(repo, &Object::Blob(Blob::new(data)))?;
    let meta = fs::metadata(abs).with_path(abs)?;
    index.upsert(IndexEntry::from_metadata(&meta, oid, name, filemode));
    Ok(())
}
