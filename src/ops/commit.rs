use chrono::Local;

use crate::error::{Error, Result};
use crate::index::Index;
use crate::object::{find, write_object, Commit, Object};
use crate::oid::Oid;
use crate::ops::write_tree;
use crate::refs;
use crate::repo::Repository;

/// record the index as a new commit on the current branch
///
/// the staged tree is written bottom-up, HEAD (when resolvable)
/// becomes the parent, and the branch ref is advanced (or HEAD itself
/// when detached).
pub fn commit(repo: &Repository, message: &str) -> Result<Oid> {
    let index = Index::read(repo)?;
    if index.is_empty() {
        return Err(Error::NothingToCommit);
    }

    let tree = write_tree(repo, &index)?;

    let parent = match find(repo, "HEAD", None, true) {
        Ok(oid) => Some(oid),
        Err(Error::ObjectNotFound(_)) | Err(Error::RefNotFound(_)) => None,
        Err(e) => return Err(e),
    };
    let parents: Vec<Oid> = parent.into_iter().collect();

    let stamp = identity_stamp(repo);
    let commit = Commit::new(tree, &parents, &stamp, &stamp, message);
    let oid = write_object(repo, &Object::Commit(commit))?;

    refs::update_ref(repo, &oid, None)?;
    Ok(oid)
}

/// the author/committer stamp: `<identity> <unix-seconds> <±HHMM>`
///
/// the offset is computed numerically rather than via strftime so the
/// format is stable across platforms.
fn identity_stamp(repo: &Repository) -> String {
    let now = Local::now();
    format!(
        "{} {} {}",
        repo.config().user_identity(),
        now.timestamp(),
        now.format("%z")
    )
}
