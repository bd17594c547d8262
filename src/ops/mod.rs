pub mod add;
pub mod checkout;
pub mod commit;
pub mod log;
pub mod ls_tree;
pub mod rm;
pub mod status;
pub mod tag;
pub mod tree;

use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::repo::Repository;

pub use self::add::add;
pub use self::checkout::{checkout, CheckoutOptions, CheckoutOutcome};
pub use self::commit::commit;
pub use self::log::{log, LogEntry};
pub use self::ls_tree::{ls_tree, LsTreeRow};
pub use self::rm::{rm, RmOptions};
pub use self::status::{status, ChangeKind, Status, StatusEntry};
pub use self::tag::{tag_create, tag_list};
pub use self::tree::{tree_to_map, write_tree};

/// absolute form of a user-supplied path
///
/// existing paths are canonicalized (symlinks resolved); missing ones
/// are only lexically absolutized so they can still be reported.
pub(crate) fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        std::fs::canonicalize(path).with_path(path)
    } else {
        std::path::absolute(path).with_path(path)
    }
}

/// repo-relative name for an absolute path
///
/// fails for paths outside the worktree; anything under the metadata
/// directory never matches a pathspec.
pub(crate) fn worktree_rel(repo: &Repository, abs: &Path) -> Result<String> {
    let rel = abs
        .strip_prefix(repo.worktree())
        .map_err(|_| Error::PathOutsideWorktree(abs.to_path_buf()))?;
    let name = rel
        .to_str()
        .ok_or_else(|| Error::PathspecUnmatched(rel.to_string_lossy().to_string()))?
        .to_string();
    if name == ".git" || name.starts_with(".git/") {
        return Err(Error::PathspecUnmatched(name));
    }
    Ok(name)
}
