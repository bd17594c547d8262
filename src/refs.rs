use std::collections::BTreeMap;
use std::fs;

use crate::error::{Error, IoResultExt, Result};
use crate::fs::Root;
use crate::oid::Oid;
use crate::repo::Repository;

/// maximum symbolic ref indirections before giving up
pub const MAX_SYMREF_DEPTH: usize = 64;

/// resolve a ref to an oid, following `ref: ` indirections
///
/// a chain longer than [`MAX_SYMREF_DEPTH`] (which includes any cycle)
/// is an error.
pub fn resolve(repo: &Repository, ref_name: &str) -> Result<Oid> {
    let mut current = ref_name.to_string();
    for _ in 0..MAX_SYMREF_DEPTH {
        let data = repo
            .fs()
            .file_read_text(&current, Root::Git)
            .map_err(|e| match e {
                Error::FileNotFound(_) => Error::RefNotFound(current.clone()),
                other => other,
            })?;
        let data = data.trim_end();
        match data.strip_prefix("ref: ") {
            Some(target) => current = target.to_string(),
            None => return Oid::from_hex(data),
        }
    }
    Err(Error::RefDepthExceeded(ref_name.to_string()))
}

/// a node in the hierarchical ref listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefEntry {
    Direct(Oid),
    Nested(RefTree),
}

/// refs listed as a sorted tree of names
pub type RefTree = BTreeMap<String, RefEntry>;

/// list refs under a gitdir-relative prefix (default `refs`)
pub fn list(repo: &Repository, prefix: &str) -> Result<RefTree> {
    let dir = repo.fs().dir_require(prefix, Root::Git)?;
    let mut result = RefTree::new();

    for entry in fs::read_dir(&dir).with_path(&dir)? {
        let entry = entry.with_path(&dir)?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let rel = format!("{}/{}", prefix, name);
        if entry.path().is_dir() {
            result.insert(name, RefEntry::Nested(list(repo, &rel)?));
        } else {
            result.insert(name, RefEntry::Direct(resolve(repo, &rel)?));
        }
    }

    Ok(result)
}

/// flatten a ref tree into `(full-name, oid)` rows in listing order
pub fn flatten(tree: &RefTree, prefix: &str) -> Vec<(String, Oid)> {
    let mut rows = Vec::new();
    for (name, entry) in tree {
        let full = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };
        match entry {
            RefEntry::Direct(oid) => rows.push((full, *oid)),
            RefEntry::Nested(nested) => rows.extend(flatten(nested, &full)),
        }
    }
    rows
}

/// create or overwrite a ref, creating parent directories
pub fn create(repo: &Repository, ref_path: &str, oid: &Oid) -> Result<()> {
    repo.fs()
        .lock_write(ref_path, format!("{}\n", oid).as_bytes(), Root::Git)?;
    Ok(())
}

/// branch name from HEAD, or None when detached
pub fn current_branch(repo: &Repository) -> Result<Option<String>> {
    let content = repo.fs().file_read_text("HEAD", Root::Git)?;
    Ok(content
        .strip_prefix("ref: refs/heads/")
        .map(|rest| rest.trim_end().to_string()))
}

/// whether a name refers to a local branch
pub fn is_branch_name(repo: &Repository, name: &str) -> bool {
    if repo
        .fs()
        .file_exists(format!("refs/heads/{}", name), Root::Git)
    {
        return true;
    }
    matches!(current_branch(repo), Ok(Some(branch)) if branch == name)
}

/// detach HEAD onto a commit oid
pub fn detach_head(repo: &Repository, oid: &Oid) -> Result<()> {
    repo.fs()
        .lock_write("HEAD", format!("{}\n", oid).as_bytes(), Root::Git)?;
    Ok(())
}

/// point the current branch (or HEAD itself) at a commit
///
/// with a branch name the branch is written and HEAD re-attached to
/// it; without one, the current branch is advanced, or HEAD is
/// detached onto the oid directly.
pub fn update_ref(repo: &Repository, oid: &Oid, branch: Option<&str>) -> Result<()> {
    match branch {
        Some(branch) => {
            create(repo, &format!("refs/heads/{}", branch), oid)?;
            repo.fs().lock_write(
                "HEAD",
                format!("ref: refs/heads/{}\n", branch).as_bytes(),
                Root::Git,
            )?;
        }
        None => match current_branch(repo)? {
            Some(branch) => create(repo, &format!("refs/heads/{}", branch), oid)?,
            None => {
                repo.fs()
                    .lock_write("HEAD", format!("{}\n", oid).as_bytes(), Root::Git)?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempdir().unwrap();
        let repo = Repository::init(&dir.path().join("repo")).unwrap();
        (dir, repo)
    }

    fn oid(n: u8) -> Oid {
        Oid::from_bytes([n; 20])
    }

    #[test]
    fn test_create_and_resolve() {
        let (_dir, repo) = test_repo();

        create(&repo, "refs/heads/main", &oid(1)).unwrap();
        assert_eq!(resolve(&repo, "refs/heads/main").unwrap(), oid(1));
    }

    #[test]
    fn test_resolve_missing_ref() {
        let (_dir, repo) = test_repo();
        let result = resolve(&repo, "refs/heads/nope");
        assert!(matches!(result, Err(Error::RefNotFound(_))));
    }

    #[test]
    fn test_symbolic_chain() {
        let (_dir, repo) = test_repo();

        create(&repo, "refs/heads/main", &oid(3)).unwrap();
        repo.fs()
            .file_write("refs/heads/alias", b"ref: refs/heads/main\n", Root::Git, true)
            .unwrap();
        repo.fs()
            .file_write("refs/heads/alias2", b"ref: refs/heads/alias\n", Root::Git, true)
            .unwrap();

        assert_eq!(resolve(&repo, "refs/heads/alias2").unwrap(), oid(3));
    }

    #[test]
    fn test_symbolic_cycle_fails() {
        let (_dir, repo) = test_repo();

        repo.fs()
            .file_write("refs/heads/a", b"ref: refs/heads/b\n", Root::Git, true)
            .unwrap();
        repo.fs()
            .file_write("refs/heads/b", b"ref: refs/heads/a\n", Root::Git, true)
            .unwrap();

        let result = resolve(&repo, "refs/heads/a");
        assert!(matches!(result, Err(Error::RefDepthExceeded(_))));
    }

    #[test]
    fn test_depth_limit() {
        let (_dir, repo) = test_repo();

        for i in 0..70 {
            let content = format!("ref: refs/heads/chain{}\n", i + 1);
            repo.fs()
                .file_write(
                    format!("refs/heads/chain{}", i),
                    content.as_bytes(),
                    Root::Git,
                    true,
                )
                .unwrap();
        }
        create(&repo, "refs/heads/chain70", &oid(7)).unwrap();

        let result = resolve(&repo, "refs/heads/chain0");
        assert!(matches!(result, Err(Error::RefDepthExceeded(_))));

        // a chain comfortably under the limit resolves
        assert_eq!(resolve(&repo, "refs/heads/chain40").unwrap(), oid(7));
    }

    #[test]
    fn test_head_through_branch() {
        let (_dir, repo) = test_repo();

        create(&repo, "refs/heads/main", &oid(9)).unwrap();
        assert_eq!(resolve(&repo, "HEAD").unwrap(), oid(9));
    }

    #[test]
    fn test_list_and_flatten() {
        let (_dir, repo) = test_repo();

        create(&repo, "refs/heads/main", &oid(1)).unwrap();
        create(&repo, "refs/heads/feature/x", &oid(2)).unwrap();
        create(&repo, "refs/tags/v1", &oid(3)).unwrap();

        let tree = list(&repo, "refs").unwrap();
        let rows = flatten(&tree, "refs");
        assert_eq!(
            rows,
            vec![
                ("refs/heads/feature/x".to_string(), oid(2)),
                ("refs/heads/main".to_string(), oid(1)),
                ("refs/tags/v1".to_string(), oid(3)),
            ]
        );
    }

    #[test]
    fn test_current_branch_fresh_repo() {
        let (_dir, repo) = test_repo();
        assert_eq!(current_branch(&repo).unwrap(), Some("main".to_string()));
    }

    #[test]
    fn test_update_ref_on_branch() {
        let (_dir, repo) = test_repo();

        update_ref(&repo, &oid(5), None).unwrap();
        assert_eq!(resolve(&repo, "refs/heads/main").unwrap(), oid(5));
        assert_eq!(current_branch(&repo).unwrap(), Some("main".to_string()));
    }

    #[test]
    fn test_update_ref_with_branch_moves_head() {
        let (_dir, repo) = test_repo();

        update_ref(&repo, &oid(6), Some("topic")).unwrap();
        assert_eq!(resolve(&repo, "refs/heads/topic").unwrap(), oid(6));
        assert_eq!(current_branch(&repo).unwrap(), Some("topic".to_string()));
    }

    #[test]
    fn test_update_ref_detached() {
        let (_dir, repo) = test_repo();

        // detach HEAD first
        repo.fs()
            .file_write("HEAD", format!("{}\n", oid(4)).as_bytes(), Root::Git, true)
            .unwrap();
        assert_eq!(current_branch(&repo).unwrap(), None);

        update_ref(&repo, &oid(8), None).unwrap();
        assert_eq!(resolve(&repo, "HEAD").unwrap(), oid(8));
        assert_eq!(current_branch(&repo).unwrap(), None);
    }

    #[test]
    fn test_is_branch_name() {
        let (_dir, repo) = test_repo();

        create(&repo, "refs/heads/dev", &oid(1)).unwrap();
        assert!(is_branch_name(&repo, "dev"));
        // HEAD's unborn branch counts too
        assert!(is_branch_name(&repo, "main"));
        assert!(!is_branch_name(&repo, "ghost"));
    }
}
