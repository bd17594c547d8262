use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};

/// which root a relative path is resolved under
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Root {
    Git,
    Worktree,
}

/// filesystem gateway for a repository
///
/// every on-disk access goes through here so path resolution, parent
/// creation and overwrite policy live in one place.
#[derive(Clone, Debug)]
pub struct Fs {
    worktree: PathBuf,
    gitdir: PathBuf,
}

impl Fs {
    pub fn new(worktree: PathBuf, gitdir: PathBuf) -> Self {
        Self { worktree, gitdir }
    }

    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    pub fn gitdir(&self) -> &Path {
        &self.gitdir
    }

    /// resolve a relative path under the chosen root
    pub fn resolve(&self, rel: impl AsRef<Path>, root: Root) -> PathBuf {
        let base = match root {
            Root::Git => &self.gitdir,
            Root::Worktree => &self.worktree,
        };
        base.join(rel)
    }

    /// shorthand for gitdir-rooted paths
    pub fn git_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.resolve(rel, Root::Git)
    }

    /// shorthand for worktree-rooted paths
    pub fn work_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.resolve(rel, Root::Worktree)
    }

    pub fn dir_exists(&self, rel: impl AsRef<Path>, root: Root) -> bool {
        self.resolve(rel, root).is_dir()
    }

    /// idempotent directory creation
    pub fn dir_ensure(&self, rel: impl AsRef<Path>, root: Root) -> Result<PathBuf> {
        let path = self.resolve(rel, root);
        if path.exists() && !path.is_dir() {
            return Err(Error::NotADirectory(path));
        }
        fs::create_dir_all(&path).with_path(&path)?;
        Ok(path)
    }

    pub fn dir_require(&self, rel: impl AsRef<Path>, root: Root) -> Result<PathBuf> {
        let path = self.resolve(rel, root);
        if !path.is_dir() {
            return Err(Error::NotADirectory(path));
        }
        Ok(path)
    }

    pub fn file_exists(&self, rel: impl AsRef<Path>, root: Root) -> bool {
        self.resolve(rel, root).is_file()
    }

    pub fn file_require(&self, rel: impl AsRef<Path>, root: Root) -> Result<PathBuf> {
        let path = self.resolve(rel, root);
        if !path.is_file() {
            return Err(Error::FileNotFound(path));
        }
        Ok(path)
    }

    pub fn file_read(&self, rel: impl AsRef<Path>, root: Root) -> Result<Vec<u8>> {
        let path = self.file_require(rel, root)?;
        fs::read(&path).with_path(&path)
    }

    pub fn file_read_text(&self, rel: impl AsRef<Path>, root: Root) -> Result<String> {
        let path = self.file_require(rel, root)?;
        fs::read_to_string(&path).with_path(&path)
    }

    /// write a file, creating parent directories
    ///
    /// with `overwrite` false an existing file is left untouched.
    pub fn file_write(
        &self,
        rel: impl AsRef<Path>,
        content: &[u8],
        root: Root,
        overwrite: bool,
    ) -> Result<PathBuf> {
        let path = self.resolve(rel, root);
        if path.is_dir() {
            return Err(Error::IsADirectory(path));
        }
        if path.exists() && !overwrite {
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        fs::write(&path, content).with_path(&path)?;
        Ok(path)
    }

    /// create an empty file if absent
    pub fn file_ensure(&self, rel: impl AsRef<Path>, root: Root) -> Result<PathBuf> {
        let path = self.resolve(rel, root);
        if path.exists() {
            if !path.is_file() {
                return Err(Error::IsADirectory(path));
            }
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        File::create(&path).with_path(&path)?;
        Ok(path)
    }

    pub fn file_delete(&self, rel: impl AsRef<Path>, root: Root) -> Result<()> {
        let path = self.resolve(rel, root);
        if !path.exists() {
            return Ok(());
        }
        if !path.is_file() {
            return Err(Error::IsADirectory(path));
        }
        fs::remove_file(&path).with_path(&path)
    }

    /// atomic write: temp `.lock` sibling -> fsync -> rename
    pub fn lock_write(&self, rel: impl AsRef<Path>, content: &[u8], root: Root) -> Result<PathBuf> {
        let path = self.resolve(rel, root);
        if path.is_dir() {
            return Err(Error::IsADirectory(path));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");
        let lock_path = PathBuf::from(lock_path);
        {
            let mut lock_file = File::create(&lock_path).with_path(&lock_path)?;
            lock_file.write_all(content).with_path(&lock_path)?;
            lock_file.sync_all().with_path(&lock_path)?;
        }
        fs::rename(&lock_path, &path).with_path(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_fs() -> (tempfile::TempDir, Fs) {
        let dir = tempdir().unwrap();
        let worktree = dir.path().join("wt");
        let gitdir = worktree.join(".git");
        fs::create_dir_all(&gitdir).unwrap();
        (dir, Fs::new(worktree, gitdir))
    }

    #[test]
    fn test_resolve_roots() {
        let (_dir, fs) = test_fs();
        assert_eq!(fs.git_path("HEAD"), fs.gitdir().join("HEAD"));
        assert_eq!(fs.work_path("a/b"), fs.worktree().join("a/b"));
    }

    #[test]
    fn test_dir_ensure_idempotent() {
        let (_dir, fs) = test_fs();
        let first = fs.dir_ensure("objects/ab", Root::Git).unwrap();
        let second = fs.dir_ensure("objects/ab", Root::Git).unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn test_dir_ensure_over_file_fails() {
        let (_dir, fs) = test_fs();
        fs.file_write("blocker", b"x", Root::Git, true).unwrap();
        let result = fs.dir_ensure("blocker", Root::Git);
        assert!(matches!(result, Err(Error::NotADirectory(_))));
    }

    #[test]
    fn test_file_require_missing() {
        let (_dir, fs) = test_fs();
        let result = fs.file_require("nope", Root::Git);
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_file_write_creates_parents() {
        let (_dir, fs) = test_fs();
        fs.file_write("refs/heads/main", b"abc\n", Root::Git, true)
            .unwrap();
        assert_eq!(fs.file_read("refs/heads/main", Root::Git).unwrap(), b"abc\n");
    }

    #[test]
    fn test_file_write_no_overwrite() {
        let (_dir, fs) = test_fs();
        fs.file_write("config", b"first", Root::Git, true).unwrap();
        fs.file_write("config", b"second", Root::Git, false).unwrap();
        assert_eq!(fs.file_read("config", Root::Git).unwrap(), b"first");
    }

    #[test]
    fn test_file_write_over_dir_fails() {
        let (_dir, fs) = test_fs();
        fs.dir_ensure("objects", Root::Git).unwrap();
        let result = fs.file_write("objects", b"x", Root::Git, true);
        assert!(matches!(result, Err(Error::IsADirectory(_))));
    }

    #[test]
    fn test_file_ensure() {
        let (_dir, fs) = test_fs();
        let path = fs.file_ensure("description", Root::Git).unwrap();
        assert!(path.is_file());
        fs.file_write("description", b"text", Root::Git, true).unwrap();
        fs.file_ensure("description", Root::Git).unwrap();
        assert_eq!(fs.file_read("description", Root::Git).unwrap(), b"text");
    }

    #[test]
    fn test_lock_write_atomic_replace() {
        let (_dir, fs) = test_fs();
        fs.lock_write("index", b"one", Root::Git).unwrap();
        fs.lock_write("index", b"two", Root::Git).unwrap();
        assert_eq!(fs.file_read("index", Root::Git).unwrap(), b"two");
        assert!(!fs.git_path("index.lock").exists());
    }

    #[test]
    fn test_file_delete() {
        let (_dir, fs) = test_fs();
        fs.file_write("doomed", b"x", Root::Git, true).unwrap();
        fs.file_delete("doomed", Root::Git).unwrap();
        assert!(!fs.file_exists("doomed", Root::Git));
        // deleting a missing file is fine
        fs.file_delete("doomed", Root::Git).unwrap();
    }
}
