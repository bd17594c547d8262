use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{default_config_text, Config};
use crate::error::{Error, IoResultExt, Result};
use crate::fs::{Fs, Root};

/// name of the metadata directory inside the worktree
pub const GITDIR_NAME: &str = ".git";

/// branch a fresh repository starts on
pub const DEFAULT_BRANCH: &str = "main";

/// an opened repository: worktree plus `.git` metadata directory
pub struct Repository {
    fs: Fs,
    config: Config,
}

impl Repository {
    /// initialize a repository at the given worktree path
    ///
    /// re-init on an existing repository is idempotent: directories are
    /// re-ensured and existing HEAD/config/description are left alone.
    pub fn init(path: &Path) -> Result<Self> {
        if path.exists() && !path.is_dir() {
            return Err(Error::NotADirectory(path.to_path_buf()));
        }
        fs::create_dir_all(path).with_path(path)?;
        let worktree = fs::canonicalize(path).with_path(path)?;
        let gitdir = worktree.join(GITDIR_NAME);
        let fs = Fs::new(worktree, gitdir);

        fs.dir_ensure("branches", Root::Git)?;
        fs.dir_ensure("objects", Root::Git)?;
        fs.dir_ensure("refs/tags", Root::Git)?;
        fs.dir_ensure("refs/heads", Root::Git)?;

        fs.file_write(
            "HEAD",
            format!("ref: refs/heads/{}\n", DEFAULT_BRANCH).as_bytes(),
            Root::Git,
            false,
        )?;
        fs.file_write(
            "description",
            b"Unnamed repository; edit this file 'description' to name the repository.\n",
            Root::Git,
            false,
        )?;
        fs.file_write("config", default_config_text().as_bytes(), Root::Git, false)?;

        let config = Config::load(fs.gitdir())?;
        config.check_format_version()?;
        Ok(Self { fs, config })
    }

    /// open an existing repository whose worktree is at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let worktree = fs::canonicalize(path).map_err(|_| Error::NotARepository(path.to_path_buf()))?;
        let gitdir = worktree.join(GITDIR_NAME);
        if !gitdir.is_dir() {
            return Err(Error::NotARepository(path.to_path_buf()));
        }
        let fs = Fs::new(worktree, gitdir);
        fs.file_require("config", Root::Git)?;

        let config = Config::load(fs.gitdir())?;
        config.check_format_version()?;
        Ok(Self { fs, config })
    }

    /// locate a repository by walking up from the given directory
    pub fn discover(start: &Path) -> Result<Self> {
        let mut current = fs::canonicalize(start).with_path(start)?;
        loop {
            if current.join(GITDIR_NAME).is_dir() {
                return Self::open(&current);
            }
            if !current.pop() {
                return Err(Error::NotARepository(start.to_path_buf()));
            }
        }
    }

    /// worktree root path
    pub fn worktree(&self) -> &Path {
        self.fs.worktree()
    }

    /// metadata directory path
    pub fn gitdir(&self) -> &Path {
        self.fs.gitdir()
    }

    /// filesystem gateway
    pub fn fs(&self) -> &Fs {
        &self.fs
    }

    /// layered configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// path to the loose-object store
    pub fn objects_path(&self) -> PathBuf {
        self.fs.git_path("objects")
    }

    /// path to the staging index
    pub fn index_path(&self) -> PathBuf {
        self.fs.git_path("index")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_repo_init() {
        let dir = tempdir().unwrap();
        let repo_path = dir.path().join("test-repo");

        let repo = Repository::init(&repo_path).unwrap();

        let gitdir = repo.gitdir();
        assert!(gitdir.join("branches").is_dir());
        assert!(gitdir.join("objects").is_dir());
        assert!(gitdir.join("refs/tags").is_dir());
        assert!(gitdir.join("refs/heads").is_dir());
        assert!(gitdir.join("description").is_file());

        let head = fs::read_to_string(gitdir.join("HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/main\n");
    }

    #[test]
    fn test_repo_reinit_is_idempotent() {
        let dir = tempdir().unwrap();
        let repo_path = dir.path().join("test-repo");

        let repo = Repository::init(&repo_path).unwrap();
        fs::write(repo.gitdir().join("HEAD"), "ref: refs/heads/work\n").unwrap();

        Repository::init(&repo_path).unwrap();
        let head = fs::read_to_string(repo.gitdir().join("HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/work\n");
    }

    #[test]
    fn test_repo_init_over_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blocker");
        fs::write(&path, b"x").unwrap();

        assert!(matches!(
            Repository::init(&path),
            Err(Error::NotADirectory(_))
        ));
    }

    #[test]
    fn test_repo_open() {
        let dir = tempdir().unwrap();
        let repo_path = dir.path().join("test-repo");
        Repository::init(&repo_path).unwrap();

        let repo = Repository::open(&repo_path).unwrap();
        assert!(repo.gitdir().ends_with(".git"));
        assert_eq!(repo.config().get("core", "repositoryformatversion"), Some("0"));
    }

    #[test]
    fn test_repo_open_not_found() {
        let dir = tempdir().unwrap();
        let result = Repository::open(&dir.path().join("nonexistent"));
        assert!(matches!(result, Err(Error::NotARepository(_))));
    }

    #[test]
    fn test_repo_open_plain_dir() {
        let dir = tempdir().unwrap();
        let result = Repository::open(dir.path());
        assert!(matches!(result, Err(Error::NotARepository(_))));
    }

    #[test]
    fn test_repo_discover_from_subdir() {
        let dir = tempdir().unwrap();
        let repo_path = dir.path().join("test-repo");
        Repository::init(&repo_path).unwrap();

        let nested = repo_path.join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let repo = Repository::discover(&nested).unwrap();
        assert_eq!(repo.worktree(), fs::canonicalize(&repo_path).unwrap());
    }

    #[test]
    fn test_repo_discover_not_found() {
        let dir = tempdir().unwrap();
        let result = Repository::discover(dir.path());
        assert!(matches!(result, Err(Error::NotARepository(_))));
    }

    #[test]
    fn test_repo_open_bad_format_version() {
        let dir = tempdir().unwrap();
        let repo_path = dir.path().join("test-repo");
        let repo = Repository::init(&repo_path).unwrap();

        fs::write(
            repo.gitdir().join("config"),
            "[core]\n\trepositoryformatversion = 7\n",
        )
        .unwrap();

        let result = Repository::open(&repo_path);
        assert!(matches!(result, Err(Error::UnsupportedFormatVersion(_))));
    }
}
