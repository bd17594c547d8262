use std::path::PathBuf;

/// error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a git repository (or any of the parent directories): {0}")]
    NotARepository(PathBuf),

    #[error("required file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("is a directory: {0}")]
    IsADirectory(PathBuf),

    #[error("ref not found: {0}")]
    RefNotFound(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("ambiguous reference {name}, candidates are:\n - {}", .candidates.join("\n - "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    #[error("malformed object: {0}")]
    Malformed(String),

    #[error("unknown object type: {0}")]
    InvalidObjectType(String),

    #[error("invalid object id: {0}")]
    InvalidOidHex(String),

    #[error("unknown index entry mode type: {0:#b}")]
    BadMode(u16),

    #[error("unsupported index version: {0}")]
    UnsupportedIndexVersion(u32),

    #[error("unsupported repositoryformatversion: {0}")]
    UnsupportedFormatVersion(String),

    #[error("too many symbolic ref indirections resolving {0}")]
    RefDepthExceeded(String),

    #[error("path is outside of worktree: {0}")]
    PathOutsideWorktree(PathBuf),

    #[error("pathspec '{0}' did not match any files")]
    PathspecUnmatched(String),

    #[error("not removing '{0}' recursively without -r")]
    RecursiveRemovalRefused(String),

    #[error("path conflict in index at {0}")]
    PathConflict(String),

    #[error("your local changes to the following files would be overwritten by checkout:\n\t{}\nAborting.", .0.join("\n\t"))]
    CheckoutConflict(Vec<String>),

    #[error("checkout target not empty: {0}")]
    TargetNotEmpty(PathBuf),

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
