//! grit - a git-compatible version control core
//!
//! a reimplementation of the git repository data plane that
//! interoperates bit-for-bit with repositories produced by the
//! canonical tool: loose objects, the v2 staging index, and the
//! reference namespace, plus the working-tree operations built on them.
//!
//! # Core concepts
//!
//! - **Blob / Commit / Tag / Tree**: the four object kinds, stored
//!   zlib-compressed under `objects/<2>/<38>` and addressed by the
//!   SHA-1 of their framed bytes (`<kind> <len>\0<payload>`)
//! - **Index**: the binary staging area (format version 2), a sorted
//!   list of paths with blob oids and a stat cache
//! - **Ref**: a named pointer holding an oid or a symbolic
//!   `ref: <path>` indirection; `HEAD` decides the current branch
//!
//! # Example usage
//!
//! ```no_run
//! use std::path::Path;
//! use grit::{ops, Repository};
//!
//! // initialize a repository and stage a file
//! let repo = Repository::init(Path::new("/path/to/project")).unwrap();
//! ops::add(&repo, &[repo.worktree().join("hello.txt")]).unwrap();
//!
//! // record it
//! let oid = ops::commit(&repo, "first commit").unwrap();
//! println!("created {}", oid);
//! ```

mod config;
mod error;
mod oid;
mod repo;

pub mod fs;
pub mod ignore;
pub mod index;
pub mod object;
pub mod ops;
pub mod refs;

pub use config::Config;
pub use error::{Error, Result};
pub use ignore::Ignore;
pub use index::{Index, IndexEntry};
pub use object::{
    find, hash_object, object_exists, read_object, resolve_name, write_object, Blob, Commit, Kind,
    Object, Tag, Tree, TreeEntry,
};
pub use oid::{compute_oid, Oid};
pub use repo::Repository;
