pub mod blob;
pub mod commit;
pub mod kvlm;
pub mod tag;
pub mod tree;

use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::str::FromStr;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Error, Result};
use crate::fs::Root;
use crate::oid::{compute_oid, Oid};
use crate::refs;
use crate::repo::Repository;

pub use blob::Blob;
pub use commit::Commit;
pub use tag::Tag;
pub use tree::{Tree, TreeEntry};

/// the closed set of object kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Blob,
    Commit,
    Tag,
    Tree,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Blob => "blob",
            Kind::Commit => "commit",
            Kind::Tag => "tag",
            Kind::Tree => "tree",
        }
    }

    /// parse the kind token from a framed header
    pub fn from_token(token: &[u8]) -> Result<Self> {
        match token {
            b"blob" => Ok(Kind::Blob),
            b"commit" => Ok(Kind::Commit),
            b"tag" => Ok(Kind::Tag),
            b"tree" => Ok(Kind::Tree),
            other => Err(Error::InvalidObjectType(
                String::from_utf8_lossy(other).to_string(),
            )),
        }
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Kind::from_token(s.as_bytes())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a parsed object of any kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Commit(Commit),
    Tag(Tag),
    Tree(Tree),
}

impl Object {
    pub fn kind(&self) -> Kind {
        match self {
            Object::Blob(_) => Kind::Blob,
            Object::Commit(_) => Kind::Commit,
            Object::Tag(_) => Kind::Tag,
            Object::Tree(_) => Kind::Tree,
        }
    }

    /// parse a payload as the given kind
    pub fn parse(kind: Kind, payload: &[u8]) -> Result<Self> {
        Ok(match kind {
            Kind::Blob => Object::Blob(Blob::parse(payload)),
            Kind::Commit => Object::Commit(Commit::parse(payload)?),
            Kind::Tag => Object::Tag(Tag::parse(payload)?),
            Kind::Tree => Object::Tree(Tree::parse(payload)?),
        })
    }

    /// serialize the payload
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Object::Blob(blob) => blob.serialize(),
            Object::Commit(commit) => commit.serialize(),
            Object::Tag(tag) => tag.serialize(),
            Object::Tree(tree) => tree.serialize(),
        }
    }

    /// framed bytes, the hashed form: `<kind> <len>\0<payload>`
    pub fn framed(&self) -> Vec<u8> {
        let payload = self.serialize();
        let mut raw = Vec::with_capacity(payload.len() + 16);
        raw.extend_from_slice(self.kind().as_str().as_bytes());
        raw.push(b' ');
        raw.extend_from_slice(payload.len().to_string().as_bytes());
        raw.push(0);
        raw.extend_from_slice(&payload);
        raw
    }

    /// the object's content id
    pub fn oid(&self) -> Oid {
        compute_oid(&self.framed())
    }
}

/// loose-object path relative to the gitdir
fn loose_rel_path(oid: &Oid) -> PathBuf {
    let (dir, file) = oid.to_path_components();
    PathBuf::from("objects").join(dir).join(file)
}

/// filesystem path of a loose object
pub fn object_path(repo: &Repository, oid: &Oid) -> PathBuf {
    repo.fs().git_path(loose_rel_path(oid))
}

pub fn object_exists(repo: &Repository, oid: &Oid) -> bool {
    object_path(repo, oid).is_file()
}

/// read and parse a loose object
pub fn read_object(repo: &Repository, oid: &Oid) -> Result<Object> {
    let rel = loose_rel_path(oid);
    if !repo.fs().file_exists(&rel, Root::Git) {
        return Err(Error::ObjectNotFound(oid.to_hex()));
    }
    let compressed = repo.fs().file_read(&rel, Root::Git)?;

    let mut raw = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut raw)
        .map_err(|e| Error::Malformed(format!("{}: zlib: {}", oid, e)))?;

    let space = raw
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| Error::Malformed(format!("{}: missing type separator", oid)))?;
    let kind = Kind::from_token(&raw[..space])?;

    let nul = raw[space..]
        .iter()
        .position(|&b| b == 0)
        .map(|i| space + i)
        .ok_or_else(|| Error::Malformed(format!("{}: missing size separator", oid)))?;
    let size: usize = std::str::from_utf8(&raw[space + 1..nul])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Malformed(format!("{}: bad size field", oid)))?;
    if size != raw.len() - nul - 1 {
        return Err(Error::Malformed(format!("{}: bad length", oid)));
    }

    Object::parse(kind, &raw[nul + 1..])
}

/// hash an object without writing it
pub fn hash_object(object: &Object) -> Oid {
    object.oid()
}

/// write an object to the loose store, returning its id
///
/// content addressing makes this idempotent: an already-present object
/// is left untouched.
pub fn write_object(repo: &Repository, object: &Object) -> Result<Oid> {
    let raw = object.framed();
    let oid = compute_oid(&raw);

    let rel = loose_rel_path(&oid);
    if repo.fs().file_exists(&rel, Root::Git) {
        return Ok(oid);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&raw)
        .map_err(|e| Error::Malformed(format!("{}: zlib: {}", oid, e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::Malformed(format!("{}: zlib: {}", oid, e)))?;
    repo.fs().file_write(&rel, &compressed, Root::Git, false)?;

    Ok(oid)
}

/// collect every oid a name could mean
///
/// a name can be HEAD, a 4-40 char hex prefix, or a tag/head/remote
/// ref; all interpretations are gathered so callers can report
/// ambiguity instead of silently picking one.
pub fn resolve_name(repo: &Repository, name: &str) -> Result<Vec<Oid>> {
    let name = name.trim();
    let mut candidates = Vec::new();

    if name.is_empty() {
        return Ok(candidates);
    }

    if name == "HEAD" {
        candidates.push(refs::resolve(repo, "HEAD")?);
        return Ok(candidates);
    }

    if name.len() >= 4 && name.len() <= 40 && name.chars().all(|c| c.is_ascii_hexdigit()) {
        let lower = name.to_lowercase();
        let (prefix, rest) = lower.split_at(2);
        let prefix_dir = PathBuf::from("objects").join(prefix);
        if repo.fs().dir_exists(&prefix_dir, Root::Git) {
            let dir = repo.fs().git_path(&prefix_dir);
            let mut names: Vec<String> = std::fs::read_dir(&dir)
                .map_err(|e| Error::Io {
                    path: dir.clone(),
                    source: e,
                })?
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|file| file.starts_with(rest))
                .collect();
            names.sort();
            for file in names {
                if let Ok(oid) = Oid::from_hex(&format!("{}{}", prefix, file)) {
                    candidates.push(oid);
                }
            }
        }
    }

    for namespace in ["refs/tags/", "refs/heads/", "refs/remotes/"] {
        match refs::resolve(repo, &format!("{}{}", namespace, name)) {
            Ok(oid) => candidates.push(oid),
            Err(Error::RefNotFound(_)) | Err(Error::FileNotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(candidates)
}

/// resolve a name to exactly one oid, optionally peeling to a kind
///
/// peeling follows `tag.object` and, when a tree is wanted,
/// `commit.tree`; `follow = false` disables it.
pub fn find(repo: &Repository, name: &str, fmt: Option<Kind>, follow: bool) -> Result<Oid> {
    let candidates = resolve_name(repo, name)?;

    if candidates.is_empty() {
        return Err(Error::ObjectNotFound(name.to_string()));
    }
    if candidates.len() > 1 {
        return Err(Error::Ambiguous {
            name: name.to_string(),
            candidates: candidates.iter().map(Oid::to_hex).collect(),
        });
    }

    let mut oid = candidates[0];
    let Some(want) = fmt else {
        return Ok(oid);
    };

    loop {
        let object = read_object(repo, &oid)?;
        if object.kind() == want {
            return Ok(oid);
        }
        if !follow {
            return Err(Error::ObjectNotFound(format!("{} (as {})", name, want)));
        }
        oid = match &object {
            Object::Tag(tag) => tag.object()?,
            Object::Commit(commit) if want == Kind::Tree => commit.tree()?,
            _ => return Err(Error::ObjectNotFound(format!("{} (as {})", name, want))),
        };
    }
}
