use std::fmt;

use crate::error::{Error, Result};
use crate::object::{find, read_object, Kind, Object};
use crate::oid::Oid;
use crate::repo::Repository;

/// one listing row: mode, kind token, oid, path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LsTreeRow {
    pub mode: String,
    pub kind: &'static str,
    pub oid: Oid,
    pub path: String,
}

impl fmt::Display for LsTreeRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}\t{}", self.mode, self.kind, self.oid, self.path)
    }
}

/// list a tree-ish, optionally recursing into subtrees
pub fn ls_tree(repo: &Repository, name: &str, recursive: bool) -> Result<Vec<LsTreeRow>> {
    let oid = find(repo, name, Some(Kind::Tree), true)?;
    let mut rows = Vec::new();
    walk(repo, &oid, recursive, "", &mut rows)?;
    Ok(rows)
}

fn walk(
    repo: &Repository,
    oid: &Oid,
    recursive: bool,
    prefix: &str,
    rows: &mut Vec<LsTreeRow>,
) -> Result<()> {
    let Object::Tree(tree) = read_object(repo, oid)? else {
        return Err(Error::Malformed(format!("{} is not a tree", oid)));
    };

    for entry in tree.entries() {
        let full = if prefix.is_empty() {
            entry.path.clone()
        } else {
            format!("{}/{}", prefix, entry.path)
        };
        if recursive && entry.is_tree() {
            walk(repo, &entry.oid, recursive, &full, rows)?;
        } else {
            rows.push(LsTreeRow {
                mode: entry.display_mode(),
                kind: entry.kind_token()?,
                oid: entry.oid,
                path: full,
            });
        }
    }
    Ok(())
}
