use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::index::Index;
use crate::object::tree::MODE_TREE;
use crate::object::{find, read_object, write_object, Kind, Object, Tree, TreeEntry};
use crate::oid::Oid;
use crate::repo::Repository;

/// one level of the directory structure built from index paths
enum Node {
    Leaf { mode: u32, oid: Oid },
    Dir(BTreeMap<String, Node>),
}

/// turn the flat index into a recursive tree of tree objects
///
/// every directory level is written to the object store bottom-up; the
/// returned oid is the root tree, ready to be a commit's `tree`.
pub fn write_tree(repo: &Repository, index: &Index) -> Result<Oid> {
    let mut root = BTreeMap::new();

    for entry in index.entries() {
        let mut current = &mut root;
        let mut parts = entry.name.split('/').peekable();

        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                // leaf: the file itself
                match current.get(part) {
                    Some(Node::Dir(_)) => {
                        return Err(Error::PathConflict(entry.name.clone()));
                    }
                    _ => {
                        current.insert(
                            part.to_string(),
                            Node::Leaf {
                                mode: entry.tree_mode(),
                                oid: entry.oid,
                            },
                        );
                    }
                }
            } else {
                let node = current
                    .entry(part.to_string())
                    .or_insert_with(|| Node::Dir(BTreeMap::new()));
                current = match node {
                    Node::Dir(children) => children,
                    Node::Leaf { .. } => {
                        return Err(Error::PathConflict(entry.name.clone()));
                    }
                };
            }
        }
    }

    write_node(repo, &root)
}

fn write_node(repo: &Repository, children: &BTreeMap<String, Node>) -> Result<Oid> {
    let mut tree = Tree::default();
    for (name, node) in children {
        match node {
            Node::Leaf { mode, oid } => tree.push(TreeEntry::new(*mode, name.clone(), *oid)),
            Node::Dir(grandchildren) => {
                let subtree = write_node(repo, grandchildren)?;
                tree.push(TreeEntry::new(MODE_TREE, name.clone(), subtree));
            }
        }
    }
    write_object(repo, &Object::Tree(tree))
}

/// flatten a tree-ish name into a `path -> blob oid` map
pub fn tree_to_map(repo: &Repository, name: &str) -> Result<BTreeMap<String, Oid>> {
    let oid = find(repo, name, Some(Kind::Tree), true)?;
    let mut map = BTreeMap::new();
    collect(repo, &oid, "", &mut map)?;
    Ok(map)
}

fn collect(
    repo: &Repository,
    oid: &Oid,
    prefix: &str,
    map: &mut BTreeMap<String, Oid>,
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
        if entry.is_tree() {
            collect(repo, &entry.oid, &full, map)?;
        } else {
            map.insert(full, entry.oid);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexEntry, MODE_TYPE_REGULAR};
    use tempfile::tempdir;

    fn test_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempdir().unwrap();
        let repo = Repository::init(&dir.path().join("repo")).unwrap();
        (dir, repo)
    }

    fn entry(name: &str, oid_byte: u8) -> IndexEntry {
        IndexEntry {
            ctime: (0, 0),
            mtime: (0, 0),
            dev: 0,
            ino: 0,
            mode_type: MODE_TYPE_REGULAR,
            mode_perms: 0o644,
            uid: 0,
            gid: 0,
            fsize: 0,
            oid: Oid::from_bytes([oid_byte; 20]),
            assume_valid: false,
            stage: 0,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_empty_index_writes_empty_tree() {
        let (_dir, repo) = test_repo();
        let oid = write_tree(&repo, &Index::new()).unwrap();
        assert_eq!(oid.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[test]
    fn test_flat_index_roundtrips_through_trees() {
        let (_dir, repo) = test_repo();

        let mut index = Index::new();
        index.upsert(entry("top.txt", 1));
        index.upsert(entry("dir/a.txt", 2));
        index.upsert(entry("dir/sub/b.txt", 3));
        index.upsert(entry("other/c.txt", 4));

        let root = write_tree(&repo, &index).unwrap();
        let map = tree_to_map(&repo, &root.to_hex()).unwrap();

        let expected: BTreeMap<String, Oid> = index
            .entries()
            .iter()
            .map(|e| (e.name.clone(), e.oid))
            .collect();
        assert_eq!(map, expected);
    }

    #[test]
    fn test_subtrees_are_real_objects() {
        let (_dir, repo) = test_repo();

        let mut index = Index::new();
        index.upsert(entry("dir/file", 2));

        let root = write_tree(&repo, &index).unwrap();
        let Object::Tree(tree) = read_object(&repo, &root).unwrap() else {
            panic!("root is not a tree");
        };
        assert_eq!(tree.len(), 1);
        let dir_entry = &tree.entries()[0];
        assert_eq!(dir_entry.path, "dir");
        assert_eq!(dir_entry.mode, MODE_TREE);

        let Object::Tree(subtree) = read_object(&repo, &dir_entry.oid).unwrap() else {
            panic!("subtree missing");
        };
        assert_eq!(subtree.entries()[0].path, "file");
    }

    #[test]
    fn test_identical_content_identical_tree_oid() {
        let (_dir, repo_a) = test_repo();
        let (_dir2, repo_b) = test_repo();

        let mut index = Index::new();
        index.upsert(entry("x", 1));
        index.upsert(entry("d/y", 2));

        let oid_a = write_tree(&repo_a, &index).unwrap();
        let oid_b = write_tree(&repo_b, &index).unwrap();
        assert_eq!(oid_a, oid_b);
    }

    #[test]
    fn test_executable_mode_survives() {
        let (_dir, repo) = test_repo();

        let mut index = Index::new();
        let mut exec = entry("run.sh", 5);
        exec.mode_perms = 0o755;
        index.upsert(exec);

        let root = write_tree(&repo, &index).unwrap();
        let Object::Tree(tree) = read_object(&repo, &root).unwrap() else {
            panic!("root is not a tree");
        };
        assert_eq!(tree.entries()[0].mode, 0o100755);
    }

    #[test]
    fn test_path_conflict_file_then_dir() {
        let (_dir, repo) = test_repo();

        let mut index = Index::new();
        index.upsert(entry("x", 1));
        index.upsert(entry("x/y", 2));

        let result = write_tree(&repo, &index);
        assert!(matches!(result, Err(Error::PathConflict(_))));
    }

    #[test]
    fn test_path_conflict_dir_then_file() {
        let (_dir, repo) = test_repo();

        let mut index = Index::new();
        index.upsert(entry("x/y", 1));
        index.upsert(entry("x", 2));

        let result = write_tree(&repo, &index);
        assert!(matches!(result, Err(Error::PathConflict(_))));
    }
}
