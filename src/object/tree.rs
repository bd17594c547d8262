use crate::error::{Error, Result};
use crate::oid::Oid;

/// tree entry mode for a subtree
pub const MODE_TREE: u32 = 0o40000;
/// tree entry mode for a regular file
pub const MODE_REGULAR: u32 = 0o100644;
/// tree entry mode for an executable file
pub const MODE_EXECUTABLE: u32 = 0o100755;
/// tree entry mode for a symlink
pub const MODE_SYMLINK: u32 = 0o120000;
/// tree entry mode for a gitlink (submodule commit)
pub const MODE_GITLINK: u32 = 0o160000;

/// a single entry in a tree object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: u32,
    pub path: String,
    pub oid: Oid,
}

impl TreeEntry {
    pub fn new(mode: u32, path: impl Into<String>, oid: Oid) -> Self {
        Self {
            mode,
            path: path.into(),
            oid,
        }
    }

    /// the four high mode bits select the entry type
    pub fn mode_type(&self) -> u32 {
        self.mode >> 12
    }

    pub fn is_tree(&self) -> bool {
        self.mode_type() == 0o04
    }

    /// object kind token for listings: tree, blob or commit
    pub fn kind_token(&self) -> Result<&'static str> {
        match self.mode_type() {
            0o04 => Ok("tree"),
            0o10 | 0o12 => Ok("blob"),
            0o16 => Ok("commit"),
            _ => Err(Error::Malformed(format!(
                "unknown tree entry mode {:o} for {}",
                self.mode, self.path
            ))),
        }
    }

    /// mode zero-padded to six octal digits, for display
    pub fn display_mode(&self) -> String {
        format!("{:06o}", self.mode)
    }

    /// canonical sort key: directories (and everything non-regular)
    /// compare as if the name had a trailing slash
    fn sort_key(&self) -> Vec<u8> {
        let mut key = self.path.clone().into_bytes();
        if self.mode_type() != 0o10 {
            key.push(b'/');
        }
        key
    }
}

/// a tree object: an ordered list of entries
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TreeEntry> {
        self.entries
    }

    pub fn push(&mut self, entry: TreeEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// parse the binary entry list
    ///
    /// each entry is `<octal mode> <path>\0<20 raw sha bytes>`; the mode
    /// is five or six ASCII octal digits.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < raw.len() {
            let space = raw[pos..]
                .iter()
                .position(|&b| b == b' ')
                .map(|i| pos + i)
                .ok_or_else(|| Error::Malformed("tree entry: missing mode separator".to_string()))?;
            let mode_len = space - pos;
            if mode_len != 5 && mode_len != 6 {
                return Err(Error::Malformed(format!(
                    "tree entry: mode is {} digits, expected 5 or 6",
                    mode_len
                )));
            }
            let mode_str = std::str::from_utf8(&raw[pos..space])
                .map_err(|_| Error::Malformed("tree entry: non-ascii mode".to_string()))?;
            let mode = u32::from_str_radix(mode_str, 8)
                .map_err(|_| Error::Malformed(format!("tree entry: bad octal mode {}", mode_str)))?;

            let nul = raw[space..]
                .iter()
                .position(|&b| b == 0)
                .map(|i| space + i)
                .ok_or_else(|| Error::Malformed("tree entry: missing path separator".to_string()))?;
            let path = std::str::from_utf8(&raw[space + 1..nul])
                .map_err(|_| Error::Malformed("tree entry: path is not utf-8".to_string()))?
                .to_string();
            if path.is_empty() {
                return Err(Error::Malformed("tree entry: empty path".to_string()));
            }

            let sha_end = nul + 21;
            if raw.len() < sha_end {
                return Err(Error::Malformed("tree entry: truncated sha".to_string()));
            }
            let mut sha = [0u8; 20];
            sha.copy_from_slice(&raw[nul + 1..sha_end]);

            entries.push(TreeEntry::new(mode, path, Oid::from_bytes(sha)));
            pos = sha_end;
        }

        Ok(Self { entries })
    }

    /// serialize in canonical order
    ///
    /// entries are sorted by the composite key so the emitted bytes
    /// (and therefore the tree oid) match the canonical tool exactly.
    pub fn serialize(&self) -> Vec<u8> {
        let mut sorted: Vec<&TreeEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut out = Vec::new();
        for entry in sorted {
            out.extend_from_slice(format!("{:o}", entry.mode).as_bytes());
            out.push(b' ');
            out.extend_from_slice(entry.path.as_bytes());
            out.push(0);
            out.extend_from_slice(entry.oid.as_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u8) -> Oid {
        Oid::from_bytes([n; 20])
    }

    #[test]
    fn test_serialize_parse_roundtrip() {
        let tree = Tree::new(vec![
            TreeEntry::new(MODE_REGULAR, "a.txt", oid(1)),
            TreeEntry::new(MODE_TREE, "dir", oid(2)),
            TreeEntry::new(MODE_EXECUTABLE, "run.sh", oid(3)),
        ]);
        let raw = tree.serialize();
        let parsed = Tree::parse(&raw).unwrap();
        assert_eq!(parsed.serialize(), raw);
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_canonical_sort_dir_before_file_suffix() {
        // "a" is a directory so it sorts as "a/", before plain "b"
        let tree = Tree::new(vec![
            TreeEntry::new(MODE_REGULAR, "b", oid(1)),
            TreeEntry::new(MODE_TREE, "a", oid(2)),
        ]);
        let parsed = Tree::parse(&tree.serialize()).unwrap();
        let names: Vec<_> = parsed.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_dir_slash_ordering_against_dotted_file() {
        // canonical git quirk: "foo.txt" < "foo/" because '.' < '/',
        // but a directory "foo" would sort after "foo-bar" ('/' > '-')
        let tree = Tree::new(vec![
            TreeEntry::new(MODE_TREE, "foo", oid(1)),
            TreeEntry::new(MODE_REGULAR, "foo-bar", oid(2)),
        ]);
        let parsed = Tree::parse(&tree.serialize()).unwrap();
        let names: Vec<_> = parsed.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(names, vec!["foo-bar", "foo"]);
    }

    #[test]
    fn test_modes_serialize_without_leading_zero() {
        let tree = Tree::new(vec![TreeEntry::new(MODE_TREE, "d", oid(1))]);
        let raw = tree.serialize();
        assert!(raw.starts_with(b"40000 d\0"));
    }

    #[test]
    fn test_five_digit_mode_parses() {
        let mut raw = b"40000 d\0".to_vec();
        raw.extend_from_slice(&[7u8; 20]);
        let tree = Tree::parse(&raw).unwrap();
        assert_eq!(tree.entries()[0].mode, MODE_TREE);
        assert_eq!(tree.entries()[0].display_mode(), "040000");
        // canonical bytes are preserved on re-serialize
        assert_eq!(tree.serialize(), raw);
    }

    #[test]
    fn test_kind_tokens() {
        assert_eq!(
            TreeEntry::new(MODE_TREE, "d", oid(0)).kind_token().unwrap(),
            "tree"
        );
        assert_eq!(
            TreeEntry::new(MODE_REGULAR, "f", oid(0)).kind_token().unwrap(),
            "blob"
        );
        assert_eq!(
            TreeEntry::new(MODE_SYMLINK, "l", oid(0)).kind_token().unwrap(),
            "blob"
        );
        assert_eq!(
            TreeEntry::new(MODE_GITLINK, "s", oid(0)).kind_token().unwrap(),
            "commit"
        );
        assert!(TreeEntry::new(0o777777, "x", oid(0)).kind_token().is_err());
    }

    #[test]
    fn test_parse_rejects_bad_mode_width() {
        let mut raw = b"1006440 f\0".to_vec();
        raw.extend_from_slice(&[1u8; 20]);
        assert!(matches!(Tree::parse(&raw), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_parse_rejects_truncated_sha() {
        let mut raw = b"100644 f\0".to_vec();
        raw.extend_from_slice(&[1u8; 10]);
        assert!(matches!(Tree::parse(&raw), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_parse_rejects_missing_nul() {
        let raw = b"100644 no-terminator".to_vec();
        assert!(matches!(Tree::parse(&raw), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_empty_tree() {
        let tree = Tree::parse(b"").unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.serialize(), b"");
    }
}
