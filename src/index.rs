use std::fs::Metadata;
use std::io::{Cursor, Read};
use std::os::unix::fs::MetadataExt;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{Error, Result};
use crate::fs::Root;
use crate::oid::Oid;
use crate::repo::Repository;

/// the only supported index format version
pub const INDEX_VERSION: u32 = 2;

const INDEX_SIGNATURE: &[u8; 4] = b"DIRC";
/// fixed bytes before the entry name
const ENTRY_FIXED_LEN: usize = 62;
/// flags name-length field saturates here
const NAME_LEN_MAX: u16 = 0xFFF;

/// mode type bits for a regular file
pub const MODE_TYPE_REGULAR: u16 = 0b1000;
/// mode type bits for a symlink
pub const MODE_TYPE_SYMLINK: u16 = 0b1010;
/// mode type bits for a gitlink
pub const MODE_TYPE_GITLINK: u16 = 0b1110;

/// a staged path with its blob oid and stat cache
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub ctime: (u32, u32),
    pub mtime: (u32, u32),
    pub dev: u32,
    pub ino: u32,
    pub mode_type: u16,
    pub mode_perms: u16,
    pub uid: u32,
    pub gid: u32,
    pub fsize: u32,
    pub oid: Oid,
    pub assume_valid: bool,
    pub stage: u16,
    pub name: String,
}

impl IndexEntry {
    /// build an entry from a worktree file's metadata
    ///
    /// with `filemode` on, an executable file is staged as 0o755;
    /// otherwise perms are always 0o644.
    pub fn from_metadata(meta: &Metadata, oid: Oid, name: String, filemode: bool) -> Self {
        let perms = if filemode && meta.mode() & 0o111 != 0 {
            0o755
        } else {
            0o644
        };
        Self {
            ctime: (meta.ctime() as u32, meta.ctime_nsec() as u32),
            mtime: (meta.mtime() as u32, meta.mtime_nsec() as u32),
            dev: meta.dev() as u32,
            ino: meta.ino() as u32,
            mode_type: MODE_TYPE_REGULAR,
            mode_perms: perms,
            uid: meta.uid(),
            gid: meta.gid(),
            fsize: meta.len() as u32,
            oid,
            assume_valid: false,
            stage: 0,
            name,
        }
    }

    /// the tree-object mode for this entry
    pub fn tree_mode(&self) -> u32 {
        (u32::from(self.mode_type) << 12) | u32::from(self.mode_perms)
    }

    fn flags(&self) -> u16 {
        let name_len = u16::try_from(self.name.len()).unwrap_or(NAME_LEN_MAX).min(NAME_LEN_MAX);
        let assume = if self.assume_valid { 1u16 << 15 } else { 0 };
        assume | ((self.stage & 0b11) << 12) | name_len
    }
}

/// the staging index: version 2 binary file, entries sorted by name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Index {
    version: u32,
    entries: Vec<IndexEntry>,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            entries: Vec::new(),
        }
    }
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// read the repository's index; a missing or empty file is an
    /// empty index
    pub fn read(repo: &Repository) -> Result<Self> {
        if !repo.fs().file_exists("index", Root::Git) {
            return Ok(Self::default());
        }
        let raw = repo.fs().file_read("index", Root::Git)?;
        if raw.is_empty() {
            return Ok(Self::default());
        }
        Self::parse(&raw)
    }

    /// parse the binary format
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(raw);

        let mut signature = [0u8; 4];
        cur.read_exact(&mut signature).map_err(truncated)?;
        if &signature != INDEX_SIGNATURE {
            return Err(Error::Malformed("invalid index signature".to_string()));
        }
        let version = cur.read_u32::<BigEndian>().map_err(truncated)?;
        if version != INDEX_VERSION {
            return Err(Error::UnsupportedIndexVersion(version));
        }
        let count = cur.read_u32::<BigEndian>().map_err(truncated)?;

        let mut entries = Vec::with_capacity(count as usize);
        for i in 0..count {
            let ctime_s = cur.read_u32::<BigEndian>().map_err(truncated)?;
            let ctime_ns = cur.read_u32::<BigEndian>().map_err(truncated)?;
            let mtime_s = cur.read_u32::<BigEndian>().map_err(truncated)?;
            let mtime_ns = cur.read_u32::<BigEndian>().map_err(truncated)?;
            let dev = cur.read_u32::<BigEndian>().map_err(truncated)?;
            let ino = cur.read_u32::<BigEndian>().map_err(truncated)?;

            let unused = cur.read_u16::<BigEndian>().map_err(truncated)?;
            if unused != 0 {
                log::warn!("index entry {} has non-zero unused field", i);
            }
            let mode = cur.read_u16::<BigEndian>().map_err(truncated)?;
            let mode_type = mode >> 12;
            if ![MODE_TYPE_REGULAR, MODE_TYPE_SYMLINK, MODE_TYPE_GITLINK].contains(&mode_type) {
                return Err(Error::BadMode(mode_type));
            }
            let mode_perms = mode & 0o777;

            let uid = cur.read_u32::<BigEndian>().map_err(truncated)?;
            let gid = cur.read_u32::<BigEndian>().map_err(truncated)?;
            let fsize = cur.read_u32::<BigEndian>().map_err(truncated)?;

            let mut sha = [0u8; 20];
            cur.read_exact(&mut sha).map_err(truncated)?;

            let flags = cur.read_u16::<BigEndian>().map_err(truncated)?;
            let assume_valid = flags & (1 << 15) != 0;
            if flags & (1 << 14) != 0 {
                log::warn!("index entry {} has unsupported extended flags", i);
            }
            let stage = (flags >> 12) & 0b11;
            let name_len = flags & NAME_LEN_MAX;

            let name_start = cur.position() as usize;
            let name_end = if name_len < NAME_LEN_MAX {
                let end = name_start + name_len as usize;
                if raw.len() <= end || raw[end] != 0 {
                    return Err(Error::Malformed(
                        "index entry name not null-terminated".to_string(),
                    ));
                }
                end
            } else {
                // long name: scan for the terminator
                let scan_from = name_start + NAME_LEN_MAX as usize;
                if raw.len() < scan_from {
                    return Err(Error::Malformed("truncated index entry".to_string()));
                }
                raw[scan_from..]
                    .iter()
                    .position(|&b| b == 0)
                    .map(|p| scan_from + p)
                    .ok_or_else(|| {
                        Error::Malformed("long index entry name not null-terminated".to_string())
                    })?
            };
            let name = std::str::from_utf8(&raw[name_start..name_end])
                .map_err(|_| Error::Malformed("index entry name is not utf-8".to_string()))?
                .to_string();

            let consumed = ENTRY_FIXED_LEN + (name_end - name_start) + 1;
            let padding = (8 - consumed % 8) % 8;
            let next = name_end + 1 + padding;
            if raw.len() < next {
                return Err(Error::Malformed("truncated index entry".to_string()));
            }
            cur.set_position(next as u64);

            entries.push(IndexEntry {
                ctime: (ctime_s, ctime_ns),
                mtime: (mtime_s, mtime_ns),
                dev,
                ino,
                mode_type,
                mode_perms,
                uid,
                gid,
                fsize,
                oid: Oid::from_bytes(sha),
                assume_valid,
                stage,
                name,
            });
        }

        Ok(Self { version, entries })
    }

    /// emit the binary format; entries are written in list order
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(INDEX_SIGNATURE);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        for entry in &self.entries {
            out.extend_from_slice(&entry.ctime.0.to_be_bytes());
            out.extend_from_slice(&entry.ctime.1.to_be_bytes());
            out.extend_from_slice(&entry.mtime.0.to_be_bytes());
            out.extend_from_slice(&entry.mtime.1.to_be_bytes());
            out.extend_from_slice(&entry.dev.to_be_bytes());
            out.extend_from_slice(&entry.ino.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes());
            out.extend_from_slice(&((entry.mode_type << 12) | entry.mode_perms).to_be_bytes());
            out.extend_from_slice(&entry.uid.to_be_bytes());
            out.extend_from_slice(&entry.gid.to_be_bytes());
            out.extend_from_slice(&entry.fsize.to_be_bytes());
            out.extend_from_slice(entry.oid.as_bytes());
            out.extend_from_slice(&entry.flags().to_be_bytes());

            out.extend_from_slice(entry.name.as_bytes());
            out.push(0);

            let consumed = ENTRY_FIXED_LEN + entry.name.len() + 1;
            let padding = (8 - consumed % 8) % 8;
            out.extend(std::iter::repeat(0u8).take(padding));
        }

        out
    }

    /// rewrite the on-disk index atomically
    pub fn write(&self, repo: &Repository) -> Result<()> {
        repo.fs().lock_write("index", &self.serialize(), Root::Git)?;
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// look up an entry by name
    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// replace-by-name or insert, keeping entries sorted
    pub fn upsert(&mut self, entry: IndexEntry) {
        match self
            .entries
            .binary_search_by(|e| e.name.as_str().cmp(entry.name.as_str()))
        {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    /// drop an entry by name; false if it was not present
    pub fn remove(&mut self, name: &str) -> bool {
        match self
            .entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
        {
            Ok(i) => {
                self.entries.remove(i);
                true
            }
            Err(_) => false,
        }
    }

    /// keep only entries the predicate accepts
    pub fn retain<F: FnMut(&IndexEntry) -> bool>(&mut self, f: F) {
        self.entries.retain(f);
    }
}

fn truncated(_: std::io::Error) -> Error {
    Error::Malformed("truncated index".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(name: &str, oid_byte: u8) -> IndexEntry {
        IndexEntry {
            ctime: (1_700_000_000, 123_456_789),
            mtime: (1_700_000_001, 987_654_321),
            dev: 2049,
            ino: 1337,
            mode_type: MODE_TYPE_REGULAR,
            mode_perms: 0o644,
            uid: 1000,
            gid: 1000,
            fsize: 42,
            oid: Oid::from_bytes([oid_byte; 20]),
            assume_valid: false,
            stage: 0,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_empty_index_roundtrip() {
        let index = Index::new();
        let parsed = Index::parse(&index.serialize()).unwrap();
        assert_eq!(parsed, index);
        assert_eq!(parsed.version(), INDEX_VERSION);
    }

    #[test]
    fn test_roundtrip_preserves_entries() {
        let mut index = Index::new();
        // name lengths chosen to hit different padding widths
        for (i, name) in ["a", "ab/cd.txt", "deeply/nested/path/file.rs", "zz"]
            .iter()
            .enumerate()
        {
            index.upsert(entry(name, i as u8 + 1));
        }

        let parsed = Index::parse(&index.serialize()).unwrap();
        assert_eq!(parsed, index);
    }

    #[test]
    fn test_entries_ascending_after_upsert() {
        let mut index = Index::new();
        index.upsert(entry("zebra", 1));
        index.upsert(entry("alpha", 2));
        index.upsert(entry("mid", 3));

        let names: Vec<_> = index.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zebra"]);

        let parsed = Index::parse(&index.serialize()).unwrap();
        let names: Vec<_> = parsed.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zebra"]);
    }

    #[test]
    fn test_upsert_replaces_by_name() {
        let mut index = Index::new();
        index.upsert(entry("same", 1));
        index.upsert(entry("same", 9));

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("same").unwrap().oid, Oid::from_bytes([9; 20]));
    }

    #[test]
    fn test_entry_records_are_multiple_of_eight() {
        for name in ["x", "ab", "abc", "abcd", "abcde", "abcdef", "abcdefg", "abcdefgh"] {
            let mut index = Index::new();
            index.upsert(entry(name, 1));
            let raw = index.serialize();
            assert_eq!((raw.len() - 12) % 8, 0, "name {:?}", name);
        }
    }

    #[test]
    fn test_entry_binary_layout() {
        let mut index = Index::new();
        index.upsert(entry("abc", 7));
        let raw = index.serialize();

        assert_eq!(&raw[..4], b"DIRC");
        assert_eq!(u32::from_be_bytes(raw[4..8].try_into().unwrap()), 2);
        assert_eq!(u32::from_be_bytes(raw[8..12].try_into().unwrap()), 1);

        let e = &raw[12..];
        assert_eq!(u32::from_be_bytes(e[0..4].try_into().unwrap()), 1_700_000_000);
        assert_eq!(u32::from_be_bytes(e[16..20].try_into().unwrap()), 2049); // dev
        assert_eq!(u16::from_be_bytes(e[24..26].try_into().unwrap()), 0); // unused
        assert_eq!(
            u32::from(u16::from_be_bytes(e[26..28].try_into().unwrap())),
            0o100644
        );
        assert_eq!(u32::from_be_bytes(e[36..40].try_into().unwrap()), 42); // fsize
        assert_eq!(&e[40..60], &[7u8; 20]);
        // flags: no assume_valid, stage 0, name length 3
        assert_eq!(u16::from_be_bytes(e[60..62].try_into().unwrap()), 3);
        assert_eq!(&e[62..65], b"abc");
        assert_eq!(e[65], 0);
        // 62 fixed + 3 name + 1 nul, padded up to 72
        assert_eq!(raw.len(), 12 + 72);
    }

    #[test]
    fn test_long_name_roundtrip() {
        let long_name = "d/".repeat(2500) + "leaf"; // > 0xFFF bytes
        assert!(long_name.len() > 0xFFF);

        let mut index = Index::new();
        index.upsert(entry(&long_name, 4));

        let parsed = Index::parse(&index.serialize()).unwrap();
        assert_eq!(parsed.entries()[0].name, long_name);
    }

    #[test]
    fn test_bad_signature() {
        let result = Index::parse(b"JUNK\x00\x00\x00\x02\x00\x00\x00\x00");
        assert!(matches!(result, Err(Error::Malformed(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"DIRC");
        raw.extend_from_slice(&3u32.to_be_bytes());
        raw.extend_from_slice(&0u32.to_be_bytes());
        assert!(matches!(
            Index::parse(&raw),
            Err(Error::UnsupportedIndexVersion(3))
        ));
    }

    #[test]
    fn test_bad_mode_type() {
        let mut index = Index::new();
        let mut bad = entry("f", 1);
        bad.mode_type = 0b0110;
        index.upsert(bad);

        let result = Index::parse(&index.serialize());
        assert!(matches!(result, Err(Error::BadMode(_))));
    }

    #[test]
    fn test_truncated_input() {
        let mut index = Index::new();
        index.upsert(entry("file.txt", 1));
        let raw = index.serialize();

        let result = Index::parse(&raw[..raw.len() - 6]);
        assert!(matches!(result, Err(Error::Malformed(_))));
    }

    #[test]
    fn test_read_missing_and_empty_file() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(&dir.path().join("repo")).unwrap();

        let index = Index::read(&repo).unwrap();
        assert!(index.is_empty());

        std::fs::write(repo.index_path(), b"").unwrap();
        let index = Index::read(&repo).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_write_and_read_through_repo() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(&dir.path().join("repo")).unwrap();

        let mut index = Index::new();
        index.upsert(entry("hello.txt", 1));
        index.write(&repo).unwrap();

        let read = Index::read(&repo).unwrap();
        assert_eq!(read, index);
    }

    #[test]
    fn test_tree_mode() {
        let mut e = entry("f", 1);
        assert_eq!(e.tree_mode(), 0o100644);
        e.mode_perms = 0o755;
        assert_eq!(e.tree_mode(), 0o100755);
    }

    #[test]
    fn test_remove() {
        let mut index = Index::new();
        index.upsert(entry("a", 1));
        index.upsert(entry("b", 2));

        assert!(index.remove("a"));
        assert!(!index.remove("a"));
        assert_eq!(index.len(), 1);
    }
}
