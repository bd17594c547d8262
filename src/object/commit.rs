use crate::error::{Error, Result};
use crate::object::kvlm::Kvlm;
use crate::oid::Oid;

/// a commit object: KVLM headers plus message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    kvlm: Kvlm,
}

impl Commit {
    /// build a new commit from its parts
    ///
    /// author and committer lines carry the `<identity> <unix-secs>
    /// <±HHMM>` stamp; the message gets a trailing newline if missing.
    pub fn new(tree: Oid, parents: &[Oid], author: &str, committer: &str, message: &str) -> Self {
        let mut kvlm = Kvlm::new();
        kvlm.append(b"tree", tree.to_hex().as_bytes());
        for parent in parents {
            kvlm.append(b"parent", parent.to_hex().as_bytes());
        }
        kvlm.append(b"author", author.as_bytes());
        kvlm.append(b"committer", committer.as_bytes());

        let mut body = message.as_bytes().to_vec();
        if !body.ends_with(b"\n") {
            body.push(b'\n');
        }
        kvlm.set_message(&body);

        Self { kvlm }
    }

    pub fn parse(raw: &[u8]) -> Result<Self> {
        Ok(Self {
            kvlm: Kvlm::parse(raw)?,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.kvlm.serialize()
    }

    pub fn kvlm(&self) -> &Kvlm {
        &self.kvlm
    }

    /// the commit's tree oid
    pub fn tree(&self) -> Result<Oid> {
        let value = self
            .kvlm
            .get_one(b"tree")
            .ok_or_else(|| Error::Malformed("commit without tree header".to_string()))?;
        oid_from_header(value)
    }

    /// parent oids; zero or more, in header order
    pub fn parents(&self) -> Result<Vec<Oid>> {
        self.kvlm
            .get_all(b"parent")
            .into_iter()
            .map(oid_from_header)
            .collect()
    }

    pub fn author(&self) -> Option<&[u8]> {
        self.kvlm.get_one(b"author")
    }

    pub fn message(&self) -> &[u8] {
        self.kvlm.message()
    }

    /// first line of the message, for notices
    pub fn summary(&self) -> String {
        let message = String::from_utf8_lossy(self.message());
        message.lines().next().unwrap_or("").to_string()
    }
}

pub(crate) fn oid_from_header(value: &[u8]) -> Result<Oid> {
    let hex = std::str::from_utf8(value)
        .map_err(|_| Error::Malformed("non-ascii oid in header".to_string()))?;
    Oid::from_hex(hex.trim())
}
