use crate::error::{Error, Result};
use crate::object::commit::oid_from_header;
use crate::object::kvlm::Kvlm;
use crate::object::Kind;
use crate::oid::Oid;

/// an annotated tag object
///
/// same KVLM body as a commit, with `object`, `type`, `tag` and
/// `tagger` headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    kvlm: Kvlm,
}

impl Tag {
    pub fn new(object: Oid, kind: Kind, name: &str, tagger: &str, message: &str) -> Self {
        let mut kvlm = Kvlm::new();
        kvlm.append(b"object", object.to_hex().as_bytes());
        kvlm.append(b"type", kind.as_str().as_bytes());
        kvlm.append(b"tag", name.as_bytes());
        kvlm.append(b"tagger", tagger.as_bytes());

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

    /// the oid this tag points at
    pub fn object(&self) -> Result<Oid> {
        let value = self
            .kvlm
            .get_one(b"object")
            .ok_or_else(|| Error::Malformed("tag without object header".to_string()))?;
        oid_from_header(value)
    }

    pub fn name(&self) -> Option<&[u8]> {
        self.kvlm.get_one(b"tag")
    }

    pub fn message(&self) -> &[u8] {
        self.kvlm.message()
    }
}
