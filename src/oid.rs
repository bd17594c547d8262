use std::fmt;

use sha1::{Digest, Sha1};

use crate::Error;

/// SHA-1 object id used for content addressing
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid([u8; 20]);

impl Oid {
    /// create from raw bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// parse from a 40-char hex string
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidOidHex(s.to_string()))?;
        if bytes.len() != 20 {
            return Err(Error::InvalidOidHex(s.to_string()));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// get raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// abbreviated hex form for notices
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }

    /// split into loose-object path components
    /// returns (first 2 hex chars, remaining 38 hex chars)
    pub fn to_path_components(&self) -> (String, String) {
        let hex = self.to_hex();
        (hex[..2].to_string(), hex[2..].to_string())
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", &self.to_hex()[..12])
    }
}

/// compute the id of framed object bytes (`<kind> <len>\0<payload>`)
pub fn compute_oid(raw: &[u8]) -> Oid {
    let digest = Sha1::digest(raw);
    Oid(digest.into())
}
