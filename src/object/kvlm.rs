use crate::error::{Error, Result};

/// key-value list with message: the body format shared by commits and
/// tags
///
/// headers are an ordered list of `(key, value)` pairs; keys may repeat
/// (`parent` does). keeping the pairs in parse order makes
/// `serialize(parse(raw)) == raw` hold byte-for-byte.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Kvlm {
    fields: Vec<(Vec<u8>, Vec<u8>)>,
    message: Vec<u8>,
}

impl Kvlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// parse a commit/tag body
    ///
    /// header values may span lines; continuation lines start with a
    /// space and are unfolded. a blank line separates headers from the
    /// message.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut kvlm = Self::new();
        let mut pos = 0;

        loop {
            if pos >= raw.len() {
                return Err(Error::Malformed(
                    "kvlm: missing blank line before message".to_string(),
                ));
            }

            let space = find_byte(raw, b' ', pos);
            let newline = find_byte(raw, b'\n', pos);

            let header = match (space, newline) {
                (Some(s), Some(n)) if s < n => Some(s),
                (Some(s), None) => Some(s),
                _ => None,
            };

            let Some(space) = header else {
                // headers are over; the current byte must be the blank
                // separator line
                if newline != Some(pos) {
                    return Err(Error::Malformed(format!(
                        "kvlm: expected blank line at offset {}",
                        pos
                    )));
                }
                kvlm.message = raw[pos + 1..].to_vec();
                return Ok(kvlm);
            };

            let key = raw[pos..space].to_vec();

            // value runs to the first newline not followed by a space
            let mut end = space;
            loop {
                match find_byte(raw, b'\n', end + 1) {
                    Some(n) if raw.get(n + 1) == Some(&b' ') => end = n,
                    Some(n) => {
                        end = n;
                        break;
                    }
                    None => {
                        return Err(Error::Malformed(format!(
                            "kvlm: unterminated value for key {:?}",
                            String::from_utf8_lossy(&key)
                        )))
                    }
                }
            }

            let value = unfold(&raw[space + 1..end]);
            kvlm.fields.push((key, value));
            pos = end + 1;
        }
    }

    /// serialize back to the on-disk body
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (key, value) in &self.fields {
            out.extend_from_slice(key);
            out.push(b' ');
            out.extend_from_slice(&fold(value));
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    /// first value for a key
    pub fn get_one(&self, key: &[u8]) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// all values for a key, in order
    pub fn get_all(&self, key: &[u8]) -> Vec<&[u8]> {
        self.fields
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
            .collect()
    }

    /// replace all occurrences of a key with a single value
    ///
    /// the value lands at the first occurrence's position, or is
    /// appended when the key is new.
    pub fn set(&mut self, key: &[u8], value: &[u8]) {
        let mut replaced = false;
        self.fields.retain_mut(|(k, v)| {
            if k.as_slice() != key {
                return true;
            }
            if replaced {
                return false;
            }
            replaced = true;
            *v = value.to_vec();
            true
        });
        if !replaced {
            self.append(key, value);
        }
    }

    /// append a `(key, value)` pair
    pub fn append(&mut self, key: &[u8], value: &[u8]) {
        self.fields.push((key.to_vec(), value.to_vec()));
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn set_message(&mut self, message: &[u8]) {
        self.message = message.to_vec();
    }
}

/// `\n ` continuation -> `\n`
fn unfold(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut i = 0;
    while i < value.len() {
        if value[i] == b'\n' && value.get(i + 1) == Some(&b' ') {
            out.push(b'\n');
            i += 2;
        } else {
            out.push(value[i]);
            i += 1;
        }
    }
    out
}

/// `\n` -> `\n ` continuation
fn fold(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for &b in value {
        out.push(b);
        if b == b'\n' {
            out.push(b' ');
        }
    }
    out
}

fn find_byte(raw: &[u8], needle: u8, from: usize) -> Option<usize> {
    if from >= raw.len() {
        return None;
    }
    raw[from..].iter().position(|&b| b == needle).map(|i| from + i)
}
