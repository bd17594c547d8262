/// opaque file content
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// the payload is exactly the file content
    pub fn parse(raw: &[u8]) -> Self {
        Self { data: raw.to_vec() }
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
