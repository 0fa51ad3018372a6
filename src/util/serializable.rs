use crate::util::error::Result;

/// On-disk encoding of a metadata block. Decoding validates what it reads.
pub trait ByteSerializable: Sized {
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}
