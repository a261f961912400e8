//! Append-only byte buffers.
//!
//! `ByteData` is the accumulator every serialized record is built in: fields
//! are appended in wire order, then the buffer is frozen with
//! `make_immutable` so the finished encoding can no longer change.

use std::fmt;

use crate::util::VarInt;
use crate::PrimitivesError;

/// An append-only binary buffer that can be frozen.
///
/// Equality compares the byte content only; a frozen and an unfrozen buffer
/// holding the same bytes are equal.
#[derive(Clone, Debug, Default)]
pub struct ByteData {
    bytes: Vec<u8>,
    immutable: bool,
}

impl ByteData {
    /// Create an empty, mutable buffer.
    pub fn new() -> Self {
        ByteData::default()
    }

    /// Create an empty buffer with space reserved for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        ByteData {
            bytes: Vec::with_capacity(capacity),
            immutable: false,
        }
    }

    /// Decode a hex string into a new mutable buffer.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        Ok(ByteData::from(hex::decode(hex_str)?))
    }

    fn ensure_mutable(&self) -> Result<(), PrimitivesError> {
        if self.immutable {
            return Err(PrimitivesError::Immutable);
        }
        Ok(())
    }

    /// Append raw bytes.
    ///
    /// # Returns
    /// `PrimitivesError::Immutable` if the buffer has been frozen.
    pub fn append(&mut self, data: &[u8]) -> Result<(), PrimitivesError> {
        self.ensure_mutable()?;
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Append a u32 in little-endian order.
    pub fn append_u32_le(&mut self, v: u32) -> Result<(), PrimitivesError> {
        self.append(&v.to_le_bytes())
    }

    /// Append a u64 in little-endian order.
    pub fn append_u64_le(&mut self, v: u64) -> Result<(), PrimitivesError> {
        self.append(&v.to_le_bytes())
    }

    /// Append a compact-size integer.
    pub fn append_varint(&mut self, v: u64) -> Result<(), PrimitivesError> {
        self.append(&VarInt(v).to_bytes())
    }

    /// Append `data` preceded by its compact-size length.
    pub fn append_var_bytes(&mut self, data: &[u8]) -> Result<(), PrimitivesError> {
        self.append_varint(data.len() as u64)?;
        self.append(data)
    }

    /// Return a new mutable buffer holding `self` followed by `other`.
    ///
    /// Neither operand is modified, so this works on frozen buffers too.
    pub fn concat(&self, other: &ByteData) -> ByteData {
        let mut bytes = Vec::with_capacity(self.len() + other.len());
        bytes.extend_from_slice(&self.bytes);
        bytes.extend_from_slice(&other.bytes);
        ByteData::from(bytes)
    }

    /// Freeze the buffer; every later append fails.
    pub fn make_immutable(&mut self) {
        self.immutable = true;
    }

    /// Consume the buffer and return it frozen.
    pub fn into_immutable(mut self) -> Self {
        self.make_immutable();
        self
    }

    /// Whether `make_immutable` has been called.
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Number of bytes in the buffer.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the buffer contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the buffer and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Encode the contents as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl From<Vec<u8>> for ByteData {
    fn from(bytes: Vec<u8>) -> Self {
        ByteData {
            bytes,
            immutable: false,
        }
    }
}

impl From<&[u8]> for ByteData {
    fn from(bytes: &[u8]) -> Self {
        ByteData::from(bytes.to_vec())
    }
}

impl AsRef<[u8]> for ByteData {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for ByteData {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for ByteData {}

impl fmt::Display for ByteData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Check that `value` has exactly `expected` bytes.
///
/// A `None` expectation accepts any length.
///
/// # Returns
/// `PrimitivesError::InvalidLength` on mismatch.
pub fn validate_bytes(value: &[u8], expected: Option<usize>) -> Result<(), PrimitivesError> {
    match expected {
        Some(expected) if value.len() != expected => Err(PrimitivesError::InvalidLength {
            expected,
            got: value.len(),
        }),
        _ => Ok(()),
    }
}
