//! Reference to a previous transaction output.

use std::fmt;

use txkit_primitives::chainhash::Hash;
use txkit_primitives::util::ByteReader;

use crate::error::{decode_hex, reading};
use crate::TransactionError;

/// Serialized size of an outpoint: 32-byte txid plus 4-byte index.
pub const OUTPOINT_SIZE: usize = 36;

/// Index used by the null outpoint of a coinbase input.
pub const NULL_INDEX: u32 = 0xffff_ffff;

/// A `(tx_id, index)` pair naming the output an input spends.
///
/// # Wire format
///
/// | Field  | Size                    |
/// |--------|-------------------------|
/// | tx_id  | 32 bytes (internal order) |
/// | index  | 4 bytes (LE)            |
///
/// The wire bytes are fixed at construction and held inline, so the value
/// stays `Copy`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Outpoint {
    tx_id: Hash,
    index: u32,
    raw: [u8; OUTPOINT_SIZE],
}

impl Outpoint {
    /// Create an outpoint from a txid in internal byte order and an index.
    pub fn new(tx_id: Hash, index: u32) -> Self {
        let mut raw = [0u8; OUTPOINT_SIZE];
        raw[..32].copy_from_slice(tx_id.as_bytes());
        raw[32..].copy_from_slice(&index.to_le_bytes());
        Outpoint { tx_id, index, raw }
    }

    /// The null outpoint used by coinbase inputs: zero txid, index 0xffffffff.
    pub fn null() -> Self {
        Outpoint::new(Hash::default(), NULL_INDEX)
    }

    /// Whether this is the coinbase null outpoint.
    pub fn is_null(&self) -> bool {
        *self == Outpoint::null()
    }

    /// The referenced transaction id (internal byte order).
    pub fn tx_id(&self) -> &Hash {
        &self.tx_id
    }

    /// The referenced output index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Copy with a different txid.
    pub fn with_tx_id(&self, tx_id: Hash) -> Self {
        Outpoint::new(tx_id, self.index)
    }

    /// Copy with a different index.
    pub fn with_index(&self, index: u32) -> Self {
        Outpoint::new(self.tx_id, index)
    }

    /// Read an outpoint from the reader's current position.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let tx_id = reader.read_array::<32>().map_err(reading("outpoint tx_id"))?;
        let index = reader.read_u32_le().map_err(reading("outpoint index"))?;
        Ok(Outpoint::new(Hash::new(tx_id), index))
    }

    /// Parse an outpoint from the first 36 bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        Self::read_from(&mut ByteReader::new(bytes))
    }

    /// Parse an outpoint from hex.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        Self::from_bytes(&decode_hex(hex_str)?)
    }

    /// The 36-byte wire encoding.
    pub fn as_bytes(&self) -> &[u8; OUTPOINT_SIZE] {
        &self.raw
    }

    /// Append the wire encoding to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.raw);
    }

    /// Serialize to the 36-byte wire encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.raw.to_vec()
    }

    /// Serialize to hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl fmt::Display for Outpoint {
    /// `txid:index` with the txid in display order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.index)
    }
}
