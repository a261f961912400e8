//! Segregated-witness data attached to a transaction input.

use txkit_primitives::util::{ByteReader, VarInt};

use crate::error::{decode_hex, reading};
use crate::TransactionError;

/// One element of an input's witness stack.
///
/// Serialized as a VarInt length followed by the item bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WitnessStackItem {
    item: Vec<u8>,
}

impl WitnessStackItem {
    pub fn new(item: Vec<u8>) -> Self {
        WitnessStackItem { item }
    }

    pub fn item(&self) -> &[u8] {
        &self.item
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let item = reader.read_var_bytes().map_err(reading("witness stack item"))?;
        Ok(WitnessStackItem::new(item.to_vec()))
    }

    /// Parse an item from the front of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        Self::read_from(&mut ByteReader::new(bytes))
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        Self::from_bytes(&decode_hex(hex_str)?)
    }

    /// Serialized length in bytes, including the length prefix.
    pub fn len(&self) -> usize {
        VarInt::from(self.item.len()).length() + self.item.len()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&VarInt::from(self.item.len()).to_bytes());
        out.extend_from_slice(&self.item);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        self.write_to(&mut out);
        out
    }
}

/// The witness stack of a single input.
///
/// # Wire format
///
/// | Field       | Size                 |
/// |-------------|----------------------|
/// | item count  | VarInt               |
/// | items       | variable (per item)  |
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputWitness {
    stack: Vec<WitnessStackItem>,
}

impl InputWitness {
    pub fn new(stack: Vec<WitnessStackItem>) -> Self {
        InputWitness { stack }
    }

    /// Build a witness from raw item byte strings, bottom of the stack first.
    pub fn from_items<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Vec<u8>>,
    {
        InputWitness::new(
            items
                .into_iter()
                .map(|item| WitnessStackItem::new(item.into()))
                .collect(),
        )
    }

    pub fn stack(&self) -> &[WitnessStackItem] {
        &self.stack
    }

    pub fn with_stack(&self, stack: Vec<WitnessStackItem>) -> Self {
        InputWitness::new(stack)
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let count = reader.read_varint().map_err(reading("witness item count"))?.value();
        // Every item takes at least one byte.
        let mut stack = Vec::with_capacity((count as usize).min(reader.remaining()));
        for _ in 0..count {
            stack.push(WitnessStackItem::read_from(reader)?);
        }
        Ok(InputWitness { stack })
    }

    /// Parse a witness from the front of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        Self::read_from(&mut ByteReader::new(bytes))
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        Self::from_bytes(&decode_hex(hex_str)?)
    }

    /// Serialized length in bytes.
    pub fn len(&self) -> usize {
        VarInt::from(self.stack.len()).length()
            + self.stack.iter().map(WitnessStackItem::len).sum::<usize>()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&VarInt::from(self.stack.len()).to_bytes());
        for item in &self.stack {
            item.write_to(out);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        self.write_to(&mut out);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_item() {
        let item = WitnessStackItem::from_hex("03aabbccdd").unwrap();
        assert_eq!(item.item(), &[0xaa, 0xbb, 0xcc]);
        assert_eq!(item.len(), 4);
        assert_eq!(item.to_bytes(), vec![0x03, 0xaa, 0xbb, 0xcc]);
    }

    #[test]
    fn test_p2wpkh_witness() {
        let witness = InputWitness::from_items([vec![0xaa; 71], vec![0xbb; 33]]);
        let bytes = witness.to_bytes();
        assert_eq!(bytes[0], 2);
        assert_eq!(bytes[1], 71);
        assert_eq!(bytes[73], 33);
        assert_eq!(witness.len(), bytes.len());
        assert_eq!(witness.len(), 1 + 72 + 34);

        let parsed = InputWitness::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, witness);
        assert_eq!(parsed.stack()[1].item(), &[0xbb; 33][..]);
    }

    #[test]
    fn test_empty_witness() {
        let witness = InputWitness::from_hex("00").unwrap();
        assert!(witness.stack().is_empty());
        assert_eq!(witness.len(), 1);
    }

    #[test]
    fn test_with_stack_leaves_original() {
        let witness = InputWitness::from_items([vec![1u8]]);
        let other = witness.with_stack(vec![WitnessStackItem::new(vec![2, 3])]);
        assert_eq!(witness.to_hex(), "010101");
        assert_eq!(other.to_hex(), "01020203");
    }

    #[test]
    fn test_truncated() {
        assert!(InputWitness::from_hex("02030102").unwrap_err().is_parse());
        // Item count larger than the data.
        assert!(InputWitness::from_hex("ff").unwrap_err().is_parse());
        assert!(WitnessStackItem::from_hex("05aa").unwrap_err().is_parse());
    }
}
