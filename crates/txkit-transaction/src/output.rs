//! Transaction output carrying a value and a locking script.

use txkit_primitives::util::{ByteReader, VarInt};
use txkit_primitives::ByteData;

use crate::error::{decode_hex, reading, unsupported};
use crate::TransactionError;

/// Output scripts at or above this length are not parsed.
pub const MAX_OUTPUT_SCRIPT_SIZE: u64 = 0xfc;

/// A single transaction output.
///
/// # Wire format
///
/// | Field          | Size          |
/// |----------------|---------------|
/// | value          | 8 bytes (LE)  |
/// | script length  | VarInt        |
/// | output_script  | variable      |
///
/// The encoding is built once at construction and kept as a frozen
/// [`ByteData`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    value: u64,
    output_script: Vec<u8>,
    raw: ByteData,
}

impl TxOut {
    /// Create an output paying `value` to `output_script`.
    ///
    /// `output_script` is the bare script, without a length prefix. Scripts
    /// of 0xfc bytes or more are refused with `Unsupported`, matching what
    /// [`TxOut::read_from`] accepts.
    pub fn new(value: u64, output_script: Vec<u8>) -> Result<Self, TransactionError> {
        check_script_len(output_script.len() as u64)?;
        Ok(TxOut::sealed(value, output_script))
    }

    /// The "null" output placed before the signed index in a legacy
    /// SIGHASH_SINGLE preimage: value 0xffff_ffff_ffff_ffff, empty script.
    pub fn null() -> Self {
        TxOut::sealed(u64::MAX, Vec::new())
    }

    fn sealed(value: u64, output_script: Vec<u8>) -> Self {
        let prefix = VarInt::from(output_script.len());
        let mut raw = Vec::with_capacity(8 + prefix.length() + output_script.len());
        raw.extend_from_slice(&value.to_le_bytes());
        raw.extend_from_slice(&prefix.to_bytes());
        raw.extend_from_slice(&output_script);
        TxOut {
            value,
            output_script,
            raw: ByteData::from(raw).into_immutable(),
        }
    }

    /// Value in the chain's base unit.
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn output_script(&self) -> &[u8] {
        &self.output_script
    }

    pub fn with_value(&self, value: u64) -> Self {
        TxOut::sealed(value, self.output_script.clone())
    }

    pub fn with_output_script(&self, output_script: Vec<u8>) -> Result<Self, TransactionError> {
        TxOut::new(self.value, output_script)
    }

    /// Read an output from the reader's current position.
    ///
    /// Scripts declared at 0xfc bytes or longer are refused with
    /// `Unsupported`.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let value = reader.read_u64_le().map_err(reading("output value"))?;
        let script_len = reader.read_varint().map_err(reading("output script length"))?;
        check_script_len(script_len.value())?;
        let script = reader
            .read_bytes(script_len.value() as usize)
            .map_err(reading("output script"))?;
        Ok(TxOut::sealed(value, script.to_vec()))
    }

    /// Parse an output from the front of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        Self::read_from(&mut ByteReader::new(bytes))
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        Self::from_bytes(&decode_hex(hex_str)?)
    }

    /// Serialized length in bytes.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// The frozen wire encoding.
    pub fn raw(&self) -> &ByteData {
        &self.raw
    }

    /// Append the wire encoding to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.raw.as_bytes());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.raw.as_bytes().to_vec()
    }

    pub fn to_hex(&self) -> String {
        self.raw.to_hex()
    }
}

fn check_script_len(len: u64) -> Result<(), TransactionError> {
    if len >= MAX_OUTPUT_SCRIPT_SIZE {
        return Err(unsupported(format!(
            "output script of {} bytes; abnormally long output scripts are not supported",
            len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const P2PKH_OUTPUT_HEX: &str =
        "202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac";

    #[test]
    fn test_parse() {
        let out = TxOut::from_hex(P2PKH_OUTPUT_HEX).unwrap();
        assert_eq!(out.value(), 112_340_000);
        assert_eq!(out.output_script().len(), 25);
        assert_eq!(out.len(), 34);
        assert_eq!(out.to_hex(), P2PKH_OUTPUT_HEX);
    }

    #[test]
    fn test_long_script_unsupported() {
        let mut bytes = 5u64.to_le_bytes().to_vec();
        bytes.push(0xfc);
        bytes.extend_from_slice(&[0x51; 0xfc]);
        let err = TxOut::from_bytes(&bytes).unwrap_err();
        assert!(err.is_unsupported());

        let mut bytes = 5u64.to_le_bytes().to_vec();
        bytes.push(0xfb);
        bytes.extend_from_slice(&[0x51; 0xfb]);
        assert_eq!(TxOut::from_bytes(&bytes).unwrap().output_script().len(), 0xfb);

        assert!(TxOut::new(1, vec![0; 0xfc]).unwrap_err().is_unsupported());
        assert!(TxOut::new(1, vec![0; 0xfb]).is_ok());
    }

    #[test]
    fn test_truncated() {
        let bytes = hex::decode(P2PKH_OUTPUT_HEX).unwrap();
        assert!(TxOut::from_bytes(&bytes[..30]).unwrap_err().is_parse());
        assert!(TxOut::from_bytes(&bytes[..7]).unwrap_err().is_parse());
    }

    #[test]
    fn test_null_and_copies() {
        assert_eq!(TxOut::null().to_hex(), "ffffffffffffffff00");
        let out = TxOut::from_hex(P2PKH_OUTPUT_HEX).unwrap();
        let changed = out.with_value(1).with_output_script(vec![0x6a]).unwrap();
        assert_eq!(out.to_hex(), P2PKH_OUTPUT_HEX);
        assert_eq!(changed.to_hex(), "0100000000000000016a");
    }

    #[test]
    fn test_raw_frozen() {
        let out = TxOut::from_hex(P2PKH_OUTPUT_HEX).unwrap();
        assert!(out.raw().is_immutable());
        assert_eq!(out.raw().as_bytes(), &hex::decode(P2PKH_OUTPUT_HEX).unwrap()[..]);

        let mut buf = vec![0xaa];
        out.with_value(0).write_to(&mut buf);
        assert_eq!(buf.len(), 1 + out.len());
        assert_eq!(&buf[1..9], &[0u8; 8]);
        assert_eq!(&buf[9..], &out.raw().as_bytes()[8..]);
    }
}
