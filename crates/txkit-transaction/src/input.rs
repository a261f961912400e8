//! Transaction input spending a previous output.
//!
//! An input carries its script-sig as two parts: the `stack_script` that
//! pushes signatures and other stack data, and an optional `redeem_script`
//! (the trailing P2SH push). Serialization always writes them back to back,
//! so the split only matters to callers that inspect or replace one half.

use txkit_primitives::ByteData;
use txkit_primitives::util::{ByteReader, VarInt};
use txkit_script::split_redeem_script;

use crate::error::{decode_hex, reading, validation};
use crate::outpoint::{Outpoint, OUTPOINT_SIZE};
use crate::TransactionError;

/// Largest accepted combined script-sig, in bytes.
pub const MAX_SCRIPT_SIG_SIZE: usize = 1650;

/// Sequence number that disables relative lock-time for the input.
pub const DEFAULT_SEQUENCE: u32 = 0xffff_ffff;

/// A single transaction input.
///
/// # Wire format
///
/// | Field          | Size          |
/// |----------------|---------------|
/// | outpoint       | 36 bytes      |
/// | script length  | VarInt        |
/// | stack_script   | variable      |
/// | redeem_script  | variable      |
/// | sequence       | 4 bytes (LE)  |
///
/// The encoding is built once at construction and kept as a frozen
/// [`ByteData`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    outpoint: Outpoint,
    stack_script: Vec<u8>,
    redeem_script: Vec<u8>,
    sequence: u32,
    raw: ByteData,
}

impl TxIn {
    /// Create an input, checking the combined script-sig size.
    ///
    /// # Arguments
    /// * `outpoint` - The output being spent.
    /// * `stack_script` - Script pushing the initial stack.
    /// * `redeem_script` - Trailing P2SH redeem script push, or empty.
    /// * `sequence` - The input sequence number.
    ///
    /// # Returns
    /// A `Validation` error if the script-sig exceeds 1650 bytes.
    pub fn new(
        outpoint: Outpoint,
        stack_script: Vec<u8>,
        redeem_script: Vec<u8>,
        sequence: u32,
    ) -> Result<Self, TransactionError> {
        let script_len = stack_script.len() + redeem_script.len();
        if script_len > MAX_SCRIPT_SIG_SIZE {
            return Err(validation(format!(
                "script-sig is {} bytes, max is {}",
                script_len, MAX_SCRIPT_SIG_SIZE
            )));
        }
        Ok(TxIn::sealed(outpoint, stack_script, redeem_script, sequence))
    }

    /// Create an input with empty scripts, as used before signing.
    pub fn unsigned(outpoint: Outpoint, sequence: u32) -> Self {
        TxIn::sealed(outpoint, Vec::new(), Vec::new(), sequence)
    }

    fn sealed(
        outpoint: Outpoint,
        stack_script: Vec<u8>,
        redeem_script: Vec<u8>,
        sequence: u32,
    ) -> Self {
        let script_len = stack_script.len() + redeem_script.len();
        let prefix = VarInt::from(script_len);
        let mut raw = Vec::with_capacity(OUTPOINT_SIZE + prefix.length() + script_len + 4);
        outpoint.write_to(&mut raw);
        raw.extend_from_slice(&prefix.to_bytes());
        raw.extend_from_slice(&stack_script);
        raw.extend_from_slice(&redeem_script);
        raw.extend_from_slice(&sequence.to_le_bytes());
        TxIn {
            outpoint,
            stack_script,
            redeem_script,
            sequence,
            raw: ByteData::from(raw).into_immutable(),
        }
    }

    pub fn outpoint(&self) -> &Outpoint {
        &self.outpoint
    }

    pub fn stack_script(&self) -> &[u8] {
        &self.stack_script
    }

    pub fn redeem_script(&self) -> &[u8] {
        &self.redeem_script
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// The full script-sig: `stack_script ‖ redeem_script`.
    pub fn script_sig(&self) -> Vec<u8> {
        [self.stack_script.as_slice(), self.redeem_script.as_slice()].concat()
    }

    /// Whether the input carries a redeem script.
    pub fn is_p2sh(&self) -> bool {
        !self.redeem_script.is_empty()
    }

    // -----------------------------------------------------------------------
    // Copy-on-modify
    // -----------------------------------------------------------------------

    pub fn with_outpoint(&self, outpoint: Outpoint) -> Self {
        TxIn::sealed(outpoint, self.stack_script.clone(), self.redeem_script.clone(), self.sequence)
    }

    pub fn with_stack_script(&self, stack_script: Vec<u8>) -> Result<Self, TransactionError> {
        TxIn::new(self.outpoint, stack_script, self.redeem_script.clone(), self.sequence)
    }

    pub fn with_redeem_script(&self, redeem_script: Vec<u8>) -> Result<Self, TransactionError> {
        TxIn::new(self.outpoint, self.stack_script.clone(), redeem_script, self.sequence)
    }

    pub fn with_sequence(&self, sequence: u32) -> Self {
        TxIn::sealed(self.outpoint, self.stack_script.clone(), self.redeem_script.clone(), sequence)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Read an input from the reader's current position.
    ///
    /// The script-sig is split into stack and redeem parts with
    /// [`split_redeem_script`], except for coinbase inputs (null outpoint),
    /// whose script-sig is arbitrary data and stays whole.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let outpoint = Outpoint::read_from(reader)?;
        let script_sig = reader.read_var_bytes().map_err(reading("script-sig"))?;
        let sequence = reader.read_u32_le().map_err(reading("sequence"))?;

        let (stack, redeem) = if outpoint.is_null() {
            (script_sig, &script_sig[script_sig.len()..])
        } else {
            split_redeem_script(script_sig)
        };

        TxIn::new(outpoint, stack.to_vec(), redeem.to_vec(), sequence)
    }

    /// Parse an input from the front of `bytes`.
    ///
    /// Trailing bytes are ignored; use [`TxIn::len`] to advance past it.
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

#[cfg(test)]
mod tests {
    use super::*;
    use txkit_primitives::chainhash::Hash;
    use txkit_script::chunk::encode_push_datas;
    use txkit_script::opcodes::{OP_1, OP_DROP};
    use txkit_script::serialize;

    const UNSIGNED_INPUT_HEX: &str =
        "fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffff";

    fn outpoint() -> Outpoint {
        Outpoint::new(Hash::new([0x42; 32]), 3)
    }

    #[test]
    fn test_parse_unsigned() {
        let tx_in = TxIn::from_hex(UNSIGNED_INPUT_HEX).unwrap();
        assert_eq!(tx_in.sequence(), 0xffffffee);
        assert!(tx_in.script_sig().is_empty());
        assert!(!tx_in.is_p2sh());
        assert_eq!(tx_in.len(), 41);
        assert_eq!(tx_in.to_hex(), UNSIGNED_INPUT_HEX);
    }

    #[test]
    fn test_p2sh_split_on_parse() {
        let redeem = serialize("OP_1 OP_1 OP_ADD OP_2 OP_EQUAL").unwrap();
        let script_sig = encode_push_datas(&[&[0x30u8; 71][..], &redeem[..]]).unwrap();
        let built = TxIn::new(outpoint(), script_sig, vec![], DEFAULT_SEQUENCE).unwrap();
        assert!(!built.is_p2sh());

        let parsed = TxIn::from_bytes(&built.to_bytes()).unwrap();
        assert!(parsed.is_p2sh());
        assert_eq!(parsed.redeem_script()[0] as usize, redeem.len());
        assert_eq!(&parsed.redeem_script()[1..], &redeem[..]);
        assert_eq!(parsed.stack_script().len(), 72);
        assert_eq!(parsed.to_bytes(), built.to_bytes(), "split must not change the encoding");
    }

    #[test]
    fn test_coinbase_not_split() {
        let script_sig = encode_push_datas(&[&[OP_1, OP_DROP][..]]).unwrap();
        let tx_in = TxIn::new(Outpoint::null(), script_sig.clone(), vec![], DEFAULT_SEQUENCE).unwrap();
        let parsed = TxIn::from_bytes(&tx_in.to_bytes()).unwrap();
        assert_eq!(parsed.stack_script(), &script_sig[..]);
        assert!(parsed.redeem_script().is_empty());

        // The same script-sig on a normal input is split.
        let normal = tx_in.with_outpoint(outpoint());
        let parsed = TxIn::from_bytes(&normal.to_bytes()).unwrap();
        assert!(parsed.is_p2sh());
    }

    #[test]
    fn test_script_sig_size_limit() {
        assert!(TxIn::new(outpoint(), vec![0; 1000], vec![0; 650], 0).is_ok());
        let err = TxIn::new(outpoint(), vec![0; 1000], vec![0; 651], 0).unwrap_err();
        assert!(err.is_validation());

        let tx_in = TxIn::unsigned(outpoint(), 0);
        assert!(tx_in.with_stack_script(vec![0; 1651]).unwrap_err().is_validation());
    }

    #[test]
    fn test_copy_leaves_original() {
        let tx_in = TxIn::from_hex(UNSIGNED_INPUT_HEX).unwrap();
        let changed = tx_in
            .with_sequence(0)
            .with_redeem_script(vec![0x51])
            .unwrap();
        assert_eq!(tx_in.to_hex(), UNSIGNED_INPUT_HEX);
        assert_eq!(changed.sequence(), 0);
        assert_eq!(changed.script_sig(), vec![0x51]);
    }

    #[test]
    fn test_raw_frozen_and_rebuilt_on_copy() {
        let tx_in = TxIn::from_hex(UNSIGNED_INPUT_HEX).unwrap();
        assert!(tx_in.raw().is_immutable());
        assert_eq!(tx_in.raw().to_hex(), UNSIGNED_INPUT_HEX);

        let changed = tx_in.with_sequence(1).with_stack_script(vec![0x51, 0x52]).unwrap();
        assert!(changed.raw().is_immutable());
        assert_eq!(changed.len(), 43);
        assert_eq!(
            changed.to_hex(),
            format!("{}02515201000000", &UNSIGNED_INPUT_HEX[..72])
        );
        assert_eq!(tx_in.raw().to_hex(), UNSIGNED_INPUT_HEX);
    }

    #[test]
    fn test_truncated() {
        let bytes = hex::decode(UNSIGNED_INPUT_HEX).unwrap();
        assert!(TxIn::from_bytes(&bytes[..40]).unwrap_err().is_parse());
        // Script length claims more bytes than remain.
        let mut bad = bytes[..36].to_vec();
        bad.extend_from_slice(&[0x10, 0x00]);
        assert!(TxIn::from_bytes(&bad).unwrap_err().is_parse());
    }
}
