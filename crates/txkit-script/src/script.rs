/// Script codec - conversion between raw script bytes and ASM, plus the
/// script-sig splitting used when parsing transaction inputs.
///
/// The `Script` newtype wraps a `Vec<u8>`; the free functions `deserialize`,
/// `serialize` and `split_redeem_script` work on plain byte slices so callers
/// that only hold borrowed bytes do not need to allocate.

use std::fmt;

use crate::chunk::{push_data_prefix, tokenize, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// A script, represented as a byte vector newtype.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from an ASM string. See [`serialize`].
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        serialize(asm).map(Script)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Convert the script to ASM. See [`deserialize`].
    pub fn to_asm(&self) -> Result<String, ScriptError> {
        deserialize(&self.0)
    }

    /// Return a reference to the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the script length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` if the script has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tokenize the script into chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        tokenize(&self.0)
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    /// Append data bytes to the script with the minimal PUSHDATA prefix.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append raw opcodes to the script.
    ///
    /// Rejects push opcodes (OP_DATA_1..=OP_PUSHDATA4), which need a payload,
    /// and bytes the tokenizer would refuse.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        for &op in opcodes {
            if is_push_data(op) {
                return Err(ScriptError::InvalidToken(opcode_to_string(op).to_string()));
            }
            check_plain_opcode(op)?;
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

fn check_plain_opcode(op: u8) -> Result<(), ScriptError> {
    if op == OP_CODESEPARATOR {
        return Err(ScriptError::CodeSeparator);
    }
    if op > MAX_DEFINED_OPCODE {
        return Err(ScriptError::UnsupportedOpcode(op));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Free-function codec
// ---------------------------------------------------------------------------

/// Render script bytes as space-separated ASM.
///
/// Fails if the bytes do not tokenize (see [`tokenize`]).
pub fn deserialize(bytes: &[u8]) -> Result<String, ScriptError> {
    let chunks = tokenize(bytes)?;
    Ok(chunks
        .iter()
        .map(ScriptChunk::to_asm_string)
        .collect::<Vec<_>>()
        .join(" "))
}

/// Encode an ASM string into script bytes.
///
/// Opcode names become their byte. `OP_PUSHDATA1/2/4` take the following
/// token as hex payload and keep the explicit width. Any other token is hex
/// data pushed with the minimal prefix.
pub fn serialize(asm: &str) -> Result<Vec<u8>, ScriptError> {
    let mut out = Vec::new();
    let mut tokens = asm.split_whitespace();

    while let Some(token) = tokens.next() {
        match string_to_opcode(token) {
            Some(op @ (OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4)) => {
                let payload = tokens
                    .next()
                    .ok_or_else(|| ScriptError::InvalidToken(format!("{} without data", token)))?;
                let data = hex::decode(payload)?;
                let len = data.len();
                out.push(op);
                match op {
                    OP_PUSHDATA1 => {
                        let len = u8::try_from(len).map_err(|_| ScriptError::DataTooBig)?;
                        out.push(len);
                    }
                    OP_PUSHDATA2 => {
                        let len = u16::try_from(len).map_err(|_| ScriptError::DataTooBig)?;
                        out.extend_from_slice(&len.to_le_bytes());
                    }
                    _ => {
                        let len = u32::try_from(len).map_err(|_| ScriptError::DataTooBig)?;
                        out.extend_from_slice(&len.to_le_bytes());
                    }
                }
                out.extend_from_slice(&data);
            }
            Some(op) => {
                check_plain_opcode(op)?;
                out.push(op);
            }
            None => {
                if token.starts_with("OP_") {
                    return Err(ScriptError::InvalidToken(token.to_string()));
                }
                let data = hex::decode(token)?;
                out.extend_from_slice(&push_data_prefix(data.len())?);
                out.extend_from_slice(&data);
            }
        }
    }

    Ok(out)
}

/// Split a script-sig into its stack part and a trailing P2SH redeem script.
///
/// The whole script-sig must tokenize and its last chunk must be a non-empty
/// data push whose payload also tokenizes. When both hold, the split happens
/// at that chunk's offset, so the redeem part keeps its push opcode and
/// `stack ‖ redeem` is always the original script-sig. Otherwise the whole
/// script-sig is the stack part and the redeem part is empty.
///
/// A pushed stack item that happens to tokenize (e.g. a single signature
/// whose bytes are all defined opcodes) is taken as a redeem script. This
/// imprecision is accepted; callers that know better should construct the
/// input explicitly.
pub fn split_redeem_script(script_sig: &[u8]) -> (&[u8], &[u8]) {
    let no_split = (script_sig, &script_sig[script_sig.len()..]);

    let chunks = match tokenize(script_sig) {
        Ok(chunks) => chunks,
        Err(err) => {
            tracing::trace!(%err, "script-sig does not tokenize, not splitting");
            return no_split;
        }
    };

    let last = match chunks.last() {
        Some(chunk) => chunk,
        None => return no_split,
    };

    match last.data.as_deref() {
        Some(payload) if !payload.is_empty() => {
            if let Err(err) = tokenize(payload) {
                tracing::trace!(%err, "trailing push is not a script, not splitting");
                return no_split;
            }
        }
        _ => {
            tracing::trace!(op = last.op, "script-sig does not end in a data push");
            return no_split;
        }
    }

    tracing::trace!(offset = last.offset, "splitting redeem script from script-sig");
    script_sig.split_at(last.offset)
}

#[cfg(test)]
mod tests {
    //! Tests for the Script type and the free-function codec.
    //!
    //! Covers hex/ASM conversion, explicit PUSHDATA handling, rejection of
    //! unsupported opcodes, and redeem-script splitting.

    use super::*;

    const P2PKH_HEX: &str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";
    const P2PKH_ASM: &str =
        "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG";

    // -----------------------------------------------------------------------
    // Construction & roundtrip tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_from_hex_roundtrip() {
        let script = Script::from_hex(P2PKH_HEX).expect("valid hex should parse");
        assert_eq!(script.to_hex(), P2PKH_HEX);
        assert_eq!(script.len(), 25);
    }

    #[test]
    fn test_from_hex_invalid() {
        assert!(Script::from_hex("ZZZZ").is_err());
    }

    /// Verify that to_asm produces the expected ASM string for a P2PKH script.
    #[test]
    fn test_to_asm_p2pkh() {
        let script = Script::from_hex(P2PKH_HEX).expect("valid hex should parse");
        assert_eq!(script.to_asm().unwrap(), P2PKH_ASM);
    }

    #[test]
    fn test_from_asm_p2pkh() {
        let script = Script::from_asm(P2PKH_ASM).expect("valid ASM should parse");
        assert_eq!(script.to_hex(), P2PKH_HEX);
    }

    #[test]
    fn test_empty() {
        assert_eq!(deserialize(&[]).unwrap(), "");
        assert!(serialize("").unwrap().is_empty());
        assert!(Script::default().is_empty());
    }

    /// Non-minimal pushes survive a bytes -> ASM -> bytes round trip.
    #[test]
    fn test_explicit_pushdata_roundtrip() {
        let bytes = hex::decode("4c03aabbcc4d0200ddee51").unwrap();
        let asm = deserialize(&bytes).unwrap();
        assert_eq!(asm, "OP_PUSHDATA1 aabbcc OP_PUSHDATA2 ddee OP_1");
        assert_eq!(serialize(&asm).unwrap(), bytes);
    }

    #[test]
    fn test_serialize_minimal_push() {
        let data = "ab".repeat(80);
        let bytes = serialize(&format!("OP_0 {}", data)).unwrap();
        assert_eq!(&bytes[..3], &[OP_0, OP_PUSHDATA1, 80]);
        assert_eq!(bytes.len(), 3 + 80);
    }

    #[test]
    fn test_serialize_errors() {
        assert!(matches!(serialize("OP_NOTREAL"), Err(ScriptError::InvalidToken(_))));
        assert!(matches!(serialize("OP_PUSHDATA1"), Err(ScriptError::InvalidToken(_))));
        assert!(matches!(serialize("abc"), Err(ScriptError::HexDecode(_))));
        assert!(matches!(serialize("OP_CODESEPARATOR"), Err(ScriptError::CodeSeparator)));
        let too_long = format!("OP_PUSHDATA1 {}", "00".repeat(256));
        assert!(matches!(serialize(&too_long), Err(ScriptError::DataTooBig)));
    }

    #[test]
    fn test_deserialize_rejects() {
        assert!(deserialize(&[OP_CHECKSIG, OP_CODESEPARATOR]).is_err());
        assert!(deserialize(&[0xc0]).is_err());
        assert!(deserialize(&[0x02, 0x01]).is_err());
    }

    #[test]
    fn test_append() {
        let mut script = Script::new();
        script.append_opcodes(&[OP_HASH160]).unwrap();
        script.append_push_data(&[0x11; 20]).unwrap();
        script.append_opcodes(&[OP_EQUAL]).unwrap();
        assert_eq!(script.to_hex(), format!("a914{}87", "11".repeat(20)));

        assert!(script.append_opcodes(&[OP_PUSHDATA1]).is_err());
        assert!(script.append_opcodes(&[OP_DATA_20]).is_err());
        assert!(script.append_opcodes(&[0xfa]).is_err());
        assert_eq!(script.len(), 23, "rejected appends must not change the script");
    }

    // -----------------------------------------------------------------------
    // split_redeem_script
    // -----------------------------------------------------------------------

    /// A 2-of-2 multisig P2SH spend: OP_0 <sig> <sig> <redeem script>.
    #[test]
    fn test_split_p2sh_multisig() {
        let redeem = serialize(&format!(
            "OP_2 02{} 03{} OP_2 OP_CHECKMULTISIG",
            "11".repeat(32),
            "22".repeat(32)
        ))
        .unwrap();
        let mut script_sig = vec![OP_0];
        script_sig.extend_from_slice(&[0x47]);
        script_sig.extend_from_slice(&[0x30; 0x47]);
        script_sig.extend_from_slice(&[0x47]);
        script_sig.extend_from_slice(&[0x30; 0x47]);
        let stack_len = script_sig.len();
        script_sig.extend_from_slice(&push_data_prefix(redeem.len()).unwrap());
        script_sig.extend_from_slice(&redeem);

        let (stack, redeem_part) = split_redeem_script(&script_sig);
        assert_eq!(stack.len(), stack_len);
        assert_eq!(redeem_part[0] as usize, redeem.len());
        assert_eq!(&redeem_part[1..], &redeem[..]);
    }

    /// A P2PKH script-sig ends in a public key, which is not a script.
    #[test]
    fn test_split_p2pkh_not_split() {
        let mut script_sig = vec![0x47];
        script_sig.extend_from_slice(&[0x30; 0x47]);
        script_sig.push(0x21);
        script_sig.push(0x02);
        script_sig.extend_from_slice(&[0xff; 32]);

        let (stack, redeem) = split_redeem_script(&script_sig);
        assert_eq!(stack, &script_sig[..]);
        assert!(redeem.is_empty());
    }

    const NONE: &[u8] = &[];

    #[test]
    fn test_split_edge_cases() {
        // Empty script-sig.
        let (stack, redeem) = split_redeem_script(&[]);
        assert!(stack.is_empty() && redeem.is_empty());

        // Truncated push.
        let bad = [0x05, 0x01];
        assert_eq!(split_redeem_script(&bad), (&bad[..], NONE));

        // Ends in a plain opcode.
        let ops = [0x01, OP_1, OP_DROP];
        assert_eq!(split_redeem_script(&ops), (&ops[..], NONE));

        // Ends in an empty extended push.
        let empty_push = [OP_PUSHDATA1, 0x00];
        assert_eq!(split_redeem_script(&empty_push), (&empty_push[..], NONE));
    }

    /// A pushed value that also tokenizes is taken as a redeem script.
    #[test]
    fn test_split_false_positive_is_kept() {
        let script_sig = [0x01, OP_1, 0x02, OP_DUP, OP_DROP];
        let (stack, redeem) = split_redeem_script(&script_sig);
        assert_eq!(stack, &[0x01, OP_1]);
        assert_eq!(redeem, &[0x02, OP_DUP, OP_DROP]);
    }
}
