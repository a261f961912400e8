//! Script chunk parsing and encoding.
//!
//! A script chunk is either an opcode or a data push with its associated bytes.
//! This module handles tokenizing raw script bytes into structured chunks and
//! encoding push data with the correct OP_PUSHDATA prefix.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a script.
///
/// Each chunk is either a standalone opcode (like OP_DUP) or a data push
/// that carries the opcode byte and the pushed data bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes), this is the length.
    pub op: u8,
    /// The data payload, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
    /// Byte offset of the opcode within the tokenized script.
    pub offset: usize,
}

impl ScriptChunk {
    /// Convert this chunk to its ASM token(s).
    ///
    /// Direct pushes render as bare hex. Extended pushes keep their opcode
    /// name in front of the hex so the original encoding survives a round
    /// trip; a zero-length extended push renders as `OP_0`. Everything else
    /// uses its canonical OP_xxx name.
    pub fn to_asm_string(&self) -> String {
        match (&self.data, self.op) {
            (Some(data), op) if is_direct_push(op) => hex::encode(data),
            (Some(data), _) if data.is_empty() => opcode_to_string(OP_0).to_string(),
            (Some(data), op) => format!("{} {}", opcode_to_string(op), hex::encode(data)),
            (None, op) => opcode_to_string(op).to_string(),
        }
    }

    /// Whether this chunk is a data push.
    pub fn is_push(&self) -> bool {
        self.data.is_some()
    }
}

fn read_len(bytes: &[u8], pos: usize, width: usize) -> Result<usize, ScriptError> {
    let field = bytes.get(pos..pos + width).ok_or(ScriptError::DataTooSmall)?;
    let mut buf = [0u8; 4];
    buf[..width].copy_from_slice(field);
    Ok(u32::from_le_bytes(buf) as usize)
}

/// Tokenize raw script bytes into a vector of `ScriptChunk` values.
///
/// The tokenizer is strict: a push that runs past the end of the script,
/// an `OP_CODESEPARATOR`, or any byte above `OP_NOP10` fails the whole
/// script. `OP_RETURN` is an ordinary opcode here.
///
/// # Arguments
/// * `bytes` - The raw script bytes to tokenize.
///
/// # Returns
/// A vector of parsed chunks with their byte offsets, or a `ScriptError`.
pub fn tokenize(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let offset = pos;
        let op = bytes[pos];
        pos += 1;

        let length = match op {
            0x01..=0x4b => Some(op as usize),
            OP_PUSHDATA1 => Some(read_len(bytes, pos, 1)?),
            OP_PUSHDATA2 => Some(read_len(bytes, pos, 2)?),
            OP_PUSHDATA4 => Some(read_len(bytes, pos, 4)?),
            OP_CODESEPARATOR => return Err(ScriptError::CodeSeparator),
            op if op > MAX_DEFINED_OPCODE => return Err(ScriptError::UnsupportedOpcode(op)),
            _ => None,
        };

        let data = match length {
            Some(length) => {
                pos += match op {
                    OP_PUSHDATA1 => 1,
                    OP_PUSHDATA2 => 2,
                    OP_PUSHDATA4 => 4,
                    _ => 0,
                };
                let end = pos.checked_add(length).ok_or(ScriptError::DataTooSmall)?;
                let payload = bytes.get(pos..end).ok_or(ScriptError::DataTooSmall)?;
                pos = end;
                Some(payload.to_vec())
            }
            None => None,
        };

        chunks.push(ScriptChunk { op, data, offset });
    }

    Ok(chunks)
}

/// Compute the OP_PUSHDATA prefix bytes for a data payload of the given length.
///
/// # Arguments
/// * `data_len` - The length of the data to be pushed.
///
/// # Returns
/// The minimal prefix for the payload, or `DataTooBig` past 4 GiB.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= 75 {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFFFFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

/// Encode multiple data payloads into a single byte vector with push prefixes.
///
/// # Arguments
/// * `parts` - Slice of data byte slices to encode.
///
/// # Returns
/// A byte vector containing all pushes concatenated.
pub fn encode_push_datas(parts: &[&[u8]]) -> Result<Vec<u8>, ScriptError> {
    let mut result = Vec::new();
    for part in parts {
        result.extend_from_slice(&push_data_prefix(part.len())?);
        result.extend_from_slice(part);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    //! Tests for strict tokenization and push data encoding.
    //!
    //! Covers tokenize with simple, complex, and malformed inputs,
    //! push_data_prefix boundary sizes, and encode_push_datas.

    use super::*;

    // -----------------------------------------------------------------------
    // tokenize - basic cases
    // -----------------------------------------------------------------------

    /// Tokenize a script with three simple push chunks and verify offsets.
    #[test]
    fn test_tokenize_simple() {
        let bytes = hex::decode("05000102030401FF02ABCD").expect("valid hex");
        let parts = tokenize(&bytes).expect("should tokenize");
        assert_eq!(parts.len(), 3);
        let offsets: Vec<usize> = parts.iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0, 6, 8]);
        assert_eq!(parts[2].data.as_deref(), Some(&[0xab, 0xcd][..]));
    }

    /// Tokenize and re-encode a simple script to verify roundtrip fidelity.
    #[test]
    fn test_tokenize_and_encode_roundtrip() {
        let script_hex = "05000102030401ff02abcd";
        let bytes = hex::decode(script_hex).expect("valid hex");
        let parts = tokenize(&bytes).expect("should tokenize");

        let data_parts: Vec<&[u8]> = parts
            .iter()
            .filter_map(|p| p.data.as_deref())
            .collect();
        let encoded = encode_push_datas(&data_parts).expect("should encode");
        assert_eq!(hex::encode(&encoded), script_hex);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize(&[]).expect("should tokenize").is_empty());
    }

    /// Tokenize a 2-of-2 multisig with OP_PUSHDATA1 chunks.
    #[test]
    fn test_tokenize_complex() {
        let script_hex = "524c53ff0488b21e000000000000000000362f7a9030543db8751401c387d6a71e870f1895b3a62569d455e8ee5f5f5e5f03036624c6df96984db6b4e625b6707c017eb0e0d137cd13a0c989bfa77a4473fd000000004c53ff0488b21e0000000000000000008b20425398995f3c866ea6ce5c1828a516b007379cf97b136bffbdc86f75df14036454bad23b019eae34f10aff8b8d6d8deb18cb31354e5a169ee09d8a4560e8250000000052ae";
        let bytes = hex::decode(script_hex).expect("valid hex");
        let parts = tokenize(&bytes).expect("should tokenize");
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[1].op, OP_PUSHDATA1);
        assert_eq!(parts[1].offset, 1);
        assert_eq!(parts[2].offset, 1 + 2 + 0x53);
        assert_eq!(parts[4].op, OP_CHECKMULTISIG);
    }

    /// OP_RETURN does not swallow the rest of the script.
    #[test]
    fn test_tokenize_op_return_is_plain_opcode() {
        let parts = tokenize(&[OP_RETURN, 0x01, 0xaa]).expect("should tokenize");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].data, None);
        assert_eq!(parts[1].data, Some(vec![0xaa]));
    }

    // -----------------------------------------------------------------------
    // tokenize - rejection cases
    // -----------------------------------------------------------------------

    /// A direct push claiming more bytes than remain fails.
    #[test]
    fn test_tokenize_truncated_push() {
        let bytes = hex::decode("05000000").expect("valid hex");
        assert!(matches!(tokenize(&bytes), Err(ScriptError::DataTooSmall)));
    }

    #[test]
    fn test_tokenize_truncated_pushdata1() {
        let bytes = hex::decode("4c05000000").expect("valid hex");
        assert!(tokenize(&bytes).is_err());
    }

    #[test]
    fn test_tokenize_pushdata1_valid() {
        let data = b"testing";
        let mut script_bytes = vec![OP_PUSHDATA1, data.len() as u8];
        script_bytes.extend_from_slice(data);
        let parts = tokenize(&script_bytes).expect("should tokenize");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].op, OP_PUSHDATA1);
        assert_eq!(parts[0].data.as_deref(), Some(&data[..]));
    }

    /// Extended push opcodes with no length field fail.
    #[test]
    fn test_tokenize_pushdata_missing_length() {
        assert!(tokenize(&[OP_PUSHDATA1]).is_err());
        assert!(tokenize(&[OP_PUSHDATA2, 0x01]).is_err());
        assert!(tokenize(&[OP_PUSHDATA4, 0x01, 0x00]).is_err());
    }

    /// OP_PUSHDATA4 with an absurd length fails without allocating.
    #[test]
    fn test_tokenize_pushdata4_huge_length() {
        assert!(matches!(
            tokenize(&[OP_PUSHDATA4, 0xff, 0xff, 0xff, 0xff, 0x00]),
            Err(ScriptError::DataTooSmall)
        ));
    }

    #[test]
    fn test_tokenize_rejects_codeseparator() {
        assert!(matches!(
            tokenize(&[OP_DUP, OP_CODESEPARATOR, OP_CHECKSIG]),
            Err(ScriptError::CodeSeparator)
        ));
    }

    #[test]
    fn test_tokenize_rejects_undefined_opcode() {
        assert!(tokenize(&[OP_NOP10]).is_ok());
        assert!(matches!(
            tokenize(&[OP_1, 0xba]),
            Err(ScriptError::UnsupportedOpcode(0xba))
        ));
        assert!(matches!(tokenize(&[0xff]), Err(ScriptError::UnsupportedOpcode(0xff))));
    }

    // -----------------------------------------------------------------------
    // push_data_prefix boundary tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_push_data_prefix_boundaries() {
        let cases: Vec<(usize, Vec<u8>)> = vec![
            (0, vec![0x00]),
            (20, vec![20]),
            (75, vec![75]),
            (76, vec![OP_PUSHDATA1, 76]),
            (255, vec![OP_PUSHDATA1, 255]),
            (256, vec![OP_PUSHDATA2, 0x00, 0x01]),
            (65535, vec![OP_PUSHDATA2, 0xff, 0xff]),
            (65536, vec![OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]),
        ];
        for (len, expected) in cases {
            assert_eq!(push_data_prefix(len).expect("should succeed"), expected, "len {}", len);
        }
    }

    // -----------------------------------------------------------------------
    // encode_push_datas
    // -----------------------------------------------------------------------

    #[test]
    fn test_encode_push_datas_multiple() {
        let parts: Vec<&[u8]> = vec![b"hello", b"world"];
        let encoded = encode_push_datas(&parts).expect("should encode");
        let expected = hex::decode("0568656c6c6f05776f726c64").expect("valid hex");
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_encode_push_datas_empty() {
        let parts: Vec<&[u8]> = vec![];
        assert!(encode_push_datas(&parts).expect("should encode").is_empty());
    }

    // -----------------------------------------------------------------------
    // ScriptChunk::to_asm_string
    // -----------------------------------------------------------------------

    #[test]
    fn test_chunk_to_asm_string() {
        let direct = ScriptChunk { op: OP_DATA_20, data: Some(vec![0xAB; 20]), offset: 0 };
        assert_eq!(direct.to_asm_string(), "ab".repeat(20));

        let extended = ScriptChunk { op: OP_PUSHDATA1, data: Some(vec![0x01, 0x02]), offset: 0 };
        assert_eq!(extended.to_asm_string(), "OP_PUSHDATA1 0102");

        let empty = ScriptChunk { op: OP_PUSHDATA2, data: Some(vec![]), offset: 0 };
        assert_eq!(empty.to_asm_string(), "OP_0");

        let op = ScriptChunk { op: OP_DUP, data: None, offset: 0 };
        assert_eq!(op.to_asm_string(), "OP_DUP");
        assert!(!op.is_push());
    }
}
