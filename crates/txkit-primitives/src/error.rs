/// Unified error type for all primitives operations.
///
/// Covers errors from byte buffers, compact-size decoding, hex and hash parsing.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    #[error("invalid length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("cannot modify an immutable byte buffer")]
    Immutable,

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("varint too large")]
    VarIntTooLarge,

    #[error("non-minimal varint encoding of {0}")]
    NonCanonicalVarInt(u64),

    #[error("unexpected end of data")]
    UnexpectedEof,
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}
