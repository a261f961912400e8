/// Error types for script operations.
///
/// Covers tokenizer failures, ASM parsing problems and hex decoding.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Not enough data in script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds maximum allowed size.
    #[error("data too big")]
    DataTooBig,

    /// A byte above OP_NOP10 with no assigned meaning.
    #[error("unsupported opcode: 0x{0:02x}")]
    UnsupportedOpcode(u8),

    /// OP_CODESEPARATOR is not accepted in parsed scripts.
    #[error("OP_CODESEPARATOR is not supported")]
    CodeSeparator,

    /// An ASM token that is neither an opcode name nor hex data.
    #[error("invalid ASM token: {0}")]
    InvalidToken(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
