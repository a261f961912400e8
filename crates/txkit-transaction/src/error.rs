use txkit_primitives::PrimitivesError;

/// Error types for transaction operations.
///
/// The first three variants are the families callers are expected to
/// branch on: bad field values at construction, protocol behaviour that is
/// refused outright, and malformed bytes during parsing.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// A field failed validation at construction (width, count, size limit).
    #[error("validation error: {0}")]
    Validation(String),
    /// The requested protocol behaviour is deliberately not supported.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Malformed bytes during binary/hex deserialization.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Network configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),
    /// An underlying script error (forwarded from `txkit-script`).
    #[error("script error: {0}")]
    Script(#[from] txkit_script::ScriptError),
    /// An underlying primitives error (forwarded from `txkit-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] PrimitivesError),
}

impl TransactionError {
    /// Whether this is a construction-time validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, TransactionError::Validation(_))
    }

    /// Whether this is a refused protocol behaviour.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, TransactionError::Unsupported(_))
    }

    /// Whether this came from parsing malformed bytes or hex.
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            TransactionError::Serialization(_)
                | TransactionError::Primitives(PrimitivesError::InvalidHex(_))
        )
    }
}

/// Build a `map_err` adapter that tags a reader failure with what was being read.
pub(crate) fn reading(what: &'static str) -> impl FnOnce(PrimitivesError) -> TransactionError {
    move |e| TransactionError::Serialization(format!("reading {}: {}", what, e))
}

pub(crate) fn validation(msg: impl Into<String>) -> TransactionError {
    TransactionError::Validation(msg.into())
}

pub(crate) fn unsupported(msg: impl Into<String>) -> TransactionError {
    TransactionError::Unsupported(msg.into())
}

pub(crate) fn decode_hex(hex_str: &str) -> Result<Vec<u8>, TransactionError> {
    Ok(hex::decode(hex_str).map_err(PrimitivesError::from)?)
}
