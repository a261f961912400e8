/// txkit - Script tokenizing and ASM codec.
///
/// Provides opcode definitions, a strict script tokenizer, conversion
/// between script bytes and ASM, and the heuristic that separates a P2SH
/// redeem script from the rest of a script-sig.

pub mod script;
pub mod opcodes;
pub mod chunk;

mod error;
pub use error::ScriptError;
pub use script::{deserialize, serialize, split_redeem_script, Script};
pub use chunk::ScriptChunk;
