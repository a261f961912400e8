/// txkit - Byte buffers, compact-size integers, and hashing.
///
/// This crate provides the foundational building blocks for txkit:
/// - Append-only byte buffers that can be frozen after construction
/// - Compact-size (VarInt) encoding and a cursor-based reader
/// - Hash functions (SHA-256, SHA-256d, personalized BLAKE2b-256)
/// - Chain hash type for transaction identifiers

pub mod bytedata;
pub mod chainhash;
pub mod hash;
pub mod util;

mod error;
pub use bytedata::{validate_bytes, ByteData};
pub use error::PrimitivesError;
