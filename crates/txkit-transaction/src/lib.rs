/// txkit - Transaction model, serialization, and signature hashing.
///
/// Provides immutable transaction records (outpoints, inputs, outputs,
/// witnesses), the `Tx` and `SaplingTx` transaction types with cached
/// identifiers, and the legacy, BIP143, fork id and ZIP-243 sighash
/// algorithms. Chain-specific behaviour is selected by an explicit
/// `NetworkParams` value.

pub mod network;
pub mod outpoint;
pub mod input;
pub mod output;
pub mod witness;
pub mod transaction;
pub mod sighash;
pub mod sapling;

mod error;
pub use error::TransactionError;
pub use network::NetworkParams;
pub use outpoint::Outpoint;
pub use input::TxIn;
pub use output::TxOut;
pub use witness::{InputWitness, WitnessStackItem};
pub use transaction::{Tx, TxBuilder};
pub use sighash::{SighashOptions, SighashType};
pub use sapling::{JoinSplit, SaplingTx, SaplingTxBuilder, ShieldedOutput, ShieldedSpend};
