//! Legacy and witness transactions.
//!
//! A [`Tx`] is validated and serialized once, when it is built. The raw
//! bytes and both identifiers are cached alongside the fields and never
//! recomputed; "changing" a transaction means building a new one through
//! [`Tx::copy`].

use std::fmt;

use tracing::trace;
use txkit_primitives::chainhash::Hash;
use txkit_primitives::hash::sha256d;
use txkit_primitives::util::{ByteReader, VarInt};
use txkit_primitives::ByteData;

use crate::error::{decode_hex, reading, validation};
use crate::input::TxIn;
use crate::network::NetworkParams;
use crate::output::TxOut;
use crate::witness::InputWitness;
use crate::TransactionError;

/// An immutable Bitcoin-style transaction.
///
/// # Wire format
///
/// | Field        | Size                                  |
/// |--------------|---------------------------------------|
/// | version      | 4 bytes (LE)                          |
/// | flag         | 2 bytes, witness transactions only    |
/// | input count  | VarInt                                |
/// | inputs       | variable (per input)                  |
/// | output count | VarInt                                |
/// | outputs      | variable (per output)                 |
/// | witnesses    | one per input, witness transactions only |
/// | lock_time    | 4 bytes (LE)                          |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    version: u32,
    flag: Option<[u8; 2]>,
    tx_ins: Vec<TxIn>,
    tx_outs: Vec<TxOut>,
    tx_witnesses: Vec<InputWitness>,
    lock_time: u32,
    raw: ByteData,
    tx_id_le: Hash,
    wtx_id_le: Option<Hash>,
}

impl Tx {
    /// Validate the fields and build a transaction.
    ///
    /// # Arguments
    /// * `network` - Supplies the segwit marker the flag must match.
    /// * `version` - Transaction version.
    /// * `flag` - Witness marker, or `None` for a legacy transaction.
    /// * `tx_ins` - At least one input.
    /// * `tx_outs` - At least one output.
    /// * `tx_witnesses` - Empty, or exactly one witness per input.
    /// * `lock_time` - Block height or timestamp lock.
    ///
    /// # Returns
    /// A `Validation` error when the flag does not match the network, when
    /// witnesses are given without a flag or in the wrong number, or when
    /// there are no inputs or no outputs.
    pub fn new(
        network: &NetworkParams,
        version: u32,
        flag: Option<[u8; 2]>,
        tx_ins: Vec<TxIn>,
        tx_outs: Vec<TxOut>,
        tx_witnesses: Vec<InputWitness>,
        lock_time: u32,
    ) -> Result<Self, TransactionError> {
        if let Some(flag) = flag {
            if flag != network.segwit_flag {
                return Err(validation(format!(
                    "witness flag {} does not match {} segwit flag {}",
                    hex::encode(flag),
                    network.name,
                    hex::encode(network.segwit_flag)
                )));
            }
        }
        if !tx_witnesses.is_empty() {
            if flag.is_none() {
                return Err(validation("witnesses supplied without a witness flag"));
            }
            if tx_witnesses.len() != tx_ins.len() {
                return Err(validation(format!(
                    "{} witnesses for {} inputs",
                    tx_witnesses.len(),
                    tx_ins.len()
                )));
            }
        }
        if tx_ins.is_empty() || tx_outs.is_empty() {
            return Err(validation("too few inputs or outputs"));
        }

        let mut tx = Tx {
            version,
            flag,
            tx_ins,
            tx_outs,
            tx_witnesses,
            lock_time,
            raw: ByteData::new(),
            tx_id_le: Hash::default(),
            wtx_id_le: None,
        };

        let mut raw = Vec::with_capacity(tx.serialized_len());
        tx.write_to(&mut raw);
        tx.tx_id_le = Hash::new(sha256d(&tx.no_witness()));
        if tx.flag.is_some() {
            tx.wtx_id_le = Some(Hash::new(sha256d(&raw)));
        }
        tx.raw = ByteData::from(raw).into_immutable();
        Ok(tx)
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction that fills `bytes` exactly.
    ///
    /// A transaction is read as a witness transaction when bytes 4..6 equal
    /// the network's segwit flag. Witnesses are only read when data beyond
    /// the lock time remains, so a flagged transaction without a witness
    /// section is accepted.
    ///
    /// # Returns
    /// A `Serialization` error for truncated data, trailing bytes, or a
    /// non-canonical encoding; construction errors from [`Tx::new`] are
    /// passed through.
    pub fn from_bytes(network: &NetworkParams, bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let version = reader.read_u32_le().map_err(reading("version"))?;

        let flag = if bytes.get(4..6) == Some(&network.segwit_flag[..]) {
            Some(reader.read_array::<2>().map_err(reading("witness flag"))?)
        } else {
            None
        };

        let input_count = reader.read_varint().map_err(reading("input count"))?.value();
        let mut tx_ins = Vec::with_capacity((input_count as usize).min(reader.remaining()));
        for _ in 0..input_count {
            tx_ins.push(TxIn::read_from(&mut reader)?);
        }

        let output_count = reader.read_varint().map_err(reading("output count"))?.value();
        let mut tx_outs = Vec::with_capacity((output_count as usize).min(reader.remaining()));
        for _ in 0..output_count {
            tx_outs.push(TxOut::read_from(&mut reader)?);
        }

        let mut tx_witnesses = Vec::new();
        if flag.is_some() && reader.remaining() > 4 {
            tx_witnesses.reserve(tx_ins.len());
            for _ in 0..tx_ins.len() {
                tx_witnesses.push(InputWitness::read_from(&mut reader)?);
            }
        }

        let lock_time = reader.read_u32_le().map_err(reading("lock time"))?;
        if reader.remaining() != 0 {
            return Err(TransactionError::Serialization(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }

        trace!(
            inputs = tx_ins.len(),
            outputs = tx_outs.len(),
            witness = flag.is_some(),
            "parsed transaction"
        );

        let tx = Tx::new(network, version, flag, tx_ins, tx_outs, tx_witnesses, lock_time)?;
        if tx.raw.as_bytes() != bytes {
            return Err(TransactionError::Serialization(
                "non-canonical transaction encoding".to_string(),
            ));
        }
        Ok(tx)
    }

    /// Parse a transaction from hex.
    pub fn from_hex(network: &NetworkParams, hex_str: &str) -> Result<Self, TransactionError> {
        Self::from_bytes(network, &decode_hex(hex_str)?)
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    fn serialized_len(&self) -> usize {
        let mut len = 4 + self.legacy_body_len() + 4;
        if self.flag.is_some() {
            len += 2 + self.tx_witnesses.iter().map(InputWitness::len).sum::<usize>();
        }
        len
    }

    fn legacy_body_len(&self) -> usize {
        VarInt::from(self.tx_ins.len()).length()
            + self.tx_ins.iter().map(TxIn::len).sum::<usize>()
            + VarInt::from(self.tx_outs.len()).length()
            + self.tx_outs.iter().map(TxOut::len).sum::<usize>()
    }

    fn write_ins_outs(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&VarInt::from(self.tx_ins.len()).to_bytes());
        for tx_in in &self.tx_ins {
            tx_in.write_to(out);
        }
        out.extend_from_slice(&VarInt::from(self.tx_outs.len()).to_bytes());
        for tx_out in &self.tx_outs {
            tx_out.write_to(out);
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.to_le_bytes());
        if let Some(flag) = self.flag {
            out.extend_from_slice(&flag);
        }
        self.write_ins_outs(out);
        for witness in &self.tx_witnesses {
            witness.write_to(out);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    /// The full serialization, witnesses included.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.raw.as_bytes().to_vec()
    }

    /// The cached, frozen serialization.
    pub fn raw(&self) -> &ByteData {
        &self.raw
    }

    pub fn to_hex(&self) -> String {
        self.raw.to_hex()
    }

    /// The pre-witness serialization: no flag and no witnesses.
    ///
    /// This is the txid preimage for every transaction, witness or not.
    pub fn no_witness(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.legacy_body_len());
        out.extend_from_slice(&self.version.to_le_bytes());
        self.write_ins_outs(&mut out);
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// Serialized length in bytes.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn flag(&self) -> Option<[u8; 2]> {
        self.flag
    }

    pub fn tx_ins(&self) -> &[TxIn] {
        &self.tx_ins
    }

    pub fn tx_outs(&self) -> &[TxOut] {
        &self.tx_outs
    }

    pub fn tx_witnesses(&self) -> &[InputWitness] {
        &self.tx_witnesses
    }

    pub fn lock_time(&self) -> u32 {
        self.lock_time
    }

    /// Whether the transaction carries the witness flag.
    pub fn is_witness(&self) -> bool {
        self.flag.is_some()
    }

    // -----------------------------------------------------------------
    // Identifiers
    // -----------------------------------------------------------------

    /// Double SHA-256 of [`Tx::no_witness`], in internal byte order.
    pub fn tx_id_le(&self) -> &Hash {
        &self.tx_id_le
    }

    /// The txid in display (byte-reversed) order.
    pub fn tx_id(&self) -> [u8; 32] {
        self.tx_id_le.reversed()
    }

    /// The txid as the conventional display hex string.
    pub fn tx_id_hex(&self) -> String {
        self.tx_id_le.to_string()
    }

    /// Double SHA-256 of the full serialization; witness transactions only.
    pub fn wtx_id_le(&self) -> Option<&Hash> {
        self.wtx_id_le.as_ref()
    }

    pub fn wtx_id(&self) -> Option<[u8; 32]> {
        self.wtx_id_le.as_ref().map(Hash::reversed)
    }

    /// Fee paid: the sum of `input_values` minus the sum of output values.
    ///
    /// `input_values` holds the value of each spent output, in input order.
    /// The result is negative when outputs exceed inputs.
    pub fn calculate_fee(&self, input_values: &[u64]) -> Result<i128, TransactionError> {
        if input_values.len() != self.tx_ins.len() {
            return Err(validation(format!(
                "{} input values for {} inputs",
                input_values.len(),
                self.tx_ins.len()
            )));
        }
        let total_in: i128 = input_values.iter().map(|v| *v as i128).sum();
        let total_out: i128 = self.tx_outs.iter().map(|o| o.value() as i128).sum();
        Ok(total_in - total_out)
    }

    /// Start a modified copy seeded with this transaction's fields.
    pub fn copy(&self) -> TxBuilder {
        TxBuilder {
            version: self.version,
            flag: self.flag,
            tx_ins: self.tx_ins.clone(),
            tx_outs: self.tx_outs.clone(),
            tx_witnesses: self.tx_witnesses.clone(),
            lock_time: self.lock_time,
        }
    }
}

impl fmt::Display for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Field overrides for a new [`Tx`], produced by [`Tx::copy`].
///
/// Nothing is validated until [`TxBuilder::build`].
#[derive(Clone, Debug)]
pub struct TxBuilder {
    version: u32,
    flag: Option<[u8; 2]>,
    tx_ins: Vec<TxIn>,
    tx_outs: Vec<TxOut>,
    tx_witnesses: Vec<InputWitness>,
    lock_time: u32,
}

impl TxBuilder {
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_flag(mut self, flag: Option<[u8; 2]>) -> Self {
        self.flag = flag;
        self
    }

    pub fn with_tx_ins(mut self, tx_ins: Vec<TxIn>) -> Self {
        self.tx_ins = tx_ins;
        self
    }

    pub fn with_tx_outs(mut self, tx_outs: Vec<TxOut>) -> Self {
        self.tx_outs = tx_outs;
        self
    }

    pub fn with_tx_witnesses(mut self, tx_witnesses: Vec<InputWitness>) -> Self {
        self.tx_witnesses = tx_witnesses;
        self
    }

    pub fn with_lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = lock_time;
        self
    }

    /// Drop the flag and witnesses, producing a legacy transaction.
    pub fn without_witness(self) -> Self {
        self.with_flag(None).with_tx_witnesses(Vec::new())
    }

    /// Validate and build, as [`Tx::new`].
    pub fn build(self, network: &NetworkParams) -> Result<Tx, TransactionError> {
        Tx::new(
            network,
            self.version,
            self.flag,
            self.tx_ins,
            self.tx_outs,
            self.tx_witnesses,
            self.lock_time,
        )
    }
}
