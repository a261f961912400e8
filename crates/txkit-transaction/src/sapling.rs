//! Sapling (Zcash v4) transactions and their ZIP-243 signature hash.
//!
//! The transparent part reuses [`TxIn`] and [`TxOut`]. Shielded spends,
//! shielded outputs and Groth16 joinsplits are carried as opaque byte
//! fields of fixed width; nothing here verifies proofs or signatures.
//!
//! See <https://zips.z.cash/zip-0243>.

use std::fmt;

use tracing::{debug, trace};
use txkit_primitives::chainhash::Hash;
use txkit_primitives::hash::{blake2b_256, sha256d};
use txkit_primitives::util::{ByteReader, VarInt};
use txkit_primitives::{validate_bytes, ByteData};

use crate::error::{decode_hex, reading, unsupported, validation};
use crate::input::TxIn;
use crate::network::NetworkParams;
use crate::output::TxOut;
use crate::sighash::{SighashOptions, SighashType};
use crate::TransactionError;

/// Overwintered flag plus version 4.
pub const SAPLING_HEADER: u32 = 0x8000_0004;

pub const SAPLING_VERSION_GROUP_ID: u32 = 0x892f_2085;

/// Largest expiry height; larger values are reserved.
pub const MAX_EXPIRY_HEIGHT: u32 = 499_999_999;

pub const MAX_JOINSPLITS: usize = 5;

pub const ZKPROOF_SIZE: usize = 192;
pub const ENC_CIPHERTEXT_SIZE: usize = 580;
pub const OUT_CIPHERTEXT_SIZE: usize = 80;
pub const NOTE_CIPHERTEXT_SIZE: usize = 601;

pub const SPEND_DESCRIPTION_SIZE: usize = 384;
pub const OUTPUT_DESCRIPTION_SIZE: usize = 948;
pub const JOINSPLIT_SIZE: usize = 1698;

const PREVOUTS_PERSONAL: &[u8; 16] = b"ZcashPrevoutHash";
const SEQUENCE_PERSONAL: &[u8; 16] = b"ZcashSequencHash";
const OUTPUTS_PERSONAL: &[u8; 16] = b"ZcashOutputsHash";
const JOINSPLITS_PERSONAL: &[u8; 16] = b"ZcashJSplitsHash";
const SHIELDED_SPENDS_PERSONAL: &[u8; 16] = b"ZcashSSpendsHash";
const SHIELDED_OUTPUTS_PERSONAL: &[u8; 16] = b"ZcashSOutputHash";

fn check_width(field: &str, value: &[u8], expected: usize) -> Result<(), TransactionError> {
    validate_bytes(value, Some(expected)).map_err(|e| validation(format!("{}: {}", field, e)))
}

fn read_vec(
    reader: &mut ByteReader,
    n: usize,
    what: &'static str,
) -> Result<Vec<u8>, TransactionError> {
    Ok(reader.read_bytes(n).map_err(reading(what))?.to_vec())
}

// -----------------------------------------------------------------------
// Shielded spend
// -----------------------------------------------------------------------

/// A Sapling spend description (384 bytes on the wire).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShieldedSpend {
    cv: [u8; 32],
    anchor: [u8; 32],
    nullifier: [u8; 32],
    rk: [u8; 32],
    zkproof: Vec<u8>,
    spend_auth_sig: [u8; 64],
}

impl ShieldedSpend {
    /// Create a spend description; `zkproof` must be 192 bytes.
    pub fn new(
        cv: [u8; 32],
        anchor: [u8; 32],
        nullifier: [u8; 32],
        rk: [u8; 32],
        zkproof: Vec<u8>,
        spend_auth_sig: [u8; 64],
    ) -> Result<Self, TransactionError> {
        check_width("spend zkproof", &zkproof, ZKPROOF_SIZE)?;
        Ok(ShieldedSpend {
            cv,
            anchor,
            nullifier,
            rk,
            zkproof,
            spend_auth_sig,
        })
    }

    pub fn cv(&self) -> &[u8; 32] {
        &self.cv
    }

    pub fn anchor(&self) -> &[u8; 32] {
        &self.anchor
    }

    pub fn nullifier(&self) -> &[u8; 32] {
        &self.nullifier
    }

    pub fn rk(&self) -> &[u8; 32] {
        &self.rk
    }

    pub fn zkproof(&self) -> &[u8] {
        &self.zkproof
    }

    pub fn spend_auth_sig(&self) -> &[u8; 64] {
        &self.spend_auth_sig
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let cv = reader.read_array().map_err(reading("spend cv"))?;
        let anchor = reader.read_array().map_err(reading("spend anchor"))?;
        let nullifier = reader.read_array().map_err(reading("spend nullifier"))?;
        let rk = reader.read_array().map_err(reading("spend rk"))?;
        let zkproof = read_vec(reader, ZKPROOF_SIZE, "spend zkproof")?;
        let spend_auth_sig = reader.read_array().map_err(reading("spend auth sig"))?;
        ShieldedSpend::new(cv, anchor, nullifier, rk, zkproof, spend_auth_sig)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        Self::read_from(&mut ByteReader::new(bytes))
    }

    /// The description without its spend authorization signature, as
    /// committed to by the signature hash.
    fn write_without_sig(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.cv);
        out.extend_from_slice(&self.anchor);
        out.extend_from_slice(&self.nullifier);
        out.extend_from_slice(&self.rk);
        out.extend_from_slice(&self.zkproof);
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        self.write_without_sig(out);
        out.extend_from_slice(&self.spend_auth_sig);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SPEND_DESCRIPTION_SIZE);
        self.write_to(&mut out);
        out
    }
}

// -----------------------------------------------------------------------
// Shielded output
// -----------------------------------------------------------------------

/// A Sapling output description (948 bytes on the wire).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShieldedOutput {
    cv: [u8; 32],
    cmu: [u8; 32],
    ephemeral_key: [u8; 32],
    enc_ciphertext: Vec<u8>,
    out_ciphertext: Vec<u8>,
    zkproof: Vec<u8>,
}

impl ShieldedOutput {
    /// Create an output description, checking the ciphertext and proof widths.
    pub fn new(
        cv: [u8; 32],
        cmu: [u8; 32],
        ephemeral_key: [u8; 32],
        enc_ciphertext: Vec<u8>,
        out_ciphertext: Vec<u8>,
        zkproof: Vec<u8>,
    ) -> Result<Self, TransactionError> {
        check_width("output enc_ciphertext", &enc_ciphertext, ENC_CIPHERTEXT_SIZE)?;
        check_width("output out_ciphertext", &out_ciphertext, OUT_CIPHERTEXT_SIZE)?;
        check_width("output zkproof", &zkproof, ZKPROOF_SIZE)?;
        Ok(ShieldedOutput {
            cv,
            cmu,
            ephemeral_key,
            enc_ciphertext,
            out_ciphertext,
            zkproof,
        })
    }

    pub fn cv(&self) -> &[u8; 32] {
        &self.cv
    }

    pub fn cmu(&self) -> &[u8; 32] {
        &self.cmu
    }

    pub fn ephemeral_key(&self) -> &[u8; 32] {
        &self.ephemeral_key
    }

    pub fn enc_ciphertext(&self) -> &[u8] {
        &self.enc_ciphertext
    }

    pub fn out_ciphertext(&self) -> &[u8] {
        &self.out_ciphertext
    }

    pub fn zkproof(&self) -> &[u8] {
        &self.zkproof
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let cv = reader.read_array().map_err(reading("output cv"))?;
        let cmu = reader.read_array().map_err(reading("output cmu"))?;
        let ephemeral_key = reader.read_array().map_err(reading("output ephemeral key"))?;
        let enc_ciphertext = read_vec(reader, ENC_CIPHERTEXT_SIZE, "output enc_ciphertext")?;
        let out_ciphertext = read_vec(reader, OUT_CIPHERTEXT_SIZE, "output out_ciphertext")?;
        let zkproof = read_vec(reader, ZKPROOF_SIZE, "output zkproof")?;
        ShieldedOutput::new(cv, cmu, ephemeral_key, enc_ciphertext, out_ciphertext, zkproof)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        Self::read_from(&mut ByteReader::new(bytes))
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.cv);
        out.extend_from_slice(&self.cmu);
        out.extend_from_slice(&self.ephemeral_key);
        out.extend_from_slice(&self.enc_ciphertext);
        out.extend_from_slice(&self.out_ciphertext);
        out.extend_from_slice(&self.zkproof);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(OUTPUT_DESCRIPTION_SIZE);
        self.write_to(&mut out);
        out
    }
}

// -----------------------------------------------------------------------
// JoinSplit
// -----------------------------------------------------------------------

/// A Sprout joinsplit description in its Groth16 form (1698 bytes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinSplit {
    vpub_old: u64,
    vpub_new: u64,
    anchor: [u8; 32],
    nullifiers: [[u8; 32]; 2],
    commitments: [[u8; 32]; 2],
    ephemeral_key: [u8; 32],
    random_seed: [u8; 32],
    vmacs: [[u8; 32]; 2],
    zkproof: Vec<u8>,
    encrypted_notes: [Vec<u8>; 2],
}

impl JoinSplit {
    /// Create a joinsplit, checking the proof and note ciphertext widths.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vpub_old: u64,
        vpub_new: u64,
        anchor: [u8; 32],
        nullifiers: [[u8; 32]; 2],
        commitments: [[u8; 32]; 2],
        ephemeral_key: [u8; 32],
        random_seed: [u8; 32],
        vmacs: [[u8; 32]; 2],
        zkproof: Vec<u8>,
        encrypted_notes: [Vec<u8>; 2],
    ) -> Result<Self, TransactionError> {
        check_width("joinsplit zkproof", &zkproof, ZKPROOF_SIZE)?;
        for note in &encrypted_notes {
            check_width("joinsplit ciphertext", note, NOTE_CIPHERTEXT_SIZE)?;
        }
        Ok(JoinSplit {
            vpub_old,
            vpub_new,
            anchor,
            nullifiers,
            commitments,
            ephemeral_key,
            random_seed,
            vmacs,
            zkproof,
            encrypted_notes,
        })
    }

    /// Value leaving the transparent pool.
    pub fn vpub_old(&self) -> u64 {
        self.vpub_old
    }

    /// Value entering the transparent pool.
    pub fn vpub_new(&self) -> u64 {
        self.vpub_new
    }

    pub fn anchor(&self) -> &[u8; 32] {
        &self.anchor
    }

    pub fn nullifiers(&self) -> &[[u8; 32]; 2] {
        &self.nullifiers
    }

    pub fn commitments(&self) -> &[[u8; 32]; 2] {
        &self.commitments
    }

    pub fn ephemeral_key(&self) -> &[u8; 32] {
        &self.ephemeral_key
    }

    pub fn random_seed(&self) -> &[u8; 32] {
        &self.random_seed
    }

    pub fn vmacs(&self) -> &[[u8; 32]; 2] {
        &self.vmacs
    }

    pub fn zkproof(&self) -> &[u8] {
        &self.zkproof
    }

    pub fn encrypted_notes(&self) -> &[Vec<u8>; 2] {
        &self.encrypted_notes
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let vpub_old = reader.read_u64_le().map_err(reading("joinsplit vpub_old"))?;
        let vpub_new = reader.read_u64_le().map_err(reading("joinsplit vpub_new"))?;
        let anchor = reader.read_array().map_err(reading("joinsplit anchor"))?;
        let nullifiers = [
            reader.read_array().map_err(reading("joinsplit nullifier"))?,
            reader.read_array().map_err(reading("joinsplit nullifier"))?,
        ];
        let commitments = [
            reader.read_array().map_err(reading("joinsplit commitment"))?,
            reader.read_array().map_err(reading("joinsplit commitment"))?,
        ];
        let ephemeral_key = reader.read_array().map_err(reading("joinsplit ephemeral key"))?;
        let random_seed = reader.read_array().map_err(reading("joinsplit random seed"))?;
        let vmacs = [
            reader.read_array().map_err(reading("joinsplit vmac"))?,
            reader.read_array().map_err(reading("joinsplit vmac"))?,
        ];
        let zkproof = read_vec(reader, ZKPROOF_SIZE, "joinsplit zkproof")?;
        let encrypted_notes = [
            read_vec(reader, NOTE_CIPHERTEXT_SIZE, "joinsplit ciphertext")?,
            read_vec(reader, NOTE_CIPHERTEXT_SIZE, "joinsplit ciphertext")?,
        ];
        JoinSplit::new(
            vpub_old,
            vpub_new,
            anchor,
            nullifiers,
            commitments,
            ephemeral_key,
            random_seed,
            vmacs,
            zkproof,
            encrypted_notes,
        )
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        Self::read_from(&mut ByteReader::new(bytes))
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.vpub_old.to_le_bytes());
        out.extend_from_slice(&self.vpub_new.to_le_bytes());
        out.extend_from_slice(&self.anchor);
        for nullifier in &self.nullifiers {
            out.extend_from_slice(nullifier);
        }
        for commitment in &self.commitments {
            out.extend_from_slice(commitment);
        }
        out.extend_from_slice(&self.ephemeral_key);
        out.extend_from_slice(&self.random_seed);
        for vmac in &self.vmacs {
            out.extend_from_slice(vmac);
        }
        out.extend_from_slice(&self.zkproof);
        for note in &self.encrypted_notes {
            out.extend_from_slice(note);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(JOINSPLIT_SIZE);
        self.write_to(&mut out);
        out
    }
}

// -----------------------------------------------------------------------
// Transaction
// -----------------------------------------------------------------------

/// An immutable Sapling (v4, overwintered) transaction.
///
/// # Wire format
///
/// | Field            | Size                                   |
/// |------------------|----------------------------------------|
/// | header           | 4 bytes (LE), `0x80000004`             |
/// | version group id | 4 bytes (LE), `0x892f2085`             |
/// | inputs           | VarInt count + inputs                  |
/// | outputs          | VarInt count + outputs                 |
/// | lock_time        | 4 bytes (LE)                           |
/// | expiry_height    | 4 bytes (LE)                           |
/// | value_balance    | 8 bytes (LE, signed)                   |
/// | shielded spends  | VarInt count + 384 bytes each          |
/// | shielded outputs | VarInt count + 948 bytes each          |
/// | joinsplits       | VarInt count + 1698 bytes each         |
/// | joinsplit key    | 32 bytes, only with joinsplits         |
/// | joinsplit sig    | 64 bytes, only with joinsplits         |
/// | binding sig      | 64 bytes, only with spends or outputs  |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaplingTx {
    header: u32,
    version_group_id: u32,
    tx_ins: Vec<TxIn>,
    tx_outs: Vec<TxOut>,
    lock_time: u32,
    expiry_height: u32,
    value_balance: i64,
    shielded_spends: Vec<ShieldedSpend>,
    shielded_outputs: Vec<ShieldedOutput>,
    tx_joinsplits: Vec<JoinSplit>,
    joinsplit_pubkey: Option<[u8; 32]>,
    joinsplit_sig: Option<[u8; 64]>,
    binding_sig: Option<[u8; 64]>,
    raw: ByteData,
    tx_id_le: Hash,
}

impl SaplingTx {
    /// An empty builder with the Sapling header and version group id set.
    pub fn builder() -> SaplingTxBuilder {
        SaplingTxBuilder::default()
    }

    /// Start a modified copy seeded with this transaction's fields.
    pub fn copy(&self) -> SaplingTxBuilder {
        SaplingTxBuilder {
            header: self.header,
            version_group_id: self.version_group_id,
            tx_ins: self.tx_ins.clone(),
            tx_outs: self.tx_outs.clone(),
            lock_time: self.lock_time,
            expiry_height: self.expiry_height,
            value_balance: self.value_balance,
            shielded_spends: self.shielded_spends.clone(),
            shielded_outputs: self.shielded_outputs.clone(),
            tx_joinsplits: self.tx_joinsplits.clone(),
            joinsplit_pubkey: self.joinsplit_pubkey,
            joinsplit_sig: self.joinsplit_sig,
            binding_sig: self.binding_sig,
        }
    }

    fn validate(b: &SaplingTxBuilder) -> Result<(), TransactionError> {
        if b.header != SAPLING_HEADER {
            return Err(validation(format!(
                "expected header {:#010x}, got {:#010x}",
                SAPLING_HEADER, b.header
            )));
        }
        if b.version_group_id != SAPLING_VERSION_GROUP_ID {
            return Err(validation(format!(
                "expected version group id {:#010x}, got {:#010x}",
                SAPLING_VERSION_GROUP_ID, b.version_group_id
            )));
        }
        if b.expiry_height > MAX_EXPIRY_HEIGHT {
            return Err(validation(format!(
                "expiry height {} above {}",
                b.expiry_height, MAX_EXPIRY_HEIGHT
            )));
        }
        if b.tx_joinsplits.len() > MAX_JOINSPLITS {
            return Err(validation(format!(
                "{} joinsplits, at most {} allowed",
                b.tx_joinsplits.len(),
                MAX_JOINSPLITS
            )));
        }

        let has_joinsplits = !b.tx_joinsplits.is_empty();
        if b.joinsplit_pubkey.is_some() != has_joinsplits || b.joinsplit_sig.is_some() != has_joinsplits {
            return Err(validation(
                "joinsplit pubkey and sig must be present exactly when joinsplits are",
            ));
        }

        let has_shielded = !b.shielded_spends.is_empty() || !b.shielded_outputs.is_empty();
        if has_shielded != b.binding_sig.is_some() {
            return Err(validation(
                "binding sig must be present exactly when shielded spends or outputs are",
            ));
        }
        if !has_shielded && b.value_balance != 0 {
            return Err(validation("nonzero value balance without shielded spends or outputs"));
        }

        if b.tx_ins.is_empty() && b.shielded_spends.is_empty() && !has_joinsplits {
            return Err(validation("transaction spends nothing"));
        }
        if b.tx_outs.is_empty() && b.shielded_outputs.is_empty() && !has_joinsplits {
            return Err(validation("transaction pays nothing"));
        }
        Ok(())
    }

    fn from_builder(b: SaplingTxBuilder) -> Result<Self, TransactionError> {
        Self::validate(&b)?;
        let mut tx = SaplingTx {
            header: b.header,
            version_group_id: b.version_group_id,
            tx_ins: b.tx_ins,
            tx_outs: b.tx_outs,
            lock_time: b.lock_time,
            expiry_height: b.expiry_height,
            value_balance: b.value_balance,
            shielded_spends: b.shielded_spends,
            shielded_outputs: b.shielded_outputs,
            tx_joinsplits: b.tx_joinsplits,
            joinsplit_pubkey: b.joinsplit_pubkey,
            joinsplit_sig: b.joinsplit_sig,
            binding_sig: b.binding_sig,
            raw: ByteData::new(),
            tx_id_le: Hash::default(),
        };
        let mut raw = Vec::new();
        tx.write_to(&mut raw);
        tx.tx_id_le = Hash::new(sha256d(&raw));
        tx.raw = ByteData::from(raw).into_immutable();
        Ok(tx)
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    fn write_transparent(&self, out: &mut Vec<u8>) {
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
        out.extend_from_slice(&self.header.to_le_bytes());
        out.extend_from_slice(&self.version_group_id.to_le_bytes());
        self.write_transparent(out);
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out.extend_from_slice(&self.expiry_height.to_le_bytes());
        out.extend_from_slice(&self.value_balance.to_le_bytes());

        out.extend_from_slice(&VarInt::from(self.shielded_spends.len()).to_bytes());
        for spend in &self.shielded_spends {
            spend.write_to(out);
        }
        out.extend_from_slice(&VarInt::from(self.shielded_outputs.len()).to_bytes());
        for output in &self.shielded_outputs {
            output.write_to(out);
        }
        out.extend_from_slice(&VarInt::from(self.tx_joinsplits.len()).to_bytes());
        for joinsplit in &self.tx_joinsplits {
            joinsplit.write_to(out);
        }
        if let (Some(pubkey), Some(sig)) = (&self.joinsplit_pubkey, &self.joinsplit_sig) {
            out.extend_from_slice(pubkey);
            out.extend_from_slice(sig);
        }
        if let Some(sig) = &self.binding_sig {
            out.extend_from_slice(sig);
        }
    }

    /// Parse a Sapling transaction that fills `bytes` exactly.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let mut b = SaplingTx::builder();
        b.header = reader.read_u32_le().map_err(reading("header"))?;
        b.version_group_id = reader.read_u32_le().map_err(reading("version group id"))?;
        if b.header != SAPLING_HEADER || b.version_group_id != SAPLING_VERSION_GROUP_ID {
            return Err(TransactionError::Serialization(format!(
                "not a Sapling transaction (header {:#010x}, group id {:#010x})",
                b.header, b.version_group_id
            )));
        }

        let count = reader.read_varint().map_err(reading("input count"))?.value();
        for _ in 0..count {
            b.tx_ins.push(TxIn::read_from(&mut reader)?);
        }
        let count = reader.read_varint().map_err(reading("output count"))?.value();
        for _ in 0..count {
            b.tx_outs.push(TxOut::read_from(&mut reader)?);
        }

        b.lock_time = reader.read_u32_le().map_err(reading("lock time"))?;
        b.expiry_height = reader.read_u32_le().map_err(reading("expiry height"))?;
        b.value_balance = reader.read_i64_le().map_err(reading("value balance"))?;

        let count = reader.read_varint().map_err(reading("shielded spend count"))?.value();
        for _ in 0..count {
            b.shielded_spends.push(ShieldedSpend::read_from(&mut reader)?);
        }
        let count = reader.read_varint().map_err(reading("shielded output count"))?.value();
        for _ in 0..count {
            b.shielded_outputs.push(ShieldedOutput::read_from(&mut reader)?);
        }
        let count = reader.read_varint().map_err(reading("joinsplit count"))?.value();
        for _ in 0..count {
            b.tx_joinsplits.push(JoinSplit::read_from(&mut reader)?);
        }

        if !b.tx_joinsplits.is_empty() {
            b.joinsplit_pubkey = Some(reader.read_array().map_err(reading("joinsplit pubkey"))?);
            b.joinsplit_sig = Some(reader.read_array().map_err(reading("joinsplit sig"))?);
        }
        if !b.shielded_spends.is_empty() || !b.shielded_outputs.is_empty() {
            b.binding_sig = Some(reader.read_array().map_err(reading("binding sig"))?);
        }

        if reader.remaining() != 0 {
            return Err(TransactionError::Serialization(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }

        trace!(
            inputs = b.tx_ins.len(),
            outputs = b.tx_outs.len(),
            spends = b.shielded_spends.len(),
            shielded_outputs = b.shielded_outputs.len(),
            joinsplits = b.tx_joinsplits.len(),
            "parsed sapling transaction"
        );

        let tx = b.build()?;
        if tx.raw.as_bytes() != bytes {
            return Err(TransactionError::Serialization(
                "non-canonical transaction encoding".to_string(),
            ));
        }
        Ok(tx)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        Self::from_bytes(&decode_hex(hex_str)?)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.raw.as_bytes().to_vec()
    }

    pub fn to_hex(&self) -> String {
        self.raw.to_hex()
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn header(&self) -> u32 {
        self.header
    }

    pub fn version_group_id(&self) -> u32 {
        self.version_group_id
    }

    pub fn tx_ins(&self) -> &[TxIn] {
        &self.tx_ins
    }

    pub fn tx_outs(&self) -> &[TxOut] {
        &self.tx_outs
    }

    pub fn lock_time(&self) -> u32 {
        self.lock_time
    }

    pub fn expiry_height(&self) -> u32 {
        self.expiry_height
    }

    /// Net value moving from the shielded pool to the transparent pool.
    pub fn value_balance(&self) -> i64 {
        self.value_balance
    }

    pub fn shielded_spends(&self) -> &[ShieldedSpend] {
        &self.shielded_spends
    }

    pub fn shielded_outputs(&self) -> &[ShieldedOutput] {
        &self.shielded_outputs
    }

    pub fn tx_joinsplits(&self) -> &[JoinSplit] {
        &self.tx_joinsplits
    }

    pub fn joinsplit_pubkey(&self) -> Option<&[u8; 32]> {
        self.joinsplit_pubkey.as_ref()
    }

    pub fn joinsplit_sig(&self) -> Option<&[u8; 64]> {
        self.joinsplit_sig.as_ref()
    }

    pub fn binding_sig(&self) -> Option<&[u8; 64]> {
        self.binding_sig.as_ref()
    }

    /// Double SHA-256 of the full serialization, in internal byte order.
    pub fn tx_id_le(&self) -> &Hash {
        &self.tx_id_le
    }

    pub fn tx_id(&self) -> [u8; 32] {
        self.tx_id_le.reversed()
    }

    pub fn tx_id_hex(&self) -> String {
        self.tx_id_le.to_string()
    }

    // -----------------------------------------------------------------
    // ZIP-243 sub-hashes
    // -----------------------------------------------------------------

    /// BLAKE2b of all outpoints, or zero with ANYONECANPAY.
    pub fn hash_prevouts(&self, anyone_can_pay: bool) -> [u8; 32] {
        if anyone_can_pay {
            return [0u8; 32];
        }
        let mut data = Vec::with_capacity(self.tx_ins.len() * 36);
        for tx_in in &self.tx_ins {
            tx_in.outpoint().write_to(&mut data);
        }
        blake2b_256(PREVOUTS_PERSONAL, &data)
    }

    /// BLAKE2b of all sequences, or zero with ANYONECANPAY or SINGLE.
    pub fn hash_sequence(&self, sighash_type: SighashType, anyone_can_pay: bool) -> [u8; 32] {
        if anyone_can_pay || sighash_type == SighashType::Single {
            return [0u8; 32];
        }
        let data: Vec<u8> = self
            .tx_ins
            .iter()
            .flat_map(|tx_in| tx_in.sequence().to_le_bytes())
            .collect();
        blake2b_256(SEQUENCE_PERSONAL, &data)
    }

    /// BLAKE2b of all transparent outputs (ALL) or the one at `index` (SINGLE).
    pub fn hash_outputs(
        &self,
        sighash_type: SighashType,
        index: usize,
    ) -> Result<[u8; 32], TransactionError> {
        let mut data = Vec::new();
        match sighash_type {
            SighashType::All => {
                for tx_out in &self.tx_outs {
                    tx_out.write_to(&mut data);
                }
            }
            SighashType::Single => match self.tx_outs.get(index) {
                Some(tx_out) => tx_out.write_to(&mut data),
                None => {
                    return Err(unsupported(
                        "SIGHASH_SINGLE without a matching output is not supported",
                    ))
                }
            },
        }
        Ok(blake2b_256(OUTPUTS_PERSONAL, &data))
    }

    /// BLAKE2b of the joinsplits followed by the joinsplit pubkey, or zero
    /// without joinsplits.
    pub fn hash_joinsplits(&self) -> [u8; 32] {
        if self.tx_joinsplits.is_empty() {
            return [0u8; 32];
        }
        let mut data = Vec::with_capacity(self.tx_joinsplits.len() * JOINSPLIT_SIZE + 32);
        for joinsplit in &self.tx_joinsplits {
            joinsplit.write_to(&mut data);
        }
        if let Some(pubkey) = &self.joinsplit_pubkey {
            data.extend_from_slice(pubkey);
        }
        blake2b_256(JOINSPLITS_PERSONAL, &data)
    }

    /// BLAKE2b of every spend without its authorization signature, or zero
    /// without spends.
    pub fn hash_shielded_spends(&self) -> [u8; 32] {
        if self.shielded_spends.is_empty() {
            return [0u8; 32];
        }
        let mut data = Vec::with_capacity(self.shielded_spends.len() * (SPEND_DESCRIPTION_SIZE - 64));
        for spend in &self.shielded_spends {
            spend.write_without_sig(&mut data);
        }
        blake2b_256(SHIELDED_SPENDS_PERSONAL, &data)
    }

    /// BLAKE2b of every shielded output, or zero without outputs.
    pub fn hash_shielded_outputs(&self) -> [u8; 32] {
        if self.shielded_outputs.is_empty() {
            return [0u8; 32];
        }
        let mut data = Vec::with_capacity(self.shielded_outputs.len() * OUTPUT_DESCRIPTION_SIZE);
        for output in &self.shielded_outputs {
            output.write_to(&mut data);
        }
        blake2b_256(SHIELDED_OUTPUTS_PERSONAL, &data)
    }

    // -----------------------------------------------------------------
    // Signature hash
    // -----------------------------------------------------------------

    /// ZIP-243 digest for signing transparent input `index`.
    ///
    /// # Arguments
    /// * `network` - Must declare a Sapling branch id; it personalizes the hash.
    /// * `sighash_type` - ALL or SINGLE.
    /// * `index` - The transparent input being signed.
    /// * `script_code` - Length-prefixed script of the output being spent.
    /// * `opts` - `prevout_value` is required.
    pub fn sighash(
        &self,
        network: &NetworkParams,
        sighash_type: SighashType,
        index: usize,
        script_code: &[u8],
        opts: SighashOptions,
    ) -> Result<[u8; 32], TransactionError> {
        if index >= self.tx_ins.len() {
            return Err(validation(format!(
                "input index {} out of range (tx has {} inputs)",
                index,
                self.tx_ins.len()
            )));
        }
        let prevout_value = opts
            .prevout_value
            .ok_or_else(|| validation("prevout value is required for this sighash"))?;
        debug!(index, ?sighash_type, network = %network.name, "sapling sighash");

        let tx_in = &self.tx_ins[index];
        let mut data = self.sighash_preimage(sighash_type, index, opts.anyone_can_pay)?;
        data.append(&tx_in.outpoint().to_bytes())?;
        data.append(script_code)?;
        data.append_u64_le(prevout_value)?;
        data.append_u32_le(tx_in.sequence())?;
        self.finalize_sighash(network, data)
    }

    /// ZIP-243 digest without a transparent input, as signed by the
    /// joinsplit and binding signatures.
    ///
    /// `index` only matters for SINGLE, where it selects the committed
    /// transparent output.
    pub fn shielded_sighash(
        &self,
        network: &NetworkParams,
        sighash_type: SighashType,
        index: usize,
    ) -> Result<[u8; 32], TransactionError> {
        debug!(index, ?sighash_type, network = %network.name, "sapling shielded sighash");
        let data = self.sighash_preimage(sighash_type, index, false)?;
        self.finalize_sighash(network, data)
    }

    /// The preimage fields shared by both digests, up to the type field.
    fn sighash_preimage(
        &self,
        sighash_type: SighashType,
        index: usize,
        anyone_can_pay: bool,
    ) -> Result<ByteData, TransactionError> {
        let mut data = ByteData::with_capacity(300);
        data.append_u32_le(self.header)?;
        data.append_u32_le(self.version_group_id)?;
        data.append(&self.hash_prevouts(anyone_can_pay))?;
        data.append(&self.hash_sequence(sighash_type, anyone_can_pay))?;
        data.append(&self.hash_outputs(sighash_type, index)?)?;
        data.append(&self.hash_joinsplits())?;
        data.append(&self.hash_shielded_spends())?;
        data.append(&self.hash_shielded_outputs())?;
        data.append_u32_le(self.lock_time)?;
        data.append_u32_le(self.expiry_height)?;
        data.append(&self.value_balance.to_le_bytes())?;
        data.append_u32_le(sighash_type.with_anyone_can_pay(anyone_can_pay))?;
        Ok(data)
    }

    fn finalize_sighash(
        &self,
        network: &NetworkParams,
        data: ByteData,
    ) -> Result<[u8; 32], TransactionError> {
        let personal = network.sapling_sighash_personalization().ok_or_else(|| {
            validation(format!("network {} declares no Sapling branch id", network.name))
        })?;
        Ok(blake2b_256(&personal, data.into_immutable().as_bytes()))
    }
}

impl fmt::Display for SaplingTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Field values for a new [`SaplingTx`], validated by [`SaplingTxBuilder::build`].
#[derive(Clone, Debug)]
pub struct SaplingTxBuilder {
    header: u32,
    version_group_id: u32,
    tx_ins: Vec<TxIn>,
    tx_outs: Vec<TxOut>,
    lock_time: u32,
    expiry_height: u32,
    value_balance: i64,
    shielded_spends: Vec<ShieldedSpend>,
    shielded_outputs: Vec<ShieldedOutput>,
    tx_joinsplits: Vec<JoinSplit>,
    joinsplit_pubkey: Option<[u8; 32]>,
    joinsplit_sig: Option<[u8; 64]>,
    binding_sig: Option<[u8; 64]>,
}

impl Default for SaplingTxBuilder {
    fn default() -> Self {
        SaplingTxBuilder {
            header: SAPLING_HEADER,
            version_group_id: SAPLING_VERSION_GROUP_ID,
            tx_ins: Vec::new(),
            tx_outs: Vec::new(),
            lock_time: 0,
            expiry_height: 0,
            value_balance: 0,
            shielded_spends: Vec::new(),
            shielded_outputs: Vec::new(),
            tx_joinsplits: Vec::new(),
            joinsplit_pubkey: None,
            joinsplit_sig: None,
            binding_sig: None,
        }
    }
}

impl SaplingTxBuilder {
    pub fn with_tx_ins(mut self, tx_ins: Vec<TxIn>) -> Self {
        self.tx_ins = tx_ins;
        self
    }

    pub fn with_tx_outs(mut self, tx_outs: Vec<TxOut>) -> Self {
        self.tx_outs = tx_outs;
        self
    }

    pub fn with_lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = lock_time;
        self
    }

    pub fn with_expiry_height(mut self, expiry_height: u32) -> Self {
        self.expiry_height = expiry_height;
        self
    }

    pub fn with_value_balance(mut self, value_balance: i64) -> Self {
        self.value_balance = value_balance;
        self
    }

    pub fn with_shielded_spends(mut self, shielded_spends: Vec<ShieldedSpend>) -> Self {
        self.shielded_spends = shielded_spends;
        self
    }

    pub fn with_shielded_outputs(mut self, shielded_outputs: Vec<ShieldedOutput>) -> Self {
        self.shielded_outputs = shielded_outputs;
        self
    }

    /// Set the joinsplits with the key and signature that cover them.
    pub fn with_joinsplits(
        mut self,
        tx_joinsplits: Vec<JoinSplit>,
        joinsplit_pubkey: Option<[u8; 32]>,
        joinsplit_sig: Option<[u8; 64]>,
    ) -> Self {
        self.tx_joinsplits = tx_joinsplits;
        self.joinsplit_pubkey = joinsplit_pubkey;
        self.joinsplit_sig = joinsplit_sig;
        self
    }

    pub fn with_binding_sig(mut self, binding_sig: Option<[u8; 64]>) -> Self {
        self.binding_sig = binding_sig;
        self
    }

    /// Validate and build the transaction.
    ///
    /// # Returns
    /// A `Validation` error when the header or group id is wrong, the
    /// expiry height is reserved, there are more than five joinsplits, the
    /// joinsplit key/sig or binding sig presence does not match the
    /// components they cover, the value balance is nonzero without shielded
    /// components, or nothing is spent or paid.
    pub fn build(self) -> Result<SaplingTx, TransactionError> {
        SaplingTx::from_builder(self)
    }
}
