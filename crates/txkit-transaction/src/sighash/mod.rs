//! Signature hash computation for transaction signing.
//!
//! Three digest families are supported, each bit-exact with the chains that
//! use it:
//!
//! * legacy: double SHA-256 of a modified copy of the transaction,
//!   see <https://en.bitcoin.it/wiki/OP_CHECKSIG>
//! * witness (BIP143): double SHA-256 of a fixed preimage of sub-hashes,
//!   see <https://github.com/bitcoin/bips/blob/master/bip-0143.mediawiki>
//! * fork id: the BIP143 preimage with a replay-protected type field,
//!   see <https://github.com/bitcoincashorg/spec/blob/master/replay-protected-sighash.md>
//!
//! [`Tx::sighash_all`] and [`Tx::sighash_single`] pick the family from the
//! network and the transaction. SIGHASH_NONE and the SIGHASH_SINGLE
//! out-of-range case are refused with `Unsupported`.

use tracing::debug;
use txkit_primitives::hash::sha256d;
use txkit_primitives::util::VarInt;
use txkit_primitives::ByteData;

use crate::error::{unsupported, validation};
use crate::input::TxIn;
use crate::network::NetworkParams;
use crate::output::TxOut;
use crate::transaction::Tx;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs.
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign no outputs. Never supported.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: only sign the current input.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Replay-protection flag set in the type field of fork id digests.
pub const SIGHASH_FORKID: u32 = 0x40;

/// The supported base sighash types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum SighashType {
    All = SIGHASH_ALL,
    Single = SIGHASH_SINGLE,
}

impl SighashType {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// The type field with the ANYONECANPAY bit applied when requested.
    pub fn with_anyone_can_pay(self, anyone_can_pay: bool) -> u32 {
        if anyone_can_pay {
            self.as_u32() | SIGHASH_ANYONECANPAY
        } else {
            self.as_u32()
        }
    }
}

impl TryFrom<u32> for SighashType {
    type Error = TransactionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            SIGHASH_ALL => Ok(SighashType::All),
            SIGHASH_SINGLE => Ok(SighashType::Single),
            SIGHASH_NONE => Err(unsupported("SIGHASH_NONE is not supported")),
            other => Err(unsupported(format!("unknown sighash type {:#04x}", other))),
        }
    }
}

/// Optional inputs to a sighash computation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SighashOptions {
    /// Value of the output being spent. Required by the witness and fork id
    /// families, ignored by legacy.
    pub prevout_value: Option<u64>,
    /// Commit to the signed input only.
    pub anyone_can_pay: bool,
}

impl SighashOptions {
    pub fn with_prevout_value(value: u64) -> Self {
        SighashOptions {
            prevout_value: Some(value),
            anyone_can_pay: false,
        }
    }

    pub fn anyone_can_pay(mut self, anyone_can_pay: bool) -> Self {
        self.anyone_can_pay = anyone_can_pay;
        self
    }
}

impl Tx {
    // -----------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------

    /// Digest for SIGHASH_ALL on input `index`.
    ///
    /// # Arguments
    /// * `network` - Selects the fork id family when it declares a fork id.
    /// * `index` - The input being signed.
    /// * `script_code` - The length-prefixed script of the output being spent
    ///   (for P2SH and witness script outputs, the redeem or witness script).
    /// * `opts` - Prevout value and ANYONECANPAY.
    ///
    /// # Returns
    /// The 32-byte digest to sign. The signer appends the sighash byte
    /// (`0x01`, or `0x81` with ANYONECANPAY) to the signature.
    pub fn sighash_all(
        &self,
        network: &NetworkParams,
        index: usize,
        script_code: &[u8],
        opts: SighashOptions,
    ) -> Result<[u8; 32], TransactionError> {
        self.sighash(network, SighashType::All, index, script_code, opts)
    }

    /// Digest for SIGHASH_SINGLE on input `index`.
    ///
    /// Refused with `Unsupported` when there is no output at `index`.
    pub fn sighash_single(
        &self,
        network: &NetworkParams,
        index: usize,
        script_code: &[u8],
        opts: SighashOptions,
    ) -> Result<[u8; 32], TransactionError> {
        self.sighash(network, SighashType::Single, index, script_code, opts)
    }

    /// SIGHASH_NONE is never supported.
    pub fn sighash_none(
        &self,
        _network: &NetworkParams,
        _index: usize,
        _script_code: &[u8],
        _opts: SighashOptions,
    ) -> Result<[u8; 32], TransactionError> {
        Err(unsupported("SIGHASH_NONE is not supported"))
    }

    /// Digest for `sighash_type`, choosing the family: fork id when the
    /// network declares one, otherwise BIP143 for witness transactions and
    /// legacy for the rest.
    pub fn sighash(
        &self,
        network: &NetworkParams,
        sighash_type: SighashType,
        index: usize,
        script_code: &[u8],
        opts: SighashOptions,
    ) -> Result<[u8; 32], TransactionError> {
        if sighash_type == SighashType::Single && index >= self.tx_outs().len() {
            return Err(unsupported(
                "SIGHASH_SINGLE without a matching output is not supported",
            ));
        }

        if let Some(fork_id) = network.fork_id {
            debug!(index, ?sighash_type, fork_id, "forkid sighash");
            return self.forkid_sighash(network, sighash_type, index, script_code, opts);
        }
        if self.is_witness() {
            debug!(index, ?sighash_type, "witness sighash");
            return self.segwit_sighash(sighash_type, index, script_code, opts);
        }
        debug!(index, ?sighash_type, "legacy sighash");
        self.legacy_sighash(network, sighash_type, index, script_code, opts.anyone_can_pay)
    }

    // -----------------------------------------------------------------
    // Legacy
    // -----------------------------------------------------------------

    /// Legacy digest over a modified copy of the transaction.
    ///
    /// Every input script is blanked except the signed input's, which
    /// becomes `script_code` without its length prefix. SINGLE keeps outputs
    /// up to `index` (earlier ones nulled) and zeroes the other inputs'
    /// sequences; ANYONECANPAY keeps only the signed input. The digest is
    /// double SHA-256 of the copy's pre-witness serialization followed by
    /// the 4-byte type.
    pub fn legacy_sighash(
        &self,
        network: &NetworkParams,
        sighash_type: SighashType,
        index: usize,
        script_code: &[u8],
        anyone_can_pay: bool,
    ) -> Result<[u8; 32], TransactionError> {
        let type_field = sighash_type.with_anyone_can_pay(anyone_can_pay);
        let preimage =
            self.legacy_preimage(network, sighash_type, index, script_code, anyone_can_pay, type_field)?;
        Ok(sha256d(preimage.as_bytes()))
    }

    /// The legacy preimage: the modified copy's pre-witness serialization
    /// followed by `type_field` (4 bytes LE).
    ///
    /// `sighash_type` and `anyone_can_pay` shape the copy; `type_field` is
    /// appended as given, so callers can commit to a type byte with extra
    /// high bits set.
    pub fn legacy_preimage(
        &self,
        network: &NetworkParams,
        sighash_type: SighashType,
        index: usize,
        script_code: &[u8],
        anyone_can_pay: bool,
        type_field: u32,
    ) -> Result<ByteData, TransactionError> {
        self.check_index(index)?;
        let sub_script = strip_length_prefix(script_code)?;

        let mut tx_ins = Vec::with_capacity(self.tx_ins().len());
        for (i, tx_in) in self.tx_ins().iter().enumerate() {
            let redeem = if i == index { sub_script.to_vec() } else { Vec::new() };
            let mut blanked = TxIn::new(*tx_in.outpoint(), Vec::new(), redeem, tx_in.sequence())?;
            if sighash_type == SighashType::Single && i != index {
                blanked = blanked.with_sequence(0);
            }
            tx_ins.push(blanked);
        }

        let tx_outs = match sighash_type {
            SighashType::All => self.tx_outs().to_vec(),
            SighashType::Single => {
                let target = self.tx_outs().get(index).ok_or_else(|| {
                    unsupported("SIGHASH_SINGLE without a matching output is not supported")
                })?;
                let mut outs = vec![TxOut::null(); index];
                outs.push(target.clone());
                outs
            }
        };

        if anyone_can_pay {
            tx_ins = vec![tx_ins.swap_remove(index)];
        }

        let copy = self
            .copy()
            .without_witness()
            .with_tx_ins(tx_ins)
            .with_tx_outs(tx_outs)
            .build(network)?;

        let mut preimage = ByteData::from(copy.no_witness());
        preimage.append_u32_le(type_field)?;
        Ok(preimage.into_immutable())
    }

    // -----------------------------------------------------------------
    // BIP143 and fork id
    // -----------------------------------------------------------------

    /// BIP143 witness digest. `opts.prevout_value` is required.
    pub fn segwit_sighash(
        &self,
        sighash_type: SighashType,
        index: usize,
        script_code: &[u8],
        opts: SighashOptions,
    ) -> Result<[u8; 32], TransactionError> {
        let type_field = sighash_type.with_anyone_can_pay(opts.anyone_can_pay);
        let preimage = self.bip143_preimage(sighash_type, index, script_code, opts, type_field)?;
        Ok(sha256d(preimage.as_bytes()))
    }

    /// Replay-protected digest for chains that declare a fork id.
    ///
    /// Same preimage as [`Tx::segwit_sighash`], with the type field set to
    /// `(fork_id << 8) | type | SIGHASH_FORKID`, plus ANYONECANPAY when
    /// requested. `opts.prevout_value` is required.
    pub fn forkid_sighash(
        &self,
        network: &NetworkParams,
        sighash_type: SighashType,
        index: usize,
        script_code: &[u8],
        opts: SighashOptions,
    ) -> Result<[u8; 32], TransactionError> {
        let fork_id = network
            .fork_id
            .ok_or_else(|| validation(format!("network {} declares no fork id", network.name)))?;
        let mut type_field = (fork_id << 8) | sighash_type.as_u32() | SIGHASH_FORKID;
        if opts.anyone_can_pay {
            type_field |= SIGHASH_ANYONECANPAY;
        }
        let preimage = self.bip143_preimage(sighash_type, index, script_code, opts, type_field)?;
        Ok(sha256d(preimage.as_bytes()))
    }

    /// Compute the BIP143 preimage before double-hashing.
    ///
    /// The preimage consists of:
    /// 1. nVersion (4 bytes LE)
    /// 2. hashPrevouts (32 bytes), zero with ANYONECANPAY
    /// 3. hashSequence (32 bytes), zero with ANYONECANPAY or SINGLE
    /// 4. outpoint (32+4 bytes) of the signed input
    /// 5. scriptCode, already length-prefixed by the caller
    /// 6. value (8 bytes LE) of the output being spent
    /// 7. nSequence (4 bytes LE) of the signed input
    /// 8. hashOutputs (32 bytes), all outputs or the same-index output
    /// 9. nLocktime (4 bytes LE)
    /// 10. type field (4 bytes LE)
    pub fn bip143_preimage(
        &self,
        sighash_type: SighashType,
        index: usize,
        script_code: &[u8],
        opts: SighashOptions,
        type_field: u32,
    ) -> Result<ByteData, TransactionError> {
        self.check_index(index)?;
        let prevout_value = opts
            .prevout_value
            .ok_or_else(|| validation("prevout value is required for this sighash"))?;
        let tx_in = &self.tx_ins()[index];

        let mut data = ByteData::with_capacity(156 + script_code.len());
        data.append_u32_le(self.version())?;
        data.append(&self.hash_prevouts(opts.anyone_can_pay))?;
        data.append(&self.hash_sequence(sighash_type, opts.anyone_can_pay))?;
        data.append(&tx_in.outpoint().to_bytes())?;
        data.append(script_code)?;
        data.append_u64_le(prevout_value)?;
        data.append_u32_le(tx_in.sequence())?;
        data.append(&self.hash_outputs(sighash_type, index)?)?;
        data.append_u32_le(self.lock_time())?;
        data.append_u32_le(type_field)?;
        Ok(data.into_immutable())
    }

    // -----------------------------------------------------------------
    // Sub-hashes
    // -----------------------------------------------------------------

    /// Double SHA-256 of all outpoints, or zero with ANYONECANPAY.
    pub fn hash_prevouts(&self, anyone_can_pay: bool) -> [u8; 32] {
        if anyone_can_pay {
            return [0u8; 32];
        }
        let mut outpoints = Vec::with_capacity(self.tx_ins().len() * 36);
        for tx_in in self.tx_ins() {
            tx_in.outpoint().write_to(&mut outpoints);
        }
        sha256d(&outpoints)
    }

    /// Double SHA-256 of all sequences, or zero with ANYONECANPAY or SINGLE.
    pub fn hash_sequence(&self, sighash_type: SighashType, anyone_can_pay: bool) -> [u8; 32] {
        if anyone_can_pay || sighash_type == SighashType::Single {
            return [0u8; 32];
        }
        let sequences: Vec<u8> = self
            .tx_ins()
            .iter()
            .flat_map(|tx_in| tx_in.sequence().to_le_bytes())
            .collect();
        sha256d(&sequences)
    }

    /// Double SHA-256 of all outputs (ALL) or the output at `index` (SINGLE).
    pub fn hash_outputs(
        &self,
        sighash_type: SighashType,
        index: usize,
    ) -> Result<[u8; 32], TransactionError> {
        match sighash_type {
            SighashType::All => {
                let mut outputs = Vec::new();
                for tx_out in self.tx_outs() {
                    tx_out.write_to(&mut outputs);
                }
                Ok(sha256d(&outputs))
            }
            SighashType::Single => match self.tx_outs().get(index) {
                Some(tx_out) => Ok(sha256d(&tx_out.to_bytes())),
                None => Err(unsupported(
                    "SIGHASH_SINGLE without a matching output is not supported",
                )),
            },
        }
    }

    fn check_index(&self, index: usize) -> Result<(), TransactionError> {
        if index >= self.tx_ins().len() {
            return Err(validation(format!(
                "input index {} out of range (tx has {} inputs)",
                index,
                self.tx_ins().len()
            )));
        }
        Ok(())
    }
}

/// Drop the VarInt length prefix from a script code.
fn strip_length_prefix(script_code: &[u8]) -> Result<&[u8], TransactionError> {
    if script_code.is_empty() {
        return Err(validation("script code is empty"));
    }
    let (_, prefix_len) = VarInt::from_bytes(script_code)?;
    Ok(&script_code[prefix_len..])
}
