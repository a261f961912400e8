//! Consensus parameters that change how transactions are parsed and signed.
//!
//! A `NetworkParams` value is passed explicitly to every constructor and
//! sighash call that depends on the chain, so one process can work with
//! several chains at once.

use serde::{Deserialize, Serialize};

use crate::TransactionError;

/// The two-byte marker that follows the version of a witness transaction.
pub const SEGWIT_FLAG: [u8; 2] = [0x00, 0x01];

/// Consensus branch id of the Sapling network upgrade.
pub const SAPLING_BRANCH_ID: u32 = 0x76b8_09bb;

/// Prefix of the Sapling signature hash personalization.
pub const SAPLING_SIGHASH_PERSONAL_PREFIX: &[u8; 12] = b"ZcashSigHash";

/// Per-chain parameters consumed by transaction parsing and sighash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkParams {
    /// Human-readable network name, e.g. `bitcoin_main`.
    pub name: String,
    /// Marker bytes identifying a witness serialization.
    #[serde(default = "default_segwit_flag")]
    pub segwit_flag: [u8; 2],
    /// Replay-protection fork id; selects the FORKID sighash when set.
    #[serde(default)]
    pub fork_id: Option<u32>,
    /// Consensus branch id bound into Sapling signature hashes.
    #[serde(default)]
    pub sapling_branch_id: Option<u32>,
}

fn default_segwit_flag() -> [u8; 2] {
    SEGWIT_FLAG
}

impl NetworkParams {
    fn preset(name: &str, fork_id: Option<u32>, sapling_branch_id: Option<u32>) -> Self {
        NetworkParams {
            name: name.to_string(),
            segwit_flag: SEGWIT_FLAG,
            fork_id,
            sapling_branch_id,
        }
    }

    /// Bitcoin mainnet.
    pub fn bitcoin_main() -> Self {
        Self::preset("bitcoin_main", None, None)
    }

    /// Bitcoin testnet.
    pub fn bitcoin_test() -> Self {
        Self::preset("bitcoin_test", None, None)
    }

    /// Litecoin mainnet.
    pub fn litecoin_main() -> Self {
        Self::preset("litecoin_main", None, None)
    }

    /// Bitcoin Cash mainnet (fork id 0).
    pub fn bitcoin_cash_main() -> Self {
        Self::preset("bitcoin_cash_main", Some(0), None)
    }

    /// Bitcoin Gold mainnet (fork id 79).
    pub fn bitcoin_gold_main() -> Self {
        Self::preset("bitcoin_gold_main", Some(79), None)
    }

    /// Zcash mainnet after the Sapling upgrade.
    pub fn zcash_sapling_main() -> Self {
        Self::preset("zcash_sapling_main", None, Some(SAPLING_BRANCH_ID))
    }

    /// Resolve a built-in preset by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "bitcoin_main" => Some(Self::bitcoin_main()),
            "bitcoin_test" => Some(Self::bitcoin_test()),
            "litecoin_main" => Some(Self::litecoin_main()),
            "bitcoin_cash_main" => Some(Self::bitcoin_cash_main()),
            "bitcoin_gold_main" => Some(Self::bitcoin_gold_main()),
            "zcash_sapling_main" => Some(Self::zcash_sapling_main()),
            _ => None,
        }
    }

    /// Load parameters from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, TransactionError> {
        serde_json::from_str(json).map_err(|e| TransactionError::Config(e.to_string()))
    }

    /// The 16-byte BLAKE2b personalization for Sapling signature hashes.
    ///
    /// Returns `None` when the network has no Sapling branch id.
    pub fn sapling_sighash_personalization(&self) -> Option<[u8; 16]> {
        let branch_id = self.sapling_branch_id?;
        let mut personal = [0u8; 16];
        personal[..12].copy_from_slice(SAPLING_SIGHASH_PERSONAL_PREFIX);
        personal[12..].copy_from_slice(&branch_id.to_le_bytes());
        Some(personal)
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self::bitcoin_main()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(NetworkParams::bitcoin_cash_main().fork_id, Some(0));
        assert_eq!(NetworkParams::bitcoin_gold_main().fork_id, Some(79));
        assert_eq!(NetworkParams::bitcoin_main().fork_id, None);
        assert_eq!(NetworkParams::default(), NetworkParams::bitcoin_main());
        for name in [
            "bitcoin_main",
            "bitcoin_test",
            "litecoin_main",
            "bitcoin_cash_main",
            "bitcoin_gold_main",
            "zcash_sapling_main",
        ] {
            assert_eq!(NetworkParams::by_name(name).map(|n| n.name), Some(name.to_string()));
        }
        assert!(NetworkParams::by_name("dogecoin_main").is_none());
    }

    #[test]
    fn test_from_json_defaults() {
        let net = NetworkParams::from_json(r#"{"name": "custom", "fork_id": 42}"#).unwrap();
        assert_eq!(net.segwit_flag, SEGWIT_FLAG);
        assert_eq!(net.fork_id, Some(42));
        assert_eq!(net.sapling_branch_id, None);
    }

    #[test]
    fn test_from_json_round_trip() {
        let net = NetworkParams::zcash_sapling_main();
        let json = serde_json::to_string(&net).unwrap();
        assert_eq!(NetworkParams::from_json(&json).unwrap(), net);
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let err = NetworkParams::from_json(r#"{"name": "x", "magic": 1}"#).unwrap_err();
        assert!(matches!(err, TransactionError::Config(_)));
    }

    #[test]
    fn test_sapling_personalization() {
        let personal = NetworkParams::zcash_sapling_main()
            .sapling_sighash_personalization()
            .unwrap();
        assert_eq!(&personal[..12], b"ZcashSigHash");
        assert_eq!(&personal[12..], &[0xbb, 0x09, 0xb8, 0x76]);
        assert!(NetworkParams::bitcoin_main().sapling_sighash_personalization().is_none());
    }
}
