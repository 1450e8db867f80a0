//! Immutable configuration of an [crate::query::AxiomV2QueryBuilder].
//!
//! Capacity limits and size thresholds are product constants of the prover deployment; the values
//! here are defaults and every one of them can be overridden from JSON.
use std::{fs::File, path::Path, time::Duration};

use anyhow::Context;
use axiom_codec::types::native::SubqueryType;
use ethers_core::types::U256;
use serde::{Deserialize, Serialize};

use crate::admission::{ConfigCategory, SizeCategory};

pub const GWEI: u64 = 1_000_000_000;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AxiomV2QueryConfig {
    pub source_chain_id: u64,
    pub capacity: CapacityConfig,
    pub tx_size: TxSizeThresholds,
    pub receipt_size: ReceiptSizeThresholds,
    pub fee: FeeConfig,
    /// Timeout applied to every individual chain data request.
    pub request_timeout_ms: u64,
    /// Maximum number of chain data requests in flight at once.
    pub max_concurrent_requests: usize,
}

impl Default for AxiomV2QueryConfig {
    fn default() -> Self {
        Self {
            source_chain_id: 1,
            capacity: CapacityConfig::default(),
            tx_size: TxSizeThresholds::default(),
            receipt_size: ReceiptSizeThresholds::default(),
            fee: FeeConfig::default(),
            request_timeout_ms: 30_000,
            max_concurrent_requests: 16,
        }
    }
}

impl AxiomV2QueryConfig {
    pub fn new(source_chain_id: u64) -> Self {
        Self { source_chain_id, ..Default::default() }
    }

    /// Reads a JSON config. Missing fields take their default values.
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening config {path:?}"))?;
        let config = serde_json::from_reader(file).with_context(|| format!("parsing {path:?}"))?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Subquery limits for each [ConfigCategory].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CapacityConfig {
    pub default: CapacityLimits,
    pub large: CapacityLimits,
    pub max: CapacityLimits,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            default: CapacityLimits::uniform(128),
            large: CapacityLimits { tx: 16, receipt: 16, ..CapacityLimits::uniform(64) },
            max: CapacityLimits { tx: 1, receipt: 1, ..CapacityLimits::uniform(16) },
        }
    }
}

impl CapacityConfig {
    pub fn limits(&self, category: ConfigCategory) -> &CapacityLimits {
        match category {
            ConfigCategory::Default => &self.default,
            ConfigCategory::Large => &self.large,
            ConfigCategory::Max => &self.max,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CapacityLimits {
    pub total: usize,
    pub header: usize,
    pub account: usize,
    pub storage: usize,
    pub tx: usize,
    pub receipt: usize,
    pub solidity_mapping: usize,
}

impl Default for CapacityLimits {
    fn default() -> Self {
        Self::uniform(128)
    }
}

impl CapacityLimits {
    pub fn uniform(limit: usize) -> Self {
        Self {
            total: limit,
            header: limit,
            account: limit,
            storage: limit,
            tx: limit,
            receipt: limit,
            solidity_mapping: limit,
        }
    }

    pub fn for_type(&self, subquery_type: SubqueryType) -> usize {
        match subquery_type {
            SubqueryType::Header => self.header,
            SubqueryType::Account => self.account,
            SubqueryType::Storage => self.storage,
            SubqueryType::Transaction => self.tx,
            SubqueryType::Receipt => self.receipt,
            SubqueryType::SolidityNestedMapping => self.solidity_mapping,
        }
    }
}

/// Inclusive upper bounds of a size measure for each [SizeCategory].
/// Anything above `max` cannot be proven at all.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBounds {
    pub default: usize,
    pub large: usize,
    pub max: usize,
}

impl CategoryBounds {
    pub const fn new(default: usize, large: usize, max: usize) -> Self {
        Self { default, large, max }
    }

    /// Returns `None` when `size` is above the `max` ceiling.
    pub fn classify(&self, size: usize) -> Option<SizeCategory> {
        if size <= self.default {
            Some(SizeCategory::Default)
        } else if size <= self.large {
            Some(SizeCategory::Large)
        } else if size <= self.max {
            Some(SizeCategory::Max)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TxSizeThresholds {
    /// Bytes of the canonical (EIP-2718 typed) transaction encoding.
    pub tx_len: CategoryBounds,
    /// Bytes of the RLP encoded access list, for transaction types that carry one.
    pub access_list_len: CategoryBounds,
}

impl Default for TxSizeThresholds {
    fn default() -> Self {
        Self {
            tx_len: CategoryBounds::new(8_192, 32_768, 131_072),
            access_list_len: CategoryBounds::new(4_096, 16_384, 65_536),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiptSizeThresholds {
    /// Bytes of the largest `data` field over all logs of the receipt.
    pub max_log_data_len: CategoryBounds,
    pub num_logs: CategoryBounds,
}

impl Default for ReceiptSizeThresholds {
    fn default() -> Self {
        Self {
            max_log_data_len: CategoryBounds::new(1_024, 4_096, 16_384),
            num_logs: CategoryBounds::new(20, 80, 400),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeeConfig {
    /// Gas charged for verifying the query proof onchain.
    pub proof_verification_gas: u64,
    /// Flat protocol fee, in wei.
    pub axiom_query_fee: U256,
    pub default_max_fee_per_gas: U256,
    pub default_callback_gas_limit: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            proof_verification_gas: 500_000,
            axiom_query_fee: U256::from(3_000_000u64) * U256::from(GWEI),
            default_max_fee_per_gas: U256::from(25u64) * U256::from(GWEI),
            default_callback_gas_limit: 100_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: AxiomV2QueryConfig = serde_json::from_str(
            r#"{
                "sourceChainId": 5,
                "capacity": { "max": { "total": 8, "header": 8, "account": 8, "storage": 8, "tx": 2, "receipt": 2, "solidityMapping": 8 } },
                "receiptSize": { "numLogs": { "default": 10, "large": 40, "max": 100 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.source_chain_id, 5);
        assert_eq!(config.capacity.max.tx, 2);
        assert_eq!(config.capacity.default, CapacityLimits::uniform(128));
        assert_eq!(config.receipt_size.num_logs, CategoryBounds::new(10, 40, 100));
        assert_eq!(config.receipt_size.max_log_data_len, CategoryBounds::new(1_024, 4_096, 16_384));
        assert_eq!(config.fee, FeeConfig::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_classify_bounds() {
        let bounds = CategoryBounds::new(10, 20, 30);
        assert_eq!(bounds.classify(0), Some(SizeCategory::Default));
        assert_eq!(bounds.classify(10), Some(SizeCategory::Default));
        assert_eq!(bounds.classify(11), Some(SizeCategory::Large));
        assert_eq!(bounds.classify(30), Some(SizeCategory::Max));
        assert_eq!(bounds.classify(31), None);
    }
}
