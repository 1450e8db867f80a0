//! Admission control: escalating capacity categories as records prove larger than assumed.
//!
//! The prover is deployed in a few configurations. Larger transactions and receipts need a
//! configuration with bigger per-record buffers, which in turn fits fewer subqueries. Every
//! admitted record can raise the [ConfigCategory] of the whole batch, and the capacity check is
//! always made against the current category, so one large record can shrink the budget for
//! records that were admitted before it.
use std::fmt;

use axiom_codec::{constants::NUM_SUBQUERY_TYPES, types::native::SubqueryType};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AxiomV2QueryConfig, CapacityConfig, ReceiptSizeThresholds, TxSizeThresholds},
    error::AdmissionError,
    resolver::{RawReceipt, RawTransaction},
};


/// Size class of a single transaction or receipt.
#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum SizeCategory {
    #[default]
    Default,
    Large,
    Max,
}

/// Prover configuration needed by a whole batch. Never decreases.
#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum ConfigCategory {
    #[default]
    Default,
    Large,
    Max,
}

impl From<SizeCategory> for ConfigCategory {
    fn from(value: SizeCategory) -> Self {
        match value {
            SizeCategory::Default => ConfigCategory::Default,
            SizeCategory::Large => ConfigCategory::Large,
            SizeCategory::Max => ConfigCategory::Max,
        }
    }
}

/// Which limit a [AdmissionError::CapacityExceeded] refers to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum CapacityScope {
    Total,
    Type(SubqueryType),
}

impl fmt::Display for CapacityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityScope::Total => f.write_str("total"),
            CapacityScope::Type(subquery_type) => write!(f, "{subquery_type}"),
        }
    }
}

/// What admission control needs to know about one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordShape {
    /// Records whose proving cost does not depend on chain data.
    Fixed(SubqueryType),
    Tx { tx_type: u8, tx_len: usize, access_list_len: usize },
    Receipt { max_log_data_len: usize, num_logs: usize },
}

impl RecordShape {
    pub fn subquery_type(&self) -> SubqueryType {
        match self {
            RecordShape::Fixed(subquery_type) => *subquery_type,
            RecordShape::Tx { .. } => SubqueryType::Transaction,
            RecordShape::Receipt { .. } => SubqueryType::Receipt,
        }
    }
}

impl From<&RawTransaction> for RecordShape {
    fn from(tx: &RawTransaction) -> Self {
        RecordShape::Tx {
            tx_type: tx.tx_type,
            tx_len: tx.rlp.len(),
            access_list_len: tx.access_list_len,
        }
    }
}

impl From<&RawReceipt> for RecordShape {
    fn from(receipt: &RawReceipt) -> Self {
        RecordShape::Receipt {
            max_log_data_len: receipt.max_log_data_len(),
            num_logs: receipt.logs.len(),
        }
    }
}

pub fn classify_tx(
    thresholds: &TxSizeThresholds,
    tx_type: u8,
    tx_len: usize,
    access_list_len: usize,
) -> Result<SizeCategory, AdmissionError> {
    let too_large = |what, size, max| AdmissionError::RecordTooLarge {
        subquery_type: SubqueryType::Transaction,
        what,
        size,
        max,
    };
    let len_category = thresholds
        .tx_len
        .classify(tx_len)
        .ok_or_else(|| too_large("length", tx_len, thresholds.tx_len.max))?;
    // legacy transactions have no access list
    if tx_type == 0 {
        return Ok(len_category);
    }
    let access_list_category =
        thresholds.access_list_len.classify(access_list_len).ok_or_else(|| {
            too_large("access list length", access_list_len, thresholds.access_list_len.max)
        })?;
    Ok(len_category.max(access_list_category))
}

/// The worse of the log data length and log count classifications.
pub fn classify_receipt(
    thresholds: &ReceiptSizeThresholds,
    max_log_data_len: usize,
    num_logs: usize,
) -> Result<SizeCategory, AdmissionError> {
    let too_large = |what, size, max| AdmissionError::RecordTooLarge {
        subquery_type: SubqueryType::Receipt,
        what,
        size,
        max,
    };
    let data_category =
        thresholds.max_log_data_len.classify(max_log_data_len).ok_or_else(|| {
            too_large("log data length", max_log_data_len, thresholds.max_log_data_len.max)
        })?;
    let logs_category = thresholds
        .num_logs
        .classify(num_logs)
        .ok_or_else(|| too_large("number of logs", num_logs, thresholds.num_logs.max))?;
    Ok(data_category.max(logs_category))
}

/// Sequential owner of the capacity state of one batch.
#[derive(Clone, Debug)]
pub struct AdmissionController {
    capacity: CapacityConfig,
    tx_size: TxSizeThresholds,
    receipt_size: ReceiptSizeThresholds,
    category: ConfigCategory,
    tx_category: SizeCategory,
    receipt_category: SizeCategory,
    counts: [usize; NUM_SUBQUERY_TYPES],
}

impl AdmissionController {
    pub fn new(config: &AxiomV2QueryConfig) -> Self {
        Self {
            capacity: config.capacity.clone(),
            tx_size: config.tx_size,
            receipt_size: config.receipt_size,
            category: ConfigCategory::Default,
            tx_category: SizeCategory::Default,
            receipt_category: SizeCategory::Default,
            counts: Default::default(),
        }
    }

    pub fn category(&self) -> ConfigCategory {
        self.category
    }

    pub fn tx_category(&self) -> SizeCategory {
        self.tx_category
    }

    pub fn receipt_category(&self) -> SizeCategory {
        self.receipt_category
    }

    pub fn count(&self, subquery_type: SubqueryType) -> usize {
        self.counts[subquery_type.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn classify(&self, shape: &RecordShape) -> Result<SizeCategory, AdmissionError> {
        match *shape {
            RecordShape::Fixed(_) => Ok(SizeCategory::Default),
            RecordShape::Tx { tx_type, tx_len, access_list_len } => {
                classify_tx(&self.tx_size, tx_type, tx_len, access_list_len)
            }
            RecordShape::Receipt { max_log_data_len, num_logs } => {
                classify_receipt(&self.receipt_size, max_log_data_len, num_logs)
            }
        }
    }

    /// Classifies and counts one record, then checks every running count against the limits of
    /// the (possibly escalated) category.
    ///
    /// A record that is too large for any category is rejected and not counted. A record that
    /// pushes a count over its limit stays counted, so [Self::check_capacity] keeps reporting the
    /// true state of the batch.
    pub fn admit(&mut self, shape: &RecordShape) -> Result<SizeCategory, AdmissionError> {
        let size_category = self.classify(shape)?;
        let subquery_type = shape.subquery_type();
        match subquery_type {
            SubqueryType::Transaction => self.tx_category = self.tx_category.max(size_category),
            SubqueryType::Receipt => {
                self.receipt_category = self.receipt_category.max(size_category)
            }
            _ => {}
        }
        let previous = self.category;
        self.category = self.category.max(size_category.into());
        if self.category != previous {
            log::debug!(
                "{subquery_type} record escalated config category {previous:?} -> {:?}",
                self.category
            );
        }
        self.counts[subquery_type.index()] += 1;
        self.check_capacity()?;
        Ok(size_category)
    }

    /// Re-checks the final state of the batch once every record has been admitted.
    pub fn finish(&self) -> Result<ConfigCategory, AdmissionError> {
        self.check_capacity()?;
        Ok(self.category)
    }

    pub fn check_capacity(&self) -> Result<(), AdmissionError> {
        let limits = self.capacity.limits(self.category);
        for subquery_type in SubqueryType::ALL {
            let count = self.count(subquery_type);
            let limit = limits.for_type(subquery_type);
            if count > limit {
                return Err(AdmissionError::CapacityExceeded {
                    scope: CapacityScope::Type(subquery_type),
                    count,
                    limit,
                    category: self.category,
                });
            }
        }
        let total = self.total();
        if total > limits.total {
            return Err(AdmissionError::CapacityExceeded {
                scope: CapacityScope::Total,
                count: total,
                limit: limits.total,
                category: self.category,
            });
        }
        Ok(())
    }
}
