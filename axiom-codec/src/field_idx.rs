use std::fmt;

use thiserror::Error;

use crate::{
    constants::MAX_SOLIDITY_MAPPING_KEYS,
    special_values::*,
    types::native::{AnySubquery, ReceiptSubquery, SolidityNestedMappingSubquery, SubqueryType},
};

/// One disjoint piece of a field index namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldIdxPartition {
    /// Named struct fields `0..len`.
    Named { len: u32 },
    /// A single derived value.
    Special(u32),
    /// Parameterized values `offset..offset + len`. `len: None` runs to `u32::MAX` inclusive.
    Offset { name: &'static str, offset: u32, len: Option<u32> },
}

impl FieldIdxPartition {
    pub fn contains(&self, idx: u32) -> bool {
        match *self {
            Self::Named { len } => idx < len,
            Self::Special(special) => idx == special,
            Self::Offset { offset, len, .. } => {
                idx >= offset && len.map_or(true, |len| idx - offset < len)
            }
        }
    }
}

impl fmt::Display for FieldIdxPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Named { len } => write!(f, "0..{len}"),
            Self::Special(idx) => write!(f, "{idx}"),
            Self::Offset { name, offset, len: Some(len) } => {
                write!(f, "{}..{} ({name})", offset, offset as u64 + len as u64)
            }
            Self::Offset { name, offset, len: None } => write!(f, "{offset}.. ({name})"),
        }
    }
}

/// What a legal field index refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldIdxKind {
    Named(u32),
    Special(u32),
    /// `index` is relative to the partition offset.
    Offset { name: &'static str, index: u32 },
}

/// The field index namespace of one subquery index.
#[derive(Clone, Copy, Debug)]
pub struct FieldIdxSpace {
    pub subquery_type: SubqueryType,
    pub index_name: &'static str,
    pub partitions: &'static [FieldIdxPartition],
}

impl FieldIdxSpace {
    pub fn partition_of(&self, idx: u32) -> Option<FieldIdxPartition> {
        self.partitions.iter().copied().find(|p| p.contains(idx))
    }

    pub fn check(&self, idx: u32) -> Result<FieldIdxKind, FieldIdxError> {
        let partition = self.partition_of(idx).ok_or_else(|| FieldIdxError::OutOfRange {
            subquery_type: self.subquery_type,
            index_name: self.index_name,
            field_idx: idx,
            valid: self.to_string(),
        })?;
        Ok(match partition {
            FieldIdxPartition::Named { .. } => FieldIdxKind::Named(idx),
            FieldIdxPartition::Special(_) => FieldIdxKind::Special(idx),
            FieldIdxPartition::Offset { name, offset, .. } => {
                FieldIdxKind::Offset { name, index: idx - offset }
            }
        })
    }
}

impl fmt::Display for FieldIdxSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, partition) in self.partitions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{partition}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FieldIdxError {
    #[error("{subquery_type} subquery {index_name} {field_idx} is out of range; valid indices: {valid}")]
    OutOfRange {
        subquery_type: SubqueryType,
        index_name: &'static str,
        field_idx: u32,
        valid: String,
    },
    #[error("topicOrDataOrAddressIdx must be 0 when fieldOrLogIdx {field_or_log_idx} does not select a log, got {topic_or_data_or_address_idx}")]
    UnusedLogIdx { field_or_log_idx: u32, topic_or_data_or_address_idx: u32 },
    #[error("mapping depth {depth} must be in 1..={max}", max = MAX_SOLIDITY_MAPPING_KEYS)]
    InvalidMappingDepth { depth: usize },
    #[error("mapping depth {depth} does not match the number of keys {num_keys}")]
    MappingKeysMismatch { depth: usize, num_keys: usize },
}

const LOGS_BLOOM_CHUNKS: Option<u32> = Some(LOGS_BLOOM_NUM_CHUNKS as u32);

pub const HEADER_FIELD_IDX_SPACE: FieldIdxSpace = FieldIdxSpace {
    subquery_type: SubqueryType::Header,
    index_name: "fieldIdx",
    partitions: &[
        FieldIdxPartition::Named { len: NUM_HEADER_FIELDS as u32 },
        FieldIdxPartition::Special(HEADER_HASH_FIELD_IDX as u32),
        FieldIdxPartition::Special(HEADER_HEADER_SIZE_FIELD_IDX as u32),
        FieldIdxPartition::Special(HEADER_EXTRA_DATA_LEN_FIELD_IDX as u32),
        FieldIdxPartition::Offset {
            name: "logsBloom",
            offset: HEADER_LOGS_BLOOM_FIELD_IDX_OFFSET as u32,
            len: LOGS_BLOOM_CHUNKS,
        },
    ],
};

pub const ACCOUNT_FIELD_IDX_SPACE: FieldIdxSpace = FieldIdxSpace {
    subquery_type: SubqueryType::Account,
    index_name: "fieldIdx",
    partitions: &[FieldIdxPartition::Named { len: NUM_ACCOUNT_FIELDS as u32 }],
};

pub const TX_FIELD_IDX_SPACE: FieldIdxSpace = FieldIdxSpace {
    subquery_type: SubqueryType::Transaction,
    index_name: "fieldOrCalldataIdx",
    partitions: &[
        FieldIdxPartition::Named { len: NUM_TX_FIELDS as u32 },
        FieldIdxPartition::Special(TX_TX_TYPE_FIELD_IDX as u32),
        FieldIdxPartition::Special(TX_BLOCK_NUMBER_FIELD_IDX as u32),
        FieldIdxPartition::Special(TX_TX_INDEX_FIELD_IDX as u32),
        FieldIdxPartition::Special(TX_FUNCTION_SELECTOR_FIELD_IDX as u32),
        FieldIdxPartition::Special(TX_CALLDATA_HASH_FIELD_IDX as u32),
        FieldIdxPartition::Special(TX_DATA_LENGTH_FIELD_IDX as u32),
        FieldIdxPartition::Offset {
            name: "calldata",
            offset: TX_CALLDATA_IDX_OFFSET as u32,
            len: Some((TX_CONTRACT_DATA_IDX_OFFSET - TX_CALLDATA_IDX_OFFSET) as u32),
        },
        FieldIdxPartition::Offset {
            name: "contractData",
            offset: TX_CONTRACT_DATA_IDX_OFFSET as u32,
            len: None,
        },
    ],
};

pub const RECEIPT_FIELD_IDX_SPACE: FieldIdxSpace = FieldIdxSpace {
    subquery_type: SubqueryType::Receipt,
    index_name: "fieldOrLogIdx",
    partitions: &[
        FieldIdxPartition::Named { len: NUM_RECEIPT_FIELDS as u32 },
        FieldIdxPartition::Special(RECEIPT_TX_TYPE_FIELD_IDX as u32),
        FieldIdxPartition::Special(RECEIPT_BLOCK_NUMBER_FIELD_IDX as u32),
        FieldIdxPartition::Special(RECEIPT_TX_INDEX_FIELD_IDX as u32),
        FieldIdxPartition::Offset {
            name: "logsBloom",
            offset: RECEIPT_LOGS_BLOOM_IDX_OFFSET as u32,
            len: LOGS_BLOOM_CHUNKS,
        },
        FieldIdxPartition::Offset { name: "log", offset: RECEIPT_LOG_IDX_OFFSET as u32, len: None },
    ],
};

/// Namespace of `topic_or_data_or_address_idx`, only meaningful when a log is selected.
pub const RECEIPT_LOG_FIELD_IDX_SPACE: FieldIdxSpace = FieldIdxSpace {
    subquery_type: SubqueryType::Receipt,
    index_name: "topicOrDataOrAddressIdx",
    partitions: &[
        FieldIdxPartition::Offset {
            name: "topic",
            offset: RECEIPT_TOPIC_IDX_OFFSET as u32,
            len: Some(RECEIPT_MAX_NUM_TOPICS as u32),
        },
        FieldIdxPartition::Special(RECEIPT_ADDRESS_IDX as u32),
        FieldIdxPartition::Offset {
            name: "data",
            offset: RECEIPT_DATA_IDX_OFFSET as u32,
            len: None,
        },
    ],
};

pub fn check_header_field_idx(field_idx: u32) -> Result<FieldIdxKind, FieldIdxError> {
    HEADER_FIELD_IDX_SPACE.check(field_idx)
}

pub fn check_account_field_idx(field_idx: u32) -> Result<FieldIdxKind, FieldIdxError> {
    ACCOUNT_FIELD_IDX_SPACE.check(field_idx)
}

pub fn check_tx_field_idx(field_or_calldata_idx: u32) -> Result<FieldIdxKind, FieldIdxError> {
    TX_FIELD_IDX_SPACE.check(field_or_calldata_idx)
}

/// Checks both receipt indices. The second index must be 0 unless the first selects a log.
pub fn check_receipt_idx_pair(
    field_or_log_idx: u32,
    topic_or_data_or_address_idx: u32,
) -> Result<(FieldIdxKind, Option<FieldIdxKind>), FieldIdxError> {
    let kind = RECEIPT_FIELD_IDX_SPACE.check(field_or_log_idx)?;
    match kind {
        FieldIdxKind::Offset { name: "log", .. } => {
            let log_kind = RECEIPT_LOG_FIELD_IDX_SPACE.check(topic_or_data_or_address_idx)?;
            Ok((kind, Some(log_kind)))
        }
        _ if topic_or_data_or_address_idx != 0 => {
            Err(FieldIdxError::UnusedLogIdx { field_or_log_idx, topic_or_data_or_address_idx })
        }
        _ => Ok((kind, None)),
    }
}

pub fn check_mapping_depth(depth: usize, num_keys: usize) -> Result<(), FieldIdxError> {
    if depth == 0 || depth > MAX_SOLIDITY_MAPPING_KEYS {
        return Err(FieldIdxError::InvalidMappingDepth { depth });
    }
    if depth != num_keys {
        return Err(FieldIdxError::MappingKeysMismatch { depth, num_keys });
    }
    Ok(())
}

/// Range checks every index carried by `subquery`.
pub fn check_subquery(subquery: &AnySubquery) -> Result<(), FieldIdxError> {
    match subquery {
        AnySubquery::Header(subquery) => check_header_field_idx(subquery.field_idx).map(|_| ()),
        AnySubquery::Account(subquery) => check_account_field_idx(subquery.field_idx).map(|_| ()),
        AnySubquery::Storage(_) => Ok(()),
        AnySubquery::Transaction(subquery) => {
            check_tx_field_idx(subquery.field_or_calldata_idx).map(|_| ())
        }
        AnySubquery::Receipt(ReceiptSubquery {
            field_or_log_idx, topic_or_data_or_address_idx, ..
        }) => check_receipt_idx_pair(*field_or_log_idx, *topic_or_data_or_address_idx).map(|_| ()),
        AnySubquery::SolidityNestedMapping(SolidityNestedMappingSubquery {
            mapping_depth,
            keys,
            ..
        }) => check_mapping_depth(*mapping_depth as usize, keys.len()),
    }
}
