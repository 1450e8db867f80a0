//! Field indices outside of the named struct fields of each subquery type.
//!
//! Each subquery type has a flat `field_idx` namespace: small indices name the fields of the
//! underlying RLP list, a handful of isolated indices name derived values, and indices at or
//! above an `_OFFSET` constant address a parameterized value (a 32 byte chunk, a log, a topic).

/// Number of 32 byte chunks in a 256 byte logs bloom.
pub const LOGS_BLOOM_NUM_CHUNKS: usize = 8;

// ===== Header =====
/// Number of named block header fields (through `parentBeaconBlockRoot`).
pub const NUM_HEADER_FIELDS: usize = 20;
pub const HEADER_HASH_FIELD_IDX: usize = 50;
pub const HEADER_HEADER_SIZE_FIELD_IDX: usize = 51;
pub const HEADER_EXTRA_DATA_LEN_FIELD_IDX: usize = 52;
pub const HEADER_LOGS_BLOOM_FIELD_IDX_OFFSET: usize = 70;

// ===== Account =====
pub const NUM_ACCOUNT_FIELDS: usize = 4;

// ===== Transaction =====
pub const NUM_TX_FIELDS: usize = 12;
pub const TX_TX_TYPE_FIELD_IDX: usize = 51;
pub const TX_BLOCK_NUMBER_FIELD_IDX: usize = 52;
pub const TX_TX_INDEX_FIELD_IDX: usize = 53;
pub const TX_FUNCTION_SELECTOR_FIELD_IDX: usize = 54;
pub const TX_CALLDATA_HASH_FIELD_IDX: usize = 55;
pub const TX_DATA_LENGTH_FIELD_IDX: usize = 56;
pub const TX_CALLDATA_IDX_OFFSET: usize = 100;
pub const TX_CONTRACT_DATA_IDX_OFFSET: usize = 100000;
/// Value returned for `TX_FUNCTION_SELECTOR_FIELD_IDX` when the transaction deploys a contract.
pub const TX_CONTRACT_DEPLOY_SELECTOR_VALUE: usize = 60;
/// Value returned for `TX_FUNCTION_SELECTOR_FIELD_IDX` when the transaction has no calldata.
pub const TX_NO_CALLDATA_SELECTOR_VALUE: usize = 61;

// ===== Receipt =====
pub const NUM_RECEIPT_FIELDS: usize = 5;
pub const RECEIPT_TX_TYPE_FIELD_IDX: usize = 51;
pub const RECEIPT_BLOCK_NUMBER_FIELD_IDX: usize = 52;
pub const RECEIPT_TX_INDEX_FIELD_IDX: usize = 53;
pub const RECEIPT_LOGS_BLOOM_IDX_OFFSET: usize = 70;
pub const RECEIPT_LOG_IDX_OFFSET: usize = 100;

// ===== Receipt log: `topic_or_data_or_address_idx` =====
pub const RECEIPT_MAX_NUM_TOPICS: usize = 4;
pub const RECEIPT_TOPIC_IDX_OFFSET: usize = 0;
pub const RECEIPT_ADDRESS_IDX: usize = 50;
pub const RECEIPT_DATA_IDX_OFFSET: usize = 100;
