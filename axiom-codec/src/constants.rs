/// Number of bytes used to encode the user proof length in `AxiomV2ComputeQuery`.
pub const USER_PROOF_LEN_BYTES: usize = 4;
/// Number of bytes used to encode `result_len`.
pub const USER_RESULT_LEN_BYTES: usize = 2;
/// Compute queries with `k >= USER_MAX_K` are rejected by the verifier.
pub const USER_MAX_K: u8 = 28;

/// Number of subquery types the codec knows about.
pub const NUM_SUBQUERY_TYPES: usize = 6;
/// Maximum nesting depth of a Solidity nested mapping subquery.
pub const MAX_SOLIDITY_MAPPING_KEYS: usize = 4;

/// Byte length of `source_chain_id` in an encoded data query.
pub const SOURCE_CHAIN_ID_BYTES: usize = 8;
/// Byte length of the subquery count in an encoded data query.
pub const NUM_SUBQUERIES_BYTES: usize = 2;
/// Byte length of the subquery type tag.
pub const SUBQUERY_TYPE_BYTES: usize = 2;

// Encoded subquery data lengths, without the type tag.
pub const ENCODED_HEADER_SUBQUERY_LEN: usize = 4 + 4;
pub const ENCODED_ACCOUNT_SUBQUERY_LEN: usize = 4 + 20 + 4;
pub const ENCODED_STORAGE_SUBQUERY_LEN: usize = 4 + 20 + 32;
pub const ENCODED_TX_SUBQUERY_LEN: usize = 4 + 2 + 4;
pub const ENCODED_RECEIPT_SUBQUERY_LEN: usize = 4 + 2 + 4 + 4 + 32;
/// Length without the keys, which are `mapping_depth * 32` bytes.
pub const ENCODED_SOLIDITY_NESTED_MAPPING_SUBQUERY_PREFIX_LEN: usize = 4 + 20 + 32 + 1;
