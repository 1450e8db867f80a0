use ethers_core::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

#[derive(Clone, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AxiomV2ComputeQuery {
    pub k: u8,
    pub result_len: u16,
    // Should be bytes32[]
    /// The onchain vkey
    pub vkey: Vec<H256>,
    /// This is actually the concatenation of public instances and proof transcript
    pub compute_proof: Bytes,
}

impl AxiomV2ComputeQuery {
    /// The canonical "no compute query" value: `k = 0`, empty vkey and proof.
    pub fn empty(result_len: u16) -> Self {
        Self { k: 0, result_len, vkey: vec![], compute_proof: Bytes::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.k == 0
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AxiomV2Callback {
    pub target: Address,
    pub function_selector: [u8; 4],
    /// Number of results forwarded to the callback. `None` means one per subquery.
    pub result_len: Option<u16>,
    pub extra_data: Bytes,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AxiomV2DataQuery {
    pub source_chain_id: u64,
    pub subqueries: Vec<Subquery>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct Subquery {
    /// uint16 type of subquery
    pub subquery_type: SubqueryType,
    /// Subquery data encoded, _without_ the subquery type. Length is variable and **not** resized.
    pub encoded_subquery_data: Bytes,
}

#[derive(Clone, Copy, Debug, Serialize_repr, Deserialize_repr, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum SubqueryType {
    Header = 1,
    Account = 2,
    Storage = 3,
    Transaction = 4,
    Receipt = 5,
    SolidityNestedMapping = 6,
}

impl SubqueryType {
    pub const ALL: [SubqueryType; 6] = [
        Self::Header,
        Self::Account,
        Self::Storage,
        Self::Transaction,
        Self::Receipt,
        Self::SolidityNestedMapping,
    ];

    /// Position of this type in [SubqueryType::ALL], for per-type tables.
    pub fn index(self) -> usize {
        self as usize - 1
    }
}

impl std::fmt::Display for SubqueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Header => "header",
            Self::Account => "account",
            Self::Storage => "storage",
            Self::Transaction => "transaction",
            Self::Receipt => "receipt",
            Self::SolidityNestedMapping => "solidityNestedMapping",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnySubquery {
    Header(HeaderSubquery),
    Account(AccountSubquery),
    Storage(StorageSubquery),
    Transaction(TxSubquery),
    Receipt(ReceiptSubquery),
    SolidityNestedMapping(SolidityNestedMappingSubquery),
}

impl AnySubquery {
    pub fn subquery_type(&self) -> SubqueryType {
        match self {
            AnySubquery::Header(_) => SubqueryType::Header,
            AnySubquery::Account(_) => SubqueryType::Account,
            AnySubquery::Storage(_) => SubqueryType::Storage,
            AnySubquery::Transaction(_) => SubqueryType::Transaction,
            AnySubquery::Receipt(_) => SubqueryType::Receipt,
            AnySubquery::SolidityNestedMapping(_) => SubqueryType::SolidityNestedMapping,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct HeaderSubquery {
    pub block_number: u32,
    pub field_idx: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct AccountSubquery {
    pub block_number: u32,
    pub addr: Address,
    pub field_idx: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct StorageSubquery {
    pub block_number: u32,
    pub addr: Address,
    pub slot: U256,
}

#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct TxSubquery {
    /// The block number with the requested transaction.
    pub block_number: u32,
    /// The index of the transaction in the block.
    pub tx_idx: u16,
    /// Special index to specify what subquery value to extract from the transaction.
    pub field_or_calldata_idx: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSubquery {
    /// The block number with the requested transaction.
    pub block_number: u32,
    /// The index of the transaction in the block.
    pub tx_idx: u16,
    /// Special index to specify what subquery value to extract from the transaction.
    pub field_or_log_idx: u32,
    pub topic_or_data_or_address_idx: u32,
    pub event_schema: H256,
}

#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct SolidityNestedMappingSubquery {
    pub block_number: u32,
    pub addr: Address,
    pub mapping_slot: U256,
    /// Should be equal to `keys.len()`
    pub mapping_depth: u8,
    pub keys: Vec<H256>,
}

/// Location of a transaction inside the canonical chain.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct TxPosition {
    pub block_number: u32,
    pub tx_idx: u16,
}

/// Reference to a transaction, either by hash or by position.
///
/// Transaction and receipt subqueries are encoded by position only, so a `Hash` reference must be
/// resolved against chain data first. Resolution only goes one way.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum TxRef {
    Hash(H256),
    Position(TxPosition),
}

impl TxRef {
    pub fn position(&self) -> Option<TxPosition> {
        match self {
            TxRef::Hash(_) => None,
            TxRef::Position(pos) => Some(*pos),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TxRef::Position(_))
    }

    /// Pins a hash reference to `position`. A reference that already has a position keeps it.
    pub fn resolve(self, position: TxPosition) -> Self {
        match self {
            TxRef::Hash(_) => TxRef::Position(position),
            resolved @ TxRef::Position(_) => resolved,
        }
    }
}

impl From<TxPosition> for TxRef {
    fn from(value: TxPosition) -> Self {
        TxRef::Position(value)
    }
}

impl From<H256> for TxRef {
    fn from(value: H256) -> Self {
        TxRef::Hash(value)
    }
}

// ===== Named fields =====

#[derive(Clone, Copy, Debug, Serialize_repr, Deserialize_repr, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum HeaderField {
    ParentHash = 0,
    Sha3Uncles = 1,
    Miner = 2,
    StateRoot = 3,
    TransactionsRoot = 4,
    ReceiptsRoot = 5,
    LogsBloom = 6,
    Difficulty = 7,
    Number = 8,
    GasLimit = 9,
    GasUsed = 10,
    Timestamp = 11,
    ExtraData = 12,
    MixHash = 13,
    Nonce = 14,
    BaseFeePerGas = 15,
    WithdrawalsRoot = 16,
    BlobGasUsed = 17,
    ExcessBlobGas = 18,
    ParentBeaconBlockRoot = 19,
}

#[derive(Clone, Copy, Debug, Serialize_repr, Deserialize_repr, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum AccountField {
    Nonce = 0,
    Balance = 1,
    StorageRoot = 2,
    CodeHash = 3,
}

#[derive(Clone, Copy, Debug, Serialize_repr, Deserialize_repr, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum TxField {
    ChainId = 0,
    Nonce = 1,
    MaxPriorityFeePerGas = 2,
    MaxFeePerGas = 3,
    GasLimit = 4,
    To = 5,
    Value = 6,
    Data = 7,
    GasPrice = 8,
    V = 9,
    R = 10,
    S = 11,
}

#[derive(Clone, Copy, Debug, Serialize_repr, Deserialize_repr, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ReceiptField {
    Status = 0,
    PostState = 1,
    CumulativeGas = 2,
    LogsBloom = 3,
    Logs = 4,
}

macro_rules! impl_field_idx {
    ($field:ty, [$($variant:ident),* $(,)?]) => {
        impl $field {
            pub const ALL: &'static [$field] = &[$(<$field>::$variant),*];

            pub fn idx(self) -> u32 {
                self as u32
            }
        }

        impl TryFrom<u32> for $field {
            type Error = u32;

            fn try_from(value: u32) -> Result<Self, u32> {
                Self::ALL.iter().copied().find(|f| f.idx() == value).ok_or(value)
            }
        }
    };
}

impl_field_idx!(
    HeaderField,
    [
        ParentHash,
        Sha3Uncles,
        Miner,
        StateRoot,
        TransactionsRoot,
        ReceiptsRoot,
        LogsBloom,
        Difficulty,
        Number,
        GasLimit,
        GasUsed,
        Timestamp,
        ExtraData,
        MixHash,
        Nonce,
        BaseFeePerGas,
        WithdrawalsRoot,
        BlobGasUsed,
        ExcessBlobGas,
        ParentBeaconBlockRoot,
    ]
);
impl_field_idx!(AccountField, [Nonce, Balance, StorageRoot, CodeHash]);
impl_field_idx!(
    TxField,
    [ChainId, Nonce, MaxPriorityFeePerGas, MaxFeePerGas, GasLimit, To, Value, Data, GasPrice, V, R, S]
);
impl_field_idx!(ReceiptField, [Status, PostState, CumulativeGas, LogsBloom, Logs]);
