use axiom_codec::{field_idx::FieldIdxError, types::native::SubqueryType};
use thiserror::Error;

use crate::admission::{CapacityScope, ConfigCategory};

/// Local, synchronous validation failures. The input must be fixed by the caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubqueryError {
    #[error(transparent)]
    FieldIndexOutOfRange(#[from] FieldIdxError),
    #[error("invalid address {0:?}: expected 0x followed by 40 hex characters")]
    InvalidAddressFormat(String),
    #[error("invalid 32 byte word {0:?}: expected at most 32 bytes of hex")]
    InvalidSlotEncoding(String),
    #[error("block number {0} does not fit in uint32")]
    BlockNumberOutOfRange(u64),
    #[error("transaction index {0} does not fit in uint16")]
    TxIdxOutOfRange(u64),
    #[error("{0} subquery references a transaction by hash; resolve it to a position first")]
    UnresolvedTxRef(SubqueryType),
}

/// Failures reported by a [crate::resolver::ChainDataResolver].
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} is not supported by this resolver")]
    Unsupported(String),
    /// Chain data that does not have the shape the subquery asks for.
    #[error("malformed chain data: {0}")]
    Malformed(String),
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl ResolverError {
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }

    /// Resolution failures may succeed later, e.g. after a reorg settles or the node catches up.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Transport(_) | Self::Timeout(_))
    }
}

/// Structural capacity failures. Retrying requires a smaller batch.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("{count} {scope} subqueries exceed the limit of {limit} for config category {category:?}")]
    CapacityExceeded {
        scope: CapacityScope,
        count: usize,
        limit: usize,
        category: ConfigCategory,
    },
    #[error("{subquery_type} record {what} is {size}, above the hard ceiling of {max}")]
    RecordTooLarge { subquery_type: SubqueryType, what: &'static str, size: usize, max: usize },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum FeeError {
    #[error("invalid fee parameter {name}: {reason}")]
    InvalidFeeParameter { name: &'static str, reason: String },
}

/// Errors of the query assembly lifecycle.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Subquery(#[from] SubqueryError),
    #[error("subquery {index}: {source}")]
    Resolve {
        index: usize,
        #[source]
        source: ResolverError,
    },
    #[error(transparent)]
    Admission(#[from] AdmissionError),
    #[error(transparent)]
    Fee(#[from] FeeError),
    #[error("nothing to build: the data query is empty and there is no compute query")]
    NothingToBuild,
    #[error("invalid compute query: {0}")]
    InvalidComputeQuery(String),
    #[error("build cancelled")]
    Cancelled,
    #[error("chain data request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("encoding failed")]
    Encoding(#[from] std::io::Error),
}
