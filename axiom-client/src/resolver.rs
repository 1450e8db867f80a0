//! Chain data consumed while building a query.
use async_trait::async_trait;
use axiom_codec::types::native::{AnySubquery, TxPosition};
use ethers_core::types::{Bytes, H256};

use crate::error::ResolverError;

/// A transaction in its canonical encoding, as committed to by the block's transactions root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTransaction {
    pub tx_type: u8,
    /// EIP-2718 typed transaction envelope, or the plain RLP list for legacy transactions.
    pub rlp: Bytes,
    /// Byte length of the RLP encoded access list. 0 for legacy transactions.
    pub access_list_len: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawLog {
    pub num_topics: usize,
    pub data_len: usize,
}

/// A receipt in its canonical encoding, with the shape of its logs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawReceipt {
    pub tx_type: u8,
    pub rlp: Bytes,
    pub logs: Vec<RawLog>,
}

impl RawReceipt {
    pub fn max_log_data_len(&self) -> usize {
        self.logs.iter().map(|log| log.data_len).max().unwrap_or(0)
    }
}

/// Read-only, idempotent access to historical chain data.
///
/// Implementations must be safe to call concurrently; the query builder issues one request per
/// record and correlates responses by position in the batch.
#[async_trait]
pub trait ChainDataResolver: Send + Sync {
    async fn resolve_tx_position(&self, tx_hash: H256) -> Result<TxPosition, ResolverError>;

    /// The `bytes32` value the subquery evaluates to.
    async fn fetch_field_value(&self, subquery: &AnySubquery) -> Result<H256, ResolverError>;

    async fn fetch_raw_transaction(
        &self,
        position: TxPosition,
    ) -> Result<RawTransaction, ResolverError>;

    async fn fetch_raw_receipt(&self, position: TxPosition) -> Result<RawReceipt, ResolverError>;
}
