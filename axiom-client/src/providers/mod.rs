//! [ChainDataResolver] over an `ethers` JSON-RPC provider.
use std::sync::Arc;

use async_trait::async_trait;
use axiom_codec::{
    types::native::{AnySubquery, TxPosition},
    utils::native::{left_pad_to_h256, u256_to_h256},
};
use ethers_core::types::{Block, Transaction, TransactionReceipt, H256, U64};
use ethers_providers::{Http, Middleware, Provider, RetryClient};
use itertools::Itertools;
use rlp::Rlp;

use crate::{
    error::ResolverError,
    resolver::{ChainDataResolver, RawLog, RawReceipt, RawTransaction},
};

pub mod block;
pub mod receipt;
pub mod storage;
pub mod transaction;

use self::{
    block::{get_block_rlp, header_field_value},
    receipt::{get_receipt_rlp, receipt_field_value},
    storage::{account_field_value, nested_mapping_slot},
    transaction::{access_list_rlp_len, get_transaction_rlp, tx_field_value},
};

/// Resolves chain data with standard JSON-RPC calls. Any archive node works.
#[derive(Debug)]
pub struct ProviderResolver<M> {
    provider: Arc<M>,
}

impl<M> Clone for ProviderResolver<M> {
    fn clone(&self) -> Self {
        Self { provider: Arc::clone(&self.provider) }
    }
}

impl ProviderResolver<Provider<RetryClient<Http>>> {
    /// HTTP provider that retries rate limited requests.
    pub fn from_url(url: &str) -> anyhow::Result<Self> {
        let provider = Provider::new_client(url, 10, 500)?;
        Ok(Self::new(provider))
    }
}

impl<M: Middleware + 'static> ProviderResolver<M> {
    pub fn new(provider: M) -> Self {
        Self { provider: Arc::new(provider) }
    }

    pub fn provider(&self) -> &M {
        &self.provider
    }

    async fn block(&self, block_number: u32) -> Result<Block<H256>, ResolverError> {
        self.provider
            .get_block(block_number as u64)
            .await
            .map_err(ResolverError::transport)?
            .ok_or_else(|| ResolverError::NotFound(format!("block {block_number}")))
    }

    async fn transaction_at(&self, position: TxPosition) -> Result<Transaction, ResolverError> {
        let TxPosition { block_number, tx_idx } = position;
        let block = self
            .provider
            .get_block_with_txs(block_number as u64)
            .await
            .map_err(ResolverError::transport)?
            .ok_or_else(|| ResolverError::NotFound(format!("block {block_number}")))?;
        block.transactions.into_iter().nth(tx_idx as usize).ok_or_else(|| {
            ResolverError::NotFound(format!("transaction {tx_idx} of block {block_number}"))
        })
    }

    async fn receipt_at(&self, position: TxPosition) -> Result<TransactionReceipt, ResolverError> {
        let TxPosition { block_number, tx_idx } = position;
        let block = self.block(block_number).await?;
        let tx_hash = block.transactions.get(tx_idx as usize).copied().ok_or_else(|| {
            ResolverError::NotFound(format!("transaction {tx_idx} of block {block_number}"))
        })?;
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(ResolverError::transport)?
            .ok_or_else(|| ResolverError::NotFound(format!("receipt of transaction {tx_hash:?}")))
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainDataResolver for ProviderResolver<M> {
    async fn resolve_tx_position(&self, tx_hash: H256) -> Result<TxPosition, ResolverError> {
        let tx = self
            .provider
            .get_transaction(tx_hash)
            .await
            .map_err(ResolverError::transport)?
            .ok_or_else(|| ResolverError::NotFound(format!("transaction {tx_hash:?}")))?;
        let (Some(block_number), Some(tx_idx)) = (tx.block_number, tx.transaction_index) else {
            return Err(ResolverError::NotFound(format!("mined transaction {tx_hash:?}")));
        };
        Ok(TxPosition {
            block_number: to_u32(block_number, "block number")?,
            tx_idx: to_u32(tx_idx, "transaction index")?
                .try_into()
                .map_err(|_| ResolverError::Malformed(format!("transaction index {tx_idx}")))?,
        })
    }

    async fn fetch_field_value(&self, subquery: &AnySubquery) -> Result<H256, ResolverError> {
        match subquery {
            AnySubquery::Header(subquery) => {
                let block = self.block(subquery.block_number).await?;
                header_field_value(&get_block_rlp(&block)?, subquery.field_idx)
            }
            AnySubquery::Account(subquery) => {
                let proof = self
                    .provider
                    .get_proof(subquery.addr, vec![], Some((subquery.block_number as u64).into()))
                    .await
                    .map_err(ResolverError::transport)?;
                account_field_value(&proof, subquery.field_idx)
            }
            AnySubquery::Storage(subquery) => self
                .provider
                .get_storage_at(
                    subquery.addr,
                    u256_to_h256(&subquery.slot),
                    Some((subquery.block_number as u64).into()),
                )
                .await
                .map_err(ResolverError::transport),
            AnySubquery::Transaction(subquery) => {
                let position =
                    TxPosition { block_number: subquery.block_number, tx_idx: subquery.tx_idx };
                let tx = self.transaction_at(position).await?;
                tx_field_value(&tx, subquery.field_or_calldata_idx)
            }
            AnySubquery::Receipt(subquery) => {
                let position =
                    TxPosition { block_number: subquery.block_number, tx_idx: subquery.tx_idx };
                let receipt = self.receipt_at(position).await?;
                receipt_field_value(&receipt, subquery)
            }
            AnySubquery::SolidityNestedMapping(subquery) => {
                let slot = nested_mapping_slot(subquery.mapping_slot, &subquery.keys);
                self.provider
                    .get_storage_at(subquery.addr, slot, Some((subquery.block_number as u64).into()))
                    .await
                    .map_err(ResolverError::transport)
            }
        }
    }

    async fn fetch_raw_transaction(
        &self,
        position: TxPosition,
    ) -> Result<RawTransaction, ResolverError> {
        let tx = self.transaction_at(position).await?;
        Ok(RawTransaction {
            tx_type: tx.transaction_type.map_or(0, |tx_type| tx_type.as_u64() as u8),
            rlp: get_transaction_rlp(&tx)?,
            access_list_len: access_list_rlp_len(&tx),
        })
    }

    async fn fetch_raw_receipt(&self, position: TxPosition) -> Result<RawReceipt, ResolverError> {
        let receipt = self.receipt_at(position).await?;
        let logs = receipt
            .logs
            .iter()
            .map(|log| RawLog { num_topics: log.topics.len(), data_len: log.data.len() })
            .collect_vec();
        Ok(RawReceipt {
            tx_type: receipt.transaction_type.map_or(0, |tx_type| tx_type.as_u64() as u8),
            rlp: get_receipt_rlp(&receipt)?.into(),
            logs,
        })
    }
}

fn to_u32(value: U64, what: &str) -> Result<u32, ResolverError> {
    value.try_into().map_err(|_| ResolverError::Malformed(format!("{what} {value}")))
}

/// The `idx`-th item of an RLP list, or `NotFound` when the list is shorter.
pub(crate) fn list_item<'a>(
    list: &Rlp<'a>,
    idx: usize,
    what: &str,
) -> Result<Rlp<'a>, ResolverError> {
    let malformed = |err: rlp::DecoderError| ResolverError::Malformed(format!("{what}: {err}"));
    if idx >= list.item_count().map_err(malformed)? {
        return Err(ResolverError::NotFound(format!("{what} field {idx}")));
    }
    list.at(idx).map_err(malformed)
}

/// A value item as a `bytes32`: left padded when it fits, otherwise its first 32 bytes.
pub(crate) fn rlp_item_word(item: &Rlp) -> Result<H256, ResolverError> {
    let bytes = item.data().map_err(|err| ResolverError::Malformed(err.to_string()))?;
    Ok(left_pad_to_h256(bytes).unwrap_or_else(|| H256::from_slice(&bytes[..32])))
}

pub(crate) fn uint_word(value: u64) -> H256 {
    H256::from_low_u64_be(value)
}

/// The `index`-th 32 byte chunk of `bytes`, right padded with zeros.
pub(crate) fn word_chunk(bytes: &[u8], index: usize) -> Option<H256> {
    let start = index.checked_mul(32)?;
    if start >= bytes.len() {
        return None;
    }
    let chunk = &bytes[start..bytes.len().min(start + 32)];
    let mut word = [0u8; 32];
    word[..chunk.len()].copy_from_slice(chunk);
    Some(H256(word))
}
