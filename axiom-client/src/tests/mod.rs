//! In-memory chain data for tests.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use axiom_codec::types::native::{AnySubquery, TxPosition};
use ethers_core::types::{Bytes, H256};

use crate::{
    error::ResolverError,
    resolver::{ChainDataResolver, RawLog, RawReceipt, RawTransaction},
};

#[derive(Debug, Default)]
pub struct MockResolver {
    positions: HashMap<H256, TxPosition>,
    values: HashMap<AnySubquery, H256>,
    transactions: HashMap<TxPosition, RawTransaction>,
    receipts: HashMap<TxPosition, RawReceipt>,
    /// Latency of every request about a block.
    delays: HashMap<u32, Duration>,
    calls: AtomicUsize,
    /// Block numbers in the order their requests completed.
    completed: Mutex<Vec<u32>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, tx_hash: H256, position: TxPosition) -> Self {
        self.positions.insert(tx_hash, position);
        self
    }

    pub fn with_value(mut self, subquery: impl Into<AnySubquery>, value: H256) -> Self {
        self.values.insert(subquery.into(), value);
        self
    }

    pub fn with_transaction(mut self, position: TxPosition, tx: RawTransaction) -> Self {
        self.transactions.insert(position, tx);
        self
    }

    pub fn with_receipt(mut self, position: TxPosition, receipt: RawReceipt) -> Self {
        self.receipts.insert(position, receipt);
        self
    }

    pub fn with_delay(mut self, block_number: u32, delay: Duration) -> Self {
        self.delays.insert(block_number, delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> Vec<u32> {
        self.completed.lock().unwrap().clone()
    }

    async fn respond<T>(
        &self,
        block_number: u32,
        response: Option<T>,
        what: String,
    ) -> Result<T, ResolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&block_number) {
            tokio::time::sleep(*delay).await;
        }
        self.completed.lock().unwrap().push(block_number);
        response.ok_or(ResolverError::NotFound(what))
    }
}

#[async_trait]
impl ChainDataResolver for MockResolver {
    async fn resolve_tx_position(&self, tx_hash: H256) -> Result<TxPosition, ResolverError> {
        let position = self.positions.get(&tx_hash).copied();
        let block_number = position.map_or(0, |p| p.block_number);
        self.respond(block_number, position, format!("transaction {tx_hash:?}")).await
    }

    async fn fetch_field_value(&self, subquery: &AnySubquery) -> Result<H256, ResolverError> {
        let block_number = match subquery {
            AnySubquery::Header(s) => s.block_number,
            AnySubquery::Account(s) => s.block_number,
            AnySubquery::Storage(s) => s.block_number,
            AnySubquery::Transaction(s) => s.block_number,
            AnySubquery::Receipt(s) => s.block_number,
            AnySubquery::SolidityNestedMapping(s) => s.block_number,
        };
        let value = self.values.get(subquery).copied();
        self.respond(block_number, value, format!("value of {subquery:?}")).await
    }

    async fn fetch_raw_transaction(
        &self,
        position: TxPosition,
    ) -> Result<RawTransaction, ResolverError> {
        let tx = self.transactions.get(&position).cloned();
        self.respond(position.block_number, tx, format!("transaction at {position:?}")).await
    }

    async fn fetch_raw_receipt(&self, position: TxPosition) -> Result<RawReceipt, ResolverError> {
        let receipt = self.receipts.get(&position).cloned();
        self.respond(position.block_number, receipt, format!("receipt at {position:?}")).await
    }
}

pub fn position(block_number: u32, tx_idx: u16) -> TxPosition {
    TxPosition { block_number, tx_idx }
}

/// A type 2 transaction of `len` encoded bytes without an access list.
pub fn raw_tx(len: usize) -> RawTransaction {
    RawTransaction { tx_type: 2, rlp: Bytes::from(vec![0x02; len]), access_list_len: 0 }
}

/// A receipt with `num_logs` logs, each carrying `data_len` bytes of data.
pub fn raw_receipt(num_logs: usize, data_len: usize) -> RawReceipt {
    RawReceipt {
        tx_type: 2,
        rlp: Bytes::from(vec![0x02; 64 + num_logs * data_len]),
        logs: vec![RawLog { num_topics: 3, data_len }; num_logs],
    }
}
