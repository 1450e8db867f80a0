use axiom_codec::{
    field_idx::{
        check_receipt_idx_pair, check_tx_field_idx, RECEIPT_FIELD_IDX_SPACE,
        RECEIPT_LOG_FIELD_IDX_SPACE, TX_FIELD_IDX_SPACE,
    },
    special_values::*,
    types::native::{ReceiptField, TxField, TxRef},
};
use ethers_core::types::H256;

use super::{offset_idx, IntoWord};
use crate::{
    error::SubqueryError,
    subquery::{ReceiptSubqueryRequest, TxSubqueryRequest},
};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct TxBuilder {
    tx: TxRef,
}

impl TxBuilder {
    pub(super) fn new(tx: TxRef) -> Self {
        Self { tx }
    }

    fn build(self, field_or_calldata_idx: u32) -> TxSubqueryRequest {
        TxSubqueryRequest { tx: self.tx, field_or_calldata_idx }
    }

    pub fn field(self, field: TxField) -> TxSubqueryRequest {
        self.build(field.idx())
    }

    pub fn tx_type(self) -> TxSubqueryRequest {
        self.build(TX_TX_TYPE_FIELD_IDX as u32)
    }

    pub fn block_number(self) -> TxSubqueryRequest {
        self.build(TX_BLOCK_NUMBER_FIELD_IDX as u32)
    }

    pub fn tx_idx(self) -> TxSubqueryRequest {
        self.build(TX_TX_INDEX_FIELD_IDX as u32)
    }

    /// First 4 bytes of calldata. Contract deployments and plain transfers evaluate to the
    /// sentinel values `TX_CONTRACT_DEPLOY_SELECTOR_VALUE` and `TX_NO_CALLDATA_SELECTOR_VALUE`.
    pub fn function_selector(self) -> TxSubqueryRequest {
        self.build(TX_FUNCTION_SELECTOR_FIELD_IDX as u32)
    }

    pub fn calldata_hash(self) -> TxSubqueryRequest {
        self.build(TX_CALLDATA_HASH_FIELD_IDX as u32)
    }

    pub fn data_length(self) -> TxSubqueryRequest {
        self.build(TX_DATA_LENGTH_FIELD_IDX as u32)
    }

    /// The `index`-th 32 byte word of calldata after the function selector.
    pub fn calldata(self, index: u32) -> Result<TxSubqueryRequest, SubqueryError> {
        let idx = offset_idx(&TX_FIELD_IDX_SPACE, "calldata", TX_CALLDATA_IDX_OFFSET, index)?;
        Ok(self.build(idx))
    }

    /// The `index`-th 32 byte chunk of contract creation data.
    pub fn contract_data(self, index: u32) -> Result<TxSubqueryRequest, SubqueryError> {
        let idx =
            offset_idx(&TX_FIELD_IDX_SPACE, "contractData", TX_CONTRACT_DATA_IDX_OFFSET, index)?;
        Ok(self.build(idx))
    }

    pub fn field_idx(self, field_or_calldata_idx: u32) -> Result<TxSubqueryRequest, SubqueryError> {
        check_tx_field_idx(field_or_calldata_idx)?;
        Ok(self.build(field_or_calldata_idx))
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ReceiptBuilder {
    tx: TxRef,
}

impl ReceiptBuilder {
    pub(super) fn new(tx: TxRef) -> Self {
        Self { tx }
    }

    fn build(self, field_or_log_idx: u32) -> ReceiptSubqueryRequest {
        ReceiptSubqueryRequest {
            tx: self.tx,
            field_or_log_idx,
            topic_or_data_or_address_idx: 0,
            event_schema: H256::zero(),
        }
    }

    pub fn field(self, field: ReceiptField) -> ReceiptSubqueryRequest {
        self.build(field.idx())
    }

    pub fn tx_type(self) -> ReceiptSubqueryRequest {
        self.build(RECEIPT_TX_TYPE_FIELD_IDX as u32)
    }

    pub fn block_number(self) -> ReceiptSubqueryRequest {
        self.build(RECEIPT_BLOCK_NUMBER_FIELD_IDX as u32)
    }

    pub fn tx_idx(self) -> ReceiptSubqueryRequest {
        self.build(RECEIPT_TX_INDEX_FIELD_IDX as u32)
    }

    pub fn logs_bloom(self, chunk: u32) -> Result<ReceiptSubqueryRequest, SubqueryError> {
        let idx =
            offset_idx(&RECEIPT_FIELD_IDX_SPACE, "logsBloom", RECEIPT_LOGS_BLOOM_IDX_OFFSET, chunk)?;
        Ok(self.build(idx))
    }

    /// Selects the `log_idx`-th log of the receipt.
    pub fn log(self, log_idx: u32) -> Result<ReceiptLogBuilder, SubqueryError> {
        let field_or_log_idx =
            offset_idx(&RECEIPT_FIELD_IDX_SPACE, "log", RECEIPT_LOG_IDX_OFFSET, log_idx)?;
        Ok(ReceiptLogBuilder { tx: self.tx, field_or_log_idx, event_schema: H256::zero() })
    }

    /// Raw index pair, for callers that already hold one.
    pub fn field_idx(
        self,
        field_or_log_idx: u32,
        topic_or_data_or_address_idx: u32,
    ) -> Result<ReceiptSubqueryRequest, SubqueryError> {
        check_receipt_idx_pair(field_or_log_idx, topic_or_data_or_address_idx)?;
        Ok(ReceiptSubqueryRequest {
            topic_or_data_or_address_idx,
            ..self.build(field_or_log_idx)
        })
    }
}

/// A selected log. Without an event schema the log matches any event.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ReceiptLogBuilder {
    tx: TxRef,
    field_or_log_idx: u32,
    event_schema: H256,
}

impl ReceiptLogBuilder {
    /// Requires the log's first topic to equal `event_schema`.
    pub fn event_schema(self, event_schema: impl IntoWord) -> Result<Self, SubqueryError> {
        Ok(Self { event_schema: event_schema.into_word()?, ..self })
    }

    fn build(self, topic_or_data_or_address_idx: u32) -> ReceiptSubqueryRequest {
        ReceiptSubqueryRequest {
            tx: self.tx,
            field_or_log_idx: self.field_or_log_idx,
            topic_or_data_or_address_idx,
            event_schema: self.event_schema,
        }
    }

    pub fn topic(self, topic_idx: u32) -> Result<ReceiptSubqueryRequest, SubqueryError> {
        let idx = offset_idx(
            &RECEIPT_LOG_FIELD_IDX_SPACE,
            "topic",
            RECEIPT_TOPIC_IDX_OFFSET,
            topic_idx,
        )?;
        Ok(self.build(idx))
    }

    /// The `data_idx`-th 32 byte word of the log data.
    pub fn data(self, data_idx: u32) -> Result<ReceiptSubqueryRequest, SubqueryError> {
        let idx =
            offset_idx(&RECEIPT_LOG_FIELD_IDX_SPACE, "data", RECEIPT_DATA_IDX_OFFSET, data_idx)?;
        Ok(self.build(idx))
    }

    /// The emitting contract.
    pub fn address(self) -> ReceiptSubqueryRequest {
        self.build(RECEIPT_ADDRESS_IDX as u32)
    }
}
