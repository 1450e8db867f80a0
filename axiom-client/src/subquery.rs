use axiom_codec::{
    field_idx::{
        check_account_field_idx, check_header_field_idx, check_mapping_depth,
        check_receipt_idx_pair, check_tx_field_idx,
    },
    types::native::{
        AccountSubquery, AnySubquery, HeaderSubquery, ReceiptSubquery,
        SolidityNestedMappingSubquery, StorageSubquery, SubqueryType, TxPosition, TxRef,
        TxSubquery,
    },
};
use ethers_core::types::H256;
use serde::{Deserialize, Serialize};

use crate::error::SubqueryError;

/// Transaction subquery that may still reference its transaction by hash.
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxSubqueryRequest {
    pub tx: TxRef,
    pub field_or_calldata_idx: u32,
}

/// Receipt subquery that may still reference its transaction by hash.
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSubqueryRequest {
    pub tx: TxRef,
    pub field_or_log_idx: u32,
    pub topic_or_data_or_address_idx: u32,
    pub event_schema: H256,
}

/// A subquery as appended to a query, before transaction references are resolved.
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum DataSubquery {
    Header(HeaderSubquery),
    Account(AccountSubquery),
    Storage(StorageSubquery),
    Transaction(TxSubqueryRequest),
    Receipt(ReceiptSubqueryRequest),
    SolidityNestedMapping(SolidityNestedMappingSubquery),
}

impl DataSubquery {
    pub fn subquery_type(&self) -> SubqueryType {
        match self {
            DataSubquery::Header(_) => SubqueryType::Header,
            DataSubquery::Account(_) => SubqueryType::Account,
            DataSubquery::Storage(_) => SubqueryType::Storage,
            DataSubquery::Transaction(_) => SubqueryType::Transaction,
            DataSubquery::Receipt(_) => SubqueryType::Receipt,
            DataSubquery::SolidityNestedMapping(_) => SubqueryType::SolidityNestedMapping,
        }
    }

    pub fn tx_ref(&self) -> Option<TxRef> {
        match self {
            DataSubquery::Transaction(subquery) => Some(subquery.tx),
            DataSubquery::Receipt(subquery) => Some(subquery.tx),
            _ => None,
        }
    }

    /// Pins a transaction reference by hash to `position`. No-op for every other record.
    pub fn resolve(self, position: TxPosition) -> Self {
        match self {
            DataSubquery::Transaction(subquery) => DataSubquery::Transaction(TxSubqueryRequest {
                tx: subquery.tx.resolve(position),
                ..subquery
            }),
            DataSubquery::Receipt(subquery) => {
                DataSubquery::Receipt(ReceiptSubqueryRequest { tx: subquery.tx.resolve(position), ..subquery })
            }
            other => other,
        }
    }

    /// Range checks the record. Records made through [crate::builder] always pass.
    pub fn check(&self) -> Result<(), SubqueryError> {
        match self {
            DataSubquery::Header(subquery) => {
                check_header_field_idx(subquery.field_idx)?;
            }
            DataSubquery::Account(subquery) => {
                check_account_field_idx(subquery.field_idx)?;
            }
            DataSubquery::Storage(_) => {}
            DataSubquery::Transaction(subquery) => {
                check_tx_field_idx(subquery.field_or_calldata_idx)?;
            }
            DataSubquery::Receipt(subquery) => {
                check_receipt_idx_pair(
                    subquery.field_or_log_idx,
                    subquery.topic_or_data_or_address_idx,
                )?;
            }
            DataSubquery::SolidityNestedMapping(subquery) => {
                check_mapping_depth(subquery.mapping_depth as usize, subquery.keys.len())?;
            }
        }
        Ok(())
    }

    /// The wire form of this record. Fails while a transaction is referenced by hash.
    pub fn to_any(&self) -> Result<AnySubquery, SubqueryError> {
        let unresolved = || SubqueryError::UnresolvedTxRef(self.subquery_type());
        Ok(match self {
            DataSubquery::Header(subquery) => AnySubquery::Header(subquery.clone()),
            DataSubquery::Account(subquery) => AnySubquery::Account(subquery.clone()),
            DataSubquery::Storage(subquery) => AnySubquery::Storage(subquery.clone()),
            DataSubquery::Transaction(subquery) => {
                let TxPosition { block_number, tx_idx } =
                    subquery.tx.position().ok_or_else(unresolved)?;
                AnySubquery::Transaction(TxSubquery {
                    block_number,
                    tx_idx,
                    field_or_calldata_idx: subquery.field_or_calldata_idx,
                })
            }
            DataSubquery::Receipt(subquery) => {
                let TxPosition { block_number, tx_idx } =
                    subquery.tx.position().ok_or_else(unresolved)?;
                AnySubquery::Receipt(ReceiptSubquery {
                    block_number,
                    tx_idx,
                    field_or_log_idx: subquery.field_or_log_idx,
                    topic_or_data_or_address_idx: subquery.topic_or_data_or_address_idx,
                    event_schema: subquery.event_schema,
                })
            }
            DataSubquery::SolidityNestedMapping(subquery) => {
                AnySubquery::SolidityNestedMapping(subquery.clone())
            }
        })
    }
}

impl From<AnySubquery> for DataSubquery {
    fn from(value: AnySubquery) -> Self {
        match value {
            AnySubquery::Header(subquery) => DataSubquery::Header(subquery),
            AnySubquery::Account(subquery) => DataSubquery::Account(subquery),
            AnySubquery::Storage(subquery) => DataSubquery::Storage(subquery),
            AnySubquery::Transaction(subquery) => DataSubquery::Transaction(subquery.into()),
            AnySubquery::Receipt(subquery) => DataSubquery::Receipt(subquery.into()),
            AnySubquery::SolidityNestedMapping(subquery) => {
                DataSubquery::SolidityNestedMapping(subquery)
            }
        }
    }
}

impl From<TxSubquery> for TxSubqueryRequest {
    fn from(value: TxSubquery) -> Self {
        let TxSubquery { block_number, tx_idx, field_or_calldata_idx } = value;
        Self { tx: TxRef::Position(TxPosition { block_number, tx_idx }), field_or_calldata_idx }
    }
}

impl From<ReceiptSubquery> for ReceiptSubqueryRequest {
    fn from(value: ReceiptSubquery) -> Self {
        let ReceiptSubquery {
            block_number,
            tx_idx,
            field_or_log_idx,
            topic_or_data_or_address_idx,
            event_schema,
        } = value;
        Self {
            tx: TxRef::Position(TxPosition { block_number, tx_idx }),
            field_or_log_idx,
            topic_or_data_or_address_idx,
            event_schema,
        }
    }
}

impl From<HeaderSubquery> for DataSubquery {
    fn from(value: HeaderSubquery) -> Self {
        DataSubquery::Header(value)
    }
}
impl From<AccountSubquery> for DataSubquery {
    fn from(value: AccountSubquery) -> Self {
        DataSubquery::Account(value)
    }
}
impl From<StorageSubquery> for DataSubquery {
    fn from(value: StorageSubquery) -> Self {
        DataSubquery::Storage(value)
    }
}
impl From<TxSubqueryRequest> for DataSubquery {
    fn from(value: TxSubqueryRequest) -> Self {
        DataSubquery::Transaction(value)
    }
}
impl From<ReceiptSubqueryRequest> for DataSubquery {
    fn from(value: ReceiptSubqueryRequest) -> Self {
        DataSubquery::Receipt(value)
    }
}
impl From<SolidityNestedMappingSubquery> for DataSubquery {
    fn from(value: SolidityNestedMappingSubquery) -> Self {
        DataSubquery::SolidityNestedMapping(value)
    }
}
