use axiom_codec::{
    field_idx::{check_receipt_idx_pair, FieldIdxKind},
    special_values::{
        RECEIPT_ADDRESS_IDX, RECEIPT_BLOCK_NUMBER_FIELD_IDX, RECEIPT_TX_INDEX_FIELD_IDX,
        RECEIPT_TX_TYPE_FIELD_IDX,
    },
    types::native::{ReceiptField, ReceiptSubquery},
};
use ethers_core::types::{TransactionReceipt, H256};
use rlp::RlpStream;

use super::{uint_word, word_chunk};
use crate::error::ResolverError;

/// Canonical receipt encoding, as committed to by the receipts root.
///
/// `ethers_core` encodes receipts without the typed envelope, see
/// <https://github.com/gakonst/ethers-rs/issues/2500>.
pub fn get_receipt_rlp(receipt: &TransactionReceipt) -> Result<Vec<u8>, ResolverError> {
    let mut s = RlpStream::new();
    s.begin_list(4);
    if let Some(post_state) = receipt.root {
        s.append(&post_state);
    } else {
        let status = receipt.status.ok_or_else(|| {
            ResolverError::Malformed("receipt without post-state or status".to_string())
        })?;
        s.append(&status);
    }
    s.append(&receipt.cumulative_gas_used);
    s.append(&receipt.logs_bloom);
    s.append_list(&receipt.logs);
    let mut rlp = s.out().to_vec();
    if let Some(tx_type) = receipt.transaction_type {
        if tx_type.as_u32() > 0 {
            rlp = [vec![tx_type.as_u32() as u8], rlp].concat();
        }
    }
    Ok(rlp)
}

/// Value of a receipt subquery.
pub fn receipt_field_value(
    receipt: &TransactionReceipt,
    subquery: &ReceiptSubquery,
) -> Result<H256, ResolverError> {
    let (kind, log_kind) =
        check_receipt_idx_pair(subquery.field_or_log_idx, subquery.topic_or_data_or_address_idx)
            .map_err(|err| ResolverError::Unsupported(err.to_string()))?;
    let mined = || ResolverError::NotFound("mined receipt".to_string());
    match (kind, log_kind) {
        (FieldIdxKind::Named(idx), _) => {
            let field = ReceiptField::try_from(idx)
                .map_err(|idx| ResolverError::Unsupported(format!("receipt field {idx}")))?;
            match field {
                ReceiptField::Status => {
                    receipt.status.map(|s| uint_word(s.as_u64())).ok_or_else(|| {
                        ResolverError::NotFound("status of a pre-Byzantium receipt".to_string())
                    })
                }
                ReceiptField::PostState => receipt.root.ok_or_else(|| {
                    ResolverError::NotFound("post-state of a post-Byzantium receipt".to_string())
                }),
                ReceiptField::CumulativeGas => {
                    let mut word = [0u8; 32];
                    receipt.cumulative_gas_used.to_big_endian(&mut word);
                    Ok(H256(word))
                }
                ReceiptField::LogsBloom => Ok(word_chunk(receipt.logs_bloom.as_bytes(), 0)
                    .unwrap_or_default()),
                ReceiptField::Logs => {
                    Err(ResolverError::Unsupported("the receipt log list as a value".to_string()))
                }
            }
        }
        (FieldIdxKind::Special(idx), _) => match idx as usize {
            RECEIPT_TX_TYPE_FIELD_IDX => {
                Ok(uint_word(receipt.transaction_type.map_or(0, |t| t.as_u64())))
            }
            RECEIPT_BLOCK_NUMBER_FIELD_IDX => {
                receipt.block_number.map(|n| uint_word(n.as_u64())).ok_or_else(mined)
            }
            RECEIPT_TX_INDEX_FIELD_IDX => Ok(uint_word(receipt.transaction_index.as_u64())),
            _ => Err(ResolverError::Unsupported(format!("receipt field {idx}"))),
        },
        (FieldIdxKind::Offset { name: "logsBloom", index }, _) => {
            word_chunk(receipt.logs_bloom.as_bytes(), index as usize)
                .ok_or_else(|| ResolverError::NotFound(format!("logs bloom chunk {index}")))
        }
        (FieldIdxKind::Offset { index: log_idx, .. }, Some(log_kind)) => {
            let log = receipt
                .logs
                .get(log_idx as usize)
                .ok_or_else(|| ResolverError::NotFound(format!("log {log_idx}")))?;
            if !subquery.event_schema.is_zero() && log.topics.first() != Some(&subquery.event_schema)
            {
                return Err(ResolverError::NotFound(format!(
                    "log {log_idx} with event schema {:?}",
                    subquery.event_schema
                )));
            }
            match log_kind {
                FieldIdxKind::Special(idx) if idx as usize == RECEIPT_ADDRESS_IDX => {
                    Ok(H256::from(log.address))
                }
                FieldIdxKind::Offset { name: "topic", index } => log
                    .topics
                    .get(index as usize)
                    .copied()
                    .ok_or_else(|| ResolverError::NotFound(format!("topic {index} of log {log_idx}"))),
                FieldIdxKind::Offset { index, .. } => word_chunk(&log.data, index as usize)
                    .ok_or_else(|| {
                        ResolverError::NotFound(format!("data word {index} of log {log_idx}"))
                    }),
                other => Err(ResolverError::Unsupported(format!("log index {other:?}"))),
            }
        }
        (FieldIdxKind::Offset { .. }, None) => {
            Err(ResolverError::Unsupported("log selected without a log index".to_string()))
        }
    }
}
