use axiom_codec::{
    field_idx::{check_tx_field_idx, FieldIdxKind},
    special_values::*,
    types::native::TxField,
};
use ethers_core::{
    types::{Bytes, Transaction, H256, U128, U64},
    utils::keccak256,
};
use rlp::{Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use super::{list_item, rlp_item_word, uint_word, word_chunk};
use crate::error::ResolverError;

/// The new fields in a EIP 4844 blob transaction.
/// This object is meant to be transmuted from the `other` field in [`Transaction`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobTransactionFields {
    pub max_fee_per_blob_gas: U128,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blob_versioned_hashes: Vec<H256>,
}

/// Canonical encoding of a transaction. `ethers_core` does not know EIP-4844 transactions, so
/// those are encoded here.
pub fn get_transaction_rlp(transaction: &Transaction) -> Result<Bytes, ResolverError> {
    match transaction.transaction_type {
        Some(x) if x == U64::from(3) => {
            let missing =
                |field: &str| ResolverError::Malformed(format!("EIP-4844 tx missing {field}"));
            let other = serde_json::to_value(&transaction.other)
                .map_err(|err| ResolverError::Malformed(err.to_string()))?;
            let blob_fields: BlobTransactionFields = serde_json::from_value(other)
                .map_err(|err| ResolverError::Malformed(err.to_string()))?;
            let chain_id = transaction.chain_id.ok_or_else(|| missing("chainId"))?;
            let max_priority_fee_per_gas = transaction
                .max_priority_fee_per_gas
                .ok_or_else(|| missing("maxPriorityFeePerGas"))?;
            let max_fee_per_gas =
                transaction.max_fee_per_gas.ok_or_else(|| missing("maxFeePerGas"))?;
            let to = transaction.to.ok_or_else(|| missing("to"))?;
            let mut rlp = RlpStream::new();
            rlp.begin_unbounded_list();
            rlp.append(&chain_id);
            rlp.append(&transaction.nonce);
            rlp.append(&max_priority_fee_per_gas);
            rlp.append(&max_fee_per_gas);
            rlp.append(&transaction.gas);
            rlp.append(&to);
            rlp.append(&transaction.value);
            rlp.append(&transaction.input.as_ref());
            rlp_opt_list(&mut rlp, &transaction.access_list);
            rlp.append(&blob_fields.max_fee_per_blob_gas);
            rlp.append_list(&blob_fields.blob_versioned_hashes);
            rlp.append(&normalize_v(transaction.v.as_u64(), chain_id.as_u64()));
            rlp.append(&transaction.r);
            rlp.append(&transaction.s);
            rlp.finalize_unbounded_list();
            let encoded = [&[0x3u8][..], &rlp.out()].concat();
            Ok(encoded.into())
        }
        // legacy, EIP-2930 and EIP-1559 transactions are handled by ethers_core
        _ => Ok(transaction.rlp()),
    }
}

/// RLP encode a value if it exists or else encode an empty list.
fn rlp_opt_list<T: rlp::Encodable>(rlp: &mut RlpStream, opt: &Option<T>) {
    if let Some(inner) = opt {
        rlp.append(inner);
    } else {
        rlp.append_list::<u8, u8>(&[]);
    }
}

/// normalizes the signature back to 0/1
fn normalize_v(v: u64, chain_id: u64) -> u64 {
    if v > 1 {
        v.checked_sub(chain_id * 2 + 35).unwrap_or_else(|| v.saturating_sub(27))
    } else {
        v
    }
}

/// Byte length of the RLP encoded access list. 0 for legacy transactions.
pub fn access_list_rlp_len(transaction: &Transaction) -> usize {
    match (&transaction.access_list, transaction.transaction_type) {
        (Some(access_list), Some(tx_type)) if !tx_type.is_zero() => {
            rlp::encode(access_list).len()
        }
        _ => 0,
    }
}

/// Position of named field `field_idx` inside the RLP list of a transaction of type `tx_type`.
/// `None` if transactions of that type do not carry the field.
pub fn tx_list_idx(tx_type: u8, field_idx: u32) -> Option<usize> {
    let field = TxField::try_from(field_idx).ok()?;
    use TxField::*;
    let idx = match (tx_type, field) {
        // [nonce, gasPrice, gas, to, value, data, v, r, s]
        (0, Nonce) => 0,
        (0, GasPrice) => 1,
        (0, GasLimit | To | Value | Data) => field_idx as usize - 2,
        (0, V | R | S) => field_idx as usize - 3,
        // [chainId, nonce, gasPrice, gas, to, value, data, accessList, v, r, s]
        (1, ChainId | Nonce) => field_idx as usize,
        (1, GasPrice) => 2,
        (1, GasLimit | To | Value | Data | V | R | S) => field_idx as usize - 1,
        // [chainId, nonce, maxPriorityFeePerGas, maxFeePerGas, gas, to, value, data, accessList, v, r, s]
        (2, GasPrice) => return None,
        (2, _) => field_idx as usize,
        // blob transactions insert maxFeePerBlobGas and blobVersionedHashes before v, r, s
        (3, GasPrice) => return None,
        (3, V | R | S) => field_idx as usize + 2,
        (3, _) => field_idx as usize,
        _ => return None,
    };
    Some(idx)
}

/// Value of a transaction subquery.
pub fn tx_field_value(tx: &Transaction, field_or_calldata_idx: u32) -> Result<H256, ResolverError> {
    let kind = check_tx_field_idx(field_or_calldata_idx)
        .map_err(|err| ResolverError::Unsupported(err.to_string()))?;
    let tx_type = tx.transaction_type.map_or(0, |tx_type| tx_type.as_u64() as u8);
    let data = tx.input.as_ref();
    match kind {
        FieldIdxKind::Named(field_idx) => {
            let list_idx = tx_list_idx(tx_type, field_idx).ok_or_else(|| {
                ResolverError::Unsupported(format!("field {field_idx} of type {tx_type} transaction"))
            })?;
            if field_idx == TxField::Data.idx() {
                return Ok(word_chunk(data, 0).unwrap_or_default());
            }
            let rlp = get_transaction_rlp(tx)?;
            // typed transactions are prefixed by their type byte
            let list = if tx_type == 0 { Rlp::new(&rlp) } else { Rlp::new(&rlp[1..]) };
            rlp_item_word(&list_item(&list, list_idx, "transaction")?)
        }
        FieldIdxKind::Special(idx) => match idx as usize {
            TX_TX_TYPE_FIELD_IDX => Ok(uint_word(tx_type as u64)),
            TX_BLOCK_NUMBER_FIELD_IDX => tx
                .block_number
                .map(|n| uint_word(n.as_u64()))
                .ok_or_else(|| ResolverError::NotFound("mined transaction".to_string())),
            TX_TX_INDEX_FIELD_IDX => tx
                .transaction_index
                .map(|n| uint_word(n.as_u64()))
                .ok_or_else(|| ResolverError::NotFound("mined transaction".to_string())),
            TX_FUNCTION_SELECTOR_FIELD_IDX => function_selector(tx.to.is_none(), data),
            TX_CALLDATA_HASH_FIELD_IDX => Ok(H256(keccak256(data))),
            TX_DATA_LENGTH_FIELD_IDX => Ok(uint_word(data.len() as u64)),
            _ => Err(ResolverError::Unsupported(format!("transaction field {idx}"))),
        },
        FieldIdxKind::Offset { name: "calldata", index } => {
            let calldata = data.get(4..).ok_or_else(|| {
                ResolverError::NotFound("calldata after the function selector".to_string())
            })?;
            word_chunk(calldata, index as usize)
                .ok_or_else(|| ResolverError::NotFound(format!("calldata word {index}")))
        }
        FieldIdxKind::Offset { index, .. } => word_chunk(data, index as usize)
            .ok_or_else(|| ResolverError::NotFound(format!("contract data word {index}"))),
    }
}

fn function_selector(is_contract_deploy: bool, data: &[u8]) -> Result<H256, ResolverError> {
    if data.is_empty() {
        return Ok(uint_word(TX_NO_CALLDATA_SELECTOR_VALUE as u64));
    }
    if is_contract_deploy {
        return Ok(uint_word(TX_CONTRACT_DEPLOY_SELECTOR_VALUE as u64));
    }
    let selector: [u8; 4] = data
        .get(..4)
        .and_then(|selector| selector.try_into().ok())
        .ok_or_else(|| ResolverError::Malformed("calldata shorter than a selector".to_string()))?;
    Ok(uint_word(u32::from_be_bytes(selector) as u64))
}
