use axiom_codec::{
    field_idx::{check_header_field_idx, FieldIdxKind},
    special_values::{
        HEADER_EXTRA_DATA_LEN_FIELD_IDX, HEADER_HASH_FIELD_IDX, HEADER_HEADER_SIZE_FIELD_IDX,
    },
};
use ethers_core::{
    types::{Block, H256},
    utils::keccak256,
};
use rlp::{Rlp, RlpStream};

use super::{list_item, rlp_item_word, uint_word, word_chunk};
use crate::error::ResolverError;

/// RLP encodes a block header, including every fork-dependent trailing field the block carries.
pub fn get_block_rlp<TX>(block: &Block<TX>) -> Result<Vec<u8>, ResolverError> {
    let missing = |field: &str| ResolverError::Malformed(format!("block without {field}"));
    let withdrawals_root: Option<H256> = block.withdrawals_root;
    let base_fee = block.base_fee_per_gas;
    let blob_gas_used = block.blob_gas_used;
    let excess_blob_gas = block.excess_blob_gas;
    let parent_beacon_block_root = block.parent_beacon_block_root;
    let rlp_len = 15
        + usize::from(base_fee.is_some())
        + usize::from(withdrawals_root.is_some())
        + usize::from(blob_gas_used.is_some())
        + usize::from(excess_blob_gas.is_some())
        + usize::from(parent_beacon_block_root.is_some());
    let mut rlp = RlpStream::new_list(rlp_len);
    rlp.append(&block.parent_hash);
    rlp.append(&block.uncles_hash);
    rlp.append(&block.author.ok_or_else(|| missing("miner"))?);
    rlp.append(&block.state_root);
    rlp.append(&block.transactions_root);
    rlp.append(&block.receipts_root);
    rlp.append(&block.logs_bloom.ok_or_else(|| missing("logsBloom"))?);
    rlp.append(&block.difficulty);
    rlp.append(&block.number.ok_or_else(|| missing("number"))?);
    rlp.append(&block.gas_limit);
    rlp.append(&block.gas_used);
    rlp.append(&block.timestamp);
    rlp.append(&block.extra_data.to_vec());
    rlp.append(&block.mix_hash.ok_or_else(|| missing("mixHash"))?);
    rlp.append(&block.nonce.ok_or_else(|| missing("nonce"))?);
    base_fee.map(|base_fee| rlp.append(&base_fee));
    withdrawals_root.map(|withdrawals_root| rlp.append(&withdrawals_root));
    blob_gas_used.map(|blob_gas_used| rlp.append(&blob_gas_used));
    excess_blob_gas.map(|excess_blob_gas| rlp.append(&excess_blob_gas));
    parent_beacon_block_root.map(|root| rlp.append(&root));
    let encoding: Vec<u8> = rlp.out().into();
    if let Some(hash) = block.hash {
        if H256(keccak256(&encoding)) != hash {
            return Err(ResolverError::Malformed(format!(
                "header of block {hash:?} does not hash to its block hash"
            )));
        }
    }
    Ok(encoding)
}

/// Value of a header subquery, read from the RLP encoded header.
pub fn header_field_value(header_rlp: &[u8], field_idx: u32) -> Result<H256, ResolverError> {
    let header = Rlp::new(header_rlp);
    let kind = check_header_field_idx(field_idx)
        .map_err(|err| ResolverError::Unsupported(err.to_string()))?;
    match kind {
        FieldIdxKind::Named(idx) => rlp_item_word(&list_item(&header, idx as usize, "header")?),
        FieldIdxKind::Special(idx) if idx as usize == HEADER_HASH_FIELD_IDX => {
            Ok(H256(keccak256(header_rlp)))
        }
        FieldIdxKind::Special(idx) if idx as usize == HEADER_HEADER_SIZE_FIELD_IDX => {
            Ok(uint_word(header_rlp.len() as u64))
        }
        FieldIdxKind::Special(idx) if idx as usize == HEADER_EXTRA_DATA_LEN_FIELD_IDX => {
            let extra_data = list_item(&header, 12, "header")?;
            let len = extra_data.data().map_err(malformed)?.len();
            Ok(uint_word(len as u64))
        }
        FieldIdxKind::Offset { index, .. } => {
            let bloom = list_item(&header, 6, "header")?;
            word_chunk(bloom.data().map_err(malformed)?, index as usize)
                .ok_or_else(|| ResolverError::NotFound(format!("logs bloom chunk {index}")))
        }
        FieldIdxKind::Special(idx) => Err(ResolverError::Unsupported(format!("header field {idx}"))),
    }
}

fn malformed(err: rlp::DecoderError) -> ResolverError {
    ResolverError::Malformed(err.to_string())
}

#[cfg(test)]
mod tests {
    use ethers_core::types::{Address, Bloom, Bytes, H64, U256, U64};

    use super::*;

    fn block() -> Block<H256> {
        Block {
            author: Some(Address::repeat_byte(0x11)),
            number: Some(U64::from(17_000_000)),
            gas_used: U256::from(12_345_678u64),
            logs_bloom: Some(Bloom::from_low_u64_be(0xff)),
            mix_hash: Some(H256::zero()),
            nonce: Some(H64::zero()),
            extra_data: Bytes::from(b"axiom".to_vec()),
            base_fee_per_gas: Some(U256::from(7u64)),
            ..Default::default()
        }
    }

    #[test]
    fn test_header_fields_from_rlp() {
        let header_rlp = get_block_rlp(&block()).unwrap();
        let value = |idx| header_field_value(&header_rlp, idx).unwrap();
        assert_eq!(value(8), H256::from_low_u64_be(17_000_000));
        assert_eq!(value(10), H256::from_low_u64_be(12_345_678));
        assert_eq!(value(2), H256::from(Address::repeat_byte(0x11)));
        assert_eq!(value(15), H256::from_low_u64_be(7));
        assert_eq!(value(50), H256(keccak256(&header_rlp)));
        assert_eq!(value(51), H256::from_low_u64_be(header_rlp.len() as u64));
        assert_eq!(value(52), H256::from_low_u64_be(5));
        assert_eq!(value(77), H256::from_low_u64_be(0xff));
        assert_eq!(value(70), H256::zero());
    }

    #[test]
    fn test_missing_fork_field() {
        let header_rlp = get_block_rlp(&block()).unwrap();
        // no withdrawals root before Shanghai
        assert!(matches!(header_field_value(&header_rlp, 16), Err(ResolverError::NotFound(_))));
    }

    #[test]
    fn test_block_hash_mismatch() {
        let block = Block { hash: Some(H256::repeat_byte(1)), ..block() };
        assert!(matches!(get_block_rlp(&block), Err(ResolverError::Malformed(_))));
    }
}
