use std::str::FromStr;

use ethers_core::types::{Address, Bytes, H256, U256};
use hex::FromHex;

use crate::{
    constants::*,
    decoder::native::{decode_data_query, decode_subquery},
    special_values::{RECEIPT_DATA_IDX_OFFSET, RECEIPT_LOG_IDX_OFFSET},
    types::native::{
        AccountSubquery, AnySubquery, AxiomV2ComputeQuery, AxiomV2DataQuery, HeaderField,
        HeaderSubquery, ReceiptSubquery, SolidityNestedMappingSubquery, StorageSubquery, Subquery,
        SubqueryType, TxSubquery,
    },
};

use super::native::{encode_query_schema, get_query_hash_v2};

fn gas_used_data_query() -> AxiomV2DataQuery {
    let field_idx = HeaderField::GasUsed.idx();
    AxiomV2DataQuery {
        source_chain_id: 1,
        subqueries: vec![
            HeaderSubquery { block_number: 18200000, field_idx }.into(),
            HeaderSubquery { block_number: 18200100, field_idx }.into(),
        ],
    }
}

fn h256(s: &str) -> H256 {
    H256::from_str(s).unwrap()
}

#[test]
fn test_encode_header_data_query() {
    let data_query = gas_used_data_query();
    let encoded = data_query.encode().unwrap();
    let expected = Vec::from_hex(
        "0000000000000001\
         0002\
         0001\
         0115b5c0\
         0000000a\
         0001\
         0115b624\
         0000000a",
    )
    .unwrap();
    assert_eq!(encoded, expected);
    assert_eq!(
        data_query.keccak(),
        h256("0xfaaac492509be62a2026a769d31140ee49e4b662e56c95251b8ca6ccace0e91b")
    );
}

#[test]
fn test_data_query_hash_deterministic() {
    let a = gas_used_data_query();
    let b = gas_used_data_query();
    assert_eq!(a.encode().unwrap(), b.encode().unwrap());
    assert_eq!(a.keccak(), b.keccak());
}

#[test]
fn test_data_query_hash_order_sensitive() {
    let mut swapped = gas_used_data_query();
    swapped.subqueries.swap(0, 1);
    assert_eq!(
        swapped.keccak(),
        h256("0xc9da3e503303274a3b149f1e75bb4868d1f55aa63cf56dcf4a1bc0b7373078ee")
    );
    assert_ne!(swapped.keccak(), gas_used_data_query().keccak());
}

#[test]
fn test_query_hash_without_compute() {
    let data_query = gas_used_data_query();
    let compute_query = AxiomV2ComputeQuery::empty(2);
    assert_eq!(compute_query.encode().unwrap(), vec![0, 0, 2]);
    assert_eq!(compute_query.encode().unwrap().len(), 1 + USER_RESULT_LEN_BYTES);
    assert_eq!(compute_query.query_schema().unwrap(), H256::zero());
    let query_hash = get_query_hash_v2(1, &data_query, &compute_query).unwrap();
    assert_eq!(
        query_hash,
        h256("0xda1933a884934070a870d18243ec2f1a7efa869966c4cf52d03b179c998a4825")
    );
}

#[test]
fn test_query_hash_with_compute() {
    let data_query = gas_used_data_query();
    let compute_query = AxiomV2ComputeQuery {
        k: 14,
        result_len: 1,
        vkey: vec![H256::repeat_byte(0x11), H256::repeat_byte(0x22)],
        compute_proof: Bytes::from(vec![0xaa; 4]),
    };
    assert_eq!(
        compute_query.query_schema().unwrap(),
        h256("0x3a02dffad5e4d4d1ea08a4d79135fb74a318780f792d0b901555fe72d4afd15a")
    );
    let query_hash = get_query_hash_v2(1, &data_query, &compute_query).unwrap();
    assert_eq!(
        query_hash,
        h256("0x7a979fdff7ec7b9cf9fed144bb740d397fa2d422e70c1f325484eb6f3efe4357")
    );
    assert!(get_query_hash_v2(5, &data_query, &compute_query).is_err());
}

#[test]
fn test_inconsistent_compute_query() {
    let compute_query = AxiomV2ComputeQuery {
        k: 0,
        result_len: 1,
        vkey: vec![H256::zero()],
        compute_proof: Bytes::default(),
    };
    assert!(compute_query.encode().is_err());
    assert!(encode_query_schema(28, 1, &[]).is_err());
    assert!(encode_query_schema(0, 1, &[]).is_err());
}

#[test]
fn test_subquery_widths() {
    let addr = Address::from_str("0xb47e3cd837dDF8e4c57F05d70Ab865de6e193BBB").unwrap();
    let subqueries: Vec<(AnySubquery, usize)> = vec![
        (HeaderSubquery { block_number: 1, field_idx: 2 }.into(), ENCODED_HEADER_SUBQUERY_LEN),
        (AccountSubquery { block_number: 1, addr, field_idx: 1 }.into(), ENCODED_ACCOUNT_SUBQUERY_LEN),
        (StorageSubquery { block_number: 1, addr, slot: U256::from(7) }.into(), ENCODED_STORAGE_SUBQUERY_LEN),
        (TxSubquery { block_number: 1, tx_idx: 3, field_or_calldata_idx: 101 }.into(), ENCODED_TX_SUBQUERY_LEN),
        (
            ReceiptSubquery {
                block_number: 1,
                tx_idx: 3,
                field_or_log_idx: RECEIPT_LOG_IDX_OFFSET as u32,
                topic_or_data_or_address_idx: RECEIPT_DATA_IDX_OFFSET as u32,
                event_schema: H256::repeat_byte(0xee),
            }
            .into(),
            ENCODED_RECEIPT_SUBQUERY_LEN,
        ),
        (
            SolidityNestedMappingSubquery {
                block_number: 1,
                addr,
                mapping_slot: U256::from(3),
                mapping_depth: 2,
                keys: vec![H256::repeat_byte(1), H256::repeat_byte(2)],
            }
            .into(),
            ENCODED_SOLIDITY_NESTED_MAPPING_SUBQUERY_PREFIX_LEN + 64,
        ),
    ];
    for (subquery, width) in subqueries {
        let encoded = Subquery::from(subquery.clone());
        assert_eq!(encoded.encoded_subquery_data.len(), width, "{:?}", subquery.subquery_type());
        assert_eq!(
            encoded.encode()[..SUBQUERY_TYPE_BYTES],
            (subquery.subquery_type() as u16).to_be_bytes()
        );
        let decoded = decode_subquery(&encoded.encode()[..]).unwrap();
        assert_eq!(decoded, subquery);
    }
}

#[test]
fn test_decode_data_query() {
    let data_query = gas_used_data_query();
    let encoded = data_query.encode().unwrap();
    assert_eq!(
        encoded.len(),
        SOURCE_CHAIN_ID_BYTES
            + NUM_SUBQUERIES_BYTES
            + 2 * (SUBQUERY_TYPE_BYTES + ENCODED_HEADER_SUBQUERY_LEN)
    );
    let decoded = decode_data_query(&encoded[..]).unwrap();
    assert_eq!(decoded, data_query);
    assert_eq!(decoded.keccak(), data_query.keccak());

    let mut trailing = encoded.clone();
    trailing.push(0);
    assert!(decode_data_query(&trailing[..]).is_err());
    assert!(decode_data_query(&encoded[..encoded.len() - 1]).is_err());
}

#[test]
fn test_decode_rejects_unknown_type() {
    let bytes = Vec::from_hex("0007000000010000000a").unwrap();
    assert!(decode_subquery(&bytes[..]).is_err());
}

#[test]
fn test_decode_subquery_rejects_trailing_bytes() {
    let encoded = Subquery::from(HeaderSubquery { block_number: 1, field_idx: 2 }).encode();
    assert!(decode_subquery(&encoded[..]).is_ok());
    let mut trailing = encoded.to_vec();
    trailing.push(0);
    assert!(decode_subquery(&trailing[..]).is_err());
    let subquery = Subquery {
        subquery_type: SubqueryType::Header,
        encoded_subquery_data: trailing[SUBQUERY_TYPE_BYTES..].to_vec().into(),
    };
    assert!(AnySubquery::try_from(subquery).is_err());
}

#[test]
fn test_decode_subquery_checks_field_idx() {
    // header field 30 is in the gap between the named fields and the special values
    let encoded = Subquery::from(HeaderSubquery { block_number: 1, field_idx: 30 }).encode();
    let err = decode_subquery(&encoded[..]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

    let encoded = Subquery::from(ReceiptSubquery {
        block_number: 1,
        tx_idx: 0,
        field_or_log_idx: 0,
        topic_or_data_or_address_idx: 1,
        event_schema: H256::zero(),
    })
    .encode();
    assert!(decode_subquery(&encoded[..]).is_err());
}
