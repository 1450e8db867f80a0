use std::time::Duration;

use axiom_codec::types::native::{
    AnySubquery, AxiomV2Callback, AxiomV2ComputeQuery, HeaderField, HeaderSubquery, ReceiptField,
    Subquery, SubqueryType, TxField, TxSubquery,
};
use ethers_core::types::{Address, Bytes, H256, U256};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::{
    admission::CapacityScope,
    builder,
    config::GWEI,
    tests::{position, raw_receipt, raw_tx, MockResolver},
};

fn h256(s: &str) -> H256 {
    s.parse().unwrap()
}

fn gas_used(block_number: u64) -> HeaderSubquery {
    builder::header(block_number).unwrap().field(HeaderField::GasUsed)
}

fn any(subquery: impl Into<DataSubquery>) -> AnySubquery {
    subquery.into().to_any().unwrap()
}

#[test_log::test(tokio::test)]
async fn test_two_header_query() {
    let resolver = MockResolver::new();
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::new(1));
    assert_eq!(query.state(), QueryState::Empty);
    query.append(gas_used(18_200_000)).unwrap();
    query.append(gas_used(18_200_100)).unwrap();
    assert_eq!(query.state(), QueryState::Assembling);

    let built = query.build(&resolver, &CancellationToken::new()).await.unwrap().clone();
    let expected = hex::decode(
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
    assert_eq!(built.data_query.to_vec(), expected);
    assert_eq!(
        built.data_query_hash,
        h256("0xfaaac492509be62a2026a769d31140ee49e4b662e56c95251b8ca6ccace0e91b")
    );
    assert_eq!(built.compute_query, AxiomV2ComputeQuery::empty(2));
    assert_eq!(built.query_schema, H256::zero());
    assert_eq!(
        built.query_hash,
        h256("0xda1933a884934070a870d18243ec2f1a7efa869966c4cf52d03b179c998a4825")
    );
    assert_eq!(built.callback.result_len, Some(2));
    assert_eq!(built.config_category, ConfigCategory::Default);
    assert_eq!(built.fee_data.payment, U256::from(18_000_000u64) * U256::from(GWEI));
    assert_eq!(query.state(), QueryState::Built);
    assert_eq!(query.built(), Some(&built));
    // header records need no chain data to be admitted
    assert_eq!(resolver.calls(), 0);
}

#[tokio::test]
async fn test_nothing_to_build() {
    let resolver = MockResolver::new();
    let cancel = CancellationToken::new();
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    assert!(matches!(query.build(&resolver, &cancel).await, Err(QueryError::NothingToBuild)));
    assert_eq!(query.state(), QueryState::Empty);

    query.set_compute_query(AxiomV2ComputeQuery::empty(0)).unwrap();
    assert!(matches!(query.build(&resolver, &cancel).await, Err(QueryError::NothingToBuild)));
    assert_eq!(query.state(), QueryState::Assembling);

    let report = query.validate(&resolver, &cancel).await;
    assert!(!report.is_valid);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::NothingToBuild);
}

#[tokio::test]
async fn test_empty_compute_query_returns_every_subquery() {
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::new(1));
    query.set_compute_query(AxiomV2ComputeQuery::empty(0)).unwrap();
    query.append(gas_used(18_200_000)).unwrap();
    query.append(gas_used(18_200_100)).unwrap();
    let built = query.build(&MockResolver::new(), &CancellationToken::new()).await.unwrap();
    assert_eq!(built.compute_query, AxiomV2ComputeQuery::empty(2));
    assert_eq!(built.callback.result_len, Some(2));
    assert_eq!(
        built.query_hash,
        h256("0xda1933a884934070a870d18243ec2f1a7efa869966c4cf52d03b179c998a4825")
    );
}

#[tokio::test]
async fn test_compute_query_without_subqueries() {
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    let compute_query = AxiomV2ComputeQuery {
        k: 14,
        result_len: 1,
        vkey: vec![H256::repeat_byte(0x11), H256::repeat_byte(0x22)],
        compute_proof: Bytes::from(vec![0xaa; 4]),
    };
    query.set_compute_query(compute_query.clone()).unwrap();
    let built = query.build(&MockResolver::new(), &CancellationToken::new()).await.unwrap();
    assert!(built.data_query_struct.subqueries.is_empty());
    assert_eq!(built.compute_query, compute_query);
    assert_ne!(built.query_schema, H256::zero());
}

#[test]
fn test_invalid_inputs_leave_query_unchanged() {
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    let inconsistent =
        AxiomV2ComputeQuery { vkey: vec![H256::repeat_byte(1)], ..AxiomV2ComputeQuery::empty(1) };
    assert!(matches!(
        query.set_compute_query(inconsistent),
        Err(QueryError::InvalidComputeQuery(_))
    ));
    let gap = HeaderSubquery { block_number: 1, field_idx: 30 };
    assert!(matches!(query.append(gap.clone()), Err(SubqueryError::FieldIndexOutOfRange(_))));
    assert!(query.append_all([gas_used(1), gap]).is_err());
    assert!(query.subqueries().is_empty());
    assert_eq!(query.state(), QueryState::Empty);
}

#[tokio::test]
async fn test_mutation_discards_built_query() {
    let resolver = MockResolver::new();
    let cancel = CancellationToken::new();
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    query.append(gas_used(100)).unwrap();
    let first = query.build(&resolver, &cancel).await.unwrap().clone();

    query.set_callback(AxiomV2Callback {
        target: Address::repeat_byte(0xca),
        function_selector: [0xde, 0xad, 0xbe, 0xef],
        result_len: None,
        extra_data: Bytes::default(),
    });
    assert_eq!(query.state(), QueryState::Assembling);
    assert!(query.built().is_none());
    let with_callback = query.build(&resolver, &cancel).await.unwrap().clone();
    assert_eq!(with_callback.query_hash, first.query_hash);
    assert_eq!(with_callback.callback.target, Address::repeat_byte(0xca));

    query.append(gas_used(101)).unwrap();
    assert!(query.built().is_none());
    let appended = query.build(&resolver, &cancel).await.unwrap();
    assert_ne!(appended.data_query_hash, first.data_query_hash);
    assert_eq!(appended.callback.result_len, Some(2));

    query.set_data_query([gas_used(100)]).unwrap();
    assert_eq!(query.state(), QueryState::Assembling);
    let replaced = query.build(&resolver, &cancel).await.unwrap();
    assert_eq!(replaced.data_query_hash, first.data_query_hash);
}

#[tokio::test]
async fn test_fee_options() {
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    query.append(gas_used(100)).unwrap();
    query.set_options(QueryOptions {
        max_fee_per_gas: Some(U256::from(3 * GWEI)),
        callback_gas_limit: Some(3_000_000),
    });
    let built = query.build(&MockResolver::new(), &CancellationToken::new()).await.unwrap();
    assert_eq!(built.fee_data.payment, U256::from(13_500_000_000_000_000u64));
    assert_eq!(built.fee_data.callback_gas_limit, 3_000_000);
}

#[tokio::test]
async fn test_fee_options_in_gwei() {
    let options = QueryOptions::from_gwei(Some(3.0), Some(3_000_000)).unwrap();
    assert_eq!(options, QueryOptions::parse_gwei(Some("3"), Some(3_000_000)).unwrap());
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    query.append(gas_used(100)).unwrap();
    query.set_options(options);
    let built = query.build(&MockResolver::new(), &CancellationToken::new()).await.unwrap();
    assert_eq!(built.fee_data.payment, U256::from(13_500_000_000_000_000u64));

    for gwei in [f64::NAN, f64::NEG_INFINITY, -0.5] {
        let err = QueryOptions::from_gwei(Some(gwei), None).unwrap_err();
        assert!(matches!(err, FeeError::InvalidFeeParameter { name: "maxFeePerGas", .. }));
    }
    assert!(QueryOptions::parse_gwei(Some("-1"), None).is_err());
    assert_eq!(QueryOptions::from_gwei(None, None).unwrap(), QueryOptions::default());
}

#[tokio::test]
async fn test_build_is_cached() {
    let tx_hash = H256::repeat_byte(7);
    let resolver = MockResolver::new()
        .with_position(tx_hash, position(10, 1))
        .with_transaction(position(10, 1), raw_tx(200));
    let cancel = CancellationToken::new();
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    query.append(builder::tx(tx_hash).field(TxField::To)).unwrap();
    let first = query.build(&resolver, &cancel).await.unwrap().clone();
    assert_eq!(resolver.calls(), 2);
    let second = query.build(&resolver, &cancel).await.unwrap();
    assert_eq!(&first, second);
    assert_eq!(resolver.calls(), 2);
    assert_eq!(
        first.data_query_struct.subqueries,
        vec![Subquery::from(TxSubquery {
            block_number: 10,
            tx_idx: 1,
            field_or_calldata_idx: TxField::To.idx()
        })]
    );
}

#[tokio::test(start_paused = true)]
async fn test_responses_keep_append_order() {
    let mut resolver = MockResolver::new();
    // later subqueries answer first
    for (i, block_number) in [30u32, 20, 10].into_iter().enumerate() {
        let tx_hash = H256::from_low_u64_be(block_number as u64);
        resolver = resolver
            .with_position(tx_hash, position(block_number, i as u16))
            .with_transaction(position(block_number, i as u16), raw_tx(100))
            .with_delay(block_number, Duration::from_millis(block_number as u64));
    }
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    for block_number in [30u64, 20, 10] {
        query.append(builder::tx(H256::from_low_u64_be(block_number)).tx_idx()).unwrap();
    }
    let built = query.build(&resolver, &CancellationToken::new()).await.unwrap();

    let completed = resolver.completed();
    assert_eq!(completed.first(), Some(&10));
    assert_eq!(completed.last(), Some(&30));
    let blocks: Vec<u32> = built
        .data_query_struct
        .subqueries
        .iter()
        .map(|subquery| {
            u32::from_be_bytes(subquery.encoded_subquery_data[..4].try_into().unwrap())
        })
        .collect();
    assert_eq!(blocks, [30, 20, 10]);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_build_is_retryable() {
    let tx_hash = H256::repeat_byte(1);
    let resolver = MockResolver::new()
        .with_position(tx_hash, position(10, 0))
        .with_transaction(position(10, 0), raw_tx(100))
        .with_delay(10, Duration::from_secs(10));
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    query.append(builder::receipt(tx_hash).field(ReceiptField::Status)).unwrap();
    query.append(builder::tx(tx_hash).field(TxField::Value)).unwrap();

    let cancel = CancellationToken::new();
    let (result, _) = tokio::join!(query.build(&resolver, &cancel), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });
    assert!(matches!(result, Err(QueryError::Cancelled)));
    assert_eq!(query.state(), QueryState::Assembling);
    assert!(query.built().is_none());

    // an already cancelled token fails before any request
    let calls = resolver.calls();
    assert!(matches!(query.build(&resolver, &cancel).await, Err(QueryError::Cancelled)));
    assert_eq!(resolver.calls(), calls);

    let resolver = resolver.with_receipt(position(10, 0), raw_receipt(2, 64));
    query.build(&resolver, &CancellationToken::new()).await.unwrap();
    assert_eq!(query.state(), QueryState::Built);
}

#[tokio::test(start_paused = true)]
async fn test_request_timeout() {
    let config = AxiomV2QueryConfig { request_timeout_ms: 100, ..Default::default() };
    let resolver = MockResolver::new()
        .with_transaction(position(10, 0), raw_tx(100))
        .with_delay(10, Duration::from_secs(1));
    let mut query = AxiomV2QueryBuilder::new(config);
    query.append(builder::tx_at(10, 0).unwrap().field(TxField::Nonce)).unwrap();
    let result = query.build(&resolver, &CancellationToken::new()).await;
    assert!(matches!(
        result,
        Err(QueryError::Timeout(timeout)) if timeout == Duration::from_millis(100)
    ));
    assert_eq!(query.state(), QueryState::Assembling);
}

#[tokio::test(start_paused = true)]
async fn test_validate_reports_timeouts_per_record() {
    let config = AxiomV2QueryConfig { request_timeout_ms: 100, ..Default::default() };
    let receipt = builder::receipt_at(17_000_000, 3).unwrap().field(ReceiptField::Status);
    let resolver = MockResolver::new()
        .with_transaction(position(10, 0), raw_tx(100))
        .with_delay(10, Duration::from_secs(1))
        .with_value(any(receipt.clone()), H256::from_low_u64_be(1))
        .with_receipt(position(17_000_000, 3), raw_receipt(500, 32));
    let mut query = AxiomV2QueryBuilder::new(config);
    query.append(builder::tx_at(10, 0).unwrap().field(TxField::Nonce)).unwrap();
    query.append(receipt).unwrap();
    query.append(gas_used(10)).unwrap();

    let report = query.validate(&resolver, &CancellationToken::new()).await;
    assert!(!report.is_valid);
    let found = report.diagnostics.iter().map(|d| (d.index, d.kind)).collect_vec();
    assert_eq!(
        found,
        vec![
            (Some(0), DiagnosticKind::TimedOut),
            (Some(1), DiagnosticKind::RecordTooLarge),
            (Some(2), DiagnosticKind::TimedOut),
        ]
    );

    // build still surfaces the first failure in append order
    let err = query.build(&resolver, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, QueryError::Timeout(timeout) if timeout == Duration::from_millis(100)));
    assert_eq!(query.state(), QueryState::Assembling);
}

#[test_log::test(tokio::test)]
async fn test_oversized_receipt_fails_validation() {
    let header = gas_used(17_000_000);
    let receipt = builder::receipt_at(17_000_000, 3).unwrap().field(ReceiptField::Status);
    let resolver = MockResolver::new()
        .with_value(header.clone(), H256::from_low_u64_be(21_000))
        .with_value(any(receipt.clone()), H256::from_low_u64_be(1))
        .with_receipt(position(17_000_000, 3), raw_receipt(500, 32));
    let cancel = CancellationToken::new();
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    query.append(header).unwrap();
    query.append(receipt).unwrap();

    let report = query.validate(&resolver, &cancel).await;
    assert!(!report.is_valid);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].index, Some(1));
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::RecordTooLarge);
    assert_eq!(query.state(), QueryState::Assembling);

    let err = query.build(&resolver, &cancel).await.unwrap_err();
    assert!(matches!(
        err,
        QueryError::Admission(AdmissionError::RecordTooLarge {
            subquery_type: SubqueryType::Receipt,
            size: 500,
            ..
        })
    ));
    assert_eq!(query.state(), QueryState::Assembling);
}

#[tokio::test]
async fn test_validate_accumulates_diagnostics() {
    let unknown = H256::repeat_byte(0xee);
    let receipt = builder::receipt_at(5, 0).unwrap().log(0).unwrap().topic(1).unwrap();
    let resolver = MockResolver::new()
        .with_value(any(receipt.clone()), H256::repeat_byte(2))
        .with_receipt(position(5, 0), raw_receipt(1, 20_000));
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    query.append(builder::tx(unknown).field(TxField::Data)).unwrap();
    query.append(gas_used(5)).unwrap();
    query.append(receipt).unwrap();

    let report = query.validate(&resolver, &CancellationToken::new()).await;
    assert!(!report.is_valid);
    let found: Vec<_> = report.diagnostics.iter().map(|d| (d.index, d.kind)).collect();
    assert_eq!(
        found,
        [
            (Some(0), DiagnosticKind::Unresolved),
            (Some(1), DiagnosticKind::FieldValue),
            (Some(2), DiagnosticKind::RecordTooLarge),
        ]
    );
}

#[tokio::test]
async fn test_build_reports_first_error_in_append_order() {
    let resolver = MockResolver::new().with_receipt(position(5, 0), raw_receipt(1, 20_000));
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    query.append(builder::receipt_at(5, 0).unwrap().field(ReceiptField::Status)).unwrap();
    query.append(builder::tx(H256::repeat_byte(0xee)).field(TxField::Data)).unwrap();
    let err = query.build(&resolver, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, QueryError::Admission(AdmissionError::RecordTooLarge { .. })));

    let resolver = MockResolver::new().with_receipt(position(5, 0), raw_receipt(1, 32));
    let err = query.build(&resolver, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        QueryError::Resolve { index: 1, source: crate::error::ResolverError::NotFound(_) }
    ));
}

#[test_log::test(tokio::test)]
async fn test_large_record_shrinks_capacity() {
    let resolver = MockResolver::new()
        .with_transaction(position(1, 0), raw_tx(100))
        .with_transaction(position(1, 1), raw_tx(100_000));
    let mut query = AxiomV2QueryBuilder::new(AxiomV2QueryConfig::default());
    query.append(builder::tx_at(1, 0).unwrap().field(TxField::To)).unwrap();
    query.append(builder::tx_at(1, 1).unwrap().field(TxField::To)).unwrap();
    let err = query.build(&resolver, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        QueryError::Admission(AdmissionError::CapacityExceeded {
            scope: CapacityScope::Type(SubqueryType::Transaction),
            count: 2,
            limit: 1,
            category: ConfigCategory::Max,
        })
    ));

    query.set_data_query([builder::tx_at(1, 1).unwrap().field(TxField::To)]).unwrap();
    let built = query.build(&resolver, &CancellationToken::new()).await.unwrap();
    assert_eq!(built.config_category, ConfigCategory::Max);
}
