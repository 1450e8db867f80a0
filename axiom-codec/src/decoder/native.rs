use std::io::{self, Read, Result};

use byteorder::{BigEndian, ReadBytesExt};
use ethers_core::types::Bytes;

use crate::{
    constants::MAX_SOLIDITY_MAPPING_KEYS,
    field_idx::check_subquery,
    types::native::{
        AccountSubquery, AnySubquery, AxiomV2DataQuery, HeaderSubquery, ReceiptSubquery,
        SolidityNestedMappingSubquery, StorageSubquery, Subquery, SubqueryType, TxSubquery,
    },
    utils::reader::{read_address, read_h256, read_u256},
};

impl TryFrom<Subquery> for AnySubquery {
    type Error = io::Error;

    fn try_from(subquery: Subquery) -> Result<Self> {
        let mut reader = &subquery.encoded_subquery_data[..];
        let subquery_type = subquery.subquery_type;
        let decoded = match subquery_type {
            SubqueryType::Header => AnySubquery::Header(decode_header_subquery(&mut reader)?),
            SubqueryType::Account => AnySubquery::Account(decode_account_subquery(&mut reader)?),
            SubqueryType::Storage => AnySubquery::Storage(decode_storage_subquery(&mut reader)?),
            SubqueryType::Transaction => AnySubquery::Transaction(decode_tx_subquery(&mut reader)?),
            SubqueryType::Receipt => AnySubquery::Receipt(decode_receipt_subquery(&mut reader)?),
            SubqueryType::SolidityNestedMapping => AnySubquery::SolidityNestedMapping(
                decode_solidity_nested_mapping_subquery(&mut reader)?,
            ),
        };
        if !reader.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} trailing bytes after {subquery_type} subquery", reader.len()),
            ));
        }
        Ok(decoded)
    }
}

impl TryFrom<u16> for SubqueryType {
    type Error = io::Error;
    fn try_from(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Self::Header),
            2 => Ok(Self::Account),
            3 => Ok(Self::Storage),
            4 => Ok(Self::Transaction),
            5 => Ok(Self::Receipt),
            6 => Ok(Self::SolidityNestedMapping),
            _ => Err(io::Error::new(io::ErrorKind::InvalidData, "Invalid SubqueryType")),
        }
    }
}

/// Inverse of [AxiomV2DataQuery::encode]. Subqueries are split using the fixed width of each type.
pub fn decode_data_query(mut reader: impl Read) -> Result<AxiomV2DataQuery> {
    let source_chain_id = reader.read_u64::<BigEndian>()?;
    let num_subqueries = reader.read_u16::<BigEndian>()?;
    let mut subqueries = Vec::with_capacity(num_subqueries as usize);
    for _ in 0..num_subqueries {
        let subquery_type: SubqueryType = reader.read_u16::<BigEndian>()?.try_into()?;
        let subquery = match subquery_type {
            SubqueryType::Header => Subquery::from(decode_header_subquery(&mut reader)?),
            SubqueryType::Account => Subquery::from(decode_account_subquery(&mut reader)?),
            SubqueryType::Storage => Subquery::from(decode_storage_subquery(&mut reader)?),
            SubqueryType::Transaction => Subquery::from(decode_tx_subquery(&mut reader)?),
            SubqueryType::Receipt => Subquery::from(decode_receipt_subquery(&mut reader)?),
            SubqueryType::SolidityNestedMapping => {
                Subquery::from(decode_solidity_nested_mapping_subquery(&mut reader)?)
            }
        };
        subqueries.push(subquery);
    }
    let mut trailing = [0u8; 1];
    if reader.read(&mut trailing)? != 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "trailing bytes after data query"));
    }
    Ok(AxiomV2DataQuery { source_chain_id, subqueries })
}

/// Decodes one `subqueryType ‖ data` record and range checks its indices.
pub fn decode_subquery(mut reader: impl Read) -> Result<AnySubquery> {
    let subquery_type = reader.read_u16::<BigEndian>()?;
    let subquery_type = subquery_type.try_into()?;
    let mut buf = vec![];
    reader.read_to_end(&mut buf)?;
    let encoded_subquery_data = Bytes::from(buf);
    let subquery: AnySubquery = Subquery { subquery_type, encoded_subquery_data }.try_into()?;
    check_subquery(&subquery).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    Ok(subquery)
}

pub fn decode_header_subquery(mut reader: impl Read) -> Result<HeaderSubquery> {
    let block_number = reader.read_u32::<BigEndian>()?;
    let field_idx = reader.read_u32::<BigEndian>()?;
    Ok(HeaderSubquery { block_number, field_idx })
}

pub fn decode_account_subquery(mut reader: impl Read) -> Result<AccountSubquery> {
    let block_number = reader.read_u32::<BigEndian>()?;
    let addr = read_address(&mut reader)?;
    let field_idx = reader.read_u32::<BigEndian>()?;
    Ok(AccountSubquery { block_number, addr, field_idx })
}

pub fn decode_storage_subquery(mut reader: impl Read) -> Result<StorageSubquery> {
    let block_number = reader.read_u32::<BigEndian>()?;
    let addr = read_address(&mut reader)?;
    let slot = read_u256(&mut reader)?;
    Ok(StorageSubquery { block_number, addr, slot })
}

pub fn decode_tx_subquery(mut reader: impl Read) -> Result<TxSubquery> {
    let block_number = reader.read_u32::<BigEndian>()?;
    let tx_idx = reader.read_u16::<BigEndian>()?;
    let field_or_calldata_idx = reader.read_u32::<BigEndian>()?;
    Ok(TxSubquery { block_number, tx_idx, field_or_calldata_idx })
}

pub fn decode_receipt_subquery(mut reader: impl Read) -> Result<ReceiptSubquery> {
    let block_number = reader.read_u32::<BigEndian>()?;
    let tx_idx = reader.read_u16::<BigEndian>()?;
    let field_or_log_idx = reader.read_u32::<BigEndian>()?;
    let topic_or_data_or_address_idx = reader.read_u32::<BigEndian>()?;
    let event_schema = read_h256(&mut reader)?;
    Ok(ReceiptSubquery {
        block_number,
        tx_idx,
        field_or_log_idx,
        topic_or_data_or_address_idx,
        event_schema,
    })
}

pub fn decode_solidity_nested_mapping_subquery(
    mut reader: impl Read,
) -> Result<SolidityNestedMappingSubquery> {
    let block_number = reader.read_u32::<BigEndian>()?;
    let addr = read_address(&mut reader)?;
    let mapping_slot = read_u256(&mut reader)?;
    let mapping_depth = reader.read_u8()?;
    if mapping_depth == 0 || mapping_depth as usize > MAX_SOLIDITY_MAPPING_KEYS {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "SolidityNestedMappingSubquery mapping_depth {} not in 1..={}",
                mapping_depth, MAX_SOLIDITY_MAPPING_KEYS
            ),
        ));
    }
    let mut keys = Vec::with_capacity(mapping_depth as usize);
    for _ in 0..mapping_depth {
        keys.push(read_h256(&mut reader)?);
    }
    Ok(SolidityNestedMappingSubquery { block_number, addr, mapping_slot, mapping_depth, keys })
}
