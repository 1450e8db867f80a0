//! Fluent construction of subqueries.
//!
//! Every step returns a new immutable value and validates its input immediately, so a finished
//! record is always in range. Terminal calls return the codec subquery structs (or a
//! [crate::subquery::TxSubqueryRequest] / [crate::subquery::ReceiptSubqueryRequest] when the
//! transaction may still be referenced by hash), all of which convert into
//! [crate::subquery::DataSubquery].
//!
//! ```ignore
//! let gas_used = header(17_000_000)?.field(HeaderField::GasUsed);
//! let balance = account(17_000_000)?.address("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")?
//!     .field(AccountField::Balance);
//! let transfer_to = receipt(tx_hash).log(0)?.event_schema(transfer_schema)?.topic(2)?;
//! ```
use axiom_codec::{
    field_idx::{FieldIdxError, FieldIdxKind, FieldIdxSpace},
    types::native::{TxPosition, TxRef},
    utils::native::{address_to_h256, u256_to_h256},
};
use ethers_core::types::{Address, H256, U256};

use crate::error::SubqueryError;

mod block;
mod tx;


pub use block::{
    AccountBuilder, AccountSubqueryBuilder, HeaderBuilder, MappingBuilder, MappingSlotBuilder,
    MappingSubqueryBuilder, StorageBuilder, StorageSubqueryBuilder,
};
pub use tx::{ReceiptBuilder, ReceiptLogBuilder, TxBuilder};

pub fn header(block_number: u64) -> Result<HeaderBuilder, SubqueryError> {
    Ok(HeaderBuilder::new(to_block_number(block_number)?))
}

pub fn account(block_number: u64) -> Result<AccountBuilder, SubqueryError> {
    Ok(AccountBuilder::new(to_block_number(block_number)?))
}

pub fn storage(block_number: u64) -> Result<StorageBuilder, SubqueryError> {
    Ok(StorageBuilder::new(to_block_number(block_number)?))
}

pub fn mapping(block_number: u64) -> Result<MappingBuilder, SubqueryError> {
    Ok(MappingBuilder::new(to_block_number(block_number)?))
}

/// Transaction subquery for a transaction given by hash or by position.
pub fn tx(tx: impl Into<TxRef>) -> TxBuilder {
    TxBuilder::new(tx.into())
}

/// Transaction subquery for the `tx_idx`-th transaction of block `block_number`.
pub fn tx_at(block_number: u64, tx_idx: u64) -> Result<TxBuilder, SubqueryError> {
    Ok(TxBuilder::new(to_tx_position(block_number, tx_idx)?.into()))
}

pub fn receipt(tx: impl Into<TxRef>) -> ReceiptBuilder {
    ReceiptBuilder::new(tx.into())
}

pub fn receipt_at(block_number: u64, tx_idx: u64) -> Result<ReceiptBuilder, SubqueryError> {
    Ok(ReceiptBuilder::new(to_tx_position(block_number, tx_idx)?.into()))
}

pub(crate) fn to_block_number(block_number: u64) -> Result<u32, SubqueryError> {
    block_number.try_into().map_err(|_| SubqueryError::BlockNumberOutOfRange(block_number))
}

pub(crate) fn to_tx_position(block_number: u64, tx_idx: u64) -> Result<TxPosition, SubqueryError> {
    Ok(TxPosition {
        block_number: to_block_number(block_number)?,
        tx_idx: tx_idx.try_into().map_err(|_| SubqueryError::TxIdxOutOfRange(tx_idx))?,
    })
}

/// `offset + index`, provided it lands inside the partition called `name`.
pub(crate) fn offset_idx(
    space: &FieldIdxSpace,
    name: &str,
    offset: usize,
    index: u32,
) -> Result<u32, SubqueryError> {
    let idx = (offset as u32).saturating_add(index);
    match space.check(idx)? {
        FieldIdxKind::Offset { name: found, index: found_index }
            if found == name && found_index == index =>
        {
            Ok(idx)
        }
        _ => Err(FieldIdxError::OutOfRange {
            subquery_type: space.subquery_type,
            index_name: space.index_name,
            field_idx: idx,
            valid: space.to_string(),
        }
        .into()),
    }
}

/// Values usable as a 20 byte account address.
pub trait IntoAddress {
    fn into_address(self) -> Result<Address, SubqueryError>;
}

impl IntoAddress for Address {
    fn into_address(self) -> Result<Address, SubqueryError> {
        Ok(self)
    }
}

impl IntoAddress for &str {
    /// Accepts `0x` followed by exactly 40 hex characters, in any case.
    fn into_address(self) -> Result<Address, SubqueryError> {
        let invalid = || SubqueryError::InvalidAddressFormat(self.to_string());
        let digits = self.strip_prefix("0x").ok_or_else(invalid)?;
        if digits.len() != 40 {
            return Err(invalid());
        }
        let bytes = hex::decode(digits).map_err(|_| invalid())?;
        Ok(Address::from_slice(&bytes))
    }
}

impl IntoAddress for &String {
    fn into_address(self) -> Result<Address, SubqueryError> {
        self.as_str().into_address()
    }
}

impl IntoAddress for String {
    fn into_address(self) -> Result<Address, SubqueryError> {
        self.as_str().into_address()
    }
}

/// Values usable as a 32 byte word: storage slots, mapping keys, event schemas.
pub trait IntoWord {
    fn into_word(self) -> Result<H256, SubqueryError>;
}

impl IntoWord for H256 {
    fn into_word(self) -> Result<H256, SubqueryError> {
        Ok(self)
    }
}

impl IntoWord for U256 {
    fn into_word(self) -> Result<H256, SubqueryError> {
        Ok(u256_to_h256(&self))
    }
}

impl IntoWord for u64 {
    fn into_word(self) -> Result<H256, SubqueryError> {
        U256::from(self).into_word()
    }
}

impl IntoWord for Address {
    /// Left padded, the way Solidity stores an address key.
    fn into_word(self) -> Result<H256, SubqueryError> {
        Ok(address_to_h256(&self))
    }
}

impl IntoWord for &str {
    /// Accepts `0x` followed by 1 to 64 hex characters, left padded to 32 bytes.
    fn into_word(self) -> Result<H256, SubqueryError> {
        let invalid = || SubqueryError::InvalidSlotEncoding(self.to_string());
        let digits = self.strip_prefix("0x").ok_or_else(invalid)?;
        if digits.is_empty() || digits.len() > 64 {
            return Err(invalid());
        }
        let padded = format!("{digits:0>64}");
        let bytes = hex::decode(padded).map_err(|_| invalid())?;
        Ok(H256::from_slice(&bytes))
    }
}

impl IntoWord for &String {
    fn into_word(self) -> Result<H256, SubqueryError> {
        self.as_str().into_word()
    }
}

impl IntoWord for String {
    fn into_word(self) -> Result<H256, SubqueryError> {
        self.as_str().into_word()
    }
}
