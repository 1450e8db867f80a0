use axiom_codec::{
    field_idx::{
        check_account_field_idx, check_header_field_idx, check_mapping_depth,
        HEADER_FIELD_IDX_SPACE,
    },
    special_values::{
        HEADER_EXTRA_DATA_LEN_FIELD_IDX, HEADER_HASH_FIELD_IDX, HEADER_HEADER_SIZE_FIELD_IDX,
        HEADER_LOGS_BLOOM_FIELD_IDX_OFFSET,
    },
    types::native::{
        AccountField, AccountSubquery, HeaderField, HeaderSubquery, SolidityNestedMappingSubquery,
        StorageSubquery,
    },
    utils::native::h256_to_u256,
};
use ethers_core::types::{Address, U256};

use super::{offset_idx, IntoAddress, IntoWord};
use crate::error::SubqueryError;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct HeaderBuilder {
    block_number: u32,
}

impl HeaderBuilder {
    pub(super) fn new(block_number: u32) -> Self {
        Self { block_number }
    }

    fn build(self, field_idx: u32) -> HeaderSubquery {
        HeaderSubquery { block_number: self.block_number, field_idx }
    }

    pub fn field(self, field: HeaderField) -> HeaderSubquery {
        self.build(field.idx())
    }

    /// The block hash.
    pub fn hash(self) -> HeaderSubquery {
        self.build(HEADER_HASH_FIELD_IDX as u32)
    }

    /// Byte length of the RLP encoded header.
    pub fn header_size(self) -> HeaderSubquery {
        self.build(HEADER_HEADER_SIZE_FIELD_IDX as u32)
    }

    pub fn extra_data_len(self) -> HeaderSubquery {
        self.build(HEADER_EXTRA_DATA_LEN_FIELD_IDX as u32)
    }

    /// The `chunk`-th 32 byte chunk of the logs bloom.
    pub fn logs_bloom(self, chunk: u32) -> Result<HeaderSubquery, SubqueryError> {
        let field_idx = offset_idx(
            &HEADER_FIELD_IDX_SPACE,
            "logsBloom",
            HEADER_LOGS_BLOOM_FIELD_IDX_OFFSET,
            chunk,
        )?;
        Ok(self.build(field_idx))
    }

    /// Raw field index, for callers that already hold one.
    pub fn field_idx(self, field_idx: u32) -> Result<HeaderSubquery, SubqueryError> {
        check_header_field_idx(field_idx)?;
        Ok(self.build(field_idx))
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct AccountBuilder {
    block_number: u32,
}

impl AccountBuilder {
    pub(super) fn new(block_number: u32) -> Self {
        Self { block_number }
    }

    pub fn address(self, addr: impl IntoAddress) -> Result<AccountSubqueryBuilder, SubqueryError> {
        Ok(AccountSubqueryBuilder { block_number: self.block_number, addr: addr.into_address()? })
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct AccountSubqueryBuilder {
    block_number: u32,
    addr: Address,
}

impl AccountSubqueryBuilder {
    pub fn field(self, field: AccountField) -> AccountSubquery {
        AccountSubquery { block_number: self.block_number, addr: self.addr, field_idx: field.idx() }
    }

    pub fn field_idx(self, field_idx: u32) -> Result<AccountSubquery, SubqueryError> {
        check_account_field_idx(field_idx)?;
        Ok(AccountSubquery { block_number: self.block_number, addr: self.addr, field_idx })
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct StorageBuilder {
    block_number: u32,
}

impl StorageBuilder {
    pub(super) fn new(block_number: u32) -> Self {
        Self { block_number }
    }

    pub fn address(self, addr: impl IntoAddress) -> Result<StorageSubqueryBuilder, SubqueryError> {
        Ok(StorageSubqueryBuilder { block_number: self.block_number, addr: addr.into_address()? })
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct StorageSubqueryBuilder {
    block_number: u32,
    addr: Address,
}

impl StorageSubqueryBuilder {
    pub fn slot(self, slot: impl IntoWord) -> Result<StorageSubquery, SubqueryError> {
        Ok(StorageSubquery {
            block_number: self.block_number,
            addr: self.addr,
            slot: h256_to_u256(&slot.into_word()?),
        })
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct MappingBuilder {
    block_number: u32,
}

impl MappingBuilder {
    pub(super) fn new(block_number: u32) -> Self {
        Self { block_number }
    }

    pub fn address(self, addr: impl IntoAddress) -> Result<MappingSlotBuilder, SubqueryError> {
        Ok(MappingSlotBuilder { block_number: self.block_number, addr: addr.into_address()? })
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct MappingSlotBuilder {
    block_number: u32,
    addr: Address,
}

impl MappingSlotBuilder {
    /// Storage slot of the outermost mapping variable.
    pub fn slot(self, mapping_slot: impl IntoWord) -> Result<MappingSubqueryBuilder, SubqueryError> {
        Ok(MappingSubqueryBuilder {
            block_number: self.block_number,
            addr: self.addr,
            mapping_slot: h256_to_u256(&mapping_slot.into_word()?),
        })
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct MappingSubqueryBuilder {
    block_number: u32,
    addr: Address,
    mapping_slot: U256,
}

impl MappingSubqueryBuilder {
    /// One key per nesting level, outermost first. The depth is the number of keys.
    pub fn keys<K: IntoWord>(
        self,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<SolidityNestedMappingSubquery, SubqueryError> {
        let keys = keys.into_iter().map(IntoWord::into_word).collect::<Result<Vec<_>, _>>()?;
        check_mapping_depth(keys.len(), keys.len())?;
        Ok(SolidityNestedMappingSubquery {
            block_number: self.block_number,
            addr: self.addr,
            mapping_slot: self.mapping_slot,
            mapping_depth: keys.len() as u8,
            keys,
        })
    }
}
