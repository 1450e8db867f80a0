use axiom_codec::{types::native::AccountField, utils::native::u256_to_h256};
use ethers_core::{
    types::{EIP1186ProofResponse, H256, U256},
    utils::keccak256,
};

use crate::error::ResolverError;

/// Value of an account subquery, read from an `eth_getProof` response.
pub fn account_field_value(
    proof: &EIP1186ProofResponse,
    field_idx: u32,
) -> Result<H256, ResolverError> {
    let field = AccountField::try_from(field_idx)
        .map_err(|idx| ResolverError::Unsupported(format!("account field {idx}")))?;
    Ok(match field {
        AccountField::Nonce => u256_to_h256(&U256::from(proof.nonce.as_u64())),
        AccountField::Balance => u256_to_h256(&proof.balance),
        AccountField::StorageRoot => proof.storage_hash,
        AccountField::CodeHash => proof.code_hash,
    })
}

/// Storage slot of `mapping[keys[0]][keys[1]]...` for a mapping declared at `mapping_slot`.
pub fn nested_mapping_slot(mapping_slot: U256, keys: &[H256]) -> H256 {
    keys.iter().fold(u256_to_h256(&mapping_slot), |slot, key| {
        H256(keccak256([key.as_bytes(), slot.as_bytes()].concat()))
    })
}
