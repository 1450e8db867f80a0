use ethers_core::types::{Address, H256, U256};

pub fn u256_to_h256(input: &U256) -> H256 {
    let mut bytes = [0; 32];
    input.to_big_endian(&mut bytes);
    H256(bytes)
}

pub fn h256_to_u256(input: &H256) -> U256 {
    U256::from_big_endian(input.as_bytes())
}

/// Left pads `addr` to 32 bytes, the way the EVM stores an address in a word.
pub fn address_to_h256(addr: &Address) -> H256 {
    let mut bytes = [0u8; 32];
    bytes[12..].copy_from_slice(addr.as_bytes());
    H256(bytes)
}

/// Left pads a big endian value of at most 32 bytes.
pub fn left_pad_to_h256(bytes: &[u8]) -> Option<H256> {
    if bytes.len() > 32 {
        return None;
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(bytes);
    Some(H256(word))
}
