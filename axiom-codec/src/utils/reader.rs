use std::io::{Read, Result};

use ethers_core::types::{Address, H256, U256};

pub fn read_address(reader: &mut impl Read) -> Result<Address> {
    let mut addr = [0u8; 20];
    reader.read_exact(&mut addr)?;
    Ok(Address::from_slice(&addr))
}

pub fn read_u256(reader: &mut impl Read) -> Result<U256> {
    let mut word = [0u8; 32];
    reader.read_exact(&mut word)?;
    Ok(U256::from_big_endian(&word))
}

pub fn read_h256(reader: &mut impl Read) -> Result<H256> {
    let mut hash = [0u8; 32];
    reader.read_exact(&mut hash)?;
    Ok(H256(hash))
}
