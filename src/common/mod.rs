pub mod hash;

use ethereum_types::{H160, H256, U256};

/// Bridging helpers between the crate-wide `ethereum-types` primitives and
/// the alloy-style primitives used by the native engine.
pub fn to_native_address(address: &H160) -> revm::primitives::Address {
    revm::primitives::Address::from_slice(address.as_bytes())
}

pub fn from_native_address(address: &revm::primitives::Address) -> H160 {
    H160::from_slice(address.as_slice())
}

pub fn to_native_hash(hash: &H256) -> revm::primitives::B256 {
    revm::primitives::B256::from_slice(hash.as_bytes())
}

pub fn from_native_hash(hash: &revm::primitives::B256) -> H256 {
    H256::from_slice(hash.as_slice())
}

pub fn to_native_u256(value: &U256) -> revm::primitives::U256 {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    revm::primitives::U256::from_be_bytes(buf)
}

pub fn from_native_u256(value: &revm::primitives::U256) -> U256 {
    U256::from_big_endian(&value.to_be_bytes::<32>())
}
