use std::sync::Arc;

use ethereum_types::{H160, H256, U256};

use crate::hardfork::Hardfork;
use crate::state::ForkSource;

/// Which concrete engine backs the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// revm-backed adapter. No fork support, message-level traces only.
    Native,
    /// SputnikVM-backed adapter. Fork support and full step traces.
    Interpreted,
}

/// One account seeded into the genesis state.
#[derive(Debug, Clone)]
pub struct GenesisAccount {
    pub address: H160,
    pub balance: U256,
    pub nonce: U256,
    pub code: Vec<u8>,
    pub storage: Vec<(H256, H256)>,
}

impl GenesisAccount {
    pub fn with_balance(address: H160, balance: U256) -> Self {
        GenesisAccount {
            address,
            balance,
            nonce: U256::zero(),
            code: vec![],
            storage: vec![],
        }
    }
}

/// Remote chain the adapter diverges from.
#[derive(Clone)]
pub struct ForkSettings {
    pub source: Arc<dyn ForkSource>,
    /// Height at which local execution diverges from the remote chain.
    pub block_number: u64,
    /// Network id reported by the remote node.
    pub network_id: u64,
}

/// Adapter construction parameters.
#[derive(Clone)]
pub struct VmConfig {
    pub backend: BackendKind,
    pub chain_id: u64,
    pub network_id: u64,
    /// Rules for blocks the selector has no better answer for.
    pub hardfork: Hardfork,
    pub genesis: Vec<GenesisAccount>,
    pub allow_unlimited_contract_size: bool,
    pub fork: Option<ForkSettings>,
}

impl VmConfig {
    pub fn new(backend: BackendKind, chain_id: u64, hardfork: Hardfork) -> Self {
        VmConfig {
            backend,
            chain_id,
            network_id: chain_id,
            hardfork,
            genesis: vec![],
            allow_unlimited_contract_size: false,
            fork: None,
        }
    }
}

/// The chain rule set the adapter currently runs, as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSpec {
    pub chain_id: u64,
    pub network_id: u64,
    pub hardfork: Hardfork,
}
