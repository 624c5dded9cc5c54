use ethereum_types::{H256, U256};

use crate::state;

/// Unsupported or incoherent adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("the native backend does not support forked configurations")]
    ForkingUnsupported,
    #[error("mixHash is required for blocks at or after the merge hardfork")]
    MixHashRequired,
    #[error("baseFeePerGas is required for blocks at or after the london hardfork")]
    BaseFeeRequired,
}

/// Crate-level error taxonomy. EVM-semantic outcomes (reverts, halts) are
/// never errors; they are carried inside `RunTxResult`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid block lifecycle: {0}")]
    BlockLifecycle(&'static str),
    #[error("unknown state root: {0:?}")]
    UnknownStateRoot(H256),
    #[error("invalid transaction nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: U256, got: U256 },
    #[error("sender balance {balance} cannot cover transaction cost {cost}")]
    InsufficientBalance { balance: U256, cost: U256 },
    #[error("transaction gas limit {tx_gas} exceeds remaining block gas {block_gas}")]
    BlockGasLimitReached { tx_gas: U256, block_gas: U256 },
    #[error("effective gas price {effective} is below the block basefee {base_fee}")]
    FeeTooLow { effective: U256, base_fee: U256 },
    #[error(transparent)]
    State(#[from] state::Error),
    #[error("backend execution failed: {0}")]
    BackendExecution(String),
}
