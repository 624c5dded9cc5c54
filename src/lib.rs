mod adapter;
mod block;
mod common;
mod config;
mod err;
mod exit;
mod hardfork;
mod receipt;
pub mod state;
pub mod tracing;
mod transaction;
mod vm;

pub use adapter::{
    BasicAccount, BlockHashProvider, BlockHashProviderMock, RunTxResult, VmAdapter,
};
pub use block::BlockContext;
pub use config::{BackendKind, ChainSpec, ForkSettings, GenesisAccount, VmConfig};
pub use err::{ConfigError, Error};
pub use exit::{Exit, HaltCode, SuccessReason};
pub use hardfork::{fixed_selector, Hardfork, HardforkSelector};
pub use receipt::{bloom_for_logs, Log, Receipt, ReceiptOutcome};
pub use state::ForkSource;
pub use transaction::{AccessList, Eip1559Tx, Eip2930Tx, LegacyTx, TypedTransaction};
pub use vm::{create, InterpVm, NativeVm};
