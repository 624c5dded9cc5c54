use ethereum_types::{Bloom, H160, H256, U256};
use hashbrown::HashMap;

use crate::block::BlockContext;
use crate::config::ChainSpec;
use crate::err::Error;
use crate::exit::Exit;
use crate::hardfork::Hardfork;
use crate::receipt::{bloom_for_logs, Log, Receipt, ReceiptOutcome};
use crate::tracing::{DynTracer, LastTrace};
use crate::transaction::TypedTransaction;

/// Hash lookup the BLOCKHASH opcode is served from. Implemented by the
/// blockchain store that sits next to the adapter.
pub trait BlockHashProvider: Send + Sync {
    fn block_hash(&self, number: U256) -> H256;
}

/// In-memory `BlockHashProvider` for tests and demos.
#[derive(Default)]
pub struct BlockHashProviderMock {
    hashes: HashMap<U256, H256>,
}

impl BlockHashProviderMock {
    pub fn set(&mut self, number: U256, hash: H256) {
        self.hashes.insert(number, hash);
    }
}

impl BlockHashProvider for BlockHashProviderMock {
    fn block_hash(&self, number: U256) -> H256 {
        *self.hashes.get(&number).unwrap_or(&H256::zero())
    }
}

/// Account data as exposed through the adapter's simple readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAccount {
    pub balance: U256,
    pub nonce: U256,
    pub code_hash: H256,
}

/// Normalized outcome of one executed transaction.
#[derive(Debug, Clone)]
pub struct RunTxResult {
    pub exit: Exit,
    pub gas_used: U256,
    pub return_value: Vec<u8>,
    pub created_address: Option<H160>,
    pub logs: Vec<Log>,
    pub bloom: Bloom,
    pub receipt: Receipt,
}

impl RunTxResult {
    pub(crate) fn assemble(
        exit: Exit,
        gas_used: u64,
        return_value: Vec<u8>,
        created_address: Option<H160>,
        logs: Vec<Log>,
        receipt_outcome: ReceiptOutcome,
        cumulative_gas: U256,
    ) -> RunTxResult {
        let bloom = bloom_for_logs(&logs);
        RunTxResult {
            exit,
            gas_used: U256::from(gas_used),
            return_value,
            created_address,
            bloom,
            receipt: Receipt::new(receipt_outcome, cumulative_gas, logs.clone()),
            logs,
        }
    }
}

/// Validation steps a run may bypass. Dry runs skip all of them.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TxRunSkips {
    pub nonce: bool,
    pub balance: bool,
    pub block_gas_limit: bool,
    /// Skip the effective-price-vs-basefee check. Dry runs price against a
    /// substituted basefee, so the block's real one must not reject them.
    pub base_fee: bool,
}

impl TxRunSkips {
    pub(crate) fn all() -> TxRunSkips {
        TxRunSkips {
            nonce: true,
            balance: true,
            block_gas_limit: true,
            base_fee: true,
        }
    }
}

/// The polymorphic execution surface of the node. Two concrete backends
/// implement it; the provider holds it by this trait only.
///
/// Entered by one caller at a time; there is no internal locking.
pub trait VmAdapter {
    /// Run `tx` as if in `block` without mutating committed state. The
    /// chain configuration is derived from `block.number` for the duration
    /// of the call and restored on every exit path.
    fn dry_run(
        &mut self,
        tx: &TypedTransaction,
        block: &BlockContext,
        force_base_fee_zero: bool,
    ) -> Result<RunTxResult, Error>;

    /// Open the block checkpoint. At most one may be open.
    fn start_block(&mut self) -> Result<(), Error>;

    /// Execute `tx` into the open block checkpoint.
    fn run_tx_in_block(
        &mut self,
        tx: &TypedTransaction,
        block: &BlockContext,
    ) -> Result<RunTxResult, Error>;

    /// Credit each `(address, reward)` to balance, creating absent accounts.
    fn add_block_rewards(&mut self, rewards: &[(H160, U256)]) -> Result<(), Error>;

    /// Commit the open block checkpoint.
    fn seal_block(&mut self) -> Result<(), Error>;

    /// Discard the open block checkpoint, restoring the state root captured
    /// by `start_block`.
    fn revert_block(&mut self) -> Result<(), Error>;

    fn account(&mut self, address: &H160) -> Result<Option<BasicAccount>, Error>;

    fn contract_storage(&mut self, address: &H160, key: &H256) -> Result<H256, Error>;

    fn contract_code(&mut self, address: &H160) -> Result<Vec<u8>, Error>;

    fn put_account(&mut self, address: &H160, balance: U256, nonce: U256) -> Result<(), Error>;

    fn put_contract_code(&mut self, address: &H160, code: Vec<u8>) -> Result<(), Error>;

    fn put_contract_storage(
        &mut self,
        address: &H160,
        key: H256,
        value: H256,
    ) -> Result<(), Error>;

    /// Empty according to EIP-161.
    fn account_is_empty(&mut self, address: &H160) -> Result<bool, Error>;

    /// Deterministic root over the committed account/storage/code maps.
    fn state_root(&mut self) -> Result<H256, Error>;

    /// Jump the working state to `root`. Fails with `UnknownStateRoot` when
    /// the root has never been observed.
    fn set_state_root(&mut self, root: &H256) -> Result<(), Error>;

    /// Current root as a lightweight reference to committed state; does not
    /// mutate the working set.
    fn make_snapshot(&mut self) -> Result<H256, Error>;

    /// Return to a snapshot. Fork-backed stores additionally need the block
    /// height to decide whether reads proxy to the remote node.
    fn restore_context(&mut self, root: &H256, block_number: Option<u64>) -> Result<(), Error>;

    /// Point the working state at `block`'s post-state, or at
    /// `irregular_state_root` when that block's state was patched outside
    /// consensus.
    fn set_block_context(
        &mut self,
        block: &BlockContext,
        irregular_state_root: Option<H256>,
    ) -> Result<(), Error>;

    /// Attach the debug tracer; at most one at a time, the newest wins.
    fn set_debug_tracer(&mut self, tracer: Box<dyn DynTracer>);

    /// Detach the debug tracer. Returns whether one was attached.
    fn remove_debug_tracer(&mut self) -> bool;

    /// Most recent top-level message trace and any captured tracer error.
    fn last_trace(&self) -> LastTrace;

    /// Zero the error slot without dropping traces.
    fn clear_last_error(&mut self);

    fn select_hardfork(&self, block_number: u64) -> Hardfork;

    /// Whether the currently configured rules are at or past `fork`.
    fn gte_hardfork(&self, fork: Hardfork) -> bool;

    fn chain_spec(&self) -> ChainSpec;

    /// EIP-2929 access-list warmth. Backends that cannot answer cheaply may
    /// return `true` conservatively.
    fn is_warmed_address(&self, address: &H160) -> bool;
}
