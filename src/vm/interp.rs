use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use ethereum_types::{H160, H256, U256};
use evm::backend::{Apply, ApplyBackend, Backend, Basic};
use evm::executor::stack::{MemoryStackState, PrecompileFn, StackExecutor, StackSubstateMetadata};
use hashbrown::HashSet;
use log::{debug, trace};
use rlp::RlpStream;

use crate::adapter::{BasicAccount, BlockHashProvider, RunTxResult, TxRunSkips, VmAdapter};
use crate::block::BlockContext;
use crate::common::hash;
use crate::config::{ChainSpec, VmConfig};
use crate::err::Error;
use crate::exit::Exit;
use crate::hardfork::{Hardfork, HardforkSelector};
use crate::receipt::{Log, ReceiptOutcome};
use crate::state::{JournalState, MemoryDB};
use crate::tracing::{DynTracer, LastTrace, TraceBus};
use crate::transaction::TypedTransaction;
use crate::vm::listener::{ExecutorListener, GasListener, ListenerCore, RuntimeListener};

/// Address of the contract a creation transaction deploys:
/// `keccak(rlp([sender, nonce]))[12..]`.
pub fn create_address(sender: &H160, nonce: &U256) -> H160 {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    stream.append(nonce);
    let digest = hash::summary(stream.as_raw());
    H160::from_slice(&digest[12..])
}

struct OpenBlock {
    root_before: H256,
    cumulative_gas: U256,
}

/// Engine-facing view of one transaction's environment. Reads delegate to
/// the journal; failed reads degrade to zero values and are logged, since
/// the engine interface cannot carry errors.
struct ExecBackend {
    journal: Rc<RefCell<JournalState<MemoryDB>>>,
    blockchain: Arc<dyn BlockHashProvider>,
    block: BlockContext,
    randomness: Option<H256>,
    chain_id: U256,
    origin: H160,
    gas_price: U256,
    touched: RefCell<HashSet<H160>>,
}

impl Backend for ExecBackend {
    fn gas_price(&self) -> U256 {
        self.gas_price
    }

    fn origin(&self) -> H160 {
        self.origin
    }

    fn block_hash(&self, number: U256) -> H256 {
        self.blockchain.block_hash(number)
    }

    fn block_number(&self) -> U256 {
        self.block.number
    }

    fn block_coinbase(&self) -> H160 {
        self.block.coinbase
    }

    fn block_timestamp(&self) -> U256 {
        self.block.timestamp
    }

    fn block_difficulty(&self) -> U256 {
        if self.randomness.is_some() {
            U256::zero()
        } else {
            self.block.clamped_difficulty()
        }
    }

    fn block_randomness(&self) -> Option<H256> {
        self.randomness
    }

    fn block_gas_limit(&self) -> U256 {
        self.block.gas_limit
    }

    fn block_base_fee_per_gas(&self) -> U256 {
        self.block.base_fee.unwrap_or_default()
    }

    fn chain_id(&self) -> U256 {
        self.chain_id
    }

    fn exists(&self, address: H160) -> bool {
        self.journal.borrow().exists(&address).unwrap_or_else(|e| {
            log::error!("state read failed for {:?}: {}", address, e);
            false
        })
    }

    fn basic(&self, address: H160) -> Basic {
        let journal = self.journal.borrow();
        Basic {
            balance: journal.balance(&address).unwrap_or_else(|e| {
                log::error!("state read failed for {:?}: {}", address, e);
                U256::zero()
            }),
            nonce: journal.nonce(&address).unwrap_or_default(),
        }
    }

    fn code(&self, address: H160) -> Vec<u8> {
        self.journal.borrow().code(&address).unwrap_or_default()
    }

    fn storage(&self, address: H160, index: H256) -> H256 {
        self.journal
            .borrow()
            .storage_at(&address, &index)
            .unwrap_or_default()
    }

    fn original_storage(&self, address: H160, index: H256) -> Option<H256> {
        Some(self.storage(address, index))
    }
}

impl ApplyBackend for ExecBackend {
    fn apply<A, I, L>(&mut self, values: A, _logs: L, delete_empty: bool)
    where
        A: IntoIterator<Item = Apply<I>>,
        I: IntoIterator<Item = (H256, H256)>,
        L: IntoIterator<Item = evm::backend::Log>,
    {
        let mut journal = self.journal.borrow_mut();
        let mut touched = self.touched.borrow_mut();
        let result: Result<(), crate::state::Error> = (|| {
            for change in values {
                match change {
                    Apply::Modify {
                        address,
                        basic,
                        code,
                        storage,
                        reset_storage,
                    } => {
                        touched.insert(address);
                        journal.set_balance(&address, basic.balance)?;
                        journal.set_nonce(&address, basic.nonce)?;
                        if let Some(code) = code {
                            journal.set_code(&address, code)?;
                        }
                        if reset_storage {
                            journal.reset_storage(&address)?;
                        }
                        for (key, value) in storage {
                            journal.set_storage(&address, key, value)?;
                        }
                    }
                    Apply::Delete { address } => {
                        touched.insert(address);
                        journal.kill_account(&address);
                    }
                }
            }
            if delete_empty {
                journal.kill_garbage(&touched)?;
            }
            Ok(())
        })();
        if let Err(e) = result {
            log::error!("state write-back failed: {}", e);
        }
    }
}

struct ExecOutcome {
    exit: Exit,
    gas_used: u64,
    return_value: Vec<u8>,
    created_address: Option<H160>,
    logs: Vec<Log>,
    touched: HashSet<H160>,
}

/// The interpreted backend: SputnikVM over the trie-backed journal. Full
/// fork support and full step tracing.
pub struct InterpVm {
    config: VmConfig,
    selector: HardforkSelector,
    blockchain: Arc<dyn BlockHashProvider>,
    journal: Rc<RefCell<JournalState<MemoryDB>>>,
    bus: Rc<RefCell<TraceBus>>,
    open_block: Option<OpenBlock>,
    warm: HashSet<H160>,
}

impl InterpVm {
    pub fn new(
        config: VmConfig,
        blockchain: Arc<dyn BlockHashProvider>,
        selector: HardforkSelector,
    ) -> Result<InterpVm, Error> {
        let db = Arc::new(MemoryDB::new(false));
        let journal = match &config.fork {
            Some(fork) => {
                JournalState::new_forked(db, Arc::clone(&fork.source), fork.block_number)?
            }
            None => JournalState::new(db)?,
        };

        let mut vm = InterpVm {
            config,
            selector,
            blockchain,
            journal: Rc::new(RefCell::new(journal)),
            bus: Rc::new(RefCell::new(TraceBus::new())),
            open_block: None,
            warm: HashSet::new(),
        };
        vm.seed_genesis()?;
        Ok(vm)
    }

    fn seed_genesis(&mut self) -> Result<(), Error> {
        let accounts = self.config.genesis.clone();
        let mut journal = self.journal.borrow_mut();
        for account in accounts {
            journal.set_balance(&account.address, account.balance)?;
            journal.set_nonce(&account.address, account.nonce)?;
            if !account.code.is_empty() {
                journal.set_code(&account.address, account.code)?;
            }
            for (key, value) in account.storage {
                journal.set_storage(&account.address, key, value)?;
            }
        }
        journal.commit()?;
        debug!("genesis state root: {:?}", journal.root());
        Ok(())
    }

    /// Chain rules and chain id for a block, honoring fork semantics: blocks
    /// below the fork point run the remote chain's rules under its network
    /// id.
    fn rules_for_block(&self, number: U256) -> (Hardfork, u64) {
        let number = number.low_u64();
        match &self.config.fork {
            Some(fork) if number < fork.block_number => {
                ((self.selector)(fork.block_number), fork.network_id)
            }
            _ => ((self.selector)(number), self.config.chain_id),
        }
    }

    fn execute_tx(
        &mut self,
        tx: &TypedTransaction,
        block: &BlockContext,
        fork: Hardfork,
        chain_id: u64,
        skips: TxRunSkips,
    ) -> Result<ExecOutcome, Error> {
        let sender = tx.from();
        let randomness = block.randomness(fork).map_err(Error::Config)?;
        let base_fee = block.base_fee;
        let effective_price = tx.effective_gas_price(base_fee);
        let gas_limit = tx.gas_limit();

        if fork.has_base_fee() {
            let base_fee = base_fee.ok_or(crate::err::ConfigError::BaseFeeRequired)?;
            if !skips.base_fee && effective_price < base_fee {
                return Err(Error::FeeTooLow {
                    effective: effective_price,
                    base_fee,
                });
            }
        }

        let nonce_before = self.journal.borrow().nonce(&sender)?;
        if !skips.nonce && nonce_before != tx.nonce() {
            return Err(Error::InvalidNonce {
                expected: nonce_before,
                got: tx.nonce(),
            });
        }
        if !skips.balance {
            let balance = self.journal.borrow().balance(&sender)?;
            let cost = tx.upfront_cost(base_fee);
            if balance < cost {
                return Err(Error::InsufficientBalance { balance, cost });
            }
        }
        if !skips.block_gas_limit {
            let used = self
                .open_block
                .as_ref()
                .map(|b| b.cumulative_gas)
                .unwrap_or_default();
            let remaining = block.gas_limit.saturating_sub(used);
            if U256::from(gas_limit) > remaining {
                return Err(Error::BlockGasLimitReached {
                    tx_gas: U256::from(gas_limit),
                    block_gas: remaining,
                });
            }
        }

        let mut rules = fork.interp_rules();
        if self.config.allow_unlimited_contract_size {
            rules.create_contract_limit = None;
        }

        self.journal.borrow_mut().checkpoint();
        let result = self.execute_with_engine(
            tx,
            block,
            &rules,
            randomness,
            chain_id,
            effective_price,
            nonce_before,
            skips,
        );
        match result {
            Ok(outcome) => {
                self.journal.borrow_mut().discard_checkpoint();
                Ok(outcome)
            }
            Err(e) => {
                self.journal.borrow_mut().revert_checkpoint();
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_with_engine(
        &mut self,
        tx: &TypedTransaction,
        block: &BlockContext,
        rules: &evm::Config,
        randomness: Option<H256>,
        chain_id: u64,
        effective_price: U256,
        nonce_before: U256,
        skips: TxRunSkips,
    ) -> Result<ExecOutcome, Error> {
        let sender = tx.from();
        let gas_limit = tx.gas_limit();
        let prepaid = effective_price.saturating_mul(U256::from(gas_limit));

        if !skips.balance {
            self.journal.borrow_mut().sub_balance(&sender, prepaid)?;
        }

        let mut backend = ExecBackend {
            journal: Rc::clone(&self.journal),
            blockchain: Arc::clone(&self.blockchain),
            block: block.clone(),
            randomness,
            chain_id: U256::from(chain_id),
            origin: sender,
            gas_price: effective_price,
            touched: RefCell::new(HashSet::new()),
        };
        let metadata = StackSubstateMetadata::new(gas_limit, rules);
        let stack_state = MemoryStackState::new(metadata, &mut backend);
        let precompiles: BTreeMap<H160, PrecompileFn> = BTreeMap::new();
        let mut executor = StackExecutor::new_with_precompiles(stack_state, rules, &precompiles);

        let access_list = tx.access_list().to_vec();
        let core = ListenerCore::new(Rc::clone(&self.bus), Rc::clone(&self.journal));
        let mut executor_listener = ExecutorListener(Rc::clone(&core));
        let mut runtime_listener = RuntimeListener(Rc::clone(&core));
        let mut gas_listener = GasListener(Rc::clone(&core));

        trace!(
            "executing tx from={:?} to={:?} gas_limit={}",
            sender,
            tx.to(),
            gas_limit
        );
        let (reason, return_value) = evm::tracing::using(&mut executor_listener, || {
            evm_runtime::tracing::using(&mut runtime_listener, || {
                evm_gasometer::tracing::using(&mut gas_listener, || match tx.to() {
                    Some(to) => executor.transact_call(
                        sender,
                        to,
                        tx.value(),
                        tx.input().to_vec(),
                        gas_limit,
                        access_list,
                    ),
                    None => executor.transact_create(
                        sender,
                        tx.value(),
                        tx.input().to_vec(),
                        gas_limit,
                        access_list,
                    ),
                })
            })
        });
        core.borrow_mut().finish(&reason, &return_value);

        let exit = Exit::from_interp_reason(&reason).map_err(Error::BackendExecution)?;
        let gas_used = executor.used_gas();
        let (applies, engine_logs) = executor.into_state().deconstruct();

        let delete_empty = !rules.empty_considered_exists;
        backend.apply(applies, std::iter::empty::<evm::backend::Log>(), delete_empty);

        // A transaction consumes the sender nonce even when it fails; the
        // engine only persists the bump on some paths.
        {
            let mut journal = self.journal.borrow_mut();
            if journal.nonce(&sender)? == nonce_before {
                journal.set_nonce(&sender, nonce_before + U256::one())?;
            }
        }

        if !skips.balance {
            let mut journal = self.journal.borrow_mut();
            let refund = effective_price.saturating_mul(U256::from(gas_limit - gas_used));
            journal.add_balance(&sender, refund)?;
            let priority = if rules.has_base_fee {
                effective_price.saturating_sub(block.base_fee.unwrap_or_default())
            } else {
                effective_price
            };
            journal.add_balance(
                &block.coinbase,
                priority.saturating_mul(U256::from(gas_used)),
            )?;
        }

        let logs: Vec<Log> = if exit.is_success() {
            engine_logs
                .into_iter()
                .map(|log| Log {
                    address: log.address,
                    topics: log.topics,
                    data: log.data,
                })
                .collect()
        } else {
            vec![]
        };

        let created_address = if tx.to().is_none() && exit.is_success() {
            Some(create_address(&sender, &nonce_before))
        } else {
            None
        };

        Ok(ExecOutcome {
            exit,
            gas_used,
            return_value,
            created_address,
            logs,
            touched: backend.touched.into_inner(),
        })
    }

    fn finish_result(
        &self,
        outcome: ExecOutcome,
        fork: Hardfork,
        cumulative_gas: U256,
        pre_root: H256,
    ) -> RunTxResult {
        let receipt_outcome = if fork.has_receipt_status() {
            ReceiptOutcome::Status(outcome.exit.is_success() as u8)
        } else {
            ReceiptOutcome::StateRoot(pre_root)
        };
        RunTxResult::assemble(
            outcome.exit,
            outcome.gas_used,
            outcome.return_value,
            outcome.created_address,
            outcome.logs,
            receipt_outcome,
            cumulative_gas,
        )
    }

    fn commit_root(&mut self) -> Result<H256, Error> {
        let mut journal = self.journal.borrow_mut();
        if journal.checkpoint_depth() == 0 {
            journal.commit()?;
        }
        Ok(journal.root())
    }
}

impl VmAdapter for InterpVm {
    fn dry_run(
        &mut self,
        tx: &TypedTransaction,
        block: &BlockContext,
        force_base_fee_zero: bool,
    ) -> Result<RunTxResult, Error> {
        let (fork, chain_id) = self.rules_for_block(block.number);
        let block = if fork.has_base_fee() && (block.base_fee.is_none() || force_base_fee_zero) {
            block.with_zero_base_fee()
        } else {
            block.clone()
        };

        let pre_root = self.journal.borrow().root();
        self.journal.borrow_mut().checkpoint();
        let result = self.execute_tx(tx, &block, fork, chain_id, TxRunSkips::all());
        self.journal.borrow_mut().revert_checkpoint();

        let outcome = result?;
        let cumulative = U256::from(outcome.gas_used);
        Ok(self.finish_result(outcome, fork, cumulative, pre_root))
    }

    fn start_block(&mut self) -> Result<(), Error> {
        if self.open_block.is_some() {
            return Err(Error::BlockLifecycle("startBlock while a block is open"));
        }
        let root_before = self.commit_root()?;
        self.journal.borrow_mut().checkpoint();
        self.warm.clear();
        self.open_block = Some(OpenBlock {
            root_before,
            cumulative_gas: U256::zero(),
        });
        Ok(())
    }

    fn run_tx_in_block(
        &mut self,
        tx: &TypedTransaction,
        block: &BlockContext,
    ) -> Result<RunTxResult, Error> {
        if self.open_block.is_none() {
            return Err(Error::BlockLifecycle("runTxInBlock without startBlock"));
        }
        let (fork, chain_id) = self.rules_for_block(block.number);
        let pre_root = self.journal.borrow().root();
        let outcome = self.execute_tx(tx, block, fork, chain_id, TxRunSkips::default())?;

        self.warm.insert(tx.from());
        if let Some(to) = tx.to() {
            self.warm.insert(to);
        }
        if let Some(created) = outcome.created_address {
            self.warm.insert(created);
        }
        for (address, _) in tx.access_list() {
            self.warm.insert(*address);
        }
        self.warm.extend(outcome.touched.iter().copied());

        let cumulative = match self.open_block.as_mut() {
            Some(open) => {
                open.cumulative_gas = open.cumulative_gas + U256::from(outcome.gas_used);
                open.cumulative_gas
            }
            None => return Err(Error::BlockLifecycle("runTxInBlock without startBlock")),
        };
        Ok(self.finish_result(outcome, fork, cumulative, pre_root))
    }

    fn add_block_rewards(&mut self, rewards: &[(H160, U256)]) -> Result<(), Error> {
        if self.open_block.is_none() {
            return Err(Error::BlockLifecycle("addBlockRewards without startBlock"));
        }
        let mut journal = self.journal.borrow_mut();
        for (address, reward) in rewards {
            journal.add_balance(address, *reward)?;
        }
        Ok(())
    }

    fn seal_block(&mut self) -> Result<(), Error> {
        if self.open_block.take().is_none() {
            return Err(Error::BlockLifecycle("sealBlock without startBlock"));
        }
        let mut journal = self.journal.borrow_mut();
        journal.discard_checkpoint();
        journal.commit()?;
        debug!("sealed block, state root {:?}", journal.root());
        Ok(())
    }

    fn revert_block(&mut self) -> Result<(), Error> {
        let open = self
            .open_block
            .take()
            .ok_or(Error::BlockLifecycle("revertBlock without startBlock"))?;
        let mut journal = self.journal.borrow_mut();
        journal.revert_checkpoint();
        debug_assert_eq!(journal.root(), open.root_before);
        Ok(())
    }

    fn account(&mut self, address: &H160) -> Result<Option<BasicAccount>, Error> {
        let journal = self.journal.borrow();
        if !journal.exists(address)? {
            return Ok(None);
        }
        Ok(Some(BasicAccount {
            balance: journal.balance(address)?,
            nonce: journal.nonce(address)?,
            code_hash: journal.code_hash(address)?,
        }))
    }

    fn contract_storage(&mut self, address: &H160, key: &H256) -> Result<H256, Error> {
        Ok(self.journal.borrow().storage_at(address, key)?)
    }

    fn contract_code(&mut self, address: &H160) -> Result<Vec<u8>, Error> {
        Ok(self.journal.borrow().code(address)?)
    }

    fn put_account(&mut self, address: &H160, balance: U256, nonce: U256) -> Result<(), Error> {
        let mut journal = self.journal.borrow_mut();
        journal.set_balance(address, balance)?;
        journal.set_nonce(address, nonce)?;
        Ok(())
    }

    fn put_contract_code(&mut self, address: &H160, code: Vec<u8>) -> Result<(), Error> {
        Ok(self.journal.borrow_mut().set_code(address, code)?)
    }

    fn put_contract_storage(
        &mut self,
        address: &H160,
        key: H256,
        value: H256,
    ) -> Result<(), Error> {
        Ok(self.journal.borrow_mut().set_storage(address, key, value)?)
    }

    fn account_is_empty(&mut self, address: &H160) -> Result<bool, Error> {
        Ok(self.journal.borrow().is_empty(address)?)
    }

    fn state_root(&mut self) -> Result<H256, Error> {
        self.commit_root()
    }

    fn set_state_root(&mut self, root: &H256) -> Result<(), Error> {
        if self.open_block.is_some() {
            return Err(Error::BlockLifecycle("setStateRoot while a block is open"));
        }
        self.journal
            .borrow_mut()
            .reset_to_root(*root)
            .map_err(|e| match e {
                crate::state::Error::RootNotFound => Error::UnknownStateRoot(*root),
                other => Error::State(other),
            })
    }

    fn make_snapshot(&mut self) -> Result<H256, Error> {
        self.commit_root()
    }

    fn restore_context(&mut self, root: &H256, block_number: Option<u64>) -> Result<(), Error> {
        self.set_state_root(root)?;
        if let (Some(number), Some(fork)) = (block_number, &self.config.fork) {
            let height = number.min(fork.block_number);
            self.journal.borrow_mut().set_remote_height(height);
        }
        Ok(())
    }

    fn set_block_context(
        &mut self,
        block: &BlockContext,
        irregular_state_root: Option<H256>,
    ) -> Result<(), Error> {
        let root = irregular_state_root.unwrap_or(block.state_root);
        self.restore_context(&root, Some(block.number.low_u64()))
    }

    fn set_debug_tracer(&mut self, tracer: Box<dyn DynTracer>) {
        self.bus.borrow_mut().set_debug_tracer(tracer);
    }

    fn remove_debug_tracer(&mut self) -> bool {
        self.bus.borrow_mut().remove_debug_tracer()
    }

    fn last_trace(&self) -> LastTrace {
        self.bus.borrow().last_trace()
    }

    fn clear_last_error(&mut self) {
        self.bus.borrow_mut().clear_last_error();
    }

    fn select_hardfork(&self, block_number: u64) -> Hardfork {
        self.rules_for_block(U256::from(block_number)).0
    }

    fn gte_hardfork(&self, fork: Hardfork) -> bool {
        self.config.hardfork >= fork
    }

    fn chain_spec(&self) -> ChainSpec {
        ChainSpec {
            chain_id: self.config.chain_id,
            network_id: self
                .config
                .fork
                .as_ref()
                .map(|f| f.network_id)
                .unwrap_or(self.config.network_id),
            hardfork: self.config.hardfork,
        }
    }

    fn is_warmed_address(&self, address: &H160) -> bool {
        self.warm.contains(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_address_matches_known_vector() {
        // keccak(rlp([0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0, 0]))[12..]
        let sender: H160 = "6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0".parse().unwrap();
        let created = create_address(&sender, &U256::zero());
        let expected: H160 = "cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d".parse().unwrap();
        assert_eq!(created, expected);
    }
}
