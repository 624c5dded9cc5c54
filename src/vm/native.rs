use std::convert::Infallible;
use std::sync::Arc;

use ethereum_types::{H160, H256, U256};
use hashbrown::HashMap;
use log::{debug, trace};
use revm::primitives::{
    AccessListItem, AccountInfo, Address, Bytecode, Bytes, ExecutionResult, Output, TxKind, B256,
    KECCAK_EMPTY,
};
use revm::{DatabaseRef, Evm};
use rlp::RlpStream;

use crate::adapter::{BasicAccount, BlockHashProvider, RunTxResult, TxRunSkips, VmAdapter};
use crate::block::BlockContext;
use crate::common::{
    from_native_address, from_native_hash, from_native_u256, hash, to_native_address,
    to_native_hash, to_native_u256,
};
use crate::config::{ChainSpec, VmConfig};
use crate::err::{ConfigError, Error};
use crate::exit::Exit;
use crate::hardfork::{Hardfork, HardforkSelector};
use crate::receipt::{Log, ReceiptOutcome};
use crate::tracing::{DynTracer, LastTrace, MessageResult, TraceBus, TracingMessage};
use crate::transaction::TypedTransaction;

#[derive(Debug, Clone, Default)]
struct DbAccount {
    info: AccountInfo,
    storage: HashMap<revm::primitives::U256, revm::primitives::U256>,
}

/// Flat in-memory account store behind the native engine. Cloning is the
/// snapshot primitive: block checkpoints and time-travel keep whole-store
/// copies keyed by their root digest.
#[derive(Clone)]
struct NativeDb {
    accounts: HashMap<Address, DbAccount>,
    contracts: HashMap<B256, Bytecode>,
    blockchain: Arc<dyn BlockHashProvider>,
}

impl NativeDb {
    fn new(blockchain: Arc<dyn BlockHashProvider>) -> NativeDb {
        NativeDb {
            accounts: HashMap::new(),
            contracts: HashMap::new(),
            blockchain,
        }
    }

    fn account_mut(&mut self, address: Address) -> &mut DbAccount {
        self.accounts.entry(address).or_default()
    }

    fn code_of(&self, address: &Address) -> Vec<u8> {
        self.accounts
            .get(address)
            .and_then(|a| self.contracts.get(&a.info.code_hash))
            .map(|code| code.original_bytes().to_vec())
            .unwrap_or_default()
    }

    /// Fold an execution's state delta into the store. Mirrors the engine's
    /// own cache-commit rules: untouched accounts are skipped, destroyed and
    /// touched-empty accounts are removed.
    fn apply_changes(
        &mut self,
        changes: revm::primitives::HashMap<Address, revm::primitives::Account>,
    ) {
        for (address, account) in changes {
            if !account.is_touched() {
                continue;
            }
            if account.is_selfdestructed() {
                self.accounts.remove(&address);
                continue;
            }
            if account.info.is_empty() {
                self.accounts.remove(&address);
                continue;
            }
            if let Some(code) = &account.info.code {
                if !code.is_empty() {
                    self.contracts.insert(account.info.code_hash, code.clone());
                }
            }
            let newly_created = account.is_created();
            let entry = self.account_mut(address);
            if newly_created {
                entry.storage.clear();
            }
            entry.info = AccountInfo {
                balance: account.info.balance,
                nonce: account.info.nonce,
                code_hash: account.info.code_hash,
                code: None,
            };
            for (index, slot) in account.storage {
                entry.storage.insert(index, slot.present_value);
            }
        }
    }

    /// Deterministic digest over the sorted account image. Not the
    /// Merkle-Patricia root, but stable under write reordering, which is
    /// all the adapter contract asks of it.
    fn state_digest(&self) -> H256 {
        let mut addresses: Vec<Address> = self.accounts.keys().copied().collect();
        addresses.sort();
        let mut stream = RlpStream::new_list(addresses.len());
        for address in addresses {
            let account = &self.accounts[&address];
            let mut slots: Vec<(&revm::primitives::U256, &revm::primitives::U256)> = account
                .storage
                .iter()
                .filter(|(_, value)| !value.is_zero())
                .collect();
            slots.sort_by_key(|(key, _)| **key);

            let mut entry = RlpStream::new_list(5);
            entry.append(&address.as_slice().to_vec());
            entry.append(&account.info.nonce);
            entry.append(&account.info.balance.to_be_bytes::<32>().to_vec());
            entry.append(&account.info.code_hash.as_slice().to_vec());
            entry.begin_list(slots.len());
            for (key, value) in slots {
                let mut slot = RlpStream::new_list(2);
                slot.append(&key.to_be_bytes::<32>().to_vec());
                slot.append(&value.to_be_bytes::<32>().to_vec());
                entry.append_raw(&slot.out(), 1);
            }
            stream.append_raw(&entry.out(), 1);
        }
        H256::from_slice(&hash::summary(&stream.out()))
    }
}

impl DatabaseRef for NativeDb {
    type Error = Infallible;

    fn basic_ref(&self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        Ok(self.accounts.get(&address).map(|a| a.info.clone()))
    }

    fn code_by_hash_ref(&self, code_hash: B256) -> Result<Bytecode, Self::Error> {
        Ok(self.contracts.get(&code_hash).cloned().unwrap_or_default())
    }

    fn storage_ref(
        &self,
        address: Address,
        index: revm::primitives::U256,
    ) -> Result<revm::primitives::U256, Self::Error> {
        Ok(self
            .accounts
            .get(&address)
            .and_then(|a| a.storage.get(&index).copied())
            .unwrap_or_default())
    }

    fn block_hash_ref(&self, number: u64) -> Result<B256, Self::Error> {
        Ok(to_native_hash(&self.blockchain.block_hash(U256::from(number))))
    }
}

struct NativeOpenBlock {
    root_before: H256,
    saved: NativeDb,
    cumulative_gas: U256,
}

/// The native backend: revm over a flat snapshot-clonable store. Refuses
/// forked configurations; emits message-level traces only; answers warmth
/// queries conservatively.
pub struct NativeVm {
    config: VmConfig,
    selector: HardforkSelector,
    db: NativeDb,
    snapshots: HashMap<H256, NativeDb>,
    bus: TraceBus,
    open_block: Option<NativeOpenBlock>,
}

impl NativeVm {
    pub fn new(
        config: VmConfig,
        blockchain: Arc<dyn BlockHashProvider>,
        selector: HardforkSelector,
    ) -> Result<NativeVm, Error> {
        if config.fork.is_some() {
            return Err(ConfigError::ForkingUnsupported.into());
        }
        let mut vm = NativeVm {
            config,
            selector,
            db: NativeDb::new(blockchain),
            snapshots: HashMap::new(),
            bus: TraceBus::new(),
            open_block: None,
        };
        vm.seed_genesis();
        let genesis_root = vm.db.state_digest();
        vm.snapshots.insert(genesis_root, vm.db.clone());
        debug!("genesis state root: {:?}", genesis_root);
        Ok(vm)
    }

    fn seed_genesis(&mut self) {
        for account in self.config.genesis.clone() {
            let address = to_native_address(&account.address);
            let code_hash = if account.code.is_empty() {
                KECCAK_EMPTY
            } else {
                let code = Bytecode::new_raw(Bytes::from(account.code.clone()));
                let code_hash = code.hash_slow();
                self.db.contracts.insert(code_hash, code);
                code_hash
            };
            let entry = self.db.account_mut(address);
            entry.info = AccountInfo {
                balance: to_native_u256(&account.balance),
                nonce: account.nonce.low_u64(),
                code_hash,
                code: None,
            };
            for (key, value) in &account.storage {
                entry.storage.insert(
                    to_native_u256(&U256::from_big_endian(key.as_bytes())),
                    to_native_u256(&U256::from_big_endian(value.as_bytes())),
                );
            }
        }
    }

    fn validate_in_block_tx(
        &self,
        tx: &TypedTransaction,
        block: &BlockContext,
        cumulative_gas: U256,
    ) -> Result<(), Error> {
        let sender = to_native_address(&tx.from());
        let (nonce, balance) = self
            .db
            .accounts
            .get(&sender)
            .map(|a| (a.info.nonce, from_native_u256(&a.info.balance)))
            .unwrap_or((0, U256::zero()));

        if U256::from(nonce) != tx.nonce() {
            return Err(Error::InvalidNonce {
                expected: U256::from(nonce),
                got: tx.nonce(),
            });
        }
        let cost = tx.upfront_cost(block.base_fee);
        if balance < cost {
            return Err(Error::InsufficientBalance { balance, cost });
        }
        let remaining = block.gas_limit.saturating_sub(cumulative_gas);
        if U256::from(tx.gas_limit()) > remaining {
            return Err(Error::BlockGasLimitReached {
                tx_gas: U256::from(tx.gas_limit()),
                block_gas: remaining,
            });
        }
        Ok(())
    }

    fn transact(
        &mut self,
        tx: &TypedTransaction,
        block: &BlockContext,
        fork: Hardfork,
        chain_id: u64,
        skips: TxRunSkips,
        commit: bool,
    ) -> Result<(Exit, u64, Vec<u8>, Option<H160>, Vec<Log>), Error> {
        let randomness = block.randomness(fork).map_err(Error::Config)?;
        if fork.has_base_fee() && block.base_fee.is_none() {
            return Err(ConfigError::BaseFeeRequired.into());
        }

        let caller = to_native_address(&tx.from());
        let transact_to = match tx.to() {
            Some(to) => TxKind::Call(to_native_address(&to)),
            None => TxKind::Create,
        };
        let (gas_price, priority_fee) = match tx {
            TypedTransaction::Eip1559(t) => (
                to_native_u256(&t.max_fee_per_gas),
                Some(to_native_u256(&t.max_priority_fee_per_gas)),
            ),
            _ => (to_native_u256(&tx.effective_gas_price(block.base_fee)), None),
        };
        let access_list: Vec<AccessListItem> = tx
            .access_list()
            .iter()
            .map(|(address, keys)| AccessListItem {
                address: to_native_address(address),
                storage_keys: keys.iter().map(to_native_hash).collect(),
            })
            .collect();

        let nonce = (!skips.nonce).then(|| tx.nonce().low_u64());
        let value = to_native_u256(&tx.value());
        let data = Bytes::from(tx.input().to_vec());
        let gas_limit = tx.gas_limit();
        let spec = fork.native_spec();
        let number = to_native_u256(&block.number);
        let coinbase = to_native_address(&block.coinbase);
        let timestamp = to_native_u256(&block.timestamp);
        let block_gas_limit = to_native_u256(&block.gas_limit);
        let basefee = to_native_u256(&block.base_fee.unwrap_or_default());
        let difficulty = to_native_u256(&block.clamped_difficulty());
        let prevrandao = Some(
            randomness
                .map(|r| to_native_hash(&r))
                .unwrap_or(B256::ZERO),
        );
        let code_size_limit = self
            .config
            .allow_unlimited_contract_size
            .then_some(usize::MAX);

        self.bus.before_message(TracingMessage {
            caller: tx.from(),
            to: tx.to(),
            value: tx.value(),
            data: tx.input().to_vec(),
            gas_limit,
            depth: 0,
            code: match tx.to() {
                Some(to) => {
                    let code = self.db.code_of(&to_native_address(&to));
                    (!code.is_empty()).then_some(code)
                }
                None => Some(tx.input().to_vec()),
            },
        });

        trace!(
            "executing tx from={:?} to={:?} gas_limit={}",
            tx.from(),
            tx.to(),
            gas_limit
        );
        let transacted = {
            let mut evm = Evm::builder()
                .with_ref_db(&self.db)
                .with_spec_id(spec)
                .modify_cfg_env(|cfg| {
                    cfg.chain_id = chain_id;
                    cfg.limit_contract_code_size = code_size_limit;
                    cfg.disable_eip3607 = true;
                    cfg.disable_balance_check = skips.balance;
                    cfg.disable_block_gas_limit = skips.block_gas_limit;
                    cfg.disable_base_fee = skips.base_fee;
                })
                .modify_block_env(|b| {
                    b.number = number;
                    b.coinbase = coinbase;
                    b.timestamp = timestamp;
                    b.gas_limit = block_gas_limit;
                    b.basefee = basefee;
                    b.difficulty = difficulty;
                    b.prevrandao = prevrandao;
                })
                .modify_tx_env(|t| {
                    t.caller = caller;
                    t.gas_limit = gas_limit;
                    t.gas_price = gas_price;
                    t.gas_priority_fee = priority_fee;
                    t.transact_to = transact_to;
                    t.value = value;
                    t.data = data.clone();
                    t.nonce = nonce;
                    t.chain_id = Some(chain_id);
                    t.access_list = access_list.clone();
                })
                .build();
            evm.transact()
        };

        let result_and_state = match transacted {
            Ok(result_and_state) => result_and_state,
            Err(e) => {
                // Balance the before-message so the structural tracer's
                // bracketing survives infrastructure failures.
                self.bus.after_message(MessageResult {
                    exit: Exit::Halt(crate::exit::HaltCode::Unknown),
                    gas_used: 0,
                    return_value: vec![],
                    created_address: None,
                });
                return Err(Error::BackendExecution(format!("{:?}", e)));
            }
        };

        let exit = Exit::from_native_result(&result_and_state.result);
        let (gas_used, return_value, created_address, logs) = match result_and_state.result {
            ExecutionResult::Success {
                gas_used,
                logs,
                output,
                ..
            } => {
                let (return_value, created) = match output {
                    Output::Call(data) => (data.to_vec(), None),
                    Output::Create(data, address) => (
                        data.to_vec(),
                        address.map(|a| from_native_address(&a)),
                    ),
                };
                let logs = logs
                    .into_iter()
                    .map(|log| Log {
                        address: from_native_address(&log.address),
                        topics: log.topics().iter().map(from_native_hash).collect(),
                        data: log.data.data.to_vec(),
                    })
                    .collect();
                (gas_used, return_value, created, logs)
            }
            ExecutionResult::Revert { gas_used, output } => {
                (gas_used, output.to_vec(), None, vec![])
            }
            ExecutionResult::Halt { gas_used, .. } => (gas_used, vec![], None, vec![]),
        };

        if commit {
            self.db.apply_changes(result_and_state.state);
        }

        self.bus.after_message(MessageResult {
            exit,
            gas_used,
            return_value: return_value.clone(),
            created_address,
        });

        Ok((exit, gas_used, return_value, created_address, logs))
    }

    fn receipt_outcome(&self, fork: Hardfork, exit: Exit, pre_root: H256) -> ReceiptOutcome {
        if fork.has_receipt_status() {
            ReceiptOutcome::Status(exit.is_success() as u8)
        } else {
            ReceiptOutcome::StateRoot(pre_root)
        }
    }
}

impl VmAdapter for NativeVm {
    fn dry_run(
        &mut self,
        tx: &TypedTransaction,
        block: &BlockContext,
        force_base_fee_zero: bool,
    ) -> Result<RunTxResult, Error> {
        let fork = (self.selector)(block.number.low_u64());
        let block = if fork.has_base_fee() && (block.base_fee.is_none() || force_base_fee_zero) {
            block.with_zero_base_fee()
        } else {
            block.clone()
        };

        // The delta is simply never committed; nothing to restore.
        let pre_root = self.db.state_digest();
        let (exit, gas_used, return_value, created_address, logs) = self.transact(
            tx,
            &block,
            fork,
            self.config.chain_id,
            TxRunSkips::all(),
            false,
        )?;

        let outcome = self.receipt_outcome(fork, exit, pre_root);
        Ok(RunTxResult::assemble(
            exit,
            gas_used,
            return_value,
            created_address,
            logs,
            outcome,
            U256::from(gas_used),
        ))
    }

    fn start_block(&mut self) -> Result<(), Error> {
        if self.open_block.is_some() {
            return Err(Error::BlockLifecycle("startBlock while a block is open"));
        }
        let root_before = self.db.state_digest();
        self.snapshots.insert(root_before, self.db.clone());
        self.open_block = Some(NativeOpenBlock {
            root_before,
            saved: self.db.clone(),
            cumulative_gas: U256::zero(),
        });
        Ok(())
    }

    fn run_tx_in_block(
        &mut self,
        tx: &TypedTransaction,
        block: &BlockContext,
    ) -> Result<RunTxResult, Error> {
        let cumulative_gas = match &self.open_block {
            Some(open) => open.cumulative_gas,
            None => return Err(Error::BlockLifecycle("runTxInBlock without startBlock")),
        };
        let fork = (self.selector)(block.number.low_u64());
        self.validate_in_block_tx(tx, block, cumulative_gas)?;

        let pre_root = self.db.state_digest();
        let (exit, gas_used, return_value, created_address, logs) = self.transact(
            tx,
            block,
            fork,
            self.config.chain_id,
            TxRunSkips::default(),
            true,
        )?;

        let cumulative = match self.open_block.as_mut() {
            Some(open) => {
                open.cumulative_gas = open.cumulative_gas + U256::from(gas_used);
                open.cumulative_gas
            }
            None => return Err(Error::BlockLifecycle("runTxInBlock without startBlock")),
        };
        let outcome = self.receipt_outcome(fork, exit, pre_root);
        Ok(RunTxResult::assemble(
            exit,
            gas_used,
            return_value,
            created_address,
            logs,
            outcome,
            cumulative,
        ))
    }

    fn add_block_rewards(&mut self, rewards: &[(H160, U256)]) -> Result<(), Error> {
        if self.open_block.is_none() {
            return Err(Error::BlockLifecycle("addBlockRewards without startBlock"));
        }
        for (address, reward) in rewards {
            let entry = self.db.account_mut(to_native_address(address));
            entry.info.balance = entry
                .info
                .balance
                .saturating_add(to_native_u256(reward));
        }
        Ok(())
    }

    fn seal_block(&mut self) -> Result<(), Error> {
        if self.open_block.take().is_none() {
            return Err(Error::BlockLifecycle("sealBlock without startBlock"));
        }
        let root = self.db.state_digest();
        self.snapshots.insert(root, self.db.clone());
        debug!("sealed block, state root {:?}", root);
        Ok(())
    }

    fn revert_block(&mut self) -> Result<(), Error> {
        let open = self
            .open_block
            .take()
            .ok_or(Error::BlockLifecycle("revertBlock without startBlock"))?;
        self.db = open.saved;
        debug_assert_eq!(self.db.state_digest(), open.root_before);
        Ok(())
    }

    fn account(&mut self, address: &H160) -> Result<Option<BasicAccount>, Error> {
        Ok(self
            .db
            .accounts
            .get(&to_native_address(address))
            .map(|a| BasicAccount {
                balance: from_native_u256(&a.info.balance),
                nonce: U256::from(a.info.nonce),
                code_hash: from_native_hash(&a.info.code_hash),
            }))
    }

    fn contract_storage(&mut self, address: &H160, key: &H256) -> Result<H256, Error> {
        let value = self
            .db
            .accounts
            .get(&to_native_address(address))
            .and_then(|a| {
                a.storage
                    .get(&to_native_u256(&U256::from_big_endian(key.as_bytes())))
                    .copied()
            })
            .unwrap_or_default();
        let mut out = [0u8; 32];
        from_native_u256(&value).to_big_endian(&mut out);
        Ok(H256::from(out))
    }

    fn contract_code(&mut self, address: &H160) -> Result<Vec<u8>, Error> {
        Ok(self.db.code_of(&to_native_address(address)))
    }

    fn put_account(&mut self, address: &H160, balance: U256, nonce: U256) -> Result<(), Error> {
        let entry = self.db.account_mut(to_native_address(address));
        entry.info.balance = to_native_u256(&balance);
        entry.info.nonce = nonce.low_u64();
        Ok(())
    }

    fn put_contract_code(&mut self, address: &H160, code: Vec<u8>) -> Result<(), Error> {
        let bytecode = Bytecode::new_raw(Bytes::from(code));
        let code_hash = bytecode.hash_slow();
        self.db.contracts.insert(code_hash, bytecode);
        let entry = self.db.account_mut(to_native_address(address));
        entry.info.code_hash = code_hash;
        Ok(())
    }

    fn put_contract_storage(
        &mut self,
        address: &H160,
        key: H256,
        value: H256,
    ) -> Result<(), Error> {
        let entry = self.db.account_mut(to_native_address(address));
        entry.storage.insert(
            to_native_u256(&U256::from_big_endian(key.as_bytes())),
            to_native_u256(&U256::from_big_endian(value.as_bytes())),
        );
        Ok(())
    }

    fn account_is_empty(&mut self, address: &H160) -> Result<bool, Error> {
        Ok(self
            .db
            .accounts
            .get(&to_native_address(address))
            .map(|a| a.info.is_empty())
            .unwrap_or(true))
    }

    fn state_root(&mut self) -> Result<H256, Error> {
        Ok(self.db.state_digest())
    }

    fn set_state_root(&mut self, root: &H256) -> Result<(), Error> {
        if self.open_block.is_some() {
            return Err(Error::BlockLifecycle("setStateRoot while a block is open"));
        }
        match self.snapshots.get(root) {
            Some(saved) => {
                self.db = saved.clone();
                Ok(())
            }
            None => Err(Error::UnknownStateRoot(*root)),
        }
    }

    fn make_snapshot(&mut self) -> Result<H256, Error> {
        let root = self.db.state_digest();
        self.snapshots.insert(root, self.db.clone());
        Ok(root)
    }

    fn restore_context(&mut self, root: &H256, _block_number: Option<u64>) -> Result<(), Error> {
        self.set_state_root(root)
    }

    fn set_block_context(
        &mut self,
        block: &BlockContext,
        irregular_state_root: Option<H256>,
    ) -> Result<(), Error> {
        let root = irregular_state_root.unwrap_or(block.state_root);
        self.set_state_root(&root)
    }

    fn set_debug_tracer(&mut self, tracer: Box<dyn DynTracer>) {
        self.bus.set_debug_tracer(tracer);
    }

    fn remove_debug_tracer(&mut self) -> bool {
        self.bus.remove_debug_tracer()
    }

    fn last_trace(&self) -> LastTrace {
        self.bus.last_trace()
    }

    fn clear_last_error(&mut self) {
        self.bus.clear_last_error();
    }

    fn select_hardfork(&self, block_number: u64) -> Hardfork {
        (self.selector)(block_number)
    }

    fn gte_hardfork(&self, fork: Hardfork) -> bool {
        self.config.hardfork >= fork
    }

    fn chain_spec(&self) -> ChainSpec {
        ChainSpec {
            chain_id: self.config.chain_id,
            network_id: self.config.network_id,
            hardfork: self.config.hardfork,
        }
    }

    /// Conservative stub: the engine journal's warmth is not exposed across
    /// transactions, so every address reports warm. Loses precision, never
    /// correctness of execution.
    fn is_warmed_address(&self, _address: &H160) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::BlockHashProviderMock;
    use crate::config::{BackendKind, ForkSettings, GenesisAccount};
    use crate::hardfork::fixed_selector;
    use crate::state::{self, ForkSource};

    struct NoopFork;

    impl ForkSource for NoopFork {
        fn network_id(&self) -> Result<u64, state::Error> {
            Ok(1)
        }
        fn balance(&self, _: &H160, _: u64) -> Result<U256, state::Error> {
            Ok(U256::zero())
        }
        fn transaction_count(&self, _: &H160, _: u64) -> Result<U256, state::Error> {
            Ok(U256::zero())
        }
        fn code(&self, _: &H160, _: u64) -> Result<Vec<u8>, state::Error> {
            Ok(vec![])
        }
        fn storage_at(&self, _: &H160, _: &H256, _: u64) -> Result<H256, state::Error> {
            Ok(H256::zero())
        }
    }

    #[test]
    fn forked_configuration_is_refused() {
        let mut config = VmConfig::new(BackendKind::Native, 31337, Hardfork::Shanghai);
        config.fork = Some(ForkSettings {
            source: Arc::new(NoopFork),
            block_number: 1_000_000,
            network_id: 1,
        });
        let result = NativeVm::new(
            config,
            Arc::new(BlockHashProviderMock::default()),
            fixed_selector(Hardfork::Shanghai),
        );
        assert!(matches!(
            result.err().map(|e| e.to_string()),
            Some(message) if message.contains("forked configurations")
        ));
    }

    #[test]
    fn state_digest_is_stable_under_write_order() {
        let blockchain: Arc<dyn BlockHashProvider> = Arc::new(BlockHashProviderMock::default());
        let mut config = VmConfig::new(BackendKind::Native, 31337, Hardfork::Shanghai);
        config.genesis = vec![GenesisAccount::with_balance(
            H160::repeat_byte(0x01),
            U256::from(100),
        )];

        let mut one = NativeVm::new(
            config.clone(),
            Arc::clone(&blockchain),
            fixed_selector(Hardfork::Shanghai),
        )
        .unwrap();
        let a = H160::repeat_byte(0x0a);
        let b = H160::repeat_byte(0x0b);
        one.put_account(&a, 1.into(), 0.into()).unwrap();
        one.put_account(&b, 2.into(), 0.into()).unwrap();

        let mut two = NativeVm::new(
            config,
            blockchain,
            fixed_selector(Hardfork::Shanghai),
        )
        .unwrap();
        two.put_account(&b, 2.into(), 0.into()).unwrap();
        two.put_account(&a, 1.into(), 0.into()).unwrap();

        assert_eq!(one.state_root().unwrap(), two.state_root().unwrap());
    }
}
