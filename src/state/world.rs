use std::cell::RefCell;
use std::sync::Arc;

use cita_trie::{PatriciaTrie, Trie, DB};
use ethereum_types::{H160, H256, U256};
use hashbrown::{HashMap, HashSet};
use log::debug;

use crate::common::hash;
use crate::state::account::{AccountState, CodeState};
use crate::state::account_db::AccountDB;
use crate::state::entry::{AccountEntry, EntryStatus};
use crate::state::err::Error;
use crate::state::fork::ForkSource;

/// Journaled world state: an account cache with a checkpoint stack over a
/// Merkle-Patricia trie. Reads hydrate the cache from the trie (and, when
/// forked, from the remote node); writes stay in the cache until `commit`
/// folds them into the trie and produces a new root.
pub struct JournalState<B> {
    pub db: Arc<B>,
    root: H256,
    cache: RefCell<HashMap<H160, AccountEntry>>,
    /// One map per open checkpoint, recording the pre-image of every entry
    /// dirtied since the checkpoint was taken.
    checkpoints: RefCell<Vec<HashMap<H160, Option<AccountEntry>>>>,
    remote: Option<Arc<dyn ForkSource>>,
    /// Accounts materialized from the remote; their storage misses keep
    /// falling through to the remote even after local commits.
    remote_accounts: RefCell<HashSet<H160>>,
    remote_slots: RefCell<HashMap<(H160, H256), H256>>,
    remote_height: u64,
}

impl<B: DB> JournalState<B> {
    /// Empty state over `db`.
    pub fn new(db: Arc<B>) -> Result<JournalState<B>, Error> {
        let mut trie = PatriciaTrie::new(Arc::clone(&db), Arc::new(hash::get_hasher()));
        let root = H256::from_slice(&trie.root()?);
        Ok(JournalState {
            db,
            root,
            cache: RefCell::new(HashMap::new()),
            checkpoints: RefCell::new(Vec::new()),
            remote: None,
            remote_accounts: RefCell::new(HashSet::new()),
            remote_slots: RefCell::new(HashMap::new()),
            remote_height: 0,
        })
    }

    /// Fork-backed state: local cache misses resolve through `source`,
    /// pinned at `fork_block`.
    pub fn new_forked(
        db: Arc<B>,
        source: Arc<dyn ForkSource>,
        fork_block: u64,
    ) -> Result<JournalState<B>, Error> {
        let mut state = Self::new(db)?;
        state.remote = Some(source);
        state.remote_height = fork_block;
        Ok(state)
    }

    pub fn is_forked(&self) -> bool {
        self.remote.is_some()
    }

    /// The block height remote reads are pinned to.
    pub fn set_remote_height(&mut self, height: u64) {
        self.remote_height = height;
    }

    pub fn root(&self) -> H256 {
        self.root
    }

    /// Whether `root` identifies committed state this store has observed.
    pub fn contains_root(&self, root: &H256) -> bool {
        *root == hash::RLP_NULL
            || self
                .db
                .contains(root.as_bytes())
                .unwrap_or(false)
    }

    /// Point the working state at a previously committed root. The cache is
    /// dropped; open checkpoints must not exist.
    pub fn reset_to_root(&mut self, root: H256) -> Result<(), Error> {
        assert!(self.checkpoints.borrow().is_empty());
        if !self.contains_root(&root) {
            return Err(Error::RootNotFound);
        }
        self.cache.borrow_mut().clear();
        self.remote_slots.borrow_mut().clear();
        self.root = root;
        Ok(())
    }

    fn hydrate_remote(&self, address: &H160) -> Result<Option<AccountState>, Error> {
        let remote = match &self.remote {
            Some(remote) => remote,
            None => return Ok(None),
        };
        let balance = remote.balance(address, self.remote_height)?;
        let nonce = remote.transaction_count(address, self.remote_height)?;
        let code = remote.code(address, self.remote_height)?;
        if balance.is_zero() && nonce.is_zero() && code.is_empty() {
            return Ok(None);
        }
        let mut account = AccountState::new(balance, nonce);
        if !code.is_empty() {
            account.init_code(code);
            // The code came from the remote as-is; it is not a local write.
            account.code_state = CodeState::Clean;
        }
        self.remote_accounts.borrow_mut().insert(*address);
        Ok(Some(account))
    }

    /// Read through the caches without cloning account data.
    fn with_account<F, U>(&self, address: &H160, f: F) -> Result<U, Error>
    where
        F: Fn(Option<&AccountState>) -> U,
    {
        if let Some(entry) = self.cache.borrow().get(address) {
            return Ok(f(entry.account.as_ref()));
        }
        let trie = PatriciaTrie::from(
            Arc::clone(&self.db),
            Arc::new(hash::get_hasher()),
            &self.root.0,
        )?;
        if let Some(raw) = trie.get(address.as_bytes())? {
            let mut account = AccountState::from_rlp(&raw)?;
            let accdb = Arc::new(AccountDB::new(*address, Arc::clone(&self.db)));
            account.read_code(accdb)?;
            let result = f(Some(&account));
            self.insert_cache(address, AccountEntry::new_clean(Some(account)));
            return Ok(result);
        }
        match self.hydrate_remote(address)? {
            Some(account) => {
                let result = f(Some(&account));
                self.insert_cache(address, AccountEntry::new_clean(Some(account)));
                Ok(result)
            }
            None => {
                self.insert_cache(address, AccountEntry::new_clean(None));
                Ok(f(None))
            }
        }
    }

    fn account_or_default(&self, address: &H160) -> Result<AccountState, Error> {
        self.with_account(address, |a| {
            a.map(AccountState::clone_dirty)
                .unwrap_or_else(|| AccountState::new(U256::zero(), U256::zero()))
        })
    }

    pub fn exists(&self, address: &H160) -> Result<bool, Error> {
        self.with_account(address, |a| a.is_some())
    }

    /// Empty according to EIP-161.
    pub fn is_empty(&self, address: &H160) -> Result<bool, Error> {
        self.with_account(address, |a| a.map_or(true, AccountState::is_empty))
    }

    pub fn balance(&self, address: &H160) -> Result<U256, Error> {
        self.with_account(address, |a| a.map_or_else(U256::zero, |e| e.balance))
    }

    pub fn nonce(&self, address: &H160) -> Result<U256, Error> {
        self.with_account(address, |a| a.map_or_else(U256::zero, |e| e.nonce))
    }

    pub fn code(&self, address: &H160) -> Result<Vec<u8>, Error> {
        self.with_account(address, |a| a.map_or_else(Vec::new, |e| e.code.clone()))
    }

    pub fn code_hash(&self, address: &H160) -> Result<H256, Error> {
        self.with_account(address, |a| a.map_or(hash::NIL_DATA, |e| e.code_hash))
    }

    pub fn storage_root(&self, address: &H160) -> Result<H256, Error> {
        self.with_account(address, |a| a.map_or(hash::RLP_NULL, |e| e.storage_root))
    }

    pub fn storage_at(&self, address: &H160, key: &H256) -> Result<H256, Error> {
        let local = self.with_account(address, |a| match a {
            Some(account) => {
                let accdb = Arc::new(AccountDB::new(*address, Arc::clone(&self.db)));
                account.storage_at(accdb, key)
            }
            None => Ok(None),
        })??;
        if let Some(value) = local {
            return Ok(value);
        }
        if self.remote_accounts.borrow().contains(address) {
            if let Some(value) = self.remote_slots.borrow().get(&(*address, *key)) {
                return Ok(*value);
            }
            if let Some(remote) = &self.remote {
                let value = remote.storage_at(address, key, self.remote_height)?;
                self.remote_slots
                    .borrow_mut()
                    .insert((*address, *key), value);
                return Ok(value);
            }
        }
        Ok(H256::zero())
    }

    pub fn set_storage(&mut self, address: &H160, key: H256, value: H256) -> Result<(), Error> {
        debug!("journal: write {:?} slot {:?} = {:?}", address, key, value);
        if self.storage_at(address, &key)? == value {
            return Ok(());
        }
        let mut account = self.account_or_default(address)?;
        account.set_storage(key, value);
        self.insert_cache(address, AccountEntry::new_dirty(Some(account)));
        Ok(())
    }

    /// Drop every storage slot of the account.
    pub fn reset_storage(&mut self, address: &H160) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        account.storage_changes.clear();
        account.storage_root = hash::RLP_NULL;
        self.insert_cache(address, AccountEntry::new_dirty(Some(account)));
        Ok(())
    }

    pub fn set_code(&mut self, address: &H160, code: Vec<u8>) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        account.init_code(code);
        self.insert_cache(address, AccountEntry::new_dirty(Some(account)));
        Ok(())
    }

    pub fn add_balance(&mut self, address: &H160, value: U256) -> Result<(), Error> {
        if value.is_zero() {
            return Ok(());
        }
        let mut account = self.account_or_default(address)?;
        account.add_balance(value)?;
        self.insert_cache(address, AccountEntry::new_dirty(Some(account)));
        Ok(())
    }

    pub fn sub_balance(&mut self, address: &H160, value: U256) -> Result<(), Error> {
        if value.is_zero() {
            return Ok(());
        }
        let mut account = self.account_or_default(address)?;
        account.sub_balance(value)?;
        self.insert_cache(address, AccountEntry::new_dirty(Some(account)));
        Ok(())
    }

    pub fn set_balance(&mut self, address: &H160, value: U256) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        if account.balance == value {
            return Ok(());
        }
        account.balance = value;
        self.insert_cache(address, AccountEntry::new_dirty(Some(account)));
        Ok(())
    }

    pub fn set_nonce(&mut self, address: &H160, nonce: U256) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        if account.nonce == nonce {
            return Ok(());
        }
        account.nonce = nonce;
        self.insert_cache(address, AccountEntry::new_dirty(Some(account)));
        Ok(())
    }

    pub fn inc_nonce(&mut self, address: &H160) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        account.inc_nonce();
        self.insert_cache(address, AccountEntry::new_dirty(Some(account)));
        Ok(())
    }

    /// Record the account as non-existent (self-destruct, EIP-161 clearing).
    pub fn kill_account(&mut self, address: &H160) {
        self.insert_cache(address, AccountEntry::new_dirty(None));
    }

    /// Remove touched accounts that ended up empty.
    pub fn kill_garbage(&mut self, touched: &HashSet<H160>) -> Result<(), Error> {
        for address in touched {
            if self.exists(address)? && self.is_empty(address)? {
                self.kill_account(address);
            }
        }
        Ok(())
    }

    /// Install `entry` for `address`. While a savepoint is open, a dirtying
    /// write also stores the address's pre-image in the savepoint — only
    /// the first one; later writes to the same address must not shadow it.
    fn insert_cache(&self, address: &H160, entry: AccountEntry) {
        if entry.is_dirty() {
            if let Some(open) = self.checkpoints.borrow_mut().last_mut() {
                if !open.contains_key(address) {
                    let pre_image = self
                        .cache
                        .borrow()
                        .get(address)
                        .map(AccountEntry::clone_dirty);
                    open.insert(*address, pre_image);
                }
            }
        }
        self.cache.borrow_mut().insert(*address, entry);
    }

    /// Open a savepoint; return its index.
    pub fn checkpoint(&mut self) -> usize {
        let mut savepoints = self.checkpoints.borrow_mut();
        savepoints.push(HashMap::new());
        debug!("journal: opened savepoint {}", savepoints.len() - 1);
        savepoints.len() - 1
    }

    pub fn checkpoint_depth(&self) -> usize {
        self.checkpoints.borrow().len()
    }

    /// Drop the top savepoint, keeping its writes. Its pre-images are handed
    /// down to the savepoint below, which keeps its own, older pre-image
    /// wherever both recorded one.
    pub fn discard_checkpoint(&mut self) {
        let mut savepoints = self.checkpoints.borrow_mut();
        let folded = match savepoints.pop() {
            Some(folded) => folded,
            None => return,
        };
        debug!("journal: folded savepoint {}", savepoints.len());
        if let Some(below) = savepoints.last_mut() {
            for (address, pre_image) in folded {
                below.entry(address).or_insert(pre_image);
            }
        }
    }

    /// Roll the cache back to what the top savepoint captured and drop it.
    pub fn revert_checkpoint(&mut self) {
        let Some(undo) = self.checkpoints.borrow_mut().pop() else {
            return;
        };
        debug!("journal: rolling back {} touched accounts", undo.len());
        let mut cache = self.cache.borrow_mut();
        for (address, pre_image) in undo {
            match pre_image {
                Some(saved) => {
                    if let Some(current) = cache.get_mut(&address) {
                        current.merge(saved);
                    } else {
                        cache.insert(address, saved);
                    }
                }
                None => {
                    // The address was unknown when the savepoint opened;
                    // only an aborted write can have left a dirty entry.
                    if cache.get(&address).map_or(false, AccountEntry::is_dirty) {
                        cache.remove(&address);
                    }
                }
            }
        }
    }

    /// Flush dirty cache entries into the trie and recompute the world root.
    /// The result depends only on the account image, not on write order.
    pub fn commit(&mut self) -> Result<(), Error> {
        assert!(self.checkpoints.borrow().is_empty());
        let mut cache = self.cache.borrow_mut();

        for (address, entry) in cache.iter_mut().filter(|(_, e)| e.is_dirty()) {
            if let Some(ref mut account) = entry.account {
                let accdb = Arc::new(AccountDB::new(*address, Arc::clone(&self.db)));
                account.commit_storage(Arc::clone(&accdb))?;
                account.commit_code(accdb)?;
            }
        }

        let mut trie = PatriciaTrie::from(
            Arc::clone(&self.db),
            Arc::new(hash::get_hasher()),
            &self.root.0,
        )?;
        for (address, entry) in cache.iter_mut().filter(|(_, e)| e.is_dirty()) {
            entry.status = EntryStatus::Committed;
            let leaf = match entry.account {
                Some(ref account) => rlp::encode(&account.account()).to_vec(),
                None => vec![],
            };
            trie.insert(address.as_bytes().to_vec(), leaf)?;
        }

        self.root = H256::from_slice(&trie.root()?);
        self.db
            .flush()
            .map_err(|e| Error::Database(format!("{}", e)))
    }
}
