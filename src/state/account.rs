use std::sync::Arc;

use cita_trie::{PatriciaTrie, Trie, DB};
use ethereum_types::{H256, U256};
use hashbrown::HashMap;

use crate::common::hash;
use crate::state::err::Error;

/// Account leaf as persisted in the world-state trie:
/// Key: address -> Value: rlp::encode(account).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub nonce: U256,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
}

impl rlp::Encodable for Account {
    fn rlp_append(&self, s: &mut rlp::RlpStream) {
        s.begin_list(4)
            .append(&self.nonce)
            .append(&self.balance)
            .append(&self.storage_root)
            .append(&self.code_hash);
    }
}

impl rlp::Decodable for Account {
    fn decode(data: &rlp::Rlp) -> Result<Self, rlp::DecoderError> {
        Ok(Account {
            nonce: data.val_at(0)?,
            balance: data.val_at(1)?,
            storage_root: data.val_at(2)?,
            code_hash: data.val_at(3)?,
        })
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum CodeState {
    Clean,
    Dirty,
}

/// In-memory working form of an account: the trie leaf plus loaded code and
/// uncommitted storage writes.
#[derive(Debug, Clone)]
pub struct AccountState {
    pub nonce: U256,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
    pub code: Vec<u8>,
    pub code_state: CodeState,
    pub storage_changes: HashMap<H256, H256>,
}

impl From<Account> for AccountState {
    fn from(account: Account) -> Self {
        AccountState {
            nonce: account.nonce,
            balance: account.balance,
            storage_root: account.storage_root,
            code_hash: account.code_hash,
            code: vec![],
            code_state: CodeState::Clean,
            storage_changes: HashMap::new(),
        }
    }
}

impl AccountState {
    /// A fresh account. If it is a contract, call `init_code` before the
    /// entry is committed.
    pub fn new(balance: U256, nonce: U256) -> AccountState {
        AccountState {
            nonce,
            balance,
            storage_root: hash::RLP_NULL,
            code_hash: hash::NIL_DATA,
            code: vec![],
            code_state: CodeState::Clean,
            storage_changes: HashMap::new(),
        }
    }

    /// Decode a trie leaf. Call `read_code` afterwards.
    pub fn from_rlp(data: &[u8]) -> Result<AccountState, Error> {
        let account: Account = rlp::decode(data)?;
        Ok(account.into())
    }

    pub fn account(&self) -> Account {
        Account {
            nonce: self.nonce,
            balance: self.balance,
            storage_root: self.storage_root,
            code_hash: self.code_hash,
        }
    }

    /// Empty according to EIP-161: balance = nonce = code = 0.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce.is_zero() && self.code_hash == hash::NIL_DATA
    }

    pub fn init_code(&mut self, code: Vec<u8>) {
        self.code_hash = H256::from_slice(&hash::summary(&code));
        self.code = code;
        self.code_state = CodeState::Dirty;
    }

    /// Load code from the database by code hash.
    pub fn read_code<B: DB>(&mut self, db: Arc<B>) -> Result<(), Error> {
        if self.code_hash == hash::NIL_DATA {
            return Ok(());
        }
        let code = db
            .get(self.code_hash.as_bytes())
            .map_err(|e| Error::Database(format!("{}", e)))?
            .unwrap_or_default();
        self.code = code;
        self.code_state = CodeState::Clean;
        Ok(())
    }

    pub fn inc_nonce(&mut self) {
        self.nonce += U256::one();
    }

    pub fn add_balance(&mut self, x: U256) -> Result<(), Error> {
        let (sum, overflow) = self.balance.overflowing_add(x);
        if overflow {
            return Err(Error::BalanceOverflow);
        }
        self.balance = sum;
        Ok(())
    }

    pub fn sub_balance(&mut self, x: U256) -> Result<(), Error> {
        let (rest, underflow) = self.balance.overflowing_sub(x);
        if underflow {
            return Err(Error::BalanceOverflow);
        }
        self.balance = rest;
        Ok(())
    }

    pub fn set_storage(&mut self, key: H256, value: H256) {
        self.storage_changes.insert(key, value);
    }

    /// Look a slot up in the account's storage trie, skipping the write cache.
    pub fn storage_at_backend<B: DB>(&self, db: Arc<B>, key: &H256) -> Result<Option<H256>, Error> {
        if self.storage_root == hash::RLP_NULL {
            return Ok(None);
        }
        let trie = PatriciaTrie::from(db, Arc::new(hash::get_hasher()), &self.storage_root.0)?;
        if let Some(raw) = trie.get(key.as_bytes())? {
            let value: U256 = rlp::decode(&raw)?;
            let mut buf = [0u8; 32];
            value.to_big_endian(&mut buf);
            return Ok(Some(H256::from(buf)));
        }
        Ok(None)
    }

    /// Pending write if any, then the storage trie.
    pub fn storage_at<B: DB>(&self, db: Arc<B>, key: &H256) -> Result<Option<H256>, Error> {
        if let Some(value) = self.storage_changes.get(key) {
            return Ok(Some(*value));
        }
        self.storage_at_backend(db, key)
    }

    /// Flush pending storage writes into the storage trie.
    pub fn commit_storage<B: DB>(&mut self, db: Arc<B>) -> Result<(), Error> {
        let mut trie = if self.storage_root == hash::RLP_NULL {
            PatriciaTrie::new(db, Arc::new(hash::get_hasher()))
        } else {
            PatriciaTrie::from(db, Arc::new(hash::get_hasher()), &self.storage_root.0)?
        };
        for (k, v) in self.storage_changes.drain() {
            if v.is_zero() {
                trie.remove(k.as_bytes())?;
            } else {
                trie.insert(
                    k.as_bytes().to_vec(),
                    rlp::encode(&U256::from_big_endian(v.as_bytes())).to_vec(),
                )?;
            }
        }
        self.storage_root = H256::from_slice(&trie.root()?);
        Ok(())
    }

    /// Flush code to the database if it changed.
    pub fn commit_code<B: DB>(&mut self, db: Arc<B>) -> Result<(), Error> {
        if self.code_state == CodeState::Dirty && !self.code.is_empty() {
            db.insert(self.code_hash.as_bytes().to_vec(), self.code.clone())
                .map_err(|e| Error::Database(format!("{}", e)))?;
        }
        self.code_state = CodeState::Clean;
        Ok(())
    }

    /// Clone without pending storage writes.
    pub fn clone_clean(&self) -> AccountState {
        AccountState {
            nonce: self.nonce,
            balance: self.balance,
            storage_root: self.storage_root,
            code_hash: self.code_hash,
            code: self.code.clone(),
            code_state: self.code_state,
            storage_changes: HashMap::new(),
        }
    }

    /// Clone including pending storage writes.
    pub fn clone_dirty(&self) -> AccountState {
        let mut account = self.clone_clean();
        account.storage_changes = self.storage_changes.clone();
        account
    }

    pub fn merge(&mut self, other: AccountState) {
        self.nonce = other.nonce;
        self.balance = other.balance;
        self.storage_root = other.storage_root;
        self.code_hash = other.code_hash;
        self.code_state = other.code_state;
        self.code = other.code;
        self.storage_changes = other.storage_changes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_account_has_empty_hashes() {
        let a = AccountState::new(69u8.into(), 0u8.into());
        assert_eq!(a.balance, 69u8.into());
        assert_eq!(a.code_hash, hash::NIL_DATA);
        assert_eq!(a.storage_root, hash::RLP_NULL);
        assert_eq!(
            hex::encode(rlp::encode(&a.account())),
            "f8448045a056e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421\
             a0c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn account_rlp_round_trip() {
        let a = AccountState::new(69u8.into(), 1u8.into());
        let b = AccountState::from_rlp(&rlp::encode(&a.account())).unwrap();
        assert_eq!(a.account(), b.account());
    }

    #[test]
    fn storage_commit_is_idempotent_on_reset() {
        let db = Arc::new(cita_trie::MemoryDB::new(false));
        let mut a = AccountState::new(0.into(), 0.into());
        a.set_storage(H256::from_low_u64_be(0), H256::from_low_u64_be(0x1234));
        a.commit_storage(Arc::clone(&db)).unwrap();
        let root_one = a.storage_root;

        a.set_storage(H256::from_low_u64_be(1), H256::from_low_u64_be(0x1234));
        a.commit_storage(Arc::clone(&db)).unwrap();
        assert_ne!(a.storage_root, root_one);

        a.set_storage(H256::from_low_u64_be(1), H256::zero());
        a.commit_storage(Arc::clone(&db)).unwrap();
        assert_eq!(a.storage_root, root_one);
    }

    #[test]
    fn code_round_trip_through_database() {
        let db = Arc::new(cita_trie::MemoryDB::new(false));
        let mut a = AccountState::new(0.into(), 0.into());
        a.init_code(vec![0x55, 0x44, 0xff]);
        a.commit_code(Arc::clone(&db)).unwrap();

        let mut b = AccountState::from_rlp(&rlp::encode(&a.account())).unwrap();
        b.read_code(db).unwrap();
        assert_eq!(b.code, vec![0x55, 0x44, 0xff]);
    }
}
