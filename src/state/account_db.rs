use std::sync::Arc;

use cita_trie::DB;
use ethereum_types::H160;

use crate::state::err::Error;

/// View of the backing store scoped to one account: every key is prefixed
/// with the account address so per-account storage tries cannot collide.
#[derive(Debug)]
pub struct AccountDB<B: DB> {
    address: H160,
    db: Arc<B>,
}

impl<B: DB> AccountDB<B> {
    pub fn new(address: H160, db: Arc<B>) -> Self {
        AccountDB { address, db }
    }

    fn scoped(&self, key: &[u8]) -> Vec<u8> {
        [self.address.as_bytes(), key].concat()
    }
}

impl<B: DB> DB for AccountDB<B> {
    type Error = Error;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        self.db
            .get(&self.scoped(key))
            .map_err(|e| Error::Database(format!("{}", e)))
    }

    fn contains(&self, key: &[u8]) -> Result<bool, Self::Error> {
        self.db
            .contains(&self.scoped(key))
            .map_err(|e| Error::Database(format!("{}", e)))
    }

    fn insert(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), Self::Error> {
        self.db
            .insert(self.scoped(&key), value)
            .map_err(|e| Error::Database(format!("{}", e)))
    }

    fn remove(&self, key: &[u8]) -> Result<(), Self::Error> {
        self.db
            .remove(&self.scoped(key))
            .map_err(|e| Error::Database(format!("{}", e)))
    }

    fn flush(&self) -> Result<(), Self::Error> {
        self.db
            .flush()
            .map_err(|e| Error::Database(format!("{}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cita_trie::MemoryDB;

    #[test]
    fn scoped_keys_do_not_collide_across_accounts() {
        let db = Arc::new(MemoryDB::new(false));
        let a = AccountDB::new(H160::repeat_byte(0x01), Arc::clone(&db));
        let b = AccountDB::new(H160::repeat_byte(0x02), Arc::clone(&db));
        a.insert(b"slot".to_vec(), b"a-value".to_vec()).unwrap();
        b.insert(b"slot".to_vec(), b"b-value".to_vec()).unwrap();
        assert_eq!(a.get(b"slot").unwrap().unwrap(), b"a-value");
        assert_eq!(b.get(b"slot").unwrap().unwrap(), b"b-value");
    }

    #[test]
    fn remove_clears_only_the_scoped_key() {
        let db = Arc::new(MemoryDB::new(false));
        let a = AccountDB::new(H160::repeat_byte(0x01), Arc::clone(&db));
        a.insert(b"k".to_vec(), b"v".to_vec()).unwrap();
        a.remove(b"k").unwrap();
        assert!(!a.contains(b"k").unwrap());
    }
}
