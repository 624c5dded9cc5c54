mod account;
mod account_db;
mod entry;
mod err;
mod fork;
mod world;

pub use account::{Account, AccountState, CodeState};
pub use account_db::AccountDB;
pub use cita_trie::MemoryDB;
pub use entry::{AccountEntry, EntryStatus};
pub use err::Error;
pub use fork::ForkSource;
pub use world::JournalState;
