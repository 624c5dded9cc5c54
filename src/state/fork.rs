use ethereum_types::{H160, H256, U256};

use crate::state::err::Error;

/// The JSON-RPC reads the journal consumes from the remote node when the
/// adapter is forked. All reads are pinned to a block height chosen by the
/// journal (the fork block, or an earlier height after time travel).
///
/// Implementations are blocking; an async client is wrapped by the caller.
pub trait ForkSource: Send + Sync {
    fn network_id(&self) -> Result<u64, Error>;

    fn balance(&self, address: &H160, block_number: u64) -> Result<U256, Error>;

    fn transaction_count(&self, address: &H160, block_number: u64) -> Result<U256, Error>;

    fn code(&self, address: &H160, block_number: u64) -> Result<Vec<u8>, Error>;

    fn storage_at(&self, address: &H160, key: &H256, block_number: u64) -> Result<H256, Error>;
}
