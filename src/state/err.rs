/// Failures of the journaled world state and its backing trie store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("balance overflow")]
    BalanceOverflow,
    #[error("database error: {0}")]
    Database(String),
    #[error("state root not found")]
    RootNotFound,
    #[error(transparent)]
    Rlp(#[from] rlp::DecoderError),
    #[error("trie error: {0}")]
    Trie(String),
    #[error("fork client error: {0}")]
    Remote(String),
}

impl From<cita_trie::TrieError> for Error {
    fn from(error: cita_trie::TrieError) -> Self {
        Error::Trie(format!("{}", error))
    }
}
