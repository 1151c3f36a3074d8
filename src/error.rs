use ethers::types::{
    TxHash,
    U256,
};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("profile storage unavailable: {0}")]
    Storage(String),

    /// Non-success HTTP status. Displays as the raw response body.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("'{0}' cannot be used as a path segment")]
    InvalidPathSegment(String),

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("chain request failed: {0}")]
    Chain(String),

    #[error("transaction {0:?} was dropped before confirmation")]
    TransactionDropped(TxHash),

    #[error("game creation subscription closed")]
    SubscriptionClosed,

    #[error("timed out waiting for game creation of lobby '{0}'")]
    ConfirmationTimeout(String),

    #[error("value {0} does not fit into a 128-bit counter")]
    Overflow(U256),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn chain(err: impl std::fmt::Display) -> Self {
        Error::Chain(err.to_string())
    }

    pub(crate) fn storage(err: impl std::fmt::Display) -> Self {
        Error::Storage(err.to_string())
    }
}
