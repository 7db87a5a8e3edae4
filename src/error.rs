use crate::tx::ObjectId;
use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Everything that can go wrong between the user pressing a button and the
/// chain answering. Nothing here is fatal; every variant leaves the session
/// in a retryable state.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("chain RPC failure: {0}")]
    Network(String),

    #[error("insufficient funds: wager needs {required} raw units but only {available} available")]
    InsufficientFunds { required: u64, available: u128 },

    #[error("unexpected GameResult event shape: {0}")]
    UnexpectedEventShape(String),

    #[error("failed to decode on-chain object {id}: {reason}")]
    ObjectDecode { id: ObjectId, reason: String },

    #[error("no account connected")]
    NotConnected,

    #[error("invalid identifier `{0}`")]
    InvalidId(String),

    #[error("invalid call target `{0}`")]
    InvalidTarget(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}
