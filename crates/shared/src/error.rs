use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure the controller can surface. None of them are fatal; each one
/// leaves controller state exactly as it was before the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("Enter a valid amount")]
    InvalidAmount,
    #[error("Nothing to unstake")]
    NothingToUnstake,
    #[error("Wrong network")]
    NetworkMismatch,
    #[error("Failed to switch network")]
    SwitchFailed,
    #[error("Another staking operation is still in progress")]
    OperationInProgress,
    #[error("Connect a wallet first")]
    ConnectionRequired,
}
