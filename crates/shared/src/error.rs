use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    WalletUnavailable,
    UserRejected,
    NetworkMismatch,
    InvalidInput,
    NotConnected,
    TransactionFailed,
    ReadFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("wallet provider is not available")]
    WalletUnavailable,
    #[error("request rejected: {0}")]
    UserRejected(String),
    #[error("network mismatch: {0}")]
    NetworkMismatch(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("wallet is not connected")]
    NotConnected,
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    #[error("read failed: {0}")]
    ReadFailed(String),
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::WalletUnavailable => ErrorCode::WalletUnavailable,
            Self::UserRejected(_) => ErrorCode::UserRejected,
            Self::NetworkMismatch(_) => ErrorCode::NetworkMismatch,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::NotConnected => ErrorCode::NotConnected,
            Self::TransactionFailed(_) => ErrorCode::TransactionFailed,
            Self::ReadFailed(_) => ErrorCode::ReadFailed,
        }
    }

    /// Text for the blocking notification shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::WalletUnavailable => {
                "No wallet provider is available. Configure a wallet provider to use this application."
                    .to_string()
            }
            Self::UserRejected(detail) | Self::NetworkMismatch(detail) => {
                format!("Failed to connect wallet: {detail}")
            }
            Self::InvalidInput(_) => "Please enter a valid number".to_string(),
            Self::NotConnected => "Please connect your wallet first".to_string(),
            Self::TransactionFailed(detail) => format!("Failed to store value: {detail}"),
            Self::ReadFailed(detail) => format!("Failed to retrieve value: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&SessionError> for ErrorReport {
    fn from(value: &SessionError) -> Self {
        Self::new(value.code(), value.user_message())
    }
}
