//! The wallet boundary: everything the session needs from an account-holding wallet.

use async_trait::async_trait;
use shared::{
    domain::{Address, ChainId, NetworkDescriptor, TransactionReceipt, TxHash},
    protocol::{
        CallRequest, ProviderEvent, RpcErrorObject, TransactionRequest, UNRECOGNIZED_CHAIN_CODE,
        USER_REJECTED_CODE,
    },
};
use thiserror::Error;
use tokio::sync::broadcast;

/// JSON-RPC "internal error"; used for failures that never reached the wallet.
pub const TRANSPORT_ERROR_CODE: i64 = -32603;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(TRANSPORT_ERROR_CODE, message)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED_CODE
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == UNRECOGNIZED_CHAIN_CODE
    }
}

impl From<RpcErrorObject> for ProviderError {
    fn from(value: RpcErrorObject) -> Self {
        Self::new(value.code, value.message)
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// May suspend until the user approves or denies access in the wallet.
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>>;
    /// Accounts already exposed to this client; never prompts.
    async fn accounts(&self) -> ProviderResult<Vec<Address>>;
    async fn chain_id(&self) -> ProviderResult<ChainId>;
    async fn switch_chain(&self, chain_id: ChainId) -> ProviderResult<()>;
    async fn add_chain(&self, network: &NetworkDescriptor) -> ProviderResult<()>;
    async fn send_transaction(&self, request: TransactionRequest) -> ProviderResult<TxHash>;
    /// `None` until the transaction has been included.
    async fn transaction_receipt(&self, hash: &TxHash)
        -> ProviderResult<Option<TransactionReceipt>>;
    async fn call(&self, request: CallRequest) -> ProviderResult<Vec<u8>>;
    fn subscribe_events(&self) -> broadcast::Receiver<ProviderEvent>;
}
