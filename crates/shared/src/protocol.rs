use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    Address, ChainId, NativeCurrency, NetworkDescriptor, ReceiptStatus, TransactionReceipt, TxHash,
};

pub const JSONRPC_VERSION: &str = "2.0";

/// Provider rejection code for a request the user declined.
pub const USER_REJECTED_CODE: i64 = 4001;
/// Provider rejection code for a chain the wallet has never been told about.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

pub mod methods {
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const ACCOUNTS: &str = "eth_accounts";
    pub const CHAIN_ID: &str = "eth_chainId";
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
    pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
    pub const SEND_TRANSACTION: &str = "eth_sendTransaction";
    pub const TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
    pub const CALL: &str = "eth_call";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchChainParameter {
    pub chain_id: String,
}

impl From<ChainId> for SwitchChainParameter {
    fn from(chain_id: ChainId) -> Self {
        Self {
            chain_id: chain_id.to_hex_quantity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParameter {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_explorer_urls: Vec<String>,
}

impl From<&NetworkDescriptor> for AddChainParameter {
    fn from(network: &NetworkDescriptor) -> Self {
        Self {
            chain_id: network.chain_id.to_hex_quantity(),
            chain_name: network.chain_name.clone(),
            native_currency: network.native_currency.clone(),
            rpc_urls: network.rpc_urls.clone(),
            block_explorer_urls: network.block_explorer_urls.clone(),
        }
    }
}

/// State-changing call; the wallet fills in nonce, gas and signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub to: Address,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: TxHash,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<RpcReceipt> for TransactionReceipt {
    fn from(value: RpcReceipt) -> Self {
        // Receipts without a status field predate status codes and only exist once mined.
        let status = match value.status.as_deref().and_then(parse_quantity) {
            Some(0) => ReceiptStatus::Reverted,
            _ => ReceiptStatus::Success,
        };
        Self {
            transaction_hash: value.transaction_hash,
            block_number: value.block_number.as_deref().and_then(parse_quantity),
            status,
        }
    }
}

pub fn parse_quantity(raw: &str) -> Option<u64> {
    let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ProviderEvent {
    AccountsChanged { accounts: Vec<Address> },
    ChainChanged { chain_id: ChainId },
}
