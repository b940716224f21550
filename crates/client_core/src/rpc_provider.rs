use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{
    domain::{Address, ChainId, NetworkDescriptor, TransactionReceipt, TxHash},
    protocol::{
        methods, AddChainParameter, CallRequest, ProviderEvent, RpcReceipt, RpcRequest,
        RpcResponse, SwitchChainParameter, TransactionRequest,
    },
};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::debug;
use url::Url;

use crate::provider::{ProviderError, ProviderResult, WalletProvider};

pub const MIN_WATCH_INTERVAL: Duration = Duration::from_millis(10);

/// Wallet reachable over HTTP JSON-RPC that understands the EIP-1193 method set
/// (a wallet bridge, or a development node with unlocked accounts).
pub struct JsonRpcWalletProvider {
    http: Client,
    endpoint: Url,
    next_id: AtomicU64,
    events: broadcast::Sender<ProviderEvent>,
}

impl JsonRpcWalletProvider {
    pub fn new(endpoint: Url) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            http: Client::new(),
            endpoint,
            next_id: AtomicU64::new(1),
            events,
        }
    }

    pub fn connect(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)
            .with_context(|| format!("invalid wallet provider url: {endpoint}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "wallet provider url must start with http:// or https://"
            ));
        }
        Ok(Self::new(url))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send_raw(&self, method: &str, params: Value) -> Result<RpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&RpcRequest::new(id, method, params))
            .send()
            .await
            .with_context(|| format!("failed to reach wallet provider for {method}"))?
            .error_for_status()?
            .json::<RpcResponse>()
            .await
            .with_context(|| format!("invalid {method} response"))?;
        Ok(response)
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> ProviderResult<T> {
        let response = self
            .send_raw(method, params)
            .await
            .map_err(|err| ProviderError::transport(format!("{err:#}")))?;
        if let Some(error) = response.error {
            return Err(error.into());
        }
        serde_json::from_value(response.result.unwrap_or(Value::Null)).map_err(|err| {
            ProviderError::transport(format!("malformed {method} result: {err}"))
        })
    }

    /// Polls accounts and chain id and publishes changes as provider events.
    /// The first poll only records a baseline. The task ends once the provider is dropped.
    /// Intervals shorter than `MIN_WATCH_INTERVAL` are raised to it.
    pub fn spawn_event_watcher(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let provider = Arc::downgrade(self);
        let interval = interval.max(MIN_WATCH_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_accounts: Option<Vec<Address>> = None;
            let mut last_chain: Option<ChainId> = None;
            loop {
                ticker.tick().await;
                let Some(provider) = provider.upgrade() else {
                    break;
                };

                match provider.accounts().await {
                    Ok(accounts) => {
                        if last_accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                            let _ = provider.events.send(ProviderEvent::AccountsChanged {
                                accounts: accounts.clone(),
                            });
                        }
                        last_accounts = Some(accounts);
                    }
                    Err(err) => debug!(code = err.code, "wallet: account poll failed: {}", err.message),
                }

                match provider.chain_id().await {
                    Ok(chain_id) => {
                        if last_chain.is_some_and(|prev| prev != chain_id) {
                            let _ = provider
                                .events
                                .send(ProviderEvent::ChainChanged { chain_id });
                        }
                        last_chain = Some(chain_id);
                    }
                    Err(err) => debug!(code = err.code, "wallet: chain poll failed: {}", err.message),
                }
            }
        })
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWalletProvider {
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        self.request(methods::REQUEST_ACCOUNTS, json!([])).await
    }

    async fn accounts(&self) -> ProviderResult<Vec<Address>> {
        self.request(methods::ACCOUNTS, json!([])).await
    }

    async fn chain_id(&self) -> ProviderResult<ChainId> {
        let raw: String = self.request(methods::CHAIN_ID, json!([])).await?;
        ChainId::from_hex_quantity(&raw).map_err(|err| ProviderError::transport(err.to_string()))
    }

    async fn switch_chain(&self, chain_id: ChainId) -> ProviderResult<()> {
        let _: Value = self
            .request(
                methods::SWITCH_CHAIN,
                json!([SwitchChainParameter::from(chain_id)]),
            )
            .await?;
        Ok(())
    }

    async fn add_chain(&self, network: &NetworkDescriptor) -> ProviderResult<()> {
        let _: Value = self
            .request(methods::ADD_CHAIN, json!([AddChainParameter::from(network)]))
            .await?;
        Ok(())
    }

    async fn send_transaction(&self, request: TransactionRequest) -> ProviderResult<TxHash> {
        self.request(methods::SEND_TRANSACTION, json!([request]))
            .await
    }

    async fn transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> ProviderResult<Option<TransactionReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .request(methods::TRANSACTION_RECEIPT, json!([hash]))
            .await?;
        Ok(receipt.map(TransactionReceipt::from))
    }

    async fn call(&self, request: CallRequest) -> ProviderResult<Vec<u8>> {
        let raw: String = self.request(methods::CALL, json!([request, "latest"])).await?;
        let digits = raw.strip_prefix("0x").unwrap_or(&raw);
        hex::decode(digits)
            .map_err(|err| ProviderError::transport(format!("malformed eth_call output: {err}")))
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/rpc_provider_tests.rs"]
mod tests;
