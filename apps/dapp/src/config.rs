use std::{fs, path::Path, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use client_core::{JsonRpcWalletProvider, WalletSessionConfig};
use serde::Deserialize;
use shared::domain::{Address, ChainId, NativeCurrency, NetworkDescriptor};
use tracing::warn;

const DEFAULT_CONFIG_FILE: &str = "dapp.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    /// No provider URL means no wallet is available.
    pub provider_url: Option<String>,
    pub contract_address: String,
    pub network: NetworkDescriptor,
    pub receipt_poll_interval_ms: u64,
    pub event_poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider_url: None,
            contract_address: "0x458e93d88F737fD7c6A290d0d1622FfDF3411D26".into(),
            network: NetworkDescriptor {
                chain_id: ChainId(713714),
                chain_name: "Walee Chain".into(),
                native_currency: NativeCurrency {
                    name: "WAL".into(),
                    symbol: "WAL".into(),
                    decimals: 18,
                },
                rpc_urls: vec!["https://rpc.walee.io".into()],
                block_explorer_urls: vec!["https://explorer.walee.io".into()],
            },
            receipt_poll_interval_ms: 1000,
            event_poll_interval_ms: 2000,
        }
    }
}

impl Settings {
    pub fn session_config(&self) -> anyhow::Result<WalletSessionConfig> {
        let contract_address = Address::new(self.contract_address.as_str())
            .ok_or_else(|| anyhow!("contract_address must not be empty"))?;
        let mut config = WalletSessionConfig::new(contract_address, self.network.clone());
        config.receipt_poll_interval = Duration::from_millis(self.receipt_poll_interval_ms);
        Ok(config)
    }

    pub fn wallet_provider(&self) -> anyhow::Result<Option<Arc<JsonRpcWalletProvider>>> {
        let Some(url) = self.provider_url.as_deref() else {
            return Ok(None);
        };
        let provider = JsonRpcWalletProvider::connect(url)?;
        Ok(Some(Arc::new(provider)))
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_interval_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    provider_url: Option<String>,
    contract_address: Option<String>,
    receipt_poll_interval_ms: Option<u64>,
    event_poll_interval_ms: Option<u64>,
    #[serde(default)]
    network: FileNetwork,
}

#[derive(Debug, Default, Deserialize)]
struct FileNetwork {
    chain_id: Option<u64>,
    chain_name: Option<String>,
    currency_name: Option<String>,
    currency_symbol: Option<String>,
    currency_decimals: Option<u8>,
    rpc_urls: Option<Vec<String>>,
    block_explorer_urls: Option<Vec<String>>,
}

/// Defaults, then the config file, then `APP__*` environment variables.
/// An explicitly given file must exist; the default `dapp.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(path) {
        Ok(raw) => {
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }
        Err(err) if required => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.provider_url {
        settings.provider_url = Some(v);
    }
    if let Some(v) = file_cfg.contract_address {
        settings.contract_address = v;
    }
    if let Some(v) = file_cfg
        .receipt_poll_interval_ms
        .and_then(|ms| nonzero_interval("receipt_poll_interval_ms", ms))
    {
        settings.receipt_poll_interval_ms = v;
    }
    if let Some(v) = file_cfg
        .event_poll_interval_ms
        .and_then(|ms| nonzero_interval("event_poll_interval_ms", ms))
    {
        settings.event_poll_interval_ms = v;
    }

    let network = file_cfg.network;
    if let Some(v) = network.chain_id {
        settings.network.chain_id = ChainId(v);
    }
    if let Some(v) = network.chain_name {
        settings.network.chain_name = v;
    }
    if let Some(v) = network.currency_name {
        settings.network.native_currency.name = v;
    }
    if let Some(v) = network.currency_symbol {
        settings.network.native_currency.symbol = v;
    }
    if let Some(v) = network.currency_decimals {
        settings.network.native_currency.decimals = v;
    }
    if let Some(v) = network.rpc_urls {
        settings.network.rpc_urls = v;
    }
    if let Some(v) = network.block_explorer_urls {
        settings.network.block_explorer_urls = v;
    }

    Ok(())
}

/// A zero interval would poll the provider without pause, so it is ignored.
fn nonzero_interval(key: &str, ms: u64) -> Option<u64> {
    if ms == 0 {
        warn!(key, "config: ignoring zero poll interval");
        None
    } else {
        Some(ms)
    }
}

fn parse_interval(key: &str, raw: &str) -> Option<u64> {
    match raw.parse::<u64>() {
        Ok(ms) => nonzero_interval(key, ms),
        Err(_) => {
            warn!(key, value = %raw, "config: ignoring invalid poll interval");
            None
        }
    }
}

fn split_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("WALLET_PROVIDER_URL") {
        settings.provider_url = Some(v);
    }
    if let Some(v) = var("APP__PROVIDER_URL") {
        settings.provider_url = Some(v);
    }

    if let Some(v) = var("APP__CONTRACT_ADDRESS") {
        settings.contract_address = v;
    }

    if let Some(v) = var("APP__CHAIN_ID") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.network.chain_id = ChainId(parsed),
            Err(_) => warn!(value = %v, "config: ignoring invalid APP__CHAIN_ID"),
        }
    }
    if let Some(v) = var("APP__CHAIN_NAME") {
        settings.network.chain_name = v;
    }
    if let Some(v) = var("APP__RPC_URLS") {
        settings.network.rpc_urls = split_urls(&v);
    }
    if let Some(v) = var("APP__EXPLORER_URLS") {
        settings.network.block_explorer_urls = split_urls(&v);
    }

    if let Some(ms) = var("APP__RECEIPT_POLL_INTERVAL_MS")
        .and_then(|v| parse_interval("APP__RECEIPT_POLL_INTERVAL_MS", &v))
    {
        settings.receipt_poll_interval_ms = ms;
    }
    if let Some(ms) = var("APP__EVENT_POLL_INTERVAL_MS")
        .and_then(|v| parse_interval("APP__EVENT_POLL_INTERVAL_MS", &v))
    {
        settings.event_poll_interval_ms = ms;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
