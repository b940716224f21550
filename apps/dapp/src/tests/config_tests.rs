use super::{apply_env, apply_file, load_settings, Settings};

use std::{
    collections::HashMap,
    env, fs,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use shared::domain::ChainId;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_target_walee_chain_without_a_wallet() {
    let settings = Settings::default();
    assert_eq!(settings.network.chain_id, ChainId(713714));
    assert!(settings.provider_url.is_none());
    assert!(settings.wallet_provider().expect("provider").is_none());
    assert_eq!(
        settings.session_config().expect("session config").network.chain_name,
        "Walee Chain"
    );
}

#[test]
fn file_overrides_only_the_keys_it_names() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
provider_url = "http://127.0.0.1:8545"
receipt_poll_interval_ms = 250

[network]
rpc_urls = ["https://rpc.example.test"]
block_explorer_urls = ["https://scan.example.test"]
"#,
    )
    .expect("valid toml");

    assert_eq!(settings.provider_url.as_deref(), Some("http://127.0.0.1:8545"));
    assert_eq!(settings.receipt_poll_interval_ms, 250);
    assert_eq!(settings.network.rpc_urls, vec!["https://rpc.example.test"]);
    assert_eq!(
        settings.network.block_explorer_urls,
        vec!["https://scan.example.test"]
    );
    assert_eq!(settings.network.chain_name, "Walee Chain");
    assert_eq!(settings.network.native_currency.decimals, 18);
}

#[test]
fn malformed_file_is_an_error() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, "receipt_poll_interval_ms = \"soon\"").is_err());
}

#[test]
fn environment_wins_over_file() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "provider_url = \"http://file:8545\"").expect("toml");
    apply_env(
        &mut settings,
        env_from(&[
            ("APP__PROVIDER_URL", "http://env:8545"),
            ("APP__CHAIN_ID", "31337"),
            ("APP__RPC_URLS", "https://a.test, https://b.test,"),
            ("APP__EVENT_POLL_INTERVAL_MS", "not-a-number"),
        ]),
    );

    assert_eq!(settings.provider_url.as_deref(), Some("http://env:8545"));
    assert_eq!(settings.network.chain_id, ChainId(31337));
    assert_eq!(
        settings.network.rpc_urls,
        vec!["https://a.test", "https://b.test"]
    );
    assert_eq!(settings.event_poll_interval_ms, 2000);
}

#[test]
fn invalid_chain_id_in_environment_is_ignored() {
    let mut settings = Settings::default();
    apply_env(&mut settings, env_from(&[("APP__CHAIN_ID", "0xae3f2")]));
    assert_eq!(settings.network.chain_id, ChainId(713714));
}

#[test]
fn zero_poll_intervals_are_ignored() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        "receipt_poll_interval_ms = 0\nevent_poll_interval_ms = 0\n",
    )
    .expect("valid toml");
    assert_eq!(settings.receipt_poll_interval_ms, 1000);
    assert_eq!(settings.event_poll_interval_ms, 2000);

    apply_env(
        &mut settings,
        env_from(&[
            ("APP__RECEIPT_POLL_INTERVAL_MS", "0"),
            ("APP__EVENT_POLL_INTERVAL_MS", "0"),
        ]),
    );
    assert_eq!(settings.receipt_poll_interval_ms, 1000);
    assert_eq!(settings.event_poll_interval_ms, 2000);
    assert!(!settings.event_poll_interval().is_zero());

    apply_env(
        &mut settings,
        env_from(&[("APP__EVENT_POLL_INTERVAL_MS", "500")]),
    );
    assert_eq!(settings.event_poll_interval_ms, 500);
}

#[test]
fn explicit_config_path_must_exist() {
    let missing = Path::new("/definitely/not/here/dapp.toml");
    assert!(load_settings(Some(missing)).is_err());
}

#[test]
fn loads_explicit_config_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("dapp_config_test_{suffix}.toml"));
    fs::write(&path, "contract_address = \"0xcafe\"\n[network]\nchain_name = \"Devnet\"\n")
        .expect("write config");

    let settings = load_settings(Some(&path)).expect("load");
    assert_eq!(settings.contract_address, "0xcafe");
    assert_eq!(settings.network.chain_name, "Devnet");

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn blank_contract_address_is_rejected() {
    let settings = Settings {
        contract_address: "  ".into(),
        ..Settings::default()
    };
    assert!(settings.session_config().is_err());
}

#[test]
fn provider_url_must_be_http() {
    let settings = Settings {
        provider_url: Some("ftp://wallet".into()),
        ..Settings::default()
    };
    assert!(settings.wallet_provider().is_err());
}
