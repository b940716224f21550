//! Network verification and the single register-then-retry switch attempt.

use shared::{
    domain::{ChainId, NetworkDescriptor},
    error::SessionError,
};
use tracing::{info, warn};

use crate::provider::{ProviderError, WalletProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    Unknown,
    Correct,
    Incorrect,
    Switching,
}

impl NetworkState {
    pub fn classify(live: ChainId, expected: ChainId) -> Self {
        if live == expected {
            Self::Correct
        } else {
            Self::Incorrect
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkOutcome {
    /// Chain id re-read from the provider after any switch.
    pub chain_id: ChainId,
    pub switched: bool,
    pub registered: bool,
    pub transitions: Vec<NetworkState>,
}

struct NetworkVerifier<'a> {
    provider: &'a dyn WalletProvider,
    network: &'a NetworkDescriptor,
    transitions: Vec<NetworkState>,
}

impl<'a> NetworkVerifier<'a> {
    fn enter(&mut self, state: NetworkState) {
        if self.transitions.last() != Some(&state) {
            self.transitions.push(state);
        }
    }

    fn mismatch(&self, detail: impl std::fmt::Display) -> SessionError {
        SessionError::NetworkMismatch(format!(
            "please switch to {} (chain id {}): {detail}",
            self.network.chain_name, self.network.chain_id
        ))
    }

    async fn live_chain_id(&self) -> Result<ChainId, SessionError> {
        self.provider
            .chain_id()
            .await
            .map_err(|err| self.mismatch(format!("could not read network: {}", err.message)))
    }

    async fn switch(&self) -> Result<(), ProviderError> {
        self.provider.switch_chain(self.network.chain_id).await
    }
}

/// Brings the wallet onto `network`, switching (and registering the network once
/// when the wallet does not know it) if necessary.
pub async fn ensure_network(
    provider: &dyn WalletProvider,
    network: &NetworkDescriptor,
) -> Result<NetworkOutcome, SessionError> {
    let mut verifier = NetworkVerifier {
        provider,
        network,
        transitions: vec![NetworkState::Unknown],
    };
    let expected = network.chain_id;

    let live = verifier.live_chain_id().await?;
    let state = NetworkState::classify(live, expected);
    verifier.enter(state);
    if state == NetworkState::Correct {
        return Ok(NetworkOutcome {
            chain_id: live,
            switched: false,
            registered: false,
            transitions: verifier.transitions,
        });
    }

    info!(
        live_chain_id = live.0,
        expected_chain_id = expected.0,
        "network: wallet on wrong network, requesting switch"
    );
    verifier.enter(NetworkState::Switching);
    let mut registered = false;
    match verifier.switch().await {
        Ok(()) => {}
        Err(err) if err.is_unrecognized_chain() => {
            warn!(
                chain_id = expected.0,
                chain_name = %network.chain_name,
                "network: wallet does not know the network, registering it"
            );
            verifier.enter(NetworkState::Incorrect);
            provider.add_chain(network).await.map_err(|err| {
                verifier.mismatch(format!("failed to register network: {}", err.message))
            })?;
            registered = true;
            verifier.enter(NetworkState::Switching);
            verifier.switch().await.map_err(|err| {
                verifier.mismatch(format!("switch after registration failed: {}", err.message))
            })?;
        }
        Err(err) => {
            warn!(code = err.code, "network: switch rejected: {}", err.message);
            return Err(verifier.mismatch(format!("switch failed: {}", err.message)));
        }
    }

    // The binding is network-specific, so trust only what the wallet reports now.
    let refreshed = verifier.live_chain_id().await?;
    if refreshed != expected {
        verifier.enter(NetworkState::Incorrect);
        return Err(verifier.mismatch(format!(
            "wallet still reports chain id {refreshed}"
        )));
    }
    verifier.enter(NetworkState::Correct);
    info!(chain_id = refreshed.0, registered, "network: switched");

    Ok(NetworkOutcome {
        chain_id: refreshed,
        switched: true,
        registered,
        transitions: verifier.transitions,
    })
}
