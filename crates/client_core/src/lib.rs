use std::{sync::Arc, time::Duration};

use shared::{
    domain::{Address, NetworkDescriptor, TransactionReceipt, TxHash, Uint256},
    error::{ErrorReport, SessionError},
    protocol::ProviderEvent,
};
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

pub mod contract;
pub mod controls;
pub mod network;
pub mod provider;
pub mod rpc_provider;
pub mod session;

use contract::ContractHandle;
pub use controls::{ActionControl, ActionControls, ControlState};
use controls::InFlight;
pub use provider::{ProviderError, ProviderResult, WalletProvider, TRANSPORT_ERROR_CODE};
pub use rpc_provider::JsonRpcWalletProvider;
pub use session::{Session, Transition};

const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WalletSessionConfig {
    pub contract_address: Address,
    /// Expected network; its chain id gates every contract operation.
    pub network: NetworkDescriptor,
    pub receipt_poll_interval: Duration,
}

impl WalletSessionConfig {
    pub fn new(contract_address: Address, network: NetworkDescriptor) -> Self {
        Self {
            contract_address,
            network,
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StatusChanged { status: String, connected: bool },
    ControlsChanged(ControlState),
    TransactionConfirmed(TxHash),
    ValueRetrieved(Uint256),
    Error(ErrorReport),
}

/// What the rendering layer shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub status: String,
    pub connected: bool,
    pub controls: ControlState,
    pub last_transaction: Option<TxHash>,
    pub last_value: Option<Uint256>,
    pub last_error: Option<ErrorReport>,
}

struct SessionInner {
    session: Session,
    /// Advanced on every reset and signer change; results of operations started
    /// in an older epoch are dropped.
    epoch: u64,
    last_transaction: Option<TxHash>,
    last_value: Option<Uint256>,
    last_error: Option<ErrorReport>,
}

impl SessionInner {
    fn is_pristine(&self) -> bool {
        self.session.is_empty() && self.last_transaction.is_none() && self.last_value.is_none()
    }
}

fn status_text(session: &Session) -> String {
    match session.connected_address() {
        Some(address) if session.is_connected() => format!("Wallet connected: {address}"),
        _ => "Wallet not connected".to_string(),
    }
}

fn parse_store_value(raw: &str) -> Result<Uint256, SessionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SessionError::InvalidInput("value is empty".to_string()));
    }
    trimmed
        .parse::<Uint256>()
        .map_err(|err| SessionError::InvalidInput(format!("'{trimmed}': {err}")))
}

pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    config: WalletSessionConfig,
    inner: Mutex<SessionInner>,
    controls: ActionControls,
    events: broadcast::Sender<SessionEvent>,
}

impl WalletSession {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        config: WalletSessionConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            provider,
            config,
            inner: Mutex::new(SessionInner {
                session: Session::empty(),
                epoch: 0,
                last_transaction: None,
                last_value: None,
                last_error: None,
            }),
            controls: ActionControls::new(events.clone()),
            events,
        })
    }

    pub fn is_wallet_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn config(&self) -> &WalletSessionConfig {
        &self.config
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn controls(&self) -> ControlState {
        self.controls.state()
    }

    pub async fn session(&self) -> Session {
        self.inner.lock().await.session.clone()
    }

    pub async fn view(&self) -> SessionView {
        let guard = self.inner.lock().await;
        SessionView {
            status: status_text(&guard.session),
            connected: guard.session.is_connected(),
            controls: self.controls.state(),
            last_transaction: guard.last_transaction.clone(),
            last_value: guard.last_value,
            last_error: guard.last_error.clone(),
        }
    }

    fn provider(&self) -> Result<Arc<dyn WalletProvider>, SessionError> {
        self.provider
            .clone()
            .ok_or(SessionError::WalletUnavailable)
    }

    pub async fn connect(&self) -> Result<Session, SessionError> {
        let epoch = self.epoch().await;
        let result = self.connect_impl(epoch).await;
        if let Err(err) = &result {
            if self.epoch().await == epoch {
                self.report(err).await;
            } else {
                warn!("wallet: session changed while connecting, error not shown: {err}");
            }
        }
        result
    }

    async fn connect_impl(&self, epoch: u64) -> Result<Session, SessionError> {
        let provider = self.provider()?;

        let accounts = provider.request_accounts().await.map_err(|err| {
            if err.is_user_rejection() {
                SessionError::UserRejected(err.message)
            } else if err.code == TRANSPORT_ERROR_CODE {
                warn!("wallet: provider unreachable: {}", err.message);
                SessionError::WalletUnavailable
            } else {
                SessionError::UserRejected(format!("account access failed: {}", err.message))
            }
        })?;
        let address = accounts
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::UserRejected("no accounts found".to_string()))?;

        let outcome = network::ensure_network(provider.as_ref(), &self.config.network).await?;
        let contract = ContractHandle::bind(
            self.config.contract_address.clone(),
            outcome.chain_id,
            address,
        );
        let session = Session::connected(contract);
        if !self.install(session.clone(), epoch).await {
            warn!("wallet: session changed while connecting, connection abandoned");
            return Err(SessionError::NotConnected);
        }
        info!(
            address = %session.connected_address().map(Address::as_str).unwrap_or_default(),
            chain_id = outcome.chain_id.0,
            switched = outcome.switched,
            "wallet: connected"
        );
        Ok(session)
    }

    /// Start-up path: adopt accounts the wallet already exposes, without prompting
    /// and without switching networks. Failures are only logged.
    pub async fn restore(&self) -> Option<Session> {
        let provider = self.provider.clone()?;
        let epoch = self.epoch().await;
        let accounts = match provider.accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                warn!(code = err.code, "wallet: could not read accounts: {}", err.message);
                return None;
            }
        };
        let address = accounts.into_iter().next()?;
        let chain_id = match provider.chain_id().await {
            Ok(chain_id) => chain_id,
            Err(err) => {
                warn!(code = err.code, "wallet: could not read network: {}", err.message);
                return None;
            }
        };
        if chain_id != self.config.network.chain_id {
            info!(
                chain_id = chain_id.0,
                expected_chain_id = self.config.network.chain_id.0,
                "wallet: existing account is on another network, waiting for connect"
            );
            return None;
        }

        let contract =
            ContractHandle::bind(self.config.contract_address.clone(), chain_id, address);
        let session = Session::connected(contract);
        if !self.install(session.clone(), epoch).await {
            warn!("wallet: session changed while restoring, restore abandoned");
            return None;
        }
        info!(address = %session.connected_address().map(Address::as_str).unwrap_or_default(), "wallet: restored connection");
        Some(session)
    }

    /// Returns to the empty session. Idempotent for the view; always abandons
    /// operations still in flight.
    pub async fn reset(&self) -> bool {
        let changed = {
            let mut guard = self.inner.lock().await;
            guard.epoch += 1;
            if guard.is_pristine() {
                false
            } else {
                guard.session = Session::empty();
                guard.last_transaction = None;
                guard.last_value = None;
                true
            }
        };
        self.controls.set_connected(false);
        if changed {
            self.publish_status(&Session::empty());
        }
        changed
    }

    /// Only reached through a zero-accounts provider event.
    pub async fn disconnect(&self) {
        if self.reset().await {
            info!("wallet: disconnected");
        }
    }

    pub async fn reload(&self) -> Option<Session> {
        self.reset().await;
        self.restore().await
    }

    pub async fn handle_event(&self, event: ProviderEvent) -> Transition {
        let transition = self.inner.lock().await.session.transition_for(&event);
        match transition {
            Transition::Unchanged => debug!(?event, "wallet: provider event needs no action"),
            Transition::TearDown => self.disconnect().await,
            Transition::Reload => {
                info!(?event, "wallet: provider state changed, reloading session");
                self.reload().await;
            }
        }
        transition
    }

    /// Subscribes to the provider once and applies every event until the provider closes.
    pub fn spawn_event_loop(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut provider_events = self.provider.as_ref()?.subscribe_events();
        let session = Arc::clone(self);
        Some(tokio::spawn(async move {
            loop {
                match provider_events.recv().await {
                    Ok(event) => {
                        session.handle_event(event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "wallet: missed provider events, reloading session");
                        session.reload().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }))
    }

    pub async fn store(&self, value: &str) -> Result<TransactionReceipt, SessionError> {
        let result = self.store_impl(value).await;
        if let Err(err) = &result {
            self.report(err).await;
        }
        result
    }

    async fn store_impl(&self, value: &str) -> Result<TransactionReceipt, SessionError> {
        let value = parse_store_value(value)?;
        let (contract, epoch) = self.active_contract().await?;
        let provider = self.provider()?;

        let _in_flight: InFlight<'_> = self.controls.begin(ActionControl::Store);
        let pending = contract
            .store(provider, value, self.config.receipt_poll_interval)
            .await?;
        info!(tx_hash = %pending.hash(), value = %value, "contract: store submitted");
        let receipt = pending.confirmed().await?;
        info!(
            tx_hash = %receipt.transaction_hash,
            block_number = ?receipt.block_number,
            "contract: store confirmed"
        );

        let mut guard = self.inner.lock().await;
        if guard.epoch == epoch {
            guard.last_transaction = Some(receipt.transaction_hash.clone());
            let _ = self
                .events
                .send(SessionEvent::TransactionConfirmed(receipt.transaction_hash.clone()));
        } else {
            warn!(tx_hash = %receipt.transaction_hash, "contract: session changed while storing, result not shown");
        }
        Ok(receipt)
    }

    pub async fn retrieve(&self) -> Result<Uint256, SessionError> {
        let result = self.retrieve_impl().await;
        if let Err(err) = &result {
            self.report(err).await;
        }
        result
    }

    async fn retrieve_impl(&self) -> Result<Uint256, SessionError> {
        let (contract, epoch) = self.active_contract().await?;
        let provider = self.provider()?;

        let _in_flight: InFlight<'_> = self.controls.begin(ActionControl::Retrieve);
        let value = contract.retrieve(provider.as_ref()).await?;
        info!(value = %value, "contract: retrieved value");

        let mut guard = self.inner.lock().await;
        if guard.epoch == epoch {
            guard.last_value = Some(value);
            let _ = self.events.send(SessionEvent::ValueRetrieved(value));
        } else {
            warn!("contract: session changed while reading, result not shown");
        }
        Ok(value)
    }

    async fn active_contract(&self) -> Result<(ContractHandle, u64), SessionError> {
        let guard = self.inner.lock().await;
        let contract = guard
            .session
            .contract()
            .cloned()
            .ok_or(SessionError::NotConnected)?;
        Ok((contract, guard.epoch))
    }

    async fn epoch(&self) -> u64 {
        self.inner.lock().await.epoch
    }

    /// Installs `session` unless a reset happened since `epoch` was read.
    async fn install(&self, session: Session, epoch: u64) -> bool {
        {
            let mut guard = self.inner.lock().await;
            if guard.epoch != epoch {
                return false;
            }
            let signer_changed = guard
                .session
                .connected_address()
                .is_some_and(|previous| Some(previous) != session.connected_address());
            if signer_changed {
                guard.epoch += 1;
                guard.last_transaction = None;
                guard.last_value = None;
            }
            guard.session = session.clone();
            guard.last_error = None;
        }
        self.controls.set_connected(session.is_connected());
        self.publish_status(&session);
        true
    }

    fn publish_status(&self, session: &Session) {
        let _ = self.events.send(SessionEvent::StatusChanged {
            status: status_text(session),
            connected: session.is_connected(),
        });
    }

    async fn report(&self, err: &SessionError) {
        error!(code = ?err.code(), "wallet: {err}");
        let report = ErrorReport::from(err);
        self.inner.lock().await.last_error = Some(report.clone());
        let _ = self.events.send(SessionEvent::Error(report));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
