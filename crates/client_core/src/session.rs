use shared::{
    domain::{Address, ChainId},
    protocol::ProviderEvent,
};

use crate::contract::ContractHandle;

/// Connection state. `contract` is present exactly when an account is
/// connected on the expected network; only [`Session::connected`] builds one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    connected_address: Option<Address>,
    network_id: Option<ChainId>,
    contract: Option<ContractHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    TearDown,
    Reload,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn connected(contract: ContractHandle) -> Self {
        Self {
            connected_address: Some(contract.signer().clone()),
            network_id: Some(contract.chain_id()),
            contract: Some(contract),
        }
    }

    pub fn connected_address(&self) -> Option<&Address> {
        self.connected_address.as_ref()
    }

    pub fn network_id(&self) -> Option<ChainId> {
        self.network_id
    }

    pub fn contract(&self) -> Option<&ContractHandle> {
        self.contract.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.contract.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// Maps a provider notification to the transition it requires. Pure.
    pub fn transition_for(&self, event: &ProviderEvent) -> Transition {
        match event {
            ProviderEvent::AccountsChanged { accounts } if accounts.is_empty() => {
                if self.is_empty() {
                    Transition::Unchanged
                } else {
                    Transition::TearDown
                }
            }
            ProviderEvent::AccountsChanged { accounts } => {
                if self.is_connected() && accounts.first() == self.connected_address.as_ref() {
                    Transition::Unchanged
                } else {
                    Transition::Reload
                }
            }
            ProviderEvent::ChainChanged { chain_id } => {
                if self.is_connected() && self.network_id == Some(*chain_id) {
                    Transition::Unchanged
                } else {
                    Transition::Reload
                }
            }
        }
    }
}
