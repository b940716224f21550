//! Binding for the storage contract: `store(uint256)` and `retrieve() -> uint256`.

use std::{sync::Arc, time::Duration};

use alloy_sol_types::{sol, SolCall};
use shared::{
    domain::{Address, ChainId, TransactionReceipt, TxHash, Uint256},
    error::SessionError,
    protocol::{CallRequest, TransactionRequest},
};
use tracing::debug;

use crate::provider::WalletProvider;

sol! {
    interface StorageContract {
        function store(uint256 num) external;
        function retrieve() external view returns (uint256 value);
    }
}

pub use StorageContract::{retrieveCall, storeCall};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractHandle {
    address: Address,
    chain_id: ChainId,
    signer: Address,
}

impl ContractHandle {
    pub fn bind(address: Address, chain_id: ChainId, signer: Address) -> Self {
        Self {
            address,
            chain_id,
            signer,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn signer(&self) -> &Address {
        &self.signer
    }

    pub fn encode_store(value: Uint256) -> String {
        let calldata = storeCall { num: value.into() }.abi_encode();
        format!("0x{}", hex::encode(calldata))
    }

    pub fn encode_retrieve() -> String {
        format!("0x{}", hex::encode(retrieveCall {}.abi_encode()))
    }

    /// Decodes the `retrieve()` return word; trailing bytes are ignored.
    pub fn decode_uint(output: &[u8]) -> Result<Uint256, String> {
        retrieveCall::abi_decode_returns(output, false)
            .map(|returns| Uint256::from(returns.value))
            .map_err(|err| format!("malformed contract output: {err}"))
    }

    /// Submits `store(value)`; resolves once the wallet has accepted the transaction.
    pub async fn store(
        &self,
        provider: Arc<dyn WalletProvider>,
        value: Uint256,
        poll_interval: Duration,
    ) -> Result<PendingTransaction, SessionError> {
        let request = TransactionRequest {
            from: self.signer.clone(),
            to: self.address.clone(),
            data: Self::encode_store(value),
        };
        let hash = provider
            .send_transaction(request)
            .await
            .map_err(|err| SessionError::TransactionFailed(err.message))?;
        Ok(PendingTransaction {
            hash,
            provider,
            poll_interval,
        })
    }

    pub async fn retrieve(&self, provider: &dyn WalletProvider) -> Result<Uint256, SessionError> {
        let output = provider
            .call(CallRequest {
                to: self.address.clone(),
                data: Self::encode_retrieve(),
            })
            .await
            .map_err(|err| SessionError::ReadFailed(err.message))?;
        Self::decode_uint(&output).map_err(SessionError::ReadFailed)
    }
}

pub struct PendingTransaction {
    hash: TxHash,
    provider: Arc<dyn WalletProvider>,
    poll_interval: Duration,
}

impl PendingTransaction {
    pub fn hash(&self) -> &TxHash {
        &self.hash
    }

    /// Waits for inclusion. There is no timeout; a transaction that never lands keeps polling.
    pub async fn confirmed(self) -> Result<TransactionReceipt, SessionError> {
        loop {
            match self.provider.transaction_receipt(&self.hash).await {
                Ok(Some(receipt)) if receipt.succeeded() => return Ok(receipt),
                Ok(Some(_)) => {
                    return Err(SessionError::TransactionFailed(format!(
                        "transaction {} reverted",
                        self.hash
                    )))
                }
                Ok(None) => {
                    debug!(tx_hash = %self.hash, "contract: waiting for confirmation");
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(err) => return Err(SessionError::TransactionFailed(err.message)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_calldata_is_selector_followed_by_one_word() {
        assert_eq!(storeCall::SELECTOR, [0x60, 0x57, 0x36, 0x1d]);
        assert_eq!(retrieveCall::SELECTOR, [0x2e, 0x64, 0xce, 0xc1]);

        let calldata = ContractHandle::encode_store(Uint256::from(42u64));
        assert_eq!(
            calldata,
            format!("0x6057361d{}2a", "0".repeat(62))
        );
        assert_eq!(ContractHandle::encode_retrieve(), "0x2e64cec1");
    }

    #[test]
    fn decoding_rejects_short_output() {
        assert!(ContractHandle::decode_uint(&[0u8; 31]).is_err());
        let mut word = [0u8; 32];
        word[31] = 7;
        assert_eq!(
            ContractHandle::decode_uint(&word),
            Ok(Uint256::from(7u64))
        );
    }
}
