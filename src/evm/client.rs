//! EVM ledger adapter
//!
//! Implements [`LedgerClient`] over an alloy HTTP provider. Signing is left to
//! the provider: either the node holds the sender's key or the caller wraps the
//! provider with a wallet filler before handing it over.

use alloy::{
    primitives::{Address, Bytes},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
    transports::{
        http::{Client, Http},
        TransportError,
    },
};
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::ledger::{LedgerClient, TxLifecycle, TxReceipt, TxRequest};

/// [`LedgerClient`] backed by an alloy provider
#[derive(Debug, Clone)]
pub struct EvmLedger<P> {
    provider: P,
}

impl EvmLedger<RootProvider<Http<Client>>> {
    /// Connect a read/write ledger client to an RPC URL
    pub fn connect(rpc_url: &str) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
        );

        info!(rpc_url = %rpc_url, "Created EVM ledger client");

        Ok(Self { provider })
    }
}

impl<P> EvmLedger<P> {
    /// Wrap an existing provider (e.g. one with a wallet filler)
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

fn to_rpc_request(tx: &TxRequest) -> TransactionRequest {
    let mut request = TransactionRequest::default()
        .from(tx.from)
        .to(tx.to)
        .value(tx.value)
        .input(tx.input.clone().into());

    if let Some(gas) = tx.gas {
        request = request.gas_limit(gas);
    }
    if let Some(nonce) = tx.nonce {
        request = request.nonce(nonce);
    }
    request
}

fn ledger_error(e: TransportError) -> LedgerError {
    if e.is_error_resp() {
        LedgerError::Rejected(e.to_string())
    } else {
        LedgerError::Transport(e.to_string())
    }
}

#[async_trait]
impl<P> LedgerClient for EvmLedger<P>
where
    P: Provider<Http<Client>> + Send + Sync,
{
    async fn call(&self, tx: &TxRequest) -> Result<Bytes, LedgerError> {
        let request = to_rpc_request(tx);
        self.provider.call(&request).await.map_err(ledger_error)
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, LedgerError> {
        let request = to_rpc_request(tx);
        self.provider
            .estimate_gas(&request)
            .await
            .map_err(ledger_error)
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxLifecycle, LedgerError> {
        let pending = self
            .provider
            .send_transaction(to_rpc_request(&tx))
            .await
            .map_err(ledger_error)?;

        let (mut notifier, lifecycle) = TxLifecycle::channel();
        let tx_hash = *pending.tx_hash();
        debug!(tx_hash = %tx_hash, nonce = ?tx.nonce, "Transaction hash assigned");
        notifier.hash_assigned(tx_hash);

        tokio::spawn(async move {
            match pending.get_receipt().await {
                Ok(receipt) => {
                    debug!(
                        tx_hash = %receipt.transaction_hash,
                        block_number = ?receipt.block_number,
                        success = receipt.status(),
                        "Transaction mined"
                    );
                    notifier.included(TxReceipt {
                        transaction_hash: receipt.transaction_hash,
                        block_number: receipt.block_number,
                        success: receipt.status(),
                    });
                }
                Err(e) => {
                    warn!(tx_hash = %tx_hash, error = %e, "Failed to get transaction receipt");
                    notifier.rejected(e.to_string());
                }
            }
        });

        Ok(lifecycle)
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(ledger_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    #[test]
    fn test_connect_rejects_invalid_url() {
        assert!(EvmLedger::connect("not a url").is_err());
    }

    #[test]
    fn test_rpc_request_conversion() {
        let tx = TxRequest {
            from: Address::repeat_byte(0x01),
            to: Address::repeat_byte(0x02),
            value: U256::from(5u64),
            input: Bytes::from(vec![1, 2, 3, 4]),
            gas: Some(250_000),
            nonce: Some(7),
        };

        let request = to_rpc_request(&tx);
        assert_eq!(request.from, Some(tx.from));
        assert_eq!(request.value, Some(U256::from(5u64)));
        assert_eq!(request.gas, Some(250_000));
        assert_eq!(request.nonce, Some(7));
    }

    #[test]
    fn test_rpc_request_leaves_unset_fields_for_node() {
        let request = to_rpc_request(&TxRequest::default());
        assert_eq!(request.gas, None);
        assert_eq!(request.nonce, None);
    }
}
