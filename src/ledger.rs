//! Ledger client seam and transaction lifecycle handles
//!
//! The crate never talks to an RPC endpoint directly: everything goes through
//! [`LedgerClient`], which [`crate::evm::EvmLedger`] implements over alloy and
//! the test mock implements in memory.

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::oneshot;

use crate::error::{LedgerError, PorterError};

/// A transaction (or read-only call) to be handed to the ledger
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
    pub gas: Option<u64>,
    pub nonce: Option<u64>,
}

impl TxRequest {
    /// Build a contract call from an encoded `sol!` call
    pub fn contract_call<C: SolCall>(from: Address, to: Address, call: &C) -> Self {
        Self {
            from,
            to,
            input: call.abi_encode().into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn with_nonce(mut self, nonce: Option<u64>) -> Self {
        self.nonce = nonce;
        self
    }

    /// The 4-byte function selector, if the input carries one
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.input.get(..4).map(|s| [s[0], s[1], s[2], s[3]])
    }
}

/// The remote ledger, as consumed by this crate
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Execute a read-only call and return the raw return data
    async fn call(&self, tx: &TxRequest) -> Result<Bytes, LedgerError>;

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, LedgerError>;

    /// Submit a transaction; the returned handle reports hash and inclusion
    async fn send_transaction(&self, tx: TxRequest) -> Result<TxLifecycle, LedgerError>;

    /// Next free sequence number (pending count) for an address
    async fn get_transaction_count(&self, address: Address) -> Result<u64, LedgerError>;
}

/// Read a contract through the ledger and decode the `sol!` return value
pub async fn call_contract<L, C>(
    ledger: &L,
    to: Address,
    call: &C,
) -> Result<C::Return, LedgerError>
where
    L: LedgerClient + ?Sized,
    C: SolCall + Sync,
{
    let tx = TxRequest::contract_call(Address::ZERO, to, call);
    let raw = ledger.call(&tx).await?;
    C::abi_decode_returns(&raw, true).map_err(|e| LedgerError::Decode(e.to_string()))
}

/// Inclusion result of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Producer side of a [`TxLifecycle`], held by the ledger implementation
#[derive(Debug)]
pub struct TxNotifier {
    hash: Option<oneshot::Sender<B256>>,
    receipt: oneshot::Sender<Result<TxReceipt, String>>,
}

impl TxNotifier {
    /// First event: the ledger assigned a transaction hash
    pub fn hash_assigned(&mut self, hash: B256) {
        if let Some(tx) = self.hash.take() {
            // Receiver may have been dropped by a caller that ignores this event
            let _ = tx.send(hash);
        }
    }

    /// Second event: the transaction was mined
    pub fn included(self, receipt: TxReceipt) {
        let _ = self.receipt.send(Ok(receipt));
    }

    /// The transaction will never be included
    pub fn rejected(self, reason: impl Into<String>) {
        let _ = self.receipt.send(Err(reason.into()));
    }
}

/// Caller side of one submitted transaction: hash first, then inclusion
#[derive(Debug)]
pub struct TxLifecycle {
    hash_rx: Option<oneshot::Receiver<B256>>,
    hash: Option<B256>,
    receipt_rx: oneshot::Receiver<Result<TxReceipt, String>>,
}

impl TxLifecycle {
    pub fn channel() -> (TxNotifier, TxLifecycle) {
        let (hash_tx, hash_rx) = oneshot::channel();
        let (receipt_tx, receipt_rx) = oneshot::channel();
        (
            TxNotifier {
                hash: Some(hash_tx),
                receipt: receipt_tx,
            },
            TxLifecycle {
                hash_rx: Some(hash_rx),
                hash: None,
                receipt_rx,
            },
        )
    }

    /// Wait for the transaction hash
    pub async fn transaction_hash(&mut self) -> Result<B256, PorterError> {
        if let Some(hash) = self.hash {
            return Ok(hash);
        }
        let rx = self.hash_rx.take().ok_or_else(|| PorterError::TransactionRejected {
            reason: "no transaction hash was assigned".to_string(),
        })?;
        let hash = rx.await.map_err(|_| PorterError::TransactionRejected {
            reason: "no transaction hash was assigned".to_string(),
        })?;
        self.hash = Some(hash);
        Ok(hash)
    }

    /// Wait for inclusion; a reverted or dropped transaction is a rejection
    pub async fn receipt(self) -> Result<TxReceipt, PorterError> {
        match self.receipt_rx.await {
            Ok(Ok(receipt)) if receipt.success => Ok(receipt),
            Ok(Ok(receipt)) => Err(PorterError::TransactionRejected {
                reason: format!("transaction {} reverted", receipt.transaction_hash),
            }),
            Ok(Err(reason)) => Err(PorterError::TransactionRejected { reason }),
            Err(_) => Err(PorterError::TransactionRejected {
                reason: "ledger stopped tracking the transaction".to_string(),
            }),
        }
    }
}

/// What a submitted transaction does, for logging and caller diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Purchase,
    Transfer,
    Approve,
    ClearAllowance,
    ConvertCoins,
    ConvertMet,
    Export,
    Import,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Purchase => "purchase",
            TxKind::Transfer => "transfer",
            TxKind::Approve => "approve",
            TxKind::ClearAllowance => "clear_allowance",
            TxKind::ConvertCoins => "convert_coins",
            TxKind::ConvertMet => "convert_met",
            TxKind::Export => "export",
            TxKind::Import => "import",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction accepted by the ledger, with the parameters it was sent with
#[derive(Debug)]
pub struct SubmittedTx {
    pub kind: TxKind,
    pub nonce: Option<u64>,
    pub gas: u64,
    pub lifecycle: TxLifecycle,
}
