//! Error types for MET transaction orchestration
//!
//! `LedgerError` is what a [`LedgerClient`](crate::ledger::LedgerClient) reports;
//! `PorterError` is what every public operation of this crate returns.

use thiserror::Error;

/// Failure reported by the remote ledger collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Ledger refused the request: {0}")]
    Rejected(String),

    #[error("Failed to decode ledger response: {0}")]
    Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PorterError {
    #[error("Malformed number {input:?}: {reason}")]
    MalformedNumber { input: String, reason: String },

    #[error("Invalid chain name {name:?}: {reason}")]
    InvalidChainName { name: String, reason: String },

    /// Recoverable: the caller may retry with an explicit gas value
    #[error("Gas estimation failed for {context}: {source}")]
    GasEstimationFailed {
        context: String,
        #[source]
        source: LedgerError,
    },

    #[error("Burn hash for sequence {sequence} is unavailable: {source}")]
    ProofSourceUnavailable {
        sequence: u64,
        #[source]
        source: LedgerError,
    },

    #[error("Transaction rejected: {reason}")]
    TransactionRejected { reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl PorterError {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        PorterError::MalformedNumber {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether retrying with different caller input can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PorterError::GasEstimationFailed { .. })
    }
}
