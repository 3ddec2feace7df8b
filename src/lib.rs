//! MET-Porter: Transaction Orchestration for the MET Token Contracts
//!
//! This crate drives the multi-contract MET token protocol from off-chain code:
//!
//! - **Numeric Codec** - decimal/hex wire values, time units, `bytes8` chain names
//! - **Burn Proofs** - Merkle root over the trailing window of burn commitments
//! - **Fees** - export fee from the on-chain floor and basis-point rate
//! - **Gas** - explicit, estimated or forced fallback gas budgets
//! - **Sequencer** - allowance-aware MET to coin conversions with local nonces
//! - **Porter** - export, import and single-transaction operations
//! - **EVM Module** - [`LedgerClient`] adapter over an alloy provider
//! - **Testing Module** - in-memory ledger for tests
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! met-porter = { path = "../met-porter" }
//! ```
//!
//! ## Feature Flags
//!
//! - `evm` - Enable the alloy-backed ledger client (default)
//! - `testing` - Enable testing utilities
//! - `full` - Enable all features

// Core modules (always available)
pub mod codec;
pub mod config;
pub mod contracts;
pub mod error;
pub mod fees;
pub mod gas;
pub mod hash;
pub mod ledger;
pub mod merkle;
pub mod porter;
pub mod sequencer;
pub mod types;

#[cfg(feature = "evm")]
pub mod evm;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used items at the crate root
pub use codec::{
    decode_chain_name, encode_chain_name, millis_to_seconds, parse_amount, parse_quantity,
    parse_u64, seconds_to_millis,
};
pub use config::PorterConfig;
pub use error::{LedgerError, PorterError};
pub use fees::{resolve_fee, ExportFeeParams, FeeCalculator};
pub use gas::{resolve_gas, GasBudget, GasConfig, DEFAULT_FALLBACK_GAS};
pub use hash::{bytes32_to_hex, parse_bytes32, sha256};
pub use ledger::{LedgerClient, SubmittedTx, TxKind, TxLifecycle, TxReceipt, TxRequest};
pub use merkle::{merkle_root, BurnHashSource, MerkleProofBuilder, OddNodePolicy, PROOF_WINDOW};
pub use porter::Porter;
pub use sequencer::{ConversionOutcome, ConversionPlan, SequencerState, TransactionSequencer};
pub use types::{
    ContractAddresses, ConvertParams, DestinationChainData, ExportData, ExportParams,
    ImportParams, OriginChainData, TxOptions,
};

#[cfg(feature = "evm")]
pub use evm::EvmLedger;
