//! EVM Chain Support Module
//!
//! Connects the orchestration core to a live EVM node through alloy.
//!
//! ## Submodules
//!
//! - `client` - alloy-backed [`LedgerClient`](crate::ledger::LedgerClient)

pub mod client;

pub use client::EvmLedger;
