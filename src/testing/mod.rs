//! Testing Utilities
//!
//! Helpers for exercising the orchestration logic without a node.
//!
//! ## Submodules
//!
//! - `mock_ledger` - scriptable in-memory [`LedgerClient`](crate::ledger::LedgerClient)

pub mod mock_ledger;

pub use mock_ledger::MockLedger;
