//! Gas budget resolution
//!
//! A transaction whose preconditions depend on an unmined predecessor cannot be
//! estimated by the node, so its budget is forced instead. The choice is made
//! explicitly by the caller through [`GasBudget`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PorterError;
use crate::ledger::{LedgerClient, TxRequest};

/// Budget used by default when estimation is impossible (gas units)
pub const DEFAULT_FALLBACK_GAS: u64 = 250_000;

/// How the gas for a pending transaction is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasBudget<'a> {
    /// Ask the ledger to estimate the given transaction
    Estimable(&'a TxRequest),
    /// A predecessor is unmined; use this fixed budget
    ForcedFallback(u64),
}

/// Gas settings shared by every operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasConfig {
    /// Budget for transactions that depend on an unmined predecessor
    pub fallback_gas: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            fallback_gas: DEFAULT_FALLBACK_GAS,
        }
    }
}

/// Resolve the gas for a transaction
///
/// An explicit value always wins and never touches the ledger. Estimation
/// failures surface as the recoverable [`PorterError::GasEstimationFailed`].
pub async fn resolve_gas<L>(
    ledger: &L,
    explicit_gas: Option<u64>,
    budget: GasBudget<'_>,
) -> Result<u64, PorterError>
where
    L: LedgerClient + ?Sized,
{
    if let Some(gas) = explicit_gas {
        debug!(gas = gas, "Using given gas");
        return Ok(gas);
    }

    match budget {
        GasBudget::ForcedFallback(gas) => {
            debug!(gas = gas, "Using fallback gas, transaction cannot be estimated");
            Ok(gas)
        }
        GasBudget::Estimable(tx) => {
            debug!(to = %tx.to, "Estimating transaction gas");
            let gas = ledger
                .estimate_gas(tx)
                .await
                .map_err(|source| PorterError::GasEstimationFailed {
                    context: format!("call to {}", tx.to),
                    source,
                })?;
            debug!(gas = gas, "Gas estimation complete");
            Ok(gas)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLedger;

    #[tokio::test]
    async fn test_explicit_gas_skips_estimation() {
        let ledger = MockLedger::new().with_estimated_gas(21_000);
        let tx = TxRequest::default();

        let gas = resolve_gas(&ledger, Some(90_000), GasBudget::Estimable(&tx))
            .await
            .unwrap();

        assert_eq!(gas, 90_000);
        assert_eq!(ledger.estimate_calls(), 0);
    }

    #[tokio::test]
    async fn test_forced_fallback_skips_estimation() {
        let ledger = MockLedger::new().failing_estimation();

        let budget = GasBudget::ForcedFallback(DEFAULT_FALLBACK_GAS);
        let gas = resolve_gas(&ledger, None, budget).await.unwrap();

        assert_eq!(gas, 250_000);
        assert_eq!(ledger.estimate_calls(), 0);
    }

    #[tokio::test]
    async fn test_estimation_used_without_explicit_gas() {
        let ledger = MockLedger::new().with_estimated_gas(48_123);
        let tx = TxRequest::default();

        let gas = resolve_gas(&ledger, None, GasBudget::Estimable(&tx))
            .await
            .unwrap();

        assert_eq!(gas, 48_123);
        assert_eq!(ledger.estimate_calls(), 1);
    }

    #[tokio::test]
    async fn test_estimation_failure_is_recoverable() {
        let ledger = MockLedger::new().failing_estimation();
        let tx = TxRequest::default();

        let err = resolve_gas(&ledger, None, GasBudget::Estimable(&tx))
            .await
            .unwrap_err();

        assert!(matches!(err, PorterError::GasEstimationFailed { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_default_fallback_gas() {
        assert_eq!(GasConfig::default().fallback_gas, 250_000);
    }
}
