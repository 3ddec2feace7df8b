//! Export fee calculation
//!
//! The TokenPorter charges the larger of a fixed minimum and a proportional
//! fee expressed in basis points.

use alloy::primitives::{U256, U512};
use serde::{Deserialize, Serialize};

/// Basis points per unit (1 bp = 0.01%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// On-chain export fee parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFeeParams {
    /// Fee floor, in MET base units
    #[serde(with = "crate::codec::decimal")]
    pub minimum_fee: U256,
    /// Proportional fee in basis points
    #[serde(with = "crate::codec::decimal")]
    pub fee_bps: U256,
}

/// Fee calculator for exports
pub struct FeeCalculator {
    params: ExportFeeParams,
}

impl FeeCalculator {
    pub fn new(params: ExportFeeParams) -> Self {
        Self { params }
    }

    /// Proportional part only: `floor(fee_bps * amount / 10000)`
    ///
    /// The product is taken at 512 bits; only a quotient that does not fit
    /// in 256 bits saturates.
    pub fn proportional_fee(&self, amount: U256) -> U256 {
        let product: U512 = self.params.fee_bps.widening_mul(amount);
        let quotient = product / U512::from(BPS_DENOMINATOR);
        if quotient.bit_len() > 256 {
            return U256::MAX;
        }
        U256::from_limbs_slice(&quotient.as_limbs()[..4])
    }

    /// Fee for an export of `amount`, never below the floor
    pub fn calculate_fee(&self, amount: U256) -> U256 {
        self.proportional_fee(amount).max(self.params.minimum_fee)
    }

    /// A given fee is trusted as-is and not checked against the floor
    pub fn resolve(&self, amount: U256, given_fee: Option<U256>) -> U256 {
        given_fee.unwrap_or_else(|| self.calculate_fee(amount))
    }

    pub fn params(&self) -> &ExportFeeParams {
        &self.params
    }
}

/// Resolve the export fee from its parts
pub fn resolve_fee(
    amount: U256,
    minimum_fee: U256,
    fee_bps: U256,
    given_fee: Option<U256>,
) -> U256 {
    FeeCalculator::new(ExportFeeParams {
        minimum_fee,
        fee_bps,
    })
    .resolve(amount, given_fee)
}
