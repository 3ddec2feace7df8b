//! MET to coin conversion sequencing
//!
//! Converting MET requires the AutonomousConverter to hold an allowance of at
//! least the converted amount. Depending on the current allowance `A` and the
//! amount `D`, one to three transactions are emitted:
//!
//! | Allowance      | Transactions                          | Gas                          |
//! |----------------|---------------------------------------|------------------------------|
//! | `A >= D`       | convert                               | estimated                    |
//! | `0 < A < D`    | approve 0, approve `D`, convert       | estimated, fallback, fallback |
//! | `A == 0 < D`   | approve `D`, convert                  | estimated, fallback          |
//!
//! A non-zero allowance is cleared before being set again to avoid the
//! approve/transferFrom race of ERC20 allowances. Transactions following an
//! unmined approval cannot be estimated by the node (they would revert
//! against the current state), so they get the configured fallback budget.
//!
//! Sequence numbers come from one read of the sender's pending transaction
//! count and are incremented locally.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::contracts::{AutonomousConverter, METToken};
use crate::error::PorterError;
use crate::gas::{resolve_gas, GasBudget, GasConfig};
use crate::ledger::{call_contract, LedgerClient, SubmittedTx, TxKind, TxRequest};
use crate::types::{ContractAddresses, ConvertParams};

/// States visited while converting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerState {
    Idle,
    Clearing,
    Approving,
    Converting,
    Done,
}

/// One transaction of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// approve(converter, 0)
    ClearAllowance,
    /// approve(converter, value)
    SetAllowance(U256),
    /// convertMetToEth(amount, minReturn)
    Convert(ConvertParams),
}

impl Step {
    pub fn kind(&self) -> TxKind {
        match self {
            Step::ClearAllowance => TxKind::ClearAllowance,
            Step::SetAllowance(_) => TxKind::Approve,
            Step::Convert(_) => TxKind::ConvertMet,
        }
    }

    pub fn state(&self) -> SequencerState {
        match self {
            Step::ClearAllowance => SequencerState::Clearing,
            Step::SetAllowance(_) => SequencerState::Approving,
            Step::Convert(_) => SequencerState::Converting,
        }
    }
}

/// How a planned step gets its gas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepGas {
    Estimate,
    Fallback(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedStep {
    pub step: Step,
    pub nonce: u64,
    pub gas: StepGas,
}

/// The transactions a conversion needs, decided from a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    steps: Vec<PlannedStep>,
}

impl ConversionPlan {
    /// Plan a conversion of `params.amount` given the current `allowance`
    ///
    /// `first_nonce` is the sender's next free sequence number.
    pub fn new(
        allowance: U256,
        params: ConvertParams,
        first_nonce: u64,
        fallback_gas: u64,
    ) -> Self {
        let mut steps = Vec::with_capacity(3);
        let mut nonce = first_nonce;
        let mut gas = StepGas::Estimate;

        if allowance < params.amount {
            if allowance > U256::ZERO {
                steps.push(PlannedStep {
                    step: Step::ClearAllowance,
                    nonce,
                    gas,
                });
                nonce += 1;
                gas = StepGas::Fallback(fallback_gas);
            }

            steps.push(PlannedStep {
                step: Step::SetAllowance(params.amount),
                nonce,
                gas,
            });
            nonce += 1;
            gas = StepGas::Fallback(fallback_gas);
        }

        steps.push(PlannedStep {
            step: Step::Convert(params),
            nonce,
            gas,
        });

        Self { steps }
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Full state path, from `Idle` to `Done`
    pub fn states(&self) -> Vec<SequencerState> {
        std::iter::once(SequencerState::Idle)
            .chain(self.steps.iter().map(|s| s.step.state()))
            .chain(std::iter::once(SequencerState::Done))
            .collect()
    }
}

/// The step at which a conversion stopped
#[derive(Debug)]
pub struct HaltedStep {
    pub kind: TxKind,
    pub nonce: u64,
    pub error: PorterError,
}

/// Result of a conversion: the transactions submitted, in order
///
/// A halted conversion is not rolled back. Submitted transactions stay on
/// the ledger and later steps were never sent.
#[derive(Debug)]
pub struct ConversionOutcome {
    pub plan: ConversionPlan,
    pub submitted: Vec<SubmittedTx>,
    pub halted: Option<HaltedStep>,
}

impl ConversionOutcome {
    pub fn is_complete(&self) -> bool {
        self.halted.is_none() && self.submitted.len() == self.plan.len()
    }
}

/// Emits the approval and conversion transactions for MET to coin conversions
pub struct TransactionSequencer<'a, L: ?Sized> {
    ledger: &'a L,
    contracts: &'a ContractAddresses,
    gas: GasConfig,
}

impl<'a, L> TransactionSequencer<'a, L>
where
    L: LedgerClient + ?Sized,
{
    pub fn new(ledger: &'a L, contracts: &'a ContractAddresses, gas: GasConfig) -> Self {
        Self {
            ledger,
            contracts,
            gas,
        }
    }

    /// Read the allowance and pending count, then plan the conversion
    pub async fn plan(
        &self,
        params: ConvertParams,
        from: Address,
    ) -> Result<ConversionPlan, PorterError> {
        let spender = self.contracts.autonomous_converter;
        let allowance_call = METToken::allowanceCall {
            owner: from,
            spender,
        };

        let (allowance, first_nonce) = tokio::try_join!(
            call_contract(self.ledger, self.contracts.met_token, &allowance_call),
            self.ledger.get_transaction_count(from)
        )?;
        let allowance = allowance._0;

        let plan = ConversionPlan::new(allowance, params, first_nonce, self.gas.fallback_gas);
        debug!(
            allowance = %allowance,
            amount = %params.amount,
            first_nonce = first_nonce,
            transactions = plan.len(),
            "Planned MET conversion"
        );
        Ok(plan)
    }

    /// Convert MET to coins, setting the allowance first when needed
    ///
    /// Each planned transaction is submitted once, in order, without waiting
    /// for the previous one to be mined. The first failure stops the sequence.
    ///
    /// Only the sender is taken from the caller: nonces and gas for every
    /// step are assigned by the plan.
    pub async fn convert_met_to_coins(
        &self,
        params: ConvertParams,
        from: Address,
    ) -> Result<ConversionOutcome, PorterError> {
        let plan = self.plan(params, from).await?;
        let mut submitted = Vec::with_capacity(plan.len());
        let mut halted = None;

        for planned in plan.steps() {
            match self.submit_step(from, planned).await {
                Ok(tx) => submitted.push(tx),
                Err(error) => {
                    warn!(
                        step = %planned.step.kind(),
                        nonce = planned.nonce,
                        submitted = submitted.len(),
                        error = %error,
                        "Conversion halted"
                    );
                    halted = Some(HaltedStep {
                        kind: planned.step.kind(),
                        nonce: planned.nonce,
                        error,
                    });
                    break;
                }
            }
        }

        Ok(ConversionOutcome {
            plan,
            submitted,
            halted,
        })
    }

    fn build_request(&self, from: Address, step: &Step) -> TxRequest {
        let converter = self.contracts.autonomous_converter;
        match step {
            Step::ClearAllowance => TxRequest::contract_call(
                from,
                self.contracts.met_token,
                &METToken::approveCall {
                    spender: converter,
                    value: U256::ZERO,
                },
            ),
            Step::SetAllowance(value) => TxRequest::contract_call(
                from,
                self.contracts.met_token,
                &METToken::approveCall {
                    spender: converter,
                    value: *value,
                },
            ),
            Step::Convert(params) => TxRequest::contract_call(
                from,
                converter,
                &AutonomousConverter::convertMetToEthCall {
                    amount: params.amount,
                    minReturn: params.min_return,
                },
            ),
        }
    }

    async fn submit_step(
        &self,
        from: Address,
        planned: &PlannedStep,
    ) -> Result<SubmittedTx, PorterError> {
        let request = self
            .build_request(from, &planned.step)
            .with_nonce(Some(planned.nonce));

        let budget = match planned.gas {
            StepGas::Estimate => GasBudget::Estimable(&request),
            StepGas::Fallback(gas) => GasBudget::ForcedFallback(gas),
        };
        let gas = resolve_gas(self.ledger, None, budget).await?;

        let lifecycle = self
            .ledger
            .send_transaction(request.clone().with_gas(gas))
            .await
            .map_err(|e| PorterError::TransactionRejected {
                reason: e.to_string(),
            })?;

        info!(
            kind = %planned.step.kind(),
            nonce = planned.nonce,
            gas = gas,
            "Submitted transaction"
        );

        Ok(SubmittedTx {
            kind: planned.step.kind(),
            nonce: Some(planned.nonce),
            gas,
            lifecycle,
        })
    }
}
