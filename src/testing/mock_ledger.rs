//! In-memory ledger
//!
//! Answers read calls by function selector, records every estimation and
//! submission, and resolves each submitted transaction's lifecycle at once.

use alloy::primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::contracts::{Auctions, METToken, TokenPorter};
use crate::error::LedgerError;
use crate::ledger::{LedgerClient, TxLifecycle, TxNotifier, TxReceipt, TxRequest};

#[derive(Debug, Default)]
struct MockState {
    call_responses: HashMap<[u8; 4], Bytes>,
    burn_hashes: HashMap<u64, B256>,
    burn_lookups: Vec<u64>,
    transaction_count: u64,
    count_reads: usize,
    estimated_gas: Option<u64>,
    estimate_calls: usize,
    reject_send_at: Option<usize>,
    send_attempts: usize,
    sent: Vec<TxRequest>,
    hold_receipts: bool,
    held: Vec<(TxNotifier, TxReceipt)>,
}

/// Scriptable [`LedgerClient`] for tests
#[derive(Debug)]
pub struct MockLedger {
    state: Mutex<MockState>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn word(value: U256) -> Bytes {
    Bytes::from(value.to_be_bytes::<32>().to_vec())
}

impl MockLedger {
    /// A ledger that estimates every transaction at 21000 gas
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                estimated_gas: Some(21_000),
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Raw return data for any call with the given selector
    pub fn with_call_response(self, selector: [u8; 4], data: Bytes) -> Self {
        self.state().call_responses.insert(selector, data);
        self
    }

    pub fn with_allowance(self, allowance: U256) -> Self {
        self.with_call_response(METToken::allowanceCall::SELECTOR, word(allowance))
    }

    pub fn with_export_fees(self, minimum_fee: U256, fee_bps: U256) -> Self {
        self.with_call_response(
            TokenPorter::minimumExportFeeCall::SELECTOR,
            word(minimum_fee),
        )
        .with_call_response(TokenPorter::exportFeeCall::SELECTOR, word(fee_bps))
    }

    /// Chain name and auction times (seconds) served by the Auctions contract
    pub fn with_chain(self, name: FixedBytes<8>, genesis_secs: u64, daily_start_secs: u64) -> Self {
        let mut chain_word = [0u8; 32];
        chain_word[..8].copy_from_slice(name.as_slice());
        let chain_word = Bytes::from(chain_word.to_vec());
        self.with_call_response(Auctions::chainCall::SELECTOR, chain_word)
            .with_call_response(
                Auctions::genesisTimeCall::SELECTOR,
                word(U256::from(genesis_secs)),
            )
            .with_call_response(
                Auctions::dailyAuctionStartTimeCall::SELECTOR,
                word(U256::from(daily_start_secs)),
            )
    }

    pub fn with_burn_hash(self, sequence: u64, hash: B256) -> Self {
        self.state().burn_hashes.insert(sequence, hash);
        self
    }

    /// Burns `0..count`, each hashed from its sequence number
    pub fn with_burns(self, count: u64) -> Self {
        {
            let mut state = self.state();
            for sequence in 0..count {
                state
                    .burn_hashes
                    .insert(sequence, B256::from(U256::from(sequence + 1)));
            }
        }
        self
    }

    pub fn with_transaction_count(self, count: u64) -> Self {
        self.state().transaction_count = count;
        self
    }

    pub fn with_estimated_gas(self, gas: u64) -> Self {
        self.state().estimated_gas = Some(gas);
        self
    }

    pub fn failing_estimation(self) -> Self {
        self.state().estimated_gas = None;
        self
    }

    /// Refuse the submission with the given zero-based index
    pub fn rejecting_send_at(self, index: usize) -> Self {
        self.state().reject_send_at = Some(index);
        self
    }

    /// Assign hashes on submission but keep every transaction unmined
    /// until [`release_receipts`](Self::release_receipts)
    pub fn holding_receipts(self) -> Self {
        self.state().hold_receipts = true;
        self
    }

    /// Submitted transactions still waiting for inclusion
    pub fn pending_receipts(&self) -> usize {
        self.state().held.len()
    }

    /// Mine every held transaction, in submission order
    pub fn release_receipts(&self) {
        let held = std::mem::take(&mut self.state().held);
        for (notifier, receipt) in held {
            notifier.included(receipt);
        }
    }

    /// Transactions accepted so far, in submission order
    pub fn sent(&self) -> Vec<TxRequest> {
        self.state().sent.clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.state().send_attempts
    }

    pub fn estimate_calls(&self) -> usize {
        self.state().estimate_calls
    }

    pub fn count_reads(&self) -> usize {
        self.state().count_reads
    }

    /// Burn sequences looked up so far, sorted
    pub fn burn_lookups(&self) -> Vec<u64> {
        let mut lookups = self.state().burn_lookups.clone();
        lookups.sort_unstable();
        lookups
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn call(&self, tx: &TxRequest) -> Result<Bytes, LedgerError> {
        let selector = tx
            .selector()
            .ok_or_else(|| LedgerError::Rejected("call without selector".to_string()))?;
        let mut state = self.state();

        if selector == TokenPorter::exportedBurnsCall::SELECTOR {
            let call = TokenPorter::exportedBurnsCall::abi_decode(&tx.input, true)
                .map_err(|e| LedgerError::Decode(e.to_string()))?;
            let sequence = u64::try_from(call.sequence)
                .map_err(|_| LedgerError::Rejected("burn sequence out of range".to_string()))?;
            state.burn_lookups.push(sequence);
            return state
                .burn_hashes
                .get(&sequence)
                .map(|hash| Bytes::from(hash.to_vec()))
                .ok_or_else(|| LedgerError::Transport(format!("burn {} not found", sequence)));
        }

        state
            .call_responses
            .get(&selector)
            .cloned()
            .ok_or_else(|| {
                LedgerError::Rejected(format!(
                    "no response for selector 0x{}",
                    hex::encode(selector)
                ))
            })
    }

    async fn estimate_gas(&self, _tx: &TxRequest) -> Result<u64, LedgerError> {
        let mut state = self.state();
        state.estimate_calls += 1;
        state
            .estimated_gas
            .ok_or_else(|| LedgerError::Rejected("execution reverted".to_string()))
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxLifecycle, LedgerError> {
        let mut state = self.state();
        let index = state.send_attempts;
        state.send_attempts += 1;

        if state.reject_send_at == Some(index) {
            return Err(LedgerError::Rejected(
                "replacement transaction underpriced".to_string(),
            ));
        }

        state.sent.push(tx);
        let hash = B256::from(U256::from(state.sent.len()));

        let (mut notifier, lifecycle) = TxLifecycle::channel();
        notifier.hash_assigned(hash);
        let receipt = TxReceipt {
            transaction_hash: hash,
            block_number: Some(index as u64 + 1),
            success: true,
        };
        if state.hold_receipts {
            state.held.push((notifier, receipt));
        } else {
            notifier.included(receipt);
        }
        Ok(lifecycle)
    }

    async fn get_transaction_count(&self, _address: Address) -> Result<u64, LedgerError> {
        let mut state = self.state();
        state.count_reads += 1;
        Ok(state.transaction_count)
    }
}
