//! Export/import assembly and single-transaction operations
//!
//! [`Porter`] is the entry point for callers: it holds the ledger client and
//! the deployed contract addresses, encodes each operation's payload, resolves
//! its gas and submits it.
//!
//! ## Export and import
//!
//! An export burns MET on the origin chain. Its receipt carries an
//! [`ExportData`] record which, together with the origin chain's auction times
//! and a burn proof from [`Porter::export_proof`], is what
//! [`Porter::import_met`] submits on the destination chain.

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::codec::{
    decode_chain_name, encode_chain_name, millis_to_seconds, seconds_to_millis, to_u64,
};
use crate::config::PorterConfig;
use crate::contracts::{Auctions, AutonomousConverter, METToken, TokenPorter};
use crate::error::{LedgerError, PorterError};
use crate::fees::{ExportFeeParams, FeeCalculator};
use crate::gas::{resolve_gas, GasBudget, GasConfig};
use crate::ledger::{call_contract, LedgerClient, SubmittedTx, TxKind, TxRequest};
use crate::merkle::{BurnHashSource, MerkleProofBuilder, OddNodePolicy};
use crate::sequencer::{ConversionOutcome, TransactionSequencer};
use crate::types::{
    ContractAddresses, ConvertParams, DestinationChainData, ExportParams, ImportParams,
    OriginChainData, TxOptions,
};

/// Burn commitments read from the TokenPorter's `exportedBurns`
pub struct LedgerBurnSource<'a, L: ?Sized> {
    ledger: &'a L,
    token_porter: Address,
}

impl<'a, L: ?Sized> LedgerBurnSource<'a, L> {
    pub fn new(ledger: &'a L, token_porter: Address) -> Self {
        Self {
            ledger,
            token_porter,
        }
    }
}

#[async_trait]
impl<'a, L> BurnHashSource for LedgerBurnSource<'a, L>
where
    L: LedgerClient + ?Sized,
{
    async fn burn_hash(&self, sequence: u64) -> Result<B256, LedgerError> {
        let call = TokenPorter::exportedBurnsCall {
            sequence: U256::from(sequence),
        };
        Ok(call_contract(self.ledger, self.token_porter, &call).await?._0)
    }
}

/// MET operations against one chain
pub struct Porter<L> {
    ledger: L,
    contracts: ContractAddresses,
    gas: GasConfig,
    odd_nodes: OddNodePolicy,
}

impl<L: LedgerClient> Porter<L> {
    pub fn new(ledger: L, contracts: ContractAddresses) -> Self {
        Self {
            ledger,
            contracts,
            gas: GasConfig::default(),
            odd_nodes: OddNodePolicy::default(),
        }
    }

    /// Build a porter with the contracts and tuning of a loaded configuration
    pub fn from_config(ledger: L, config: &PorterConfig) -> Self {
        Self {
            ledger,
            contracts: config.contracts,
            gas: config.gas,
            odd_nodes: config.odd_nodes,
        }
    }

    pub fn with_gas_config(mut self, gas: GasConfig) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_odd_node_policy(mut self, policy: OddNodePolicy) -> Self {
        self.odd_nodes = policy;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    pub fn gas_config(&self) -> GasConfig {
        self.gas
    }

    /// Sequencer for MET to coin conversions on this chain
    pub fn sequencer(&self) -> TransactionSequencer<'_, L> {
        TransactionSequencer::new(&self.ledger, &self.contracts, self.gas)
    }

    async fn submit(
        &self,
        kind: TxKind,
        request: TxRequest,
        opts: &TxOptions,
    ) -> Result<SubmittedTx, PorterError> {
        let request = request.with_nonce(opts.nonce);
        let gas = resolve_gas(&self.ledger, opts.gas, GasBudget::Estimable(&request)).await?;

        let lifecycle = self
            .ledger
            .send_transaction(request.with_gas(gas))
            .await
            .map_err(|e| PorterError::TransactionRejected {
                reason: e.to_string(),
            })?;

        info!(
            kind = %kind,
            from = %opts.from,
            nonce = ?opts.nonce,
            gas = gas,
            "Submitted transaction"
        );

        Ok(SubmittedTx {
            kind,
            nonce: opts.nonce,
            gas,
            lifecycle,
        })
    }

    // ------------------------------------------------------------------
    // Chain data
    // ------------------------------------------------------------------

    /// Name of this chain as recorded by the Auctions contract
    pub async fn chain_name(&self) -> Result<String, PorterError> {
        let auctions = self.contracts.auctions;
        let raw = call_contract(&self.ledger, auctions, &Auctions::chainCall {}).await?;
        decode_chain_name(raw._0)
    }

    /// This chain as an export destination
    pub async fn destination_chain_data(&self) -> Result<DestinationChainData, PorterError> {
        Ok(DestinationChainData {
            dest_chain: self.chain_name().await?,
            dest_metronome_addr: self.contracts.met_token,
        })
    }

    /// This chain as an import origin, with auction times in milliseconds
    pub async fn origin_chain_data(&self) -> Result<OriginChainData, PorterError> {
        let auctions = self.contracts.auctions;
        let (chain, genesis, daily_start) = tokio::try_join!(
            self.chain_name(),
            async {
                call_contract(&self.ledger, auctions, &Auctions::genesisTimeCall {})
                    .await
                    .map_err(PorterError::from)
            },
            async {
                call_contract(&self.ledger, auctions, &Auctions::dailyAuctionStartTimeCall {})
                    .await
                    .map_err(PorterError::from)
            }
        )?;

        Ok(OriginChainData {
            daily_auction_start_time: seconds_to_millis(to_u64(daily_start._0)?),
            genesis_time: seconds_to_millis(to_u64(genesis._0)?),
            origin_chain: chain,
        })
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    /// On-chain export fee floor and rate
    pub async fn export_fee_params(&self) -> Result<ExportFeeParams, PorterError> {
        let porter = self.contracts.token_porter;
        let (minimum, rate) = tokio::try_join!(
            call_contract(&self.ledger, porter, &TokenPorter::minimumExportFeeCall {}),
            call_contract(&self.ledger, porter, &TokenPorter::exportFeeCall {})
        )?;

        Ok(ExportFeeParams {
            minimum_fee: minimum._0,
            fee_bps: rate._0,
        })
    }

    /// Fee for exporting `amount`; a given fee is returned as is
    pub async fn export_fee(
        &self,
        amount: U256,
        given_fee: Option<U256>,
    ) -> Result<U256, PorterError> {
        if let Some(fee) = given_fee {
            return Ok(fee);
        }
        let params = self.export_fee_params().await?;
        let fee = FeeCalculator::new(params).calculate_fee(amount);
        debug!(amount = %amount, fee = %fee, "Calculated export fee");
        Ok(fee)
    }

    /// Burn proof for `burn_sequence`, as `0x`-prefixed hex
    pub async fn export_proof(&self, burn_sequence: u64) -> Result<String, PorterError> {
        let source = LedgerBurnSource::new(&self.ledger, self.contracts.token_porter);
        MerkleProofBuilder::with_policy(source, self.odd_nodes)
            .build_hex(burn_sequence)
            .await
    }

    /// Burn MET here to be imported on the destination chain
    pub async fn export_met(
        &self,
        params: ExportParams,
        opts: TxOptions,
    ) -> Result<SubmittedTx, PorterError> {
        let dest_chain = encode_chain_name(&params.destination.dest_chain)?;
        let fee = self.export_fee(params.amount, params.fee).await?;

        let call = METToken::exportCall {
            destChain: dest_chain,
            destMetronomeAddr: params.destination.dest_metronome_addr,
            destRecipAddr: params.dest_recipient.unwrap_or(opts.from),
            amount: params.amount,
            fee,
            extraData: params.extra_data.unwrap_or_default(),
        };

        debug!(
            dest_chain = %params.destination.dest_chain,
            amount = %params.amount,
            fee = %fee,
            "Exporting MET"
        );

        let request = TxRequest::contract_call(opts.from, self.contracts.met_token, &call);
        self.submit(TxKind::Export, request, &opts).await
    }

    /// Request the mint of a burn exported from another chain
    pub async fn import_met(
        &self,
        params: ImportParams,
        opts: TxOptions,
    ) -> Result<SubmittedTx, PorterError> {
        let export = &params.export_data;
        let origin = &params.origin_data;

        let import_data = vec![
            export.block_timestamp,
            export.amount_to_burn,
            export.fee,
            export.current_tick,
            U256::from(millis_to_seconds(origin.genesis_time)),
            export.daily_mintable,
            U256::from(export.burn_sequence),
            U256::from(millis_to_seconds(origin.daily_auction_start_time)),
        ];

        let call = METToken::importMETCall {
            originChain: encode_chain_name(&origin.origin_chain)?,
            destinationChain: encode_chain_name(&export.destination_chain)?,
            addresses: vec![export.destination_metronome_addr, export.destination_recipient_addr],
            extraData: export.extra_data.clone(),
            burnHashes: vec![export.prev_burn_hash, export.current_burn_hash],
            supplyOnAllChains: export.supply_on_all_chains.clone(),
            importData: import_data,
            proof: Bytes::copy_from_slice(params.proof.as_slice()),
        };

        debug!(
            origin_chain = %origin.origin_chain,
            burn_sequence = export.burn_sequence,
            "Importing MET"
        );

        let request = TxRequest::contract_call(opts.from, self.contracts.met_token, &call);
        self.submit(TxKind::Import, request, &opts).await
    }

    // ------------------------------------------------------------------
    // Single-transaction operations
    // ------------------------------------------------------------------

    /// Buy MET in the current auction with `opts.value` coins
    pub async fn buy_met(&self, opts: TxOptions) -> Result<SubmittedTx, PorterError> {
        let request = TxRequest {
            from: opts.from,
            to: self.contracts.auctions,
            value: opts.value,
            ..Default::default()
        };
        self.submit(TxKind::Purchase, request, &opts).await
    }

    pub async fn send_met(
        &self,
        to: Address,
        value: U256,
        opts: TxOptions,
    ) -> Result<SubmittedTx, PorterError> {
        let call = METToken::transferCall { to, value };
        let request = TxRequest::contract_call(opts.from, self.contracts.met_token, &call);
        self.submit(TxKind::Transfer, request, &opts).await
    }

    pub async fn approve_met(
        &self,
        spender: Address,
        value: U256,
        opts: TxOptions,
    ) -> Result<SubmittedTx, PorterError> {
        let call = METToken::approveCall { spender, value };
        let request = TxRequest::contract_call(opts.from, self.contracts.met_token, &call);
        self.submit(TxKind::Approve, request, &opts).await
    }

    /// Convert `params.amount` coins to MET
    pub async fn convert_coins_to_met(
        &self,
        params: ConvertParams,
        opts: TxOptions,
    ) -> Result<SubmittedTx, PorterError> {
        let call = AutonomousConverter::convertEthToMetCall {
            mintReturn: params.min_return,
        };
        let converter = self.contracts.autonomous_converter;
        let request =
            TxRequest::contract_call(opts.from, converter, &call).with_value(params.amount);
        self.submit(TxKind::ConvertCoins, request, &opts).await
    }

    /// Convert MET to coins assuming the converter's allowance is already set
    pub async fn convert_met_to_coins_unchecked(
        &self,
        params: ConvertParams,
        opts: TxOptions,
    ) -> Result<SubmittedTx, PorterError> {
        let call = AutonomousConverter::convertMetToEthCall {
            amount: params.amount,
            minReturn: params.min_return,
        };
        let converter = self.contracts.autonomous_converter;
        let request = TxRequest::contract_call(opts.from, converter, &call);
        self.submit(TxKind::ConvertMet, request, &opts).await
    }

    /// Convert MET to coins, approving the converter first when needed
    ///
    /// See [`TransactionSequencer`] for the transactions emitted. Unlike the
    /// single-transaction operations this takes only the sender, since the
    /// sequencer assigns every step's nonce and gas.
    pub async fn convert_met_to_coins(
        &self,
        params: ConvertParams,
        from: Address,
    ) -> Result<ConversionOutcome, PorterError> {
        self.sequencer().convert_met_to_coins(params, from).await
    }
}
