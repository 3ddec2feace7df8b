//! Parameter and result types shared by the porter and the sequencer

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Deployed MET contracts on one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAddresses {
    pub auctions: Address,
    pub autonomous_converter: Address,
    pub met_token: Address,
    pub token_porter: Address,
}

/// Per-transaction sender options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOptions {
    pub from: Address,
    /// Skip estimation and use this gas
    pub gas: Option<u64>,
    /// Leave unset to let the ledger pick the next sequence number
    pub nonce: Option<u64>,
    /// Coins sent along with the transaction
    pub value: U256,
}

impl TxOptions {
    pub fn sender(from: Address) -> Self {
        Self {
            from,
            ..Default::default()
        }
    }
}

/// Where exported MET will be minted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationChainData {
    /// Chain name, e.g. "ETC"
    pub dest_chain: String,
    /// METToken contract on the destination chain
    pub dest_metronome_addr: Address,
}

/// Origin chain context required by an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginChainData {
    /// Daily auctions start time (ms)
    pub daily_auction_start_time: u64,
    /// Initial supply auction start time (ms)
    pub genesis_time: u64,
    pub origin_chain: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportParams {
    pub amount: U256,
    pub destination: DestinationChainData,
    /// Defaults to the sender
    pub dest_recipient: Option<Address>,
    pub extra_data: Option<Bytes>,
    /// Overrides the on-chain fee calculation
    pub fee: Option<U256>,
}

/// Burn record emitted by the origin chain's export receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    #[serde(with = "crate::codec::decimal")]
    pub amount_to_burn: U256,
    #[serde(with = "crate::codec::decimal")]
    pub block_timestamp: U256,
    #[serde(with = "crate::codec::decimal_u64")]
    pub burn_sequence: u64,
    pub current_burn_hash: B256,
    #[serde(with = "crate::codec::decimal")]
    pub current_tick: U256,
    #[serde(with = "crate::codec::decimal")]
    pub daily_mintable: U256,
    pub destination_chain: String,
    pub destination_metronome_addr: Address,
    pub destination_recipient_addr: Address,
    #[serde(default)]
    pub extra_data: Bytes,
    #[serde(with = "crate::codec::decimal")]
    pub fee: U256,
    pub prev_burn_hash: B256,
    #[serde(with = "crate::codec::decimal_seq")]
    pub supply_on_all_chains: Vec<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportParams {
    pub export_data: ExportData,
    pub origin_data: OriginChainData,
    /// Root from the origin chain's burn proof
    pub proof: B256,
}

/// MET to coin conversion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertParams {
    pub amount: U256,
    /// Conversion reverts if fewer coins would be returned
    pub min_return: U256,
}

impl ConvertParams {
    pub fn new(amount: U256) -> Self {
        Self {
            amount,
            min_return: U256::from(1u64),
        }
    }
}
