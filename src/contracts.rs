//! MET contract ABI definitions
//!
//! Uses alloy's sol! macro to generate the call types used to encode
//! transaction payloads and decode read results. Only the functions this
//! crate calls are declared.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// Daily and continuous auctions
    contract Auctions {
        /// Chain name as right-padded ASCII, e.g. "ETH"
        function chain() external view returns (bytes8);

        /// Start of the initial supply auction (seconds)
        function genesisTime() external view returns (uint256);

        /// Start of the daily auctions (seconds)
        function dailyAuctionStartTime() external view returns (uint256);
    }

    /// Coin <-> MET converter
    contract AutonomousConverter {
        function convertEthToMet(uint256 mintReturn) external payable returns (uint256);

        /// Requires a prior METToken allowance of at least `amount`
        function convertMetToEth(uint256 amount, uint256 minReturn) external returns (uint256);
    }

    /// MET token, including the export/import entry points
    contract METToken {
        function allowance(address owner, address spender) external view returns (uint256);

        function approve(address spender, uint256 value) external returns (bool);

        function transfer(address to, uint256 value) external returns (bool);

        /// Burn on this chain to mint on `destChain`
        function export(
            bytes8 destChain,
            address destMetronomeAddr,
            address destRecipAddr,
            uint256 amount,
            uint256 fee,
            bytes extraData
        ) external returns (bool);

        /// Request a mint for a burn recorded on `originChain`
        ///
        /// `addresses` is [destination token, recipient], `burnHashes` is
        /// [previous burn hash, current burn hash] and `importData` is
        /// [blockTimestamp, amount, fee, currentTick, genesisTime,
        /// dailyMintable, burnSequence, dailyAuctionStartTime].
        function importMET(
            bytes8 originChain,
            bytes8 destinationChain,
            address[] addresses,
            bytes extraData,
            bytes32[] burnHashes,
            uint256[] supplyOnAllChains,
            uint256[] importData,
            bytes proof
        ) external returns (bool);
    }

    /// Cross-chain burn bookkeeping
    contract TokenPorter {
        /// Commitment hash of the burn with the given sequence number
        function exportedBurns(uint256 sequence) external view returns (bytes32);

        function minimumExportFee() external view returns (uint256);

        /// Proportional export fee in basis points
        function exportFee() external view returns (uint256);
    }
}
