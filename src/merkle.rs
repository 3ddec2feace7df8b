//! Burn proof construction
//!
//! An import on the destination chain is authorized by the Merkle root of the
//! last 16 burn commitments on the origin chain, up to and including the burn
//! being imported.
//!
//! ## Window
//!
//! For burn sequence `S` the leaves are the commitments of sequences
//! `max(0, S - 15) ..= S`, oldest first. Early burns produce shorter windows;
//! the tree is never padded.
//!
//! ## Tree
//!
//! Leaves are the raw 32-byte commitments. Parents are `sha256(left || right)`.
//! An odd node at the end of a level is handled according to [`OddNodePolicy`].

use alloy::primitives::B256;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::debug;

use crate::error::{LedgerError, PorterError};
use crate::hash::{bytes32_to_hex, hash_pair};

/// Maximum number of burns covered by one proof
pub const PROOF_WINDOW: u64 = 16;

/// Read access to the burn commitments recorded on a chain
#[async_trait]
pub trait BurnHashSource: Send + Sync {
    async fn burn_hash(&self, sequence: u64) -> Result<B256, LedgerError>;
}

/// What to do with the last node of a level with an odd node count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddNodePolicy {
    /// Pair the last node with itself
    #[default]
    Duplicate,
    /// Carry the last node up to the next level unchanged
    Promote,
}

impl FromStr for OddNodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "duplicate" => Ok(OddNodePolicy::Duplicate),
            "promote" => Ok(OddNodePolicy::Promote),
            other => Err(format!(
                "unknown odd node policy '{}', expected 'duplicate' or 'promote'",
                other
            )),
        }
    }
}

/// Burn sequences covered by the proof for `burn_sequence`
pub fn proof_window(burn_sequence: u64) -> RangeInclusive<u64> {
    burn_sequence.saturating_sub(PROOF_WINDOW - 1)..=burn_sequence
}

/// Merkle root over `leaves` in the given order
///
/// A single leaf is its own root. An empty slice yields the zero hash.
pub fn merkle_root(leaves: &[B256], policy: OddNodePolicy) -> B256 {
    if leaves.is_empty() {
        return B256::ZERO;
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match (pair, policy) {
                ([left, right], _) => next.push(hash_pair(left, right)),
                ([last], OddNodePolicy::Duplicate) => next.push(hash_pair(last, last)),
                ([last], OddNodePolicy::Promote) => next.push(*last),
                _ => unreachable!("chunks(2) yields one or two nodes"),
            }
        }
        level = next;
    }
    level[0]
}

/// Builds burn proofs from a [`BurnHashSource`]
pub struct MerkleProofBuilder<S> {
    source: S,
    policy: OddNodePolicy,
}

impl<S: BurnHashSource> MerkleProofBuilder<S> {
    pub fn new(source: S) -> Self {
        Self::with_policy(source, OddNodePolicy::default())
    }

    pub fn with_policy(source: S, policy: OddNodePolicy) -> Self {
        Self { source, policy }
    }

    /// Fetch every commitment in the window concurrently, ordered by sequence
    pub async fn fetch_window(&self, burn_sequence: u64) -> Result<Vec<B256>, PorterError> {
        let lookups = proof_window(burn_sequence).map(|sequence| async move {
            self.source
                .burn_hash(sequence)
                .await
                .map(|hash| (sequence, hash))
                .map_err(|source| PorterError::ProofSourceUnavailable { sequence, source })
        });

        let mut fetched = try_join_all(lookups).await?;
        fetched.sort_by_key(|(sequence, _)| *sequence);

        Ok(fetched.into_iter().map(|(_, hash)| hash).collect())
    }

    /// Merkle root of the window ending at `burn_sequence`
    pub async fn build(&self, burn_sequence: u64) -> Result<B256, PorterError> {
        let leaves = self.fetch_window(burn_sequence).await?;
        let root = merkle_root(&leaves, self.policy);

        debug!(
            burn_sequence = burn_sequence,
            leaves = leaves.len(),
            root = %bytes32_to_hex(&root),
            "Built burn proof"
        );

        Ok(root)
    }

    /// Same as [`build`](Self::build), rendered as `0x`-prefixed hex
    pub async fn build_hex(&self, burn_sequence: u64) -> Result<String, PorterError> {
        Ok(bytes32_to_hex(&self.build(burn_sequence).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory burns; later sequences answer faster than earlier ones
    struct SlowBurns {
        hashes: HashMap<u64, B256>,
        lookups: Mutex<Vec<u64>>,
        reverse_latency: bool,
    }

    impl SlowBurns {
        fn new(count: u64, reverse_latency: bool) -> Self {
            let hashes = (0..count)
                .map(|seq| (seq, sha256(&seq.to_be_bytes())))
                .collect();
            Self {
                hashes,
                lookups: Mutex::new(Vec::new()),
                reverse_latency,
            }
        }

        fn looked_up(&self) -> Vec<u64> {
            let mut seen = self.lookups.lock().unwrap().clone();
            seen.sort_unstable();
            seen
        }
    }

    #[async_trait]
    impl BurnHashSource for SlowBurns {
        async fn burn_hash(&self, sequence: u64) -> Result<B256, LedgerError> {
            self.lookups.lock().unwrap().push(sequence);
            if self.reverse_latency {
                tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(sequence))).await;
            }
            self.hashes
                .get(&sequence)
                .copied()
                .ok_or_else(|| LedgerError::Transport(format!("no burn {}", sequence)))
        }
    }

    #[test]
    fn test_window_for_initial_burns() {
        assert_eq!(proof_window(0), 0..=0);
        assert_eq!(proof_window(4), 0..=4);
        assert_eq!(proof_window(15), 0..=15);
    }

    #[test]
    fn test_window_slides_after_sixteen() {
        assert_eq!(proof_window(16), 1..=16);
        assert_eq!(proof_window(20), 5..=20);
        assert_eq!(proof_window(u64::MAX), (u64::MAX - 15)..=u64::MAX);
    }

    #[test]
    fn test_window_length() {
        for s in 0..40u64 {
            let len = proof_window(s).count() as u64;
            assert_eq!(len, std::cmp::min(s + 1, PROOF_WINDOW), "S={}", s);
        }
    }

    #[test]
    fn test_single_leaf_is_root() {
        let leaf = B256::repeat_byte(0x42);
        assert_eq!(merkle_root(&[leaf], OddNodePolicy::Duplicate), leaf);
        assert_eq!(merkle_root(&[leaf], OddNodePolicy::Promote), leaf);
    }

    #[test]
    fn test_two_leaves() {
        let a = B256::repeat_byte(1);
        let b = B256::repeat_byte(2);
        assert_eq!(
            merkle_root(&[a, b], OddNodePolicy::Duplicate),
            hash_pair(&a, &b)
        );
    }

    #[test]
    fn test_odd_leaf_policies() {
        let a = B256::repeat_byte(1);
        let b = B256::repeat_byte(2);
        let c = B256::repeat_byte(3);
        let ab = hash_pair(&a, &b);

        let duplicated = merkle_root(&[a, b, c], OddNodePolicy::Duplicate);
        assert_eq!(duplicated, hash_pair(&ab, &hash_pair(&c, &c)));

        let promoted = merkle_root(&[a, b, c], OddNodePolicy::Promote);
        assert_eq!(promoted, hash_pair(&ab, &c));
    }

    #[test]
    fn test_five_leaves_duplicate_at_every_level() {
        let leaves: Vec<B256> = (1..=5u8).map(B256::repeat_byte).collect();

        let l1 = vec![
            hash_pair(&leaves[0], &leaves[1]),
            hash_pair(&leaves[2], &leaves[3]),
            hash_pair(&leaves[4], &leaves[4]),
        ];
        let l2 = vec![hash_pair(&l1[0], &l1[1]), hash_pair(&l1[2], &l1[2])];
        let expected = hash_pair(&l2[0], &l2[1]);

        assert_eq!(merkle_root(&leaves, OddNodePolicy::Duplicate), expected);
    }

    #[test]
    fn test_leaf_order_matters() {
        let a = B256::repeat_byte(1);
        let b = B256::repeat_byte(2);
        assert_ne!(
            merkle_root(&[a, b], OddNodePolicy::Duplicate),
            merkle_root(&[b, a], OddNodePolicy::Duplicate)
        );
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "duplicate".parse::<OddNodePolicy>(),
            Ok(OddNodePolicy::Duplicate)
        );
        assert_eq!(
            "Promote".parse::<OddNodePolicy>(),
            Ok(OddNodePolicy::Promote)
        );
        assert!("sorted".parse::<OddNodePolicy>().is_err());
    }

    #[tokio::test]
    async fn test_fetches_initial_window() {
        let builder = MerkleProofBuilder::new(SlowBurns::new(30, false));
        let leaves = builder.fetch_window(4).await.unwrap();

        assert_eq!(leaves.len(), 5);
        assert_eq!(builder.source.looked_up(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_fetches_sliding_window() {
        let builder = MerkleProofBuilder::new(SlowBurns::new(30, false));
        let leaves = builder.fetch_window(20).await.unwrap();

        assert_eq!(leaves.len(), 16);
        assert_eq!(builder.source.looked_up(), (5..=20).collect::<Vec<_>>());
        assert_eq!(leaves[0], sha256(&5u64.to_be_bytes()));
        assert_eq!(leaves[15], sha256(&20u64.to_be_bytes()));
    }

    #[tokio::test]
    async fn test_root_independent_of_completion_order() {
        let in_order = MerkleProofBuilder::new(SlowBurns::new(30, false));
        let reversed = MerkleProofBuilder::new(SlowBurns::new(30, true));

        let a = in_order.build(20).await.unwrap();
        let b = reversed.build(20).await.unwrap();
        assert_eq!(a, b);

        // Repeated builds are identical
        assert_eq!(in_order.build(20).await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_root_hex_format() {
        let builder = MerkleProofBuilder::new(SlowBurns::new(30, false));
        let proof = builder.build_hex(4).await.unwrap();

        assert_eq!(proof.len(), 66);
        assert!(proof.starts_with("0x"));
        assert!(proof[2..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn test_missing_leaf_fails_whole_proof() {
        // Only burns 0..10 exist
        let builder = MerkleProofBuilder::new(SlowBurns::new(10, false));
        let err = builder.build(12).await.unwrap_err();

        match err {
            PorterError::ProofSourceUnavailable { sequence, .. } => {
                assert!((10..=12).contains(&sequence))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
