use crypto::PublicKey;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;

#[cfg(test)]
#[path = "tests/config_tests.rs"]
pub mod config_tests;

pub type Stake = u32;
pub type EpochNumber = u128;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    /// Base duration of a round in milliseconds, before backoff.
    pub round_duration: u64,
    /// Maximum number of transactions pulled from the pool per proposal.
    pub max_batch_size: usize,
    /// Overrides the committee quorum formula when set.
    pub quorum_threshold: Option<Stake>,
    /// Additional attempts to append a committed block before halting.
    pub store_retries: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            round_duration: 1_000,
            max_batch_size: 500,
            quorum_threshold: None,
            store_retries: 3,
        }
    }
}

impl Parameters {
    pub fn log(&self) {
        // NOTE: These log entries are used to compute performance.
        info!("Round duration set to {} ms", self.round_duration);
        info!("Max batch size set to {} txs", self.max_batch_size);
        info!("Store retries set to {}", self.store_retries);
    }

    /// Effective quorum threshold for `committee`. Anything at or below a
    /// simple majority would allow two conflicting quorums to form.
    pub fn quorum(&self, committee: &Committee) -> Stake {
        let threshold = self
            .quorum_threshold
            .unwrap_or_else(|| committee.quorum_threshold());
        assert!(
            threshold > committee.total_votes() / 2,
            "Quorum threshold must exceed a simple majority"
        );
        threshold
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Authority {
    pub name: PublicKey,
    pub stake: Stake,
    pub address: SocketAddr,
}

/// The peer roster for one epoch. Insertion order fixes the leader rotation
/// sequence; membership never changes within the epoch.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Committee {
    pub authorities: Vec<Authority>,
    pub epoch: EpochNumber,
}

impl Committee {
    pub fn new(info: Vec<(PublicKey, Stake, SocketAddr)>, epoch: EpochNumber) -> Self {
        assert!(!info.is_empty(), "Committee must have at least one member");
        let mut seen = HashSet::new();
        let authorities = info
            .into_iter()
            .map(|(name, stake, address)| {
                assert!(seen.insert(name), "Committee members must be distinct");
                Authority {
                    name,
                    stake,
                    address,
                }
            })
            .collect();
        Self { authorities, epoch }
    }

    pub fn size(&self) -> usize {
        self.authorities.len()
    }

    pub fn exists(&self, name: &PublicKey) -> bool {
        self.authorities.iter().any(|x| x.name == *name)
    }

    pub fn stake(&self, name: &PublicKey) -> Stake {
        self.authorities
            .iter()
            .find(|x| x.name == *name)
            .map_or_else(|| 0, |x| x.stake)
    }

    pub fn total_votes(&self) -> Stake {
        self.authorities.iter().map(|x| x.stake).sum()
    }

    pub fn quorum_threshold(&self) -> Stake {
        // If N = 3f + 1 + k (0 <= k < 3)
        // then (2 N + 3) / 3 = 2f + 1 + (2k + 2)/3 = 2f + 1 + k = N - f
        2 * self.total_votes() / 3 + 1
    }

    pub fn address(&self, name: &PublicKey) -> Option<SocketAddr> {
        self.authorities
            .iter()
            .find(|x| x.name == *name)
            .map(|x| x.address)
    }

    pub fn broadcast_addresses(&self, myself: &PublicKey) -> Vec<SocketAddr> {
        self.authorities
            .iter()
            .filter(|x| x.name != *myself)
            .map(|x| x.address)
            .collect()
    }
}
