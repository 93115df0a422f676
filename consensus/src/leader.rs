use crate::config::Committee;
use crate::messages::{Height, RoundNumber};
use crypto::PublicKey;

#[cfg(test)]
#[path = "tests/leader_tests.rs"]
pub mod leader_tests;

/// Deterministic leader rotation over the committee roster.
pub struct LeaderElector {
    committee: Committee,
}

impl LeaderElector {
    pub fn new(committee: Committee) -> Self {
        Self { committee }
    }

    /// Leader of the (height, round) slot. Folding the round in ensures a
    /// stalled height walks the whole roster instead of retrying one peer.
    pub fn get_leader(&self, height: Height, round: RoundNumber) -> PublicKey {
        let index = (height.wrapping_add(round) % self.committee.size() as u64) as usize;
        self.committee.authorities[index].name
    }
}
