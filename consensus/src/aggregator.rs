use crate::config::{Committee, Stake};
use crate::error::ConsensusError;
use crate::messages::{Decision, Height, RoundNumber, Vote};
use crypto::{Digest, PublicKey};
use std::collections::HashMap;

#[cfg(test)]
#[path = "tests/aggregator_tests.rs"]
pub mod aggregator_tests;

/// Outcome of feeding one vote to the tally.
#[derive(Debug)]
pub enum TallyOutcome {
    /// First counted vote from this peer for the active round.
    Recorded,
    /// Replaced an earlier vote from the same peer.
    Superseded,
    /// The vote was dropped; the tally is unchanged.
    Rejected(ConsensusError),
}

/// Collects the votes of one (height, round) and answers quorum queries.
/// Built fresh at round entry and discarded with the round.
pub struct Aggregator {
    committee: Committee,
    threshold: Stake,
    height: Height,
    round: RoundNumber,
    votes: HashMap<PublicKey, Vote>,
}

impl Aggregator {
    pub fn new(committee: Committee, threshold: Stake, height: Height, round: RoundNumber) -> Self {
        Self {
            committee,
            threshold,
            height,
            round,
            votes: HashMap::new(),
        }
    }

    /// Feed one vote. At most one vote per peer counts; a later vote from
    /// the same peer replaces the earlier one.
    pub fn record(&mut self, vote: Vote) -> TallyOutcome {
        if vote.height != self.height || vote.round != self.round {
            return TallyOutcome::Rejected(ConsensusError::StaleRound {
                height: vote.height,
                round: vote.round,
            });
        }
        if let Err(e) = vote.verify(&self.committee) {
            return TallyOutcome::Rejected(e);
        }
        match self.votes.insert(vote.author, vote) {
            Some(_) => TallyOutcome::Superseded,
            None => TallyOutcome::Recorded,
        }
    }

    pub fn count_for(&self, hash: &Digest, decision: Decision) -> Stake {
        self.votes
            .values()
            .filter(|vote| vote.hash == *hash && vote.decision == decision)
            .map(|vote| self.committee.stake(&vote.author))
            .sum()
    }

    pub fn has_quorum(&self, hash: &Digest) -> bool {
        self.count_for(hash, Decision::Accept) >= self.threshold
    }

    pub fn has_reject_quorum(&self, hash: &Digest) -> bool {
        self.count_for(hash, Decision::Reject) >= self.threshold
    }
}
