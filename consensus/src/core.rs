use crate::aggregator::{Aggregator, TallyOutcome};
use crate::config::{Committee, Parameters, Stake};
use crate::error::{ConsensusError, ConsensusResult};
use crate::interfaces::BlockStore;
use crate::leader::LeaderElector;
use crate::messages::{Block, ConsensusMessage, Decision, Height, NetMessage, RoundNumber, Vote};
use crate::proposer::Proposer;
use crate::timer::RoundTimer;
use bytes::Bytes;
use crypto::{Digest, Hash as _, PublicKey, SignatureService};
use log::{debug, error, info, warn};
use tokio::sync::mpsc::{Receiver, Sender};

#[cfg(test)]
#[path = "tests/core_tests.rs"]
pub mod core_tests;

/// Where the engine stands within the active round.
///
/// `Idle`, `Committing` and `ViewChanging` are transient: the run loop
/// resolves them before polling for the next message or timer event, so the
/// engine only ever waits in `AwaitingProposal` or `Voting`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Between rounds; resolves into Proposing or AwaitingProposal.
    Idle,
    /// We lead the round and are assembling a proposal.
    Proposing,
    /// A peer leads the round; waiting for its proposal.
    AwaitingProposal,
    /// A block is locked for the round; collecting votes.
    Voting,
    /// Quorum reached; persisting the block.
    Committing,
    /// The round stalled or was rejected; moving to the next one.
    ViewChanging,
    /// Unrecoverable store failure; operator intervention required.
    Halted,
}

pub struct Core {
    name: PublicKey,
    committee: Committee,
    parameters: Parameters,
    signature_service: SignatureService,
    store: Box<dyn BlockStore>,
    leader_elector: LeaderElector,
    proposer: Proposer,
    core_channel: Receiver<ConsensusMessage>,
    network_channel: Sender<NetMessage>,
    commit_channel: Sender<Block>,
    height: Height,
    round: RoundNumber,
    phase: Phase,
    previous_hash: Digest,
    locked_block: Option<Block>,
    aggregator: Aggregator,
    timer: RoundTimer,
    quorum_threshold: Stake,
}

impl Core {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: PublicKey,
        committee: Committee,
        parameters: Parameters,
        signature_service: SignatureService,
        store: Box<dyn BlockStore>,
        leader_elector: LeaderElector,
        proposer: Proposer,
        core_channel: Receiver<ConsensusMessage>,
        network_channel: Sender<NetMessage>,
        commit_channel: Sender<Block>,
        height: Height,
        previous_hash: Digest,
    ) -> Self {
        let quorum_threshold = parameters.quorum(&committee);
        let aggregator = Aggregator::new(committee.clone(), quorum_threshold, height, 0);
        let timer = RoundTimer::new(parameters.round_duration);
        Self {
            name,
            committee,
            parameters,
            signature_service,
            store,
            leader_elector,
            proposer,
            core_channel,
            network_channel,
            commit_channel,
            height,
            round: 0,
            phase: Phase::Idle,
            previous_hash,
            locked_block: None,
            aggregator,
            timer,
            quorum_threshold,
        }
    }

    /// Send a message to every other committee member, fire-and-forget.
    async fn transmit(&mut self, message: &ConsensusMessage) {
        debug!("Broadcasting {:?}", message);
        let addresses = self.committee.broadcast_addresses(&self.name);
        let bytes = bincode::serialize(message).expect("Failed to serialize consensus message");
        let message = NetMessage(Bytes::from(bytes), addresses);
        if let Err(e) = self.network_channel.send(message).await {
            panic!("Failed to send message through network channel: {}", e);
        }
    }

    /// Enter the active (height, round): fresh tally, fresh deadline, and a
    /// proposal of our own if the slot is ours.
    async fn enter_round(&mut self) -> ConsensusResult<()> {
        self.aggregator = Aggregator::new(
            self.committee.clone(),
            self.quorum_threshold,
            self.height,
            self.round,
        );
        self.locked_block = None;
        self.timer.arm(self.round);

        let leader = self.leader_elector.get_leader(self.height, self.round);
        if leader == self.name {
            self.phase = Phase::Proposing;
            let block = self
                .proposer
                .make_block(self.height, self.round, self.previous_hash.clone())
                .await;
            info!("Created {:?}", block);
            self.transmit(&ConsensusMessage::Propose(block.clone()))
                .await;
            self.lock_and_vote(block, Decision::Accept).await
        } else {
            self.phase = Phase::AwaitingProposal;
            debug!(
                "Waiting for proposal from {} for (height {}, round {})",
                leader, self.height, self.round
            );
            Ok(())
        }
    }

    /// Lock `block` as the round's candidate and broadcast our vote on it.
    async fn lock_and_vote(&mut self, block: Block, decision: Decision) -> ConsensusResult<()> {
        let vote = Vote::new(&block, decision, self.name, self.signature_service.clone()).await;
        self.locked_block = Some(block);
        self.phase = Phase::Voting;
        debug!("Casting {:?}", vote);
        self.transmit(&ConsensusMessage::Vote(vote.clone())).await;
        self.handle_vote(vote).await
    }

    async fn handle_proposal(&mut self, block: Block) -> ConsensusResult<()> {
        // Rounds are processed one at a time; anything not stamped with the
        // active (height, round) is dropped. Catching up lagging peers is
        // chain sync, not consensus.
        ensure!(
            block.height == self.height && block.round == self.round,
            ConsensusError::StaleRound {
                height: block.height,
                round: block.round
            }
        );
        block.verify(&self.committee)?;

        if let Some(locked) = &self.locked_block {
            let digest = block.digest();
            if locked.digest() == digest {
                // Duplicate delivery of the round's block.
                return Ok(());
            }
            bail!(ConsensusError::ConflictingProposal(block.author, digest));
        }

        // Only the slot's leader may propose. Anything else must not consume
        // our one vote for the round.
        let leader = self.leader_elector.get_leader(self.height, self.round);
        ensure!(
            block.author == leader,
            ConsensusError::WrongLeader {
                author: block.author,
                height: block.height,
                round: block.round,
            }
        );

        // Content decides our vote: an authentic but invalid block is
        // answered with Reject so the cluster can skip the round early.
        let decision = if block.previous_hash == self.previous_hash
            && block.transactions.iter().all(|x| self.proposer.is_valid(x))
        {
            Decision::Accept
        } else {
            Decision::Reject
        };
        self.lock_and_vote(block, decision).await
    }

    async fn handle_vote(&mut self, vote: Vote) -> ConsensusResult<()> {
        debug!("Processing {:?}", vote);
        if let TallyOutcome::Rejected(e) = self.aggregator.record(vote) {
            bail!(e);
        }

        // Quorums only act through the round's locked block: votes for a
        // digest we never validated give us nothing to commit.
        if let Some(digest) = self.locked_block.as_ref().map(|x| x.digest()) {
            if self.aggregator.has_quorum(&digest) {
                self.phase = Phase::Committing;
            } else if self.aggregator.has_reject_quorum(&digest) {
                debug!(
                    "Quorum rejected the proposal for (height {}, round {})",
                    self.height, self.round
                );
                self.phase = Phase::ViewChanging;
            }
        }
        Ok(())
    }

    /// Persist the locked block and advance to the next height. A failed
    /// append must not be papered over by re-proposing: retry a bounded
    /// number of times, then halt for the operator.
    async fn commit(&mut self) -> ConsensusResult<()> {
        let block = self
            .locked_block
            .take()
            .expect("Entered commit phase without a locked block");

        let mut attempts = 0;
        loop {
            match self.store.append(&block).await {
                Ok(()) => break,
                Err(e) if attempts < self.parameters.store_retries => {
                    attempts += 1;
                    warn!(
                        "Failed to persist {:?} (attempt {}): {}",
                        block, attempts, e
                    );
                }
                Err(e) => {
                    self.phase = Phase::Halted;
                    bail!(ConsensusError::StoreError(e));
                }
            }
        }

        info!("Committed {:?}", block);
        self.previous_hash = block.digest();
        if let Err(e) = self.commit_channel.send(block).await {
            warn!("Failed to send block through the commit channel: {}", e);
        }
        self.height += 1;
        self.round = 0;
        self.phase = Phase::Idle;
        Ok(())
    }

    /// The round deadline fired before a commit.
    fn local_timeout(&mut self) -> ConsensusResult<()> {
        self.phase = Phase::ViewChanging;
        bail!(ConsensusError::QuorumTimeout {
            height: self.height,
            round: self.round,
        });
    }

    /// Resolve one transient phase. Never recurses: committing at height H
    /// leaves the engine Idle, and the next call enters H+1.
    async fn advance(&mut self) -> ConsensusResult<()> {
        match self.phase {
            Phase::Idle => self.enter_round().await,
            Phase::Committing => self.commit().await,
            Phase::ViewChanging => {
                // The stalled round's block and tally die with it.
                self.round += 1;
                self.phase = Phase::Idle;
                Ok(())
            }
            phase => unreachable!("advance() called in waiting phase {:?}", phase),
        }
    }

    fn log_result(result: ConsensusResult<()>) {
        match result {
            Ok(()) => (),
            Err(ConsensusError::StoreError(e)) => error!("{}", e),
            // Routine under partition or a silent leader; a metric, not an
            // operator error.
            Err(e @ ConsensusError::QuorumTimeout { .. }) => debug!("{}", e),
            Err(e) => warn!("{}", e),
        }
    }

    /// Main reactor loop: drive the state machine to quiescence, then block
    /// on the next message or the round deadline.
    pub async fn run(&mut self) {
        loop {
            while matches!(
                self.phase,
                Phase::Idle | Phase::Committing | Phase::ViewChanging
            ) {
                let result = self.advance().await;
                Self::log_result(result);
            }
            if self.phase == Phase::Halted {
                error!(
                    "Consensus halted at height {}; operator intervention required",
                    self.height
                );
                break;
            }

            let result = tokio::select! {
                Some(message) = self.core_channel.recv() => match message {
                    ConsensusMessage::Propose(block) => self.handle_proposal(block).await,
                    ConsensusMessage::Vote(vote) => self.handle_vote(vote).await,
                },
                () = &mut self.timer => self.local_timeout(),
                else => break,
            };
            Self::log_result(result);
        }
    }
}
