use crate::config::{Committee, Parameters};
use crate::core::Core;
use crate::interfaces::{BlockStore, TransactionPool};
use crate::leader::LeaderElector;
use crate::messages::{Block, ConsensusMessage, Height, NetMessage};
use crate::proposer::Proposer;
use crypto::{Digest, PublicKey, SignatureService};
use tokio::sync::mpsc::{Receiver, Sender};

#[cfg(test)]
#[path = "tests/consensus_tests.rs"]
pub mod consensus_tests;

pub struct Consensus;

impl Consensus {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        // The identity of this node.
        name: PublicKey,
        // The committee roster for the epoch.
        committee: Committee,
        // The configuration parameters.
        parameters: Parameters,
        // Signs our proposals and votes.
        signature_service: SignatureService,
        // Durable home of committed blocks.
        store: Box<dyn BlockStore>,
        // Source of pending client transactions.
        pool: Box<dyn TransactionPool>,
        // The chain position to start agreeing on (persisted tip + 1).
        height: Height,
        // Hash of the last committed block.
        previous_hash: Digest,
        // Receives proposals and votes from the transport.
        rx_consensus: Receiver<ConsensusMessage>,
        // Hands pre-addressed envelopes to the transport.
        tx_network: Sender<NetMessage>,
        // Output committed blocks.
        tx_commit: Sender<Block>,
    ) {
        parameters.log();

        let leader_elector = LeaderElector::new(committee.clone());
        let proposer = Proposer::new(
            name,
            signature_service.clone(),
            pool,
            parameters.max_batch_size,
        );

        tokio::spawn(async move {
            Core::new(
                name,
                committee,
                parameters,
                signature_service,
                store,
                leader_elector,
                proposer,
                rx_consensus,
                tx_network,
                tx_commit,
                height,
                previous_hash,
            )
            .run()
            .await;
        });
    }
}
