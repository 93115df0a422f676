use crate::interfaces::TransactionPool;
use crate::messages::{Block, Height, RoundNumber, Transaction};
use crypto::{Digest, PublicKey, SignatureService};
use log::debug;

#[cfg(test)]
#[path = "tests/proposer_tests.rs"]
pub mod proposer_tests;

/// Assembles the block for a slot from the pool's pending transactions.
pub struct Proposer {
    name: PublicKey,
    signature_service: SignatureService,
    pool: Box<dyn TransactionPool>,
    max_batch_size: usize,
}

impl Proposer {
    pub fn new(
        name: PublicKey,
        signature_service: SignatureService,
        pool: Box<dyn TransactionPool>,
        max_batch_size: usize,
    ) -> Self {
        Self {
            name,
            signature_service,
            pool,
            max_batch_size,
        }
    }

    /// Build and sign the block for a (height, round) slot. An empty pool
    /// yields an empty block immediately so the round still makes progress.
    pub async fn make_block(
        &mut self,
        height: Height,
        round: RoundNumber,
        previous_hash: Digest,
    ) -> Block {
        let transactions = self.pool.pending_batch(self.max_batch_size);
        if transactions.is_empty() {
            debug!("No transactions pending, proposing an empty block");
        }
        Block::new(
            height,
            round,
            previous_hash,
            transactions,
            self.name,
            self.signature_service.clone(),
        )
        .await
    }

    /// The pool's validity predicate, consulted when validating a peer's
    /// proposal.
    pub fn is_valid(&self, transaction: &Transaction) -> bool {
        self.pool.is_valid(transaction)
    }
}
