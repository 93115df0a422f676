use crate::messages::{Block, Transaction};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to persist block: {0}")]
    WriteFailed(String),
}

/// Source of pending client transactions. Implemented by the node's
/// transaction pool; the engine only ever pulls, it never waits on the pool.
pub trait TransactionPool: Send {
    /// Up to `max` transactions ready for inclusion. An empty batch is
    /// normal and still produces an (empty) proposal.
    fn pending_batch(&mut self, max: usize) -> Vec<Transaction>;

    /// Application-level validity of a single transaction.
    fn is_valid(&self, transaction: &Transaction) -> bool;
}

/// Durable home of committed blocks.
#[async_trait]
pub trait BlockStore: Send {
    async fn append(&mut self, block: &Block) -> Result<(), StoreError>;
}
