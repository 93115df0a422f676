use crate::config::Committee;
use crate::interfaces::{BlockStore, StoreError, TransactionPool};
use crate::messages::{Block, Decision, Height, RoundNumber, Transaction, Vote};
use async_trait::async_trait;
use crypto::{generate_keypair, Digest, Hash as _, PublicKey, SecretKey, Signature};
use rand::rngs::StdRng;
use rand::SeedableRng as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// Fixture.
pub fn keys() -> Vec<(PublicKey, SecretKey)> {
    let mut rng = StdRng::from_seed([0; 32]);
    (0..4).map(|_| generate_keypair(&mut rng)).collect()
}

// Fixture.
pub fn foreign_keypair() -> (PublicKey, SecretKey) {
    let mut rng = StdRng::from_seed([37; 32]);
    generate_keypair(&mut rng)
}

// Fixture.
pub fn committee() -> Committee {
    Committee::new(
        keys()
            .into_iter()
            .enumerate()
            .map(|(i, (name, _))| {
                let address = format!("127.0.0.1:{}", 100 + i).parse().unwrap();
                (name, 1, address)
            })
            .collect(),
        /* epoch */ 1,
    )
}

// Fixture.
pub fn transactions() -> Vec<Transaction> {
    vec![
        Transaction {
            from: "alice".to_string(),
            to: "bob".to_string(),
            amount: 3,
        },
        Transaction {
            from: "bob".to_string(),
            to: "carol".to_string(),
            amount: 1,
        },
    ]
}

// Fixture.
pub fn signed_block(
    height: Height,
    round: RoundNumber,
    previous_hash: Digest,
    transactions: Vec<Transaction>,
    keypair: &(PublicKey, SecretKey),
) -> Block {
    let (name, secret) = keypair;
    let block = Block {
        height,
        round,
        previous_hash,
        transactions,
        author: *name,
        signature: Signature::default(),
    };
    let signature = Signature::new(&block.digest(), secret);
    Block { signature, ..block }
}

// Fixture.
pub fn signed_vote(
    block: &Block,
    decision: Decision,
    keypair: &(PublicKey, SecretKey),
) -> Vote {
    let (name, secret) = keypair;
    let vote = Vote {
        height: block.height,
        round: block.round,
        hash: block.digest(),
        decision,
        author: *name,
        signature: Signature::default(),
    };
    let signature = Signature::new(&vote.digest(), secret);
    Vote { signature, ..vote }
}

/// In-memory transaction pool: hands out its queue in order and rejects
/// transfers with missing endpoints or a zero amount.
pub struct TestPool {
    pub pending: Vec<Transaction>,
}

impl TestPool {
    pub fn new(pending: Vec<Transaction>) -> Self {
        Self { pending }
    }

    pub fn empty() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl TransactionPool for TestPool {
    fn pending_batch(&mut self, max: usize) -> Vec<Transaction> {
        let take = max.min(self.pending.len());
        self.pending.drain(..take).collect()
    }

    fn is_valid(&self, transaction: &Transaction) -> bool {
        !transaction.from.is_empty() && !transaction.to.is_empty() && transaction.amount > 0
    }
}

/// In-memory block store.
#[derive(Clone, Default)]
pub struct TestStore {
    pub blocks: Arc<Mutex<Vec<Block>>>,
}

#[async_trait]
impl BlockStore for TestStore {
    async fn append(&mut self, block: &Block) -> Result<(), StoreError> {
        self.blocks.lock().unwrap().push(block.clone());
        Ok(())
    }
}

/// Store that fails every append, counting the attempts.
#[derive(Clone, Default)]
pub struct FailingStore {
    pub attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl BlockStore for FailingStore {
    async fn append(&mut self, _block: &Block) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::WriteFailed("disk full".to_string()))
    }
}
