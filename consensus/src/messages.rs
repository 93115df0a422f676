use crate::config::Committee;
use crate::error::{ConsensusError, ConsensusResult};
use bytes::Bytes;
use crypto::{Digest, Hash, PublicKey, Signature, SignatureService};
use ed25519_dalek::Digest as _;
use ed25519_dalek::Sha512;
use serde::{Deserialize, Serialize};
use std::convert::TryInto as _;
use std::fmt;
use std::net::SocketAddr;

#[cfg(test)]
#[path = "tests/messages_tests.rs"]
pub mod messages_tests;

pub type Height = u64;
pub type RoundNumber = u64;

#[derive(Serialize, Deserialize, Debug)]
pub enum ConsensusMessage {
    Propose(Block),
    Vote(Vote),
}

/// Outbound envelope handed to the transport layer. Delivery, retry and
/// backpressure are the transport's problem; the engine never waits on it.
#[derive(Debug)]
pub struct NetMessage(pub Bytes, pub Vec<SocketAddr>);

/// Client payload carried by blocks. Consensus never interprets the fields;
/// validity is delegated to the transaction pool's predicate.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize, Debug)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub height: Height,
    pub round: RoundNumber,
    pub previous_hash: Digest,
    pub transactions: Vec<Transaction>,
    pub author: PublicKey,
    pub signature: Signature,
}

impl Block {
    pub async fn new(
        height: Height,
        round: RoundNumber,
        previous_hash: Digest,
        transactions: Vec<Transaction>,
        author: PublicKey,
        mut signature_service: SignatureService,
    ) -> Self {
        let block = Self {
            height,
            round,
            previous_hash,
            transactions,
            author,
            signature: Signature::default(),
        };
        let signature = signature_service.request_signature(block.digest()).await;
        Self { signature, ..block }
    }

    pub fn verify(&self, committee: &Committee) -> ConsensusResult<()> {
        ensure!(
            committee.exists(&self.author),
            ConsensusError::UnknownPeer(self.author)
        );
        self.signature.verify(&self.digest(), &self.author)?;
        Ok(())
    }
}

impl Hash for Block {
    fn digest(&self) -> Digest {
        // The digest covers the block's actual contents, so equal digests
        // mean equal proposals.
        let mut hasher = Sha512::new();
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.round.to_le_bytes());
        hasher.update(&self.previous_hash);
        for transaction in &self.transactions {
            hasher.update(transaction.from.as_bytes());
            hasher.update(transaction.to.as_bytes());
            hasher.update(transaction.amount.to_le_bytes());
        }
        hasher.update(self.author.0);
        Digest(hasher.finalize().as_slice()[..32].try_into().unwrap())
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: B(h{}, r{}, {}, {} txs)",
            self.digest(),
            self.height,
            self.round,
            self.author,
            self.transactions.len()
        )
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.height)
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Debug)]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Vote {
    pub height: Height,
    pub round: RoundNumber,
    pub hash: Digest,
    pub decision: Decision,
    pub author: PublicKey,
    pub signature: Signature,
}

impl Vote {
    pub async fn new(
        block: &Block,
        decision: Decision,
        author: PublicKey,
        mut signature_service: SignatureService,
    ) -> Self {
        let vote = Self {
            height: block.height,
            round: block.round,
            hash: block.digest(),
            decision,
            author,
            signature: Signature::default(),
        };
        let signature = signature_service.request_signature(vote.digest()).await;
        Self { signature, ..vote }
    }

    pub fn verify(&self, committee: &Committee) -> ConsensusResult<()> {
        ensure!(
            committee.exists(&self.author),
            ConsensusError::UnknownPeer(self.author)
        );
        self.signature.verify(&self.digest(), &self.author)?;
        Ok(())
    }
}

impl Hash for Vote {
    fn digest(&self) -> Digest {
        let mut hasher = Sha512::new();
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.round.to_le_bytes());
        hasher.update(&self.hash);
        hasher.update([match self.decision {
            Decision::Accept => 0u8,
            Decision::Reject => 1u8,
        }]);
        hasher.update(self.author.0);
        Digest(hasher.finalize().as_slice()[..32].try_into().unwrap())
    }
}

impl fmt::Debug for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "V(h{}, r{}, {:?}, {}, {})",
            self.height, self.round, self.decision, self.hash, self.author
        )
    }
}
