use crate::interfaces::StoreError;
use crate::messages::{Height, RoundNumber};
use crypto::{CryptoError, Digest, PublicKey};
use thiserror::Error;

#[macro_export]
macro_rules! bail {
    ($e:expr) => {
        return Err($e);
    };
}

#[macro_export(local_inner_macros)]
macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            bail!($e);
        }
    };
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("Invalid signature")]
    InvalidSignature(#[from] CryptoError),

    #[error("Message from unknown peer {0}")]
    UnknownPeer(PublicKey),

    #[error("Message stamped (height {height}, round {round}) does not match the active round")]
    StaleRound { height: Height, round: RoundNumber },

    #[error("Peer {0} proposed conflicting block {1} for an already-locked round")]
    ConflictingProposal(PublicKey, Digest),

    #[error("Proposal from {author} who does not lead (height {height}, round {round})")]
    WrongLeader {
        author: PublicKey,
        height: Height,
        round: RoundNumber,
    },

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Timed out waiting for quorum at (height {height}, round {round})")]
    QuorumTimeout { height: Height, round: RoundNumber },
}
