#[macro_use]
mod error;
mod aggregator;
mod config;
mod consensus;
mod core;
mod interfaces;
mod leader;
mod messages;
mod proposer;
mod timer;

#[cfg(test)]
#[path = "tests/common.rs"]
mod common;

pub use crate::config::{Committee, Parameters, Stake};
pub use crate::consensus::Consensus;
pub use crate::error::{ConsensusError, ConsensusResult};
pub use crate::interfaces::{BlockStore, StoreError, TransactionPool};
pub use crate::messages::{
    Block, ConsensusMessage, Decision, Height, NetMessage, RoundNumber, Transaction, Vote,
};
