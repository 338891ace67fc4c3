//! Core ledger-anchoring subsystem: batches opaque transaction IDs into
//! Merkle trees, persists every node, and commits each closed root to an
//! external anchoring chain through the [`anchor::AnchorProvider`] contract.
//!
//! [`subsystem::LedgerSubsystem`] is the entry point; everything else is an
//! implementation detail it wires together.

pub mod anchor;
pub mod checkpoint;
pub mod config;
pub mod digest;
pub mod engine;
pub mod mailbox;
pub mod model;
pub mod store;
pub mod subsystem;
pub mod timer;
pub mod verify;

pub use anchor::{AnchorError, AnchorProvider};
pub use config::{Config, ConfigError};
pub use digest::Digest;
pub use model::VerifyResult;
pub use subsystem::{LedgerSubsystem, SubsystemError};
