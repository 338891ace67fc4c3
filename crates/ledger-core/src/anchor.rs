//! The anchoring-chain client contract (external collaborator, spec §6).
//!
//! The core never talks to a chain directly — it owns a boxed
//! `dyn AnchorProvider` and calls `anchor`/`lookup` on it. Concrete
//! providers (e.g. `anchor-ethereum`) live in their own crates so the core
//! stays free of any particular chain SDK.

use crate::digest::Digest;
use async_trait::async_trait;
use thiserror::Error;

/// Failure modes reported by an anchoring client. The engine never retries
/// these itself (spec §1 Non-goals) — the client's own retry policy, if any,
/// lives behind `anchor`/`lookup` returning `Ok`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnchorError {
    #[error("network error talking to anchoring chain: {0}")]
    Network(String),
    #[error("anchoring chain provider error: {0}")]
    Provider(String),
    #[error("unsupported anchoring subsystem: {0}")]
    UnsupportedSubsystem(String),
}

/// The three operations the spec's anchoring client contract (§6) requires.
#[async_trait]
pub trait AnchorProvider: Send + Sync {
    /// Submit `root` to the anchoring chain. Blocks (from the engine's point
    /// of view — `.await`s inline, not spawned) until the submission is
    /// confirmed accepted, enforcing the back-pressure property of spec §5.
    async fn anchor(&self, root: Digest) -> Result<(), AnchorError>;

    /// Look up the block height at which `root` was anchored. A non-positive
    /// result means "not anchored / not yet confirmed" (spec §6).
    async fn lookup(&self, root: Digest) -> Result<i64, AnchorError>;
}
