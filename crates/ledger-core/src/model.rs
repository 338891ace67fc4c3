//! Row types for the three persistent tables, and the verifier's result
//! shapes. See spec §3 (Data Model) and §6 (External Interfaces).

use crate::digest::Digest;
use serde::{Deserialize, Serialize};

/// One bottom-level Merkle node, produced from exactly two transaction IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRow {
    pub digest: Digest,
    pub left: Digest,
    pub right: Digest,
    /// Digest of the previous leaf in the same open batch, or `None` for the
    /// first leaf — the chain used to reconstruct batch order at close.
    pub prev: Option<Digest>,
}

/// An interior Merkle node above the leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRow {
    pub digest: Digest,
    pub left: Digest,
    pub right: Digest,
}

/// The top digest of a closed batch, submitted to the anchoring chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRow {
    pub root: Digest,
    /// Colon-separated anchoring context, see [`AnchorSpec`].
    pub spec: String,
}

/// Parsed form of a root row's `spec` string:
/// `"<subsystem>:<chain_id>:<contract_name>:<contract_address>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorSpec {
    pub subsystem: String,
    pub chain_id: String,
    pub contract: String,
    pub contract_address: String,
}

impl AnchorSpec {
    #[must_use]
    pub fn format(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.subsystem, self.chain_id, self.contract, self.contract_address
        )
    }

    /// Parse a colon-separated spec string as written by [`AnchorSpec::format`].
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(4, ':');
        Some(Self {
            subsystem: parts.next()?.to_string(),
            chain_id: parts.next()?.to_string(),
            contract: parts.next()?.to_string(),
            contract_address: parts.next()?.to_string(),
        })
    }
}

/// Which side of its parent a queried digest occupies — named from the
/// perspective of the node being proven, not the sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
}

/// One step of a sibling path: the queried digest's position relative to its
/// parent, plus the sibling digest needed to fold upward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub position: Position,
    #[serde(with = "hex_digest")]
    pub sibling_digest: Digest,
}

/// Anchoring context attached to a successful verification, including the
/// block height reported by the anchoring client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedSpec {
    pub subsystem: String,
    pub chain_id: String,
    pub contract: String,
    pub contract_address: String,
    pub block: i64,
}

/// Result of [`crate::subsystem::LedgerSubsystem::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub found: bool,
    pub spec: Option<VerifiedSpec>,
    pub path: Option<Vec<ProofStep>>,
    /// Present only on a `found: false` result where a reason is known
    /// (e.g. "not anchored"), per spec §7.
    pub reason: Option<String>,
}

impl VerifyResult {
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            found: false,
            spec: None,
            path: None,
            reason: None,
        }
    }

    #[must_use]
    pub fn not_found_because(reason: &str) -> Self {
        Self {
            found: false,
            spec: None,
            path: None,
            reason: Some(reason.to_string()),
        }
    }
}

mod hex_digest {
    use super::Digest;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Digest, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&d.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Digest, D::Error> {
        let s = String::deserialize(d)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
