//! Fixed-width 32-byte digests and the concatenation hash `H(a‖b)`.

use sha2::{Digest as _, Sha256};
use std::fmt;

/// A 32-byte SHA-256 digest, used for transaction IDs, leaves, branches and
/// roots alike — the whole tree is just digests pointing at digests.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Wrap raw bytes as a digest.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The all-zero digest, used as a checkpoint sentinel — never a real
    /// hash output (SHA-256 preimage resistance makes collision astronomically
    /// unlikely), so it safely doubles as "empty".
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Parse a lowercase or uppercase hex string into a digest.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// `H(a ‖ b)` — the one hash primitive the whole Merkle structure is built
/// from. Concatenates both digests and hashes the result with SHA-256.
#[must_use]
pub fn concat_hash(a: &Digest, b: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(a.as_bytes());
    hasher.update(b.as_bytes());
    let out: [u8; 32] = hasher.finalize().into();
    Digest(out)
}
