//! Phone verification sessions.
//!
//! The expected code is held only as a SHA-256 digest; the plaintext is
//! wiped as soon as the digest is computed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::ids;

/// Opaque identifier of one issued challenge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Generate a fresh random transaction id.
    #[must_use]
    pub fn generate() -> Self {
        Self(ids::random_base36(12))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a successful challenge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub transaction_id: TransactionId,

    /// How long the caller should wait before requesting another challenge
    pub cooldown: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationState {
    Unstarted,
    ChallengeSent,
    Verified,
}

/// One challenge/response exchange for a phone.
#[derive(Clone)]
pub struct VerificationSession {
    pub transaction_id: TransactionId,
    pub phone: String,
    pub state: VerificationState,
    pub issued_at: DateTime<Utc>,
    code_digest: [u8; 32],
}

impl VerificationSession {
    /// Start a session whose challenge code has just been sent.
    #[must_use]
    pub fn challenge_sent(
        transaction_id: TransactionId,
        phone: impl Into<String>,
        code: &Zeroizing<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id,
            phone: phone.into(),
            state: VerificationState::ChallengeSent,
            issued_at,
            code_digest: digest_code(code),
        }
    }

    /// Check a submitted code against the expected one.
    ///
    /// Only six-digit numeric codes can match.
    #[must_use]
    pub fn matches(&self, code: &str) -> bool {
        let code = Zeroizing::new(code.trim().to_string());
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        digest_code(&code) == self.code_digest
    }

    pub fn mark_verified(&mut self) {
        self.state = VerificationState::Verified;
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.state == VerificationState::Verified
    }
}

// The digest is derived from a secret; keep it out of debug output.
impl std::fmt::Debug for VerificationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationSession")
            .field("transaction_id", &self.transaction_id)
            .field("state", &self.state)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

fn digest_code(code: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hasher.finalize().into()
}
