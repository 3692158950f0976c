use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use super::domain::Owner;
use crate::config::DiagnosisConfig;

/// Action name diagnosis tokens are scoped to.
pub const DIAGNOSIS_NONCE_ACTION: &str = "gi_ai_diagnosis_nonce";

const TOKEN_LENGTH: usize = 20;

/// Rejection raised before any data access. Carries no detail about the cause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    #[error("security check failed")]
    InvalidNonce,
}

/// Issues and verifies per-owner anti-forgery tokens.
///
/// A token is bound to a secret, an action and an owner, and rotates every half lifetime.
/// Verification accepts the current and the previous tick.
#[derive(Clone)]
pub struct NonceGuard {
    secret: String,
    lifetime_secs: u64,
}

impl fmt::Debug for NonceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceGuard")
            .field("secret", &"<redacted>")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish()
    }
}

impl NonceGuard {
    pub fn new(secret: impl Into<String>, lifetime_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            lifetime_secs: lifetime_secs.max(2),
        }
    }

    pub fn from_config(config: &DiagnosisConfig) -> Self {
        Self::new(config.nonce_secret.clone(), config.nonce_lifetime_secs)
    }

    pub fn issue(&self, action: &str, owner: &Owner) -> String {
        self.issue_at(action, owner, unix_now())
    }

    pub fn verify(&self, token: &str, action: &str, owner: &Owner) -> Result<(), SecurityError> {
        self.verify_at(token, action, owner, unix_now())
    }

    pub fn issue_at(&self, action: &str, owner: &Owner, unix_secs: u64) -> String {
        self.token_for_tick(action, owner, self.tick(unix_secs))
    }

    pub fn verify_at(
        &self,
        token: &str,
        action: &str,
        owner: &Owner,
        unix_secs: u64,
    ) -> Result<(), SecurityError> {
        if token.len() != TOKEN_LENGTH {
            return Err(SecurityError::InvalidNonce);
        }

        let tick = self.tick(unix_secs);
        let accepted = [Some(tick), tick.checked_sub(1)]
            .into_iter()
            .flatten()
            .any(|candidate| {
                constant_time_eq(
                    token.as_bytes(),
                    self.token_for_tick(action, owner, candidate).as_bytes(),
                )
            });

        if accepted {
            Ok(())
        } else {
            Err(SecurityError::InvalidNonce)
        }
    }

    fn tick(&self, unix_secs: u64) -> u64 {
        unix_secs.div_ceil(self.lifetime_secs / 2)
    }

    fn token_for_tick(&self, action: &str, owner: &Owner, tick: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b"|");
        hasher.update(action.as_bytes());
        hasher.update(b"|");
        hasher.update(owner.key().as_bytes());
        hasher.update(b"|");
        hasher.update(tick.to_string().as_bytes());

        let mut token = hex::encode(hasher.finalize());
        token.truncate(TOKEN_LENGTH);
        token
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

pub(crate) fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
