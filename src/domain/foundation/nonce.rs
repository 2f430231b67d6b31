//! Time-windowed confirmation nonce.
//!
//! The browser-redirect confirmation call is the one entry point a shopper's
//! browser hits directly, so it carries a CSRF-style token: an HMAC over an
//! action name and a coarse time window. A token stays valid for the current
//! window and the previous one, giving a lifetime between half the configured
//! lifetime and the full lifetime depending on when it was issued.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Default nonce lifetime: 24 hours across two 12-hour windows.
pub const DEFAULT_NONCE_LIFETIME_SECS: u64 = 86_400;

/// Issues and verifies confirmation nonces.
#[derive(Clone)]
pub struct ConfirmationNonce {
    secret: String,
    lifetime_secs: u64,
}

impl ConfirmationNonce {
    /// Creates an issuer with the default lifetime.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            lifetime_secs: DEFAULT_NONCE_LIFETIME_SECS,
        }
    }

    /// Creates an issuer with a custom lifetime in seconds.
    pub fn with_lifetime(secret: impl Into<String>, lifetime_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            lifetime_secs: lifetime_secs.max(2),
        }
    }

    /// Issues a nonce bound to `action`, valid from now.
    pub fn issue(&self, action: &str) -> String {
        self.issue_at(action, now_secs())
    }

    /// Verifies a nonce against `action`, accepting the current and the
    /// previous time window.
    pub fn verify(&self, token: &str, action: &str) -> bool {
        self.verify_at(token, action, now_secs())
    }

    fn issue_at(&self, action: &str, now: u64) -> String {
        self.compute(action, self.window(now, 0))
    }

    fn verify_at(&self, token: &str, action: &str, now: u64) -> bool {
        let current = self.compute(action, self.window(now, 0));
        let previous = self.compute(action, self.window(now, 1));

        constant_time_eq(token.as_bytes(), current.as_bytes())
            || constant_time_eq(token.as_bytes(), previous.as_bytes())
    }

    fn window(&self, now: u64, offset: u64) -> u64 {
        (now / (self.lifetime_secs / 2)).saturating_sub(offset)
    }

    fn compute(&self, action: &str, window: u64) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(action.as_bytes());
        mac.update(b"|");
        mac.update(window.to_string().as_bytes());

        let digest = mac.finalize().into_bytes();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Debug for ConfirmationNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationNonce")
            .field("secret", &"[REDACTED]")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

fn now_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTION: &str = "paystack_confirm_payment";

    fn issuer() -> ConfirmationNonce {
        ConfirmationNonce::new("test-nonce-secret")
    }

    #[test]
    fn issued_nonce_verifies() {
        let nonce = issuer();
        let token = nonce.issue(ACTION);
        assert!(nonce.verify(&token, ACTION));
    }

    #[test]
    fn nonce_is_bound_to_action() {
        let nonce = issuer();
        let token = nonce.issue(ACTION);
        assert!(!nonce.verify(&token, "some_other_action"));
    }

    #[test]
    fn tampered_nonce_fails() {
        let nonce = issuer();
        let mut token = nonce.issue(ACTION);
        let flipped = if token.ends_with('0') { "1" } else { "0" };
        token.replace_range(token.len() - 1.., flipped);
        assert!(!nonce.verify(&token, ACTION));
    }

    #[test]
    fn nonce_from_previous_window_still_verifies() {
        let nonce = ConfirmationNonce::with_lifetime("test-nonce-secret", 600);
        let now = 1_700_000_000;
        let token = nonce.issue_at(ACTION, now);

        // One window (300s) later the token falls into the previous window.
        assert!(nonce.verify_at(&token, ACTION, now + 300));
    }

    #[test]
    fn nonce_expires_after_two_windows() {
        let nonce = ConfirmationNonce::with_lifetime("test-nonce-secret", 600);
        let now = 1_700_000_000;
        let token = nonce.issue_at(ACTION, now);

        assert!(!nonce.verify_at(&token, ACTION, now + 601));
    }

    #[test]
    fn different_secrets_produce_incompatible_nonces() {
        let a = ConfirmationNonce::new("secret-a");
        let b = ConfirmationNonce::new("secret-b");
        let token = a.issue(ACTION);
        assert!(!b.verify(&token, ACTION));
    }

    #[test]
    fn debug_redacts_secret() {
        let nonce = issuer();
        let debug = format!("{:?}", nonce);
        assert!(!debug.contains("test-nonce-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
