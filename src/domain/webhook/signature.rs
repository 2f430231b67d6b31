//! Paystack webhook signature verification.
//!
//! Paystack signs each delivery with HMAC-SHA512 over the raw request body,
//! hex-encoded into the `x-paystack-signature` header. Verification must run
//! on the exact bytes received, before any JSON parsing, because
//! re-serialization is not guaranteed to reproduce the signed bytes.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use super::{WebhookError, WebhookEvent};

/// Maximum accepted webhook body size (1 MiB).
pub const MAX_PAYLOAD_BYTES: usize = 1_048_576;

/// Verifier for Paystack webhook signatures.
pub struct PaystackWebhookVerifier {
    /// The account secret key; Paystack signs webhooks with the same key
    /// used for API calls.
    secret: String,
}

impl PaystackWebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies a raw webhook body against its signature header.
    ///
    /// # Verification Steps
    ///
    /// 1. Reject empty or oversized bodies
    /// 2. Require a configured secret and a present header
    /// 3. Compute HMAC-SHA512 over the raw body
    /// 4. Compare against the hex-decoded header in constant time
    ///
    /// # Errors
    ///
    /// - `EmptyPayload` / `PayloadTooLarge` - body fails the size gate
    /// - `SecretUnconfigured` - no secret to verify with
    /// - `MissingSignature` - header absent or blank
    /// - `InvalidSignature` - header is not valid hex or does not match
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<(), WebhookError> {
        if payload.is_empty() {
            return Err(WebhookError::EmptyPayload);
        }
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(WebhookError::PayloadTooLarge(payload.len()));
        }
        if self.secret.is_empty() {
            return Err(WebhookError::SecretUnconfigured);
        }

        let header = match signature_header {
            Some(value) if !value.trim().is_empty() => value.trim(),
            _ => return Err(WebhookError::MissingSignature),
        };

        // A non-hex header can never match; fold it into the mismatch case
        // rather than leaking a distinct parse failure to the sender.
        let provided = hex::decode(header).map_err(|_| WebhookError::InvalidSignature)?;
        let expected = self.compute_signature(payload);

        if !constant_time_compare(&expected, &provided) {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    /// Verifies the signature and decodes the event envelope.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookEvent, WebhookError> {
        self.verify(payload, signature_header)?;
        WebhookEvent::parse(payload)
    }

    fn compute_signature(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac =
            Hmac::<Sha512>::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes the hex signature for test fixtures.
#[cfg(test)]
pub fn sign_test_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "sk_test_signature_secret";

    // ══════════════════════════════════════════════════════════════
    // Size and Configuration Gates
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn empty_payload_is_rejected() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let result = verifier.verify(b"", Some("aa"));
        assert!(matches!(result, Err(WebhookError::EmptyPayload)));
    }

    #[test]
    fn oversized_payload_is_rejected_before_verification() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let payload = vec![b'x'; MAX_PAYLOAD_BYTES + 1];
        // Even a correct signature must not get the body past the gate
        let signature = sign_test_payload(TEST_SECRET, &payload);

        let result = verifier.verify(&payload, Some(&signature));

        assert!(matches!(
            result,
            Err(WebhookError::PayloadTooLarge(n)) if n == MAX_PAYLOAD_BYTES + 1
        ));
    }

    #[test]
    fn payload_at_the_cap_is_accepted() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let payload = vec![b'x'; MAX_PAYLOAD_BYTES];
        let signature = sign_test_payload(TEST_SECRET, &payload);

        assert!(verifier.verify(&payload, Some(&signature)).is_ok());
    }

    #[test]
    fn unconfigured_secret_is_rejected() {
        let verifier = PaystackWebhookVerifier::new("");
        let result = verifier.verify(b"{}", Some("aa"));
        assert!(matches!(result, Err(WebhookError::SecretUnconfigured)));
    }

    #[test]
    fn missing_or_blank_header_is_rejected() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        assert!(matches!(
            verifier.verify(b"{}", None),
            Err(WebhookError::MissingSignature)
        ));
        assert!(matches!(
            verifier.verify(b"{}", Some("   ")),
            Err(WebhookError::MissingSignature)
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn valid_signature_passes() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let payload = br#"{"event":"charge.success","data":{"id":1}}"#;
        let signature = sign_test_payload(TEST_SECRET, payload);

        assert!(verifier.verify(payload, Some(&signature)).is_ok());
    }

    #[test]
    fn uppercase_hex_signature_passes() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let payload = br#"{"event":"charge.success"}"#;
        let signature = sign_test_payload(TEST_SECRET, payload).to_uppercase();

        assert!(verifier.verify(payload, Some(&signature)).is_ok());
    }

    #[test]
    fn wrong_secret_fails() {
        let verifier = PaystackWebhookVerifier::new("sk_test_other_secret");
        let payload = br#"{"event":"charge.success"}"#;
        let signature = sign_test_payload(TEST_SECRET, payload);

        let result = verifier.verify(payload, Some(&signature));

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn tampered_payload_fails() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let original = br#"{"event":"charge.success","data":{"amount":1000}}"#;
        let tampered = br#"{"event":"charge.success","data":{"amount":9000}}"#;
        let signature = sign_test_payload(TEST_SECRET, original);

        let result = verifier.verify(tampered, Some(&signature));

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn non_hex_header_fails_as_invalid_signature() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let result = verifier.verify(b"{}", Some("not-hex-at-all"));
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn truncated_signature_fails() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let payload = br#"{"event":"charge.success"}"#;
        let mut signature = sign_test_payload(TEST_SECRET, payload);
        signature.truncate(signature.len() - 2);

        let result = verifier.verify(payload, Some(&signature));

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    // ══════════════════════════════════════════════════════════════
    // Verify-and-Parse Flow
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_and_parse_returns_the_event() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let payload = br#"{"event":"invoice.update","data":{"paid":true}}"#;
        let signature = sign_test_payload(TEST_SECRET, payload);

        let event = verifier.verify_and_parse(payload, Some(&signature)).unwrap();

        assert_eq!(event.event, "invoice.update");
        assert_eq!(event.data["paid"], true);
    }

    #[test]
    fn verify_and_parse_rejects_valid_signature_over_bad_json() {
        let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
        let payload = b"signed but not json";
        let signature = sign_test_payload(TEST_SECRET, payload);

        let result = verifier.verify_and_parse(payload, Some(&signature));

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Constant Time Comparison
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn constant_time_compare_equal_values() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
    }

    #[test]
    fn constant_time_compare_different_values() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
    }

    mod signature_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Every body the gateway could send verifies against its own
            /// signature.
            #[test]
            fn any_body_verifies_against_its_own_signature(
                payload in prop::collection::vec(any::<u8>(), 1..512),
            ) {
                let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
                let signature = sign_test_payload(TEST_SECRET, &payload);
                prop_assert!(verifier.verify(&payload, Some(&signature)).is_ok());
            }

            /// Changing any single byte after signing invalidates the
            /// delivery.
            #[test]
            fn any_single_byte_change_fails_verification(
                payload in prop::collection::vec(any::<u8>(), 1..512),
                position in any::<prop::sample::Index>(),
            ) {
                let verifier = PaystackWebhookVerifier::new(TEST_SECRET);
                let signature = sign_test_payload(TEST_SECRET, &payload);

                let mut tampered = payload.clone();
                let at = position.index(tampered.len());
                tampered[at] ^= 0x01;

                prop_assert!(matches!(
                    verifier.verify(&tampered, Some(&signature)),
                    Err(WebhookError::InvalidSignature)
                ));
            }
        }
    }
}
