//! HMAC-SHA256 signature checks for the payment gateway. Comparison is
//! constant-time via `Mac::verify_slice`; a malformed signature is a
//! verification failure, not an error.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn sign(payload: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify the checkout callback signature: HMAC over
/// `"{gateway_order_ref}|{gateway_payment_ref}"` under the API key secret.
pub fn verify_payment_signature(
    gateway_order_ref: &str,
    gateway_payment_ref: &str,
    signature_hex: &str,
    secret: &str,
) -> bool {
    let payload = format!("{gateway_order_ref}|{gateway_payment_ref}");
    verify_hex(payload.as_bytes(), signature_hex, secret)
}

/// Authenticate a webhook delivery: HMAC over the raw request body under the
/// webhook secret. Must pass before any order state is touched.
pub fn verify_webhook_signature(raw_body: &[u8], signature_hex: &str, secret: &str) -> bool {
    verify_hex(raw_body, signature_hex, secret)
}

fn verify_hex(payload: &[u8], signature_hex: &str, secret: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    mac.verify_slice(&sig_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_signature_round_trip() {
        let sig = sign(b"order_123|pay_456", "key-secret");
        assert!(verify_payment_signature("order_123", "pay_456", &sig, "key-secret"));
    }

    #[test]
    fn tampered_signature_rejected() {
        let mut sig = sign(b"order_123|pay_456", "key-secret");
        // Flip the last hex digit.
        let last = sig.pop().unwrap();
        sig.push(if last == '0' { '1' } else { '0' });
        assert!(!verify_payment_signature("order_123", "pay_456", &sig, "key-secret"));
    }

    #[test]
    fn wrong_secret_rejected() {
        let sig = sign(b"order_123|pay_456", "key-secret");
        assert!(!verify_payment_signature("order_123", "pay_456", &sig, "other-secret"));
    }

    #[test]
    fn malformed_hex_rejected_without_panicking() {
        assert!(!verify_payment_signature("order_123", "pay_456", "not-hex!", "key-secret"));
        assert!(!verify_payment_signature("order_123", "pay_456", "", "key-secret"));
    }

    #[test]
    fn webhook_body_signature_verified() {
        let body = br#"{"event":"payment.captured"}"#;
        let sig = sign(body, "webhook-secret");
        assert!(verify_webhook_signature(body, &sig, "webhook-secret"));
        assert!(!verify_webhook_signature(b"{}", &sig, "webhook-secret"));
    }
}
