//! Payment confirmation signatures
//!
//! The gateway's client-side checkout hands the browser a signature over
//! `order_id|payment_id`. The server recomputes it with the key secret and
//! compares in constant time. The secret never leaves the server.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length
    HmacSha256::new_from_slice(secret).expect("HMAC key length is unrestricted")
}

/// Compute the hex signature for `order_id|payment_id`
///
/// Exposed so tests and the sandbox gateway can produce valid confirmations.
pub fn payment_signature(key_secret: &str, gateway_order_id: &str, payment_id: &str) -> String {
    let mut m = mac(key_secret.as_bytes());
    m.update(gateway_order_id.as_bytes());
    m.update(b"|");
    m.update(payment_id.as_bytes());
    hex::encode(m.finalize().into_bytes())
}

/// Verify a client-reported payment signature
///
/// Constant-time comparison; malformed hex is a mismatch, not an error.
pub fn verify_payment_signature(
    key_secret: &str,
    gateway_order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let mut m = mac(key_secret.as_bytes());
    m.update(gateway_order_id.as_bytes());
    m.update(b"|");
    m.update(payment_id.as_bytes());
    m.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_key_secret";

    #[test]
    fn test_sign_then_verify() {
        let sig = payment_signature(SECRET, "order_abc", "pay_xyz");
        assert!(verify_payment_signature(SECRET, "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn test_signature_is_hex_sha256() {
        let sig = payment_signature(SECRET, "order_abc", "pay_xyz");
        assert_eq!(sig.len(), 64);
        assert!(sig.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_any_mutation_rejected() {
        let sig = payment_signature(SECRET, "order_abc", "pay_xyz");

        // mutated order id
        assert!(!verify_payment_signature(SECRET, "order_abd", "pay_xyz", &sig));
        // mutated payment id
        assert!(!verify_payment_signature(SECRET, "order_abc", "pay_xyy", &sig));
        // wrong secret
        assert!(!verify_payment_signature("other_secret", "order_abc", "pay_xyz", &sig));

        // single-bit mutation of the signature itself
        for i in 0..sig.len() {
            let mut bytes = sig.clone().into_bytes();
            bytes[i] ^= 0x01;
            if let Ok(mutated) = String::from_utf8(bytes) {
                assert!(
                    !verify_payment_signature(SECRET, "order_abc", "pay_xyz", &mutated),
                    "mutated signature at index {i} accepted"
                );
            }
        }
    }

    #[test]
    fn test_separator_is_part_of_the_message() {
        // "a|bc" and "ab|c" must not collide
        let sig = payment_signature(SECRET, "a", "bc");
        assert!(!verify_payment_signature(SECRET, "ab", "c", &sig));
    }

    #[test]
    fn test_malformed_hex_is_a_mismatch() {
        assert!(!verify_payment_signature(SECRET, "order_abc", "pay_xyz", "zz-not-hex"));
        assert!(!verify_payment_signature(SECRET, "order_abc", "pay_xyz", ""));
    }
}
