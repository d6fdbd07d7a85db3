use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify the `x-adobe-signature` header against the raw request body.
///
/// The header carries a hex-encoded HMAC-SHA256 digest of the exact bytes
/// received on the wire, keyed with the shared webhook secret. A missing or
/// malformed header fails verification. Callers decide whether verification
/// applies at all (no configured secret means the check is skipped upstream).
pub fn verify_signature(raw_body: &[u8], signature_header: Option<&str>, secret: &str) -> bool {
    let provided = match signature_header {
        Some(value) if !value.is_empty() => value,
        _ => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(raw_body);
    let expected = hex::encode(mac.finalize().into_bytes());

    timing_safe_eq(&expected, provided)
}

/// Compute the hex signature for a body. Used by callers that need to sign
/// outbound test traffic the same way AEM signs inbound events.
pub fn compute_signature(raw_body: &[u8], secret: &str) -> crate::utils::error::Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(raw_body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut out = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        out |= x ^ y;
    }
    out == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_safe_eq() {
        assert!(timing_safe_eq("abc", "abc"));
        assert!(!timing_safe_eq("abc", "abd"));
        assert!(!timing_safe_eq("abc", "ab"));
        assert!(!timing_safe_eq("ab", "abc"));
        assert!(timing_safe_eq("", ""));
    }

    #[test]
    fn test_verify_signature_roundtrip() {
        let body = br#"{"event_type":"com.adobe.aem.assets.updated"}"#;
        let secret = "webhook-secret";
        let signature = compute_signature(body, secret).unwrap();

        assert!(verify_signature(body, Some(&signature), secret));
        assert!(!verify_signature(body, Some("deadbeef"), secret));
        assert!(!verify_signature(body, None, secret));
        assert!(!verify_signature(b"tampered", Some(&signature), secret));
    }
}
