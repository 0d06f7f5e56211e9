//! Digest and signature footer attached to every sealed record.
//!
//! The digest is hex MD5 of the canonical plaintext and serves only as a
//! change fingerprint. Tamper evidence comes from the RSA signature over the
//! digest; never compare digests alone to decide whether a record is genuine.

use common::protocol::{Footer, FOOTER_KEY, HEADER_KEY};
use md5::{Digest, Md5};
use serde_json::{Map, Value};

use super::cipher::{self, CipherError};

/// Canonical serialisation of a document's payload.
///
/// Drops the reserved `_hdr` and `_ftr` keys and serialises the rest with
/// keys in sorted order, so the same payload always yields the same bytes.
pub fn canonical_payload(doc: &Map<String, Value>) -> String {
    let payload: Map<String, Value> = doc
        .iter()
        .filter(|(k, _)| k.as_str() != HEADER_KEY && k.as_str() != FOOTER_KEY)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(payload).to_string()
}

/// Hex MD5 of `canonical`.
pub fn digest(canonical: &str) -> String {
    hex::encode(Md5::digest(canonical.as_bytes()))
}

/// Compute the digest of `canonical` and sign it with `private_key_b64`.
///
/// # Errors
///
/// Returns [`CipherError::KeyFormat`] if the private key is malformed.
pub fn build_footer(private_key_b64: &str, canonical: &str) -> Result<Footer, CipherError> {
    let digest = digest(canonical);
    let signature = cipher::sign(private_key_b64, digest.as_bytes())?;
    Ok(Footer { digest, signature })
}

/// Check `footer` against `canonical`: the digest must match and the
/// signature must verify under `public_key_b64`.
///
/// # Errors
///
/// Returns [`CipherError::KeyFormat`] if the public key is malformed.
pub fn verify_footer(
    public_key_b64: &str,
    canonical: &str,
    footer: &Footer,
) -> Result<bool, CipherError> {
    if digest(canonical) != footer.digest {
        return Ok(false);
    }
    cipher::verify(public_key_b64, footer.digest.as_bytes(), &footer.signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::testkeys::{licensee, owner};
    use serde_json::json;

    fn as_map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn digest_is_hex_md5() {
        assert_eq!(digest(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(digest("helloworld"), "fc5e038d38a57032085441e7fe7010b0");
    }

    #[test]
    fn canonical_payload_excludes_reserved_keys_and_sorts() {
        let doc = as_map(json!({
            "value": "1001.0",
            "_hdr": {"key": "k"},
            "id": 52235,
            "_ftr": {"digest": "d", "signature": "s"}
        }));
        assert_eq!(canonical_payload(&doc), r#"{"id":52235,"value":"1001.0"}"#);
    }

    #[test]
    fn footer_verifies_against_same_payload() {
        let kp = owner();
        let footer = build_footer(&kp.private_b64, r#"{"a":1}"#).unwrap();
        assert_eq!(footer.digest.len(), 32);
        assert!(verify_footer(&kp.public_b64, r#"{"a":1}"#, &footer).unwrap());
    }

    #[test]
    fn footer_rejects_changed_payload() {
        let kp = owner();
        let footer = build_footer(&kp.private_b64, r#"{"a":1}"#).unwrap();
        assert!(!verify_footer(&kp.public_b64, r#"{"a":2}"#, &footer).unwrap());
    }

    #[test]
    fn footer_rejects_forged_digest() {
        let kp = owner();
        let mut footer = build_footer(&kp.private_b64, r#"{"a":1}"#).unwrap();
        // Attacker recomputes the digest for new content but cannot re-sign.
        footer.digest = digest(r#"{"a":2}"#);
        assert!(!verify_footer(&kp.public_b64, r#"{"a":2}"#, &footer).unwrap());
    }

    #[test]
    fn footer_rejects_other_signer() {
        let footer = build_footer(&licensee().private_b64, "payload").unwrap();
        assert!(!verify_footer(&owner().public_b64, "payload", &footer).unwrap());
    }
}
