//! Selective field encryption and decryption of JSON documents.
//!
//! Only top-level fields named by a [`CryptoDescriptor`] are touched. Each
//! such field is serialised to JSON, encrypted as a single RSA block and
//! stored as a base64 string. Decryption reverses this and always parses the
//! recovered plaintext as JSON, so a field that held an object before
//! sealing holds the same object afterwards (multi-segment data).
//!
//! # Failure policy
//!
//! Fail-fast. The first field that cannot be transformed aborts the whole
//! call with a [`TransformError::Field`] naming the field and the operation.
//! No partially transformed document is ever returned.

use common::protocol::{CryptoDescriptor, Header, FOOTER_KEY, HEADER_KEY};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::crypto::cipher::{self, CipherError};

/// Which direction a field transform was running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Encrypt,
    Decrypt,
}

impl std::fmt::Display for FieldOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldOp::Encrypt => f.write_str("encrypt"),
            FieldOp::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// Why a single field could not be transformed.
#[derive(Debug, Error)]
pub enum FieldFailure {
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// A sealed field held something other than a base64 string.
    #[error("expected a ciphertext string, found {0}")]
    NotCiphertext(&'static str),

    /// The decrypted plaintext was not valid JSON.
    #[error("decrypted plaintext is not JSON: {0}")]
    NotJson(serde_json::Error),
}

/// Errors produced by the transform engine.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The input is not JSON, or its top level is not an object.
    #[error("{0}")]
    InvalidDocument(String),

    /// The descriptor list is missing or malformed.
    #[error("{0}")]
    Descriptor(String),

    /// A listed field failed to encrypt or decrypt.
    #[error("field `{field}`: {op} failed: {source}")]
    Field {
        field: String,
        op: FieldOp,
        #[source]
        source: FieldFailure,
    },
}

/// Parse `bytes` as a JSON document whose top level is an object.
///
/// # Errors
///
/// Returns [`TransformError::InvalidDocument`] if the bytes are not JSON or
/// the top-level value is not an object.
pub fn parse_document(bytes: &[u8]) -> Result<Map<String, Value>, TransformError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| TransformError::InvalidDocument(format!("not valid JSON: {e}")))?;
    into_object(value)
}

/// Parse the descriptor wire format `[{"level":..,"cryptoFields":[..]}, ..]`.
///
/// # Errors
///
/// Returns [`TransformError::Descriptor`] if the JSON does not match.
pub fn parse_descriptors(json: &str) -> Result<Vec<CryptoDescriptor>, TransformError> {
    let descriptors: Vec<CryptoDescriptor> = serde_json::from_str(json)
        .map_err(|e| TransformError::Descriptor(format!("malformed crypto descriptor: {e}")))?;
    check_descriptors(&descriptors)?;
    Ok(descriptors)
}

/// Reject descriptors that name the reserved `_hdr` or `_ftr` keys. Those
/// are written in clear next to the sealed fields and can never be opened
/// as ciphertext.
///
/// # Errors
///
/// Returns [`TransformError::Descriptor`] naming the reserved field.
pub fn check_descriptors(descriptors: &[CryptoDescriptor]) -> Result<(), TransformError> {
    match field_names(descriptors)
        .into_iter()
        .find(|name| *name == HEADER_KEY || *name == FOOTER_KEY)
    {
        Some(name) => Err(TransformError::Descriptor(format!(
            "`{name}` is reserved and cannot be a crypto field"
        ))),
        None => Ok(()),
    }
}

/// Read the header stored under `_hdr`.
///
/// # Errors
///
/// Returns [`TransformError::Descriptor`] if the header is absent or does
/// not deserialise.
pub fn read_header(doc: &Map<String, Value>) -> Result<Header, TransformError> {
    let raw = doc
        .get(HEADER_KEY)
        .ok_or_else(|| TransformError::Descriptor(format!("document has no `{HEADER_KEY}`")))?;
    Header::deserialize(raw)
        .map_err(|e| TransformError::Descriptor(format!("malformed `{HEADER_KEY}`: {e}")))
}

/// Read only the descriptor list from `_hdr.cryptoDescriptor`.
///
/// Lighter than [`read_header`]: the rest of the header is not validated,
/// which keeps records written with an older header layout readable.
///
/// # Errors
///
/// Returns [`TransformError::Descriptor`] if the header or its descriptor
/// list is absent or malformed.
pub fn descriptors_from_header(
    doc: &Map<String, Value>,
) -> Result<Vec<CryptoDescriptor>, TransformError> {
    let header = doc
        .get(HEADER_KEY)
        .and_then(Value::as_object)
        .ok_or_else(|| TransformError::Descriptor(format!("document has no `{HEADER_KEY}`")))?;
    let raw = header
        .get("cryptoDescriptor")
        .or_else(|| header.get("cryptoDescriptors"))
        .ok_or_else(|| {
            TransformError::Descriptor(format!("`{HEADER_KEY}` has no cryptoDescriptor"))
        })?;
    Vec::<CryptoDescriptor>::deserialize(raw)
        .map_err(|e| TransformError::Descriptor(format!("malformed crypto descriptor: {e}")))
}

/// Encrypt every descriptor field of `document` for `public_key_b64`.
///
/// Fields not named by any descriptor, and named fields absent from the
/// document, are left as they are. With no descriptors the document is
/// returned unchanged.
///
/// # Errors
///
/// [`TransformError::Descriptor`] if a descriptor names a reserved key,
/// [`TransformError::InvalidDocument`] if `document` is not an object,
/// [`TransformError::Field`] on the first field that fails.
pub fn encrypt_fields(
    document: Value,
    descriptors: &[CryptoDescriptor],
    public_key_b64: &str,
) -> Result<Value, TransformError> {
    check_descriptors(descriptors)?;
    let mut doc = into_object(document)?;
    for field in field_names(descriptors) {
        let Some(value) = doc.get_mut(field) else {
            continue;
        };
        debug!(field, "encrypting field");
        let plaintext = value.to_string();
        let ciphertext = cipher::encrypt(public_key_b64, plaintext.as_bytes())
            .map_err(|e| field_error(field, FieldOp::Encrypt, e.into()))?;
        *value = Value::String(ciphertext);
    }
    Ok(Value::Object(doc))
}

/// Decrypt every descriptor field of `document` with `private_key_b64`,
/// replacing each with the JSON value its plaintext encodes.
///
/// # Errors
///
/// [`TransformError::InvalidDocument`] if `document` is not an object,
/// [`TransformError::Field`] on the first field that is not a string, does
/// not decrypt, or does not decrypt to JSON.
pub fn decrypt_fields(
    document: Value,
    descriptors: &[CryptoDescriptor],
    private_key_b64: &str,
) -> Result<Value, TransformError> {
    let mut doc = into_object(document)?;
    for field in field_names(descriptors) {
        let Some(value) = doc.get_mut(field) else {
            continue;
        };
        debug!(field, "decrypting field");
        let ciphertext = match value {
            Value::String(s) => s.as_str(),
            other => {
                return Err(field_error(
                    field,
                    FieldOp::Decrypt,
                    FieldFailure::NotCiphertext(json_kind(other)),
                ))
            }
        };
        let plaintext = cipher::decrypt(private_key_b64, ciphertext)
            .map_err(|e| field_error(field, FieldOp::Decrypt, e.into()))?;
        let parsed: Value = serde_json::from_slice(&plaintext)
            .map_err(|e| field_error(field, FieldOp::Decrypt, FieldFailure::NotJson(e)))?;
        *value = parsed;
    }
    Ok(Value::Object(doc))
}

/// Parse a stored record and decrypt it using the descriptors in its own
/// header.
///
/// # Errors
///
/// Any error of [`parse_document`], [`descriptors_from_header`] or
/// [`decrypt_fields`].
pub fn decrypt_document(bytes: &[u8], private_key_b64: &str) -> Result<Value, TransformError> {
    let doc = parse_document(bytes)?;
    let descriptors = descriptors_from_header(&doc)?;
    decrypt_fields(Value::Object(doc), &descriptors, private_key_b64)
}

/// Field names across all descriptors, in order, each name once.
fn field_names(descriptors: &[CryptoDescriptor]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for name in descriptors.iter().flat_map(|cd| cd.crypto_fields.iter()) {
        if !names.contains(&name.as_str()) {
            names.push(name);
        }
    }
    names
}

fn into_object(value: Value) -> Result<Map<String, Value>, TransformError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(TransformError::InvalidDocument(format!(
            "top-level value must be an object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn field_error(field: &str, op: FieldOp, source: FieldFailure) -> TransformError {
    TransformError::Field {
        field: field.to_owned(),
        op,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::testkeys::{licensee, owner};
    use serde_json::json;

    fn group(fields: &[&str]) -> Vec<CryptoDescriptor> {
        vec![CryptoDescriptor {
            level: "GROUP".into(),
            crypto_fields: fields.iter().map(|f| f.to_string()).collect(),
        }]
    }

    fn sample() -> Value {
        json!({"id": 52235, "indicator": {"id": 10, "code": "YYRB_YSFJ"}, "value": "1001.0"})
    }

    #[test]
    fn indicator_scenario() {
        let kp = owner();
        let cds = parse_descriptors(r#"[{"level":"GROUP","cryptoFields":["indicator"]}]"#).unwrap();

        let sealed = encrypt_fields(sample(), &cds, &kp.public_b64).unwrap();
        assert_eq!(sealed["id"], 52235);
        assert_eq!(sealed["value"], "1001.0");
        assert!(sealed["indicator"].is_string());

        let opened = decrypt_fields(sealed, &cds, &kp.private_b64).unwrap();
        assert_eq!(opened["indicator"], json!({"id": 10, "code": "YYRB_YSFJ"}));
        assert_eq!(opened, sample());
    }

    #[test]
    fn reserved_keys_cannot_be_crypto_fields() {
        let kp = owner();
        for reserved in ["_hdr", "_ftr"] {
            let err = encrypt_fields(json!({"a": 1}), &group(&["a", reserved]), &kp.public_b64)
                .unwrap_err();
            assert!(
                matches!(err, TransformError::Descriptor(ref m) if m.contains(reserved)),
                "{err}"
            );
        }

        let err = parse_descriptors(r#"[{"level":"L","cryptoFields":["_hdr"]}]"#).unwrap_err();
        assert!(matches!(err, TransformError::Descriptor(_)));
    }

    #[test]
    fn empty_descriptors_pass_through() {
        let kp = owner();
        assert_eq!(encrypt_fields(sample(), &[], &kp.public_b64).unwrap(), sample());
        assert_eq!(decrypt_fields(sample(), &[], &kp.private_b64).unwrap(), sample());
    }

    #[test]
    fn unlisted_fields_are_untouched() {
        let kp = owner();
        let doc = json!({"secret": "s", "nested": {"deep": [1, 2, {"x": null}]}, "n": 1.5});
        let sealed = encrypt_fields(doc.clone(), &group(&["secret"]), &kp.public_b64).unwrap();
        assert_eq!(sealed["nested"], doc["nested"]);
        assert_eq!(sealed["n"], doc["n"]);
        assert_ne!(sealed["secret"], doc["secret"]);
    }

    #[test]
    fn scalar_fields_round_trip_with_their_type() {
        let kp = owner();
        let doc = json!({"s": "1001.0", "n": 42, "b": true, "z": null, "a": [1, "two"]});
        let cds = group(&["s", "n", "b", "z", "a"]);
        let sealed = encrypt_fields(doc.clone(), &cds, &kp.public_b64).unwrap();
        for f in ["s", "n", "b", "z", "a"] {
            assert!(sealed[f].is_string(), "{f} should be ciphertext");
        }
        let opened = decrypt_fields(sealed, &cds, &kp.private_b64).unwrap();
        assert_eq!(opened, doc);
    }

    #[test]
    fn missing_field_is_noop() {
        let kp = owner();
        let doc = json!({"name": "Bob"});
        let cds = group(&["ssn"]);
        let sealed = encrypt_fields(doc.clone(), &cds, &kp.public_b64).unwrap();
        assert_eq!(sealed, doc);
        assert_eq!(decrypt_fields(sealed, &cds, &kp.private_b64).unwrap(), doc);
    }

    #[test]
    fn duplicate_field_across_descriptors_is_sealed_once() {
        let kp = owner();
        let cds = vec![
            CryptoDescriptor {
                level: "A".into(),
                crypto_fields: vec!["value".into()],
            },
            CryptoDescriptor {
                level: "B".into(),
                crypto_fields: vec!["value".into(), "indicator".into()],
            },
        ];
        let sealed = encrypt_fields(sample(), &cds, &kp.public_b64).unwrap();
        let opened = decrypt_fields(sealed, &cds, &kp.private_b64).unwrap();
        assert_eq!(opened, sample());
    }

    #[test]
    fn non_object_document_rejected() {
        let kp = owner();
        for doc in [json!([1, 2]), json!("x"), json!(null)] {
            assert!(matches!(
                encrypt_fields(doc.clone(), &[], &kp.public_b64),
                Err(TransformError::InvalidDocument(_))
            ));
            assert!(matches!(
                decrypt_fields(doc, &[], &kp.private_b64),
                Err(TransformError::InvalidDocument(_))
            ));
        }
        assert!(matches!(
            parse_document(b"not json"),
            Err(TransformError::InvalidDocument(_))
        ));
    }

    #[test]
    fn oversized_field_names_the_field() {
        let kp = owner();
        let doc = json!({"blob": "x".repeat(512)});
        match encrypt_fields(doc, &group(&["blob"]), &kp.public_b64) {
            Err(TransformError::Field { field, op, source }) => {
                assert_eq!(field, "blob");
                assert_eq!(op, FieldOp::Encrypt);
                assert!(matches!(
                    source,
                    FieldFailure::Cipher(CipherError::PlaintextTooLarge { .. })
                ));
            }
            other => panic!("expected field error, got {other:?}"),
        }
    }

    #[test]
    fn decrypt_fails_fast_on_first_bad_field() {
        let kp = owner();
        let cds = group(&["a", "b"]);
        let sealed = encrypt_fields(json!({"a": 1, "b": 2}), &cds, &kp.public_b64).unwrap();

        // Field `a` sealed for someone else, field `b` fine.
        let mut tampered = sealed.clone();
        tampered["a"] = Value::String(cipher::encrypt(&licensee().public_b64, b"1").unwrap());

        let err = decrypt_fields(tampered, &cds, &kp.private_b64).unwrap_err();
        match err {
            TransformError::Field { field, op, .. } => {
                assert_eq!(field, "a");
                assert_eq!(op, FieldOp::Decrypt);
            }
            other => panic!("expected field error, got {other:?}"),
        }
    }

    #[test]
    fn decrypt_rejects_non_string_field() {
        let kp = owner();
        let err = decrypt_fields(json!({"a": 5}), &group(&["a"]), &kp.private_b64).unwrap_err();
        assert!(matches!(
            err,
            TransformError::Field {
                source: FieldFailure::NotCiphertext("number"),
                ..
            }
        ));
    }

    #[test]
    fn decrypt_rejects_plaintext_that_is_not_json() {
        let kp = owner();
        // Sealed raw, without JSON encoding.
        let raw = cipher::encrypt(&kp.public_b64, b"YYRB_YSFJ").unwrap();
        let err =
            decrypt_fields(json!({ "code": raw }), &group(&["code"]), &kp.private_b64).unwrap_err();
        assert!(matches!(
            err,
            TransformError::Field {
                source: FieldFailure::NotJson(_),
                ..
            }
        ));
    }

    #[test]
    fn decrypt_document_uses_header_descriptors() {
        let kp = owner();
        let cds = group(&["indicator"]);
        let mut sealed = encrypt_fields(sample(), &cds, &kp.public_b64).unwrap();
        sealed[HEADER_KEY] = json!({ "cryptoDescriptor": cds });

        let bytes = serde_json::to_vec(&sealed).unwrap();
        let opened = decrypt_document(&bytes, &kp.private_b64).unwrap();
        assert_eq!(opened["indicator"], sample()["indicator"]);
    }

    #[test]
    fn missing_header_is_descriptor_error() {
        let doc = parse_document(br#"{"a":1}"#).unwrap();
        assert!(matches!(
            descriptors_from_header(&doc),
            Err(TransformError::Descriptor(_))
        ));
        let bad = parse_document(br#"{"_hdr":{"cryptoDescriptor":"nope"}}"#).unwrap();
        assert!(matches!(
            descriptors_from_header(&bad),
            Err(TransformError::Descriptor(_))
        ));
    }

    #[test]
    fn malformed_descriptor_json_rejected() {
        assert!(matches!(
            parse_descriptors(r#"{"level":"x"}"#),
            Err(TransformError::Descriptor(_))
        ));
    }
}
