//! Wire types for sealed records and the HTTP API.
//!
//! A sealed record is a JSON object stored in the ledger:
//!
//! ```text
//! {"_hdr": Header, "_ftr": Footer, "<field>": <value or base64 ciphertext>, ...}
//! ```
//!
//! Field names in camelCase match the records already written by earlier
//! deployments; the aliases accept the spelled-out variants on read.

use serde::{Deserialize, Serialize};

/// Reserved document key holding the [`Header`].
pub const HEADER_KEY: &str = "_hdr";

/// Reserved document key holding the [`Footer`].
pub const FOOTER_KEY: &str = "_ftr";

// ---------------------------------------------------------------------------
// Record metadata
// ---------------------------------------------------------------------------

/// Declares which top-level fields of a document are encrypted.
///
/// `level` is a free-form grouping label and is not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoDescriptor {
    pub level: String,
    pub crypto_fields: Vec<String>,
}

/// Algorithm names recorded alongside every sealed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(rename = "cryptoMethod", alias = "crypto")]
    pub crypto: String,
    #[serde(rename = "digestsMethod", alias = "digest")]
    pub digest: String,
    #[serde(rename = "signatureMethod", alias = "signature")]
    pub signature: String,
}

impl Default for Strategy {
    fn default() -> Self {
        Self {
            crypto: "RSA".into(),
            digest: "MD5".into(),
            signature: "SHA1withRSA".into(),
        }
    }
}

/// Provenance and policy metadata. Stored in clear under [`HEADER_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Ledger key of this record.
    pub key: String,
    /// Ledger key of the record this one was derived from; equals `key` for
    /// originals.
    pub parent_key: String,
    /// Base64 DER public key the fields are encrypted for.
    pub licensee: String,
    /// Base64 DER public key of the party that signed the footer.
    pub authorizer: String,
    pub strategy: Strategy,
    /// Identity of the owning partner.
    pub partner: String,
    #[serde(rename = "cryptoDescriptor", alias = "cryptoDescriptors")]
    pub crypto_descriptors: Vec<CryptoDescriptor>,
}

/// Integrity proof over the canonical plaintext of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    /// Hex MD5 of the canonical plaintext. A change fingerprint only.
    #[serde(alias = "digests")]
    pub digest: String,
    /// Base64 SHA1withRSA signature over `digest`.
    pub signature: String,
}

/// Returned by every ledger-writing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_id: String,
}

/// One entry of a query-by-parameter result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryRecord {
    pub key: String,
    pub record: serde_json::Value,
}

// ---------------------------------------------------------------------------
// HTTP bodies
// ---------------------------------------------------------------------------

/// Request body for `PUT /records/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Plaintext JSON object to seal.
    pub value: serde_json::Value,
    /// Which fields of `value` to encrypt.
    #[serde(default)]
    pub descriptors: Vec<CryptoDescriptor>,
}

/// Request body for `POST /records/{id}/translate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    /// Key of the source record.
    pub pid: String,
    /// Base64 DER public key of the new licensee.
    pub licensee: String,
}

/// Request body for `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Ledger query expression, passed to the ledger unchanged.
    pub query: String,
}

/// Response body for `GET /records/{key}/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"descriptor_error"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Identity of the partner whose keys are loaded.
    pub partner: String,
}
