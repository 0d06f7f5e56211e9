//! [`RecordService`]: seal, read, verify and share records on the ledger.

use std::sync::Arc;

use common::protocol::{
    CryptoDescriptor, Footer, Header, QueryRecord, Receipt, FOOTER_KEY, HEADER_KEY,
};
use common::ServiceError;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::crypto::{build_footer, canonical_payload, verify_footer};
use crate::keys::KeyRing;
use crate::ledger::Ledger;
use crate::transform::{
    check_descriptors, decrypt_document, encrypt_fields, parse_descriptors, parse_document,
    read_header,
};

/// Operations over sealed records, bound to one ledger and one key ring.
///
/// Cheap to clone; both halves are shared.
#[derive(Clone)]
pub struct RecordService {
    ledger: Arc<dyn Ledger>,
    keys: Arc<KeyRing>,
}

impl RecordService {
    pub fn new(ledger: Arc<dyn Ledger>, keys: Arc<KeyRing>) -> Self {
        Self { ledger, keys }
    }

    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Seal `value` for the service's own key and store it under `key`.
    ///
    /// The header names the service as both licensee and authorizer, and
    /// `parentKey == key`. The footer signs the canonical plaintext.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Descriptor`] if a descriptor names `_hdr`/`_ftr`;
    /// [`ServiceError::InvalidDocument`] if `value` is not an object or
    /// already carries `_hdr`/`_ftr`; [`ServiceError::Crypto`] if a field
    /// does not encrypt; [`ServiceError::Collaborator`] if the write fails.
    pub fn write(
        &self,
        key: &str,
        value: Value,
        descriptors: &[CryptoDescriptor],
    ) -> Result<Receipt, ServiceError> {
        check_descriptors(descriptors)?;
        let payload = match value {
            Value::Object(map) => map,
            _ => {
                return Err(ServiceError::InvalidDocument(
                    "record value must be a JSON object".into(),
                ))
            }
        };
        for reserved in [HEADER_KEY, FOOTER_KEY] {
            if payload.contains_key(reserved) {
                return Err(ServiceError::InvalidDocument(format!(
                    "`{reserved}` is reserved"
                )));
            }
        }

        let own = self.keys.public_key();
        let header = Header {
            key: key.to_owned(),
            parent_key: key.to_owned(),
            licensee: own.to_owned(),
            authorizer: own.to_owned(),
            strategy: self.keys.strategy().clone(),
            partner: self.keys.partner().to_owned(),
            crypto_descriptors: descriptors.to_vec(),
        };
        let footer = build_footer(self.keys.private_key(), &canonical_payload(&payload))?;
        let sealed = encrypt_fields(Value::Object(payload), descriptors, own)?;

        let transaction_id = self.ledger.put(key, assemble(&header, &footer, sealed)?)?;
        info!(key, tx = %transaction_id, "record written");
        Ok(Receipt { transaction_id })
    }

    /// [`write`](Self::write) from raw JSON text, as submitted by a client
    /// that sends the document and descriptor list as strings.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Descriptor`] if `descriptors` does not parse,
    /// [`ServiceError::InvalidDocument`] if `value` does not, then any error
    /// of [`write`](Self::write).
    pub fn write_json(
        &self,
        key: &str,
        value: &str,
        descriptors: &str,
    ) -> Result<Receipt, ServiceError> {
        let descriptors = parse_descriptors(descriptors)?;
        let doc = parse_document(value.as_bytes())?;
        self.write(key, Value::Object(doc), &descriptors)
    }

    /// Read and open the record under `key`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] if absent, [`ServiceError::Crypto`] if it
    /// does not open with the service key.
    pub fn query(&self, key: &str) -> Result<Value, ServiceError> {
        let stored = self.get(key)?;
        Ok(decrypt_document(&stored, self.keys.private_key())?)
    }

    /// Run `expression` against the ledger and open every match.
    ///
    /// Records the service cannot open, such as copies translated for
    /// another licensee, are returned as stored.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Collaborator`] if the ledger rejects the query.
    pub fn query_by_param(&self, expression: &str) -> Result<Vec<QueryRecord>, ServiceError> {
        let rows = self.ledger.range_query(expression)?;
        debug!(count = rows.len(), "query matched");

        let mut out = Vec::with_capacity(rows.len());
        for (key, stored) in rows {
            let record = match decrypt_document(&stored, self.keys.private_key()) {
                Ok(opened) => opened,
                Err(e) => {
                    warn!(key = %key, error = %e, "returning record unopened");
                    match serde_json::from_slice(&stored) {
                        Ok(raw) => raw,
                        Err(_) => Value::String(String::from_utf8_lossy(&stored).into_owned()),
                    }
                }
            };
            out.push(QueryRecord { key, record });
        }
        Ok(out)
    }

    /// Remove the record under `key`. Removing an absent key succeeds.
    pub fn delete(&self, key: &str) -> Result<Receipt, ServiceError> {
        let transaction_id = self.ledger.delete(key)?;
        info!(key, tx = %transaction_id, "record deleted");
        Ok(Receipt { transaction_id })
    }

    /// Open the record under `key` and check its footer against the header's
    /// authorizer key. A tampered field or forged footer yields `false`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] if absent; [`ServiceError::Crypto`] if it
    /// does not open; [`ServiceError::Descriptor`] if the header or footer is
    /// malformed.
    pub fn verify(&self, key: &str) -> Result<bool, ServiceError> {
        let stored = self.get(key)?;
        let opened = match decrypt_document(&stored, self.keys.private_key())? {
            Value::Object(map) => map,
            _ => return Err(ServiceError::Internal("decrypted record is not an object".into())),
        };
        let header = read_header(&opened)?;
        let footer = opened
            .get(FOOTER_KEY)
            .cloned()
            .ok_or_else(|| ServiceError::Descriptor(format!("record has no `{FOOTER_KEY}`")))
            .and_then(|raw| {
                serde_json::from_value::<Footer>(raw).map_err(|e| {
                    ServiceError::Descriptor(format!("malformed `{FOOTER_KEY}`: {e}"))
                })
            })?;

        let valid = verify_footer(&header.authorizer, &canonical_payload(&opened), &footer)?;
        if !valid {
            warn!(key, "footer does not match record");
        }
        Ok(valid)
    }

    /// See [`crate::translate::translate`].
    pub fn translate(&self, id: &str, pid: &str, licensee: &str) -> Result<Receipt, ServiceError> {
        crate::translate::translate(self.ledger.as_ref(), &self.keys, id, pid, licensee)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ServiceError> {
        self.ledger
            .get(key)?
            .ok_or_else(|| ServiceError::NotFound(key.to_owned()))
    }
}

/// Serialise `{_hdr, _ftr, ...fields}` for storage.
pub(crate) fn assemble(
    header: &Header,
    footer: &Footer,
    fields: Value,
) -> Result<Vec<u8>, ServiceError> {
    let encode = |e: serde_json::Error| ServiceError::Internal(e.to_string());
    let mut record = Map::new();
    record.insert(HEADER_KEY.into(), serde_json::to_value(header).map_err(encode)?);
    record.insert(FOOTER_KEY.into(), serde_json::to_value(footer).map_err(encode)?);
    if let Value::Object(fields) = fields {
        record.extend(fields);
    }
    serde_json::to_vec(&Value::Object(record)).map_err(encode)
}
