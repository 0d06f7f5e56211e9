//! Re-encryption of an owner-sealed record for a new licensee.
//!
//! Translating `pid → id` reads the source record, opens it with the
//! service's private key, re-signs the plaintext as the service and seals it
//! again for the licensee's public key under a new ledger key. The source
//! record is never modified.
//!
//! Every step that can fail runs before the single ledger write, so a failed
//! translate leaves the ledger untouched. A failed write is returned as-is.
//! The target key must differ from the source key.

use common::protocol::{Header, Receipt, FOOTER_KEY, HEADER_KEY};
use common::ServiceError;
use serde_json::Value;
use tracing::info;

use crate::crypto::{build_footer, canonical_payload, cipher};
use crate::keys::KeyRing;
use crate::ledger::Ledger;
use crate::records::assemble;
use crate::transform::{decrypt_fields, descriptors_from_header, encrypt_fields, parse_document};

/// Re-seal record `pid` for `licensee` (base64 DER public key) as record `id`.
///
/// # Errors
///
/// - [`ServiceError::InvalidDocument`] if `id == pid`.
/// - [`ServiceError::NotFound`] if `pid` does not exist.
/// - [`ServiceError::Descriptor`] if its header carries no descriptors.
/// - [`ServiceError::Crypto`] if a field does not open with the service key.
/// - [`ServiceError::KeyFormat`] if `licensee` is not a public key.
/// - [`ServiceError::Collaborator`] if the ledger read or write fails.
pub fn translate(
    ledger: &dyn Ledger,
    keys: &KeyRing,
    id: &str,
    pid: &str,
    licensee: &str,
) -> Result<Receipt, ServiceError> {
    if id == pid {
        return Err(ServiceError::InvalidDocument(format!(
            "cannot translate `{pid}` onto itself"
        )));
    }

    let stored = ledger
        .get(pid)?
        .ok_or_else(|| ServiceError::NotFound(pid.to_owned()))?;

    let source = parse_document(&stored)?;
    let descriptors = descriptors_from_header(&source)?;

    let mut payload = match decrypt_fields(Value::Object(source), &descriptors, keys.private_key())? {
        Value::Object(map) => map,
        _ => return Err(ServiceError::Internal("decrypted record is not an object".into())),
    };
    // The new record gets its own header and footer.
    payload.remove(HEADER_KEY);
    payload.remove(FOOTER_KEY);

    cipher::parse_public_key(licensee)?;
    let header = Header {
        key: id.to_owned(),
        parent_key: pid.to_owned(),
        licensee: licensee.to_owned(),
        authorizer: keys.public_key().to_owned(),
        strategy: keys.strategy().clone(),
        partner: keys.partner().to_owned(),
        crypto_descriptors: descriptors,
    };

    let footer = build_footer(keys.private_key(), &canonical_payload(&payload))?;

    let sealed = encrypt_fields(Value::Object(payload), &header.crypto_descriptors, licensee)?;
    let record = assemble(&header, &footer, sealed)?;

    let transaction_id = ledger.put(id, record)?;
    info!(id, pid, tx = %transaction_id, "record translated");
    Ok(Receipt { transaction_id })
}
