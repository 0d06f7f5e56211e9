//! `fieldseal`: field-level RSA sealing of JSON records on a ledger.
//!
//! A record is stored as `{_hdr, _ftr, ...fields}`. Fields named by the
//! record's crypto descriptors are RSA-encrypted for a licensee key; the
//! header carries provenance and the descriptors; the footer is a signed
//! digest of the plaintext. [`translate`] re-seals a record for another
//! licensee without touching the original.

pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod records;
pub mod server;
pub mod telemetry;
pub mod transform;
pub mod translate;
