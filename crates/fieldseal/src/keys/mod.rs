//! Key material provider: resolves RSA keys from PEM files or from a
//! password-protected [`KeyStore`], and holds the process key ring.
//!
//! # Lifecycle
//!
//! 1. At startup, [`KeyRing::load`] resolves the service's public key (PEM)
//!    and private key (key-store entry or PEM) named in the configuration.
//! 2. Both keys are re-encoded as base64 DER and held in the [`KeyRing`],
//!    which is read-only for the lifetime of the process and shared by `Arc`.
//! 3. Every sealing operation borrows the key ring explicitly; there is no
//!    global key table.
//!
//! # Security invariants
//!
//! - Key-store passwords live only in a [`Password`], which is not `Clone`
//!   and overwrites its buffer when dropped. [`resolve_private_key`] consumes
//!   its source, so the password is wiped on every return path.
//! - Private key material is never logged; `Debug` output is redacted.

pub mod keystore;
pub mod ring;

pub use keystore::KeyStore;
pub use ring::KeyRing;

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

/// PEM label of a PKIX public key.
pub const PUBLIC_KEY_TAG: &str = "PUBLIC KEY";

/// PEM label of an unencrypted PKCS#8 private key.
pub const PRIVATE_KEY_TAG: &str = "PRIVATE KEY";

/// Errors produced while resolving key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The alias has no entry in the key-store.
    #[error("no key-store entry for alias `{0}`")]
    NotFound(String),

    /// Wrong PEM label, undecodable PEM/DER/base64, or a corrupt key-store.
    #[error("{0}")]
    Format(String),

    /// The key-store password was rejected.
    #[error("{0}")]
    Auth(String),

    /// The key file could not be read or written.
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A key-store password.
///
/// The bytes are overwritten with zeroes when the value is dropped. The type
/// is deliberately not `Clone`: whoever holds it is the only holder.
pub struct Password(Zeroizing<Vec<u8>>);

impl Password {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Read a password from `path`, dropping trailing line breaks. The file
    /// contents go straight into the zeroized buffer.
    ///
    /// # Errors
    ///
    /// [`KeyError::Io`] if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self, KeyError> {
        let mut bytes = Zeroizing::new(std::fs::read(path).map_err(|source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        })?);
        while matches!(bytes.last(), Some(b'\n' | b'\r')) {
            bytes.pop();
        }
        Ok(Self(bytes))
    }
}

impl From<String> for Password {
    /// Takes over the string's buffer without copying it.
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Password::from)
    }
}

/// Where the service's private key comes from.
#[derive(Debug)]
pub enum PrivateKeySource {
    /// Unencrypted PKCS#8 PEM file labelled `PRIVATE KEY`.
    Pem(PathBuf),
    /// Entry `alias` of the key-store at `path`, unlocked with `password`.
    KeyStore {
        path: PathBuf,
        alias: String,
        password: Password,
    },
}

/// Resolve a public key from a PEM file labelled `PUBLIC KEY`.
///
/// # Errors
///
/// [`KeyError::Io`] if the file cannot be read, [`KeyError::Format`] if the
/// PEM label is wrong or the DER is not a PKIX RSA public key.
pub fn resolve_public_key(path: &Path) -> Result<RsaPublicKey, KeyError> {
    let der = read_pem(path, PUBLIC_KEY_TAG)?;
    let key = RsaPublicKey::from_public_key_der(&der).map_err(|e| {
        KeyError::Format(format!("{}: not an RSA public key: {e}", path.display()))
    })?;
    debug!(path = %path.display(), "public key resolved");
    Ok(key)
}

/// Resolve the private key described by `source`.
///
/// The source is consumed so that any password it carries is wiped before
/// this function returns, whatever the outcome.
///
/// # Errors
///
/// [`KeyError::Io`], [`KeyError::Format`], [`KeyError::NotFound`] (alias
/// absent) or [`KeyError::Auth`] (wrong password).
pub fn resolve_private_key(source: PrivateKeySource) -> Result<RsaPrivateKey, KeyError> {
    match source {
        PrivateKeySource::Pem(path) => {
            let der = read_pem(&path, PRIVATE_KEY_TAG)?;
            let key = RsaPrivateKey::from_pkcs8_der(&der).map_err(|e| {
                KeyError::Format(format!("{}: not a PKCS#8 RSA key: {e}", path.display()))
            })?;
            debug!(path = %path.display(), "private key resolved from PEM");
            Ok(key)
        }
        PrivateKeySource::KeyStore {
            path,
            alias,
            password,
        } => {
            let store = KeyStore::open(&path)?;
            let key = store.private_key(&alias, &password)?;
            debug!(path = %path.display(), alias = %alias, "private key resolved from key-store");
            Ok(key)
        }
    }
}

/// Encode a public key as base64 PKIX DER.
///
/// # Errors
///
/// [`KeyError::Format`] if the key cannot be DER-encoded.
pub fn public_key_b64(key: &RsaPublicKey) -> Result<String, KeyError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| KeyError::Format(format!("cannot encode public key: {e}")))?;
    Ok(STANDARD.encode(der.as_bytes()))
}

/// Encode a private key as base64 PKCS#8 DER. The result is wiped on drop.
///
/// # Errors
///
/// [`KeyError::Format`] if the key cannot be DER-encoded.
pub fn private_key_b64(key: &RsaPrivateKey) -> Result<Zeroizing<String>, KeyError> {
    let der = key
        .to_pkcs8_der()
        .map_err(|e| KeyError::Format(format!("cannot encode private key: {e}")))?;
    Ok(Zeroizing::new(STANDARD.encode(der.as_bytes())))
}

/// Read a single-block PEM file and return its DER contents, checking the
/// label.
fn read_pem(path: &Path, expected_tag: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let raw = Zeroizing::new(std::fs::read(path).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })?);
    let block = pem::parse(raw.as_slice())
        .map_err(|e| KeyError::Format(format!("{}: invalid PEM: {e}", path.display())))?;
    if block.tag() != expected_tag {
        return Err(KeyError::Format(format!(
            "{}: expected a `{expected_tag}` PEM block, found `{}`",
            path.display(),
            block.tag()
        )));
    }
    Ok(Zeroizing::new(block.into_contents()))
}
