//! RSA encryption, decryption, signing and verification over byte strings.
//!
//! **Padding:** PKCS#1 v1.5 for both encryption and signatures, SHA-1 as the
//! signature digest. These match the records already stored in the ledger;
//! changing either breaks every existing ciphertext and footer.
//!
//! Keys are passed as base64(DER): PKIX `SubjectPublicKeyInfo` for public keys,
//! PKCS#8 `PrivateKeyInfo` for private keys.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::{
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    rand_core::OsRng,
    traits::PublicKeyParts,
    Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey,
};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Bytes of PKCS#1 v1.5 encryption padding overhead.
pub const PKCS1_PADDING_LEN: usize = 11;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is not valid base64 or not a valid DER-encoded RSA key.
    #[error("invalid key material: {0}")]
    KeyFormat(String),

    /// The plaintext does not fit in a single RSA block for this key.
    #[error("plaintext of {len} bytes exceeds the {max}-byte limit of this key")]
    PlaintextTooLarge { len: usize, max: usize },

    /// The RSA operation itself failed: bad padding, wrong key, or
    /// malformed ciphertext.
    #[error("rsa operation failed: {0}")]
    Crypto(String),
}

/// Parse a base64(PKIX DER) RSA public key.
///
/// # Errors
///
/// Returns [`CipherError::KeyFormat`] if the base64 or the DER is malformed.
pub fn parse_public_key(public_key_b64: &str) -> Result<RsaPublicKey, CipherError> {
    let der = STANDARD
        .decode(public_key_b64.trim())
        .map_err(|e| CipherError::KeyFormat(format!("public key base64: {e}")))?;
    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| CipherError::KeyFormat(format!("public key DER: {e}")))
}

/// Parse a base64(PKCS#8 DER) RSA private key.
///
/// # Errors
///
/// Returns [`CipherError::KeyFormat`] if the base64 or the DER is malformed.
pub fn parse_private_key(private_key_b64: &str) -> Result<RsaPrivateKey, CipherError> {
    let der = zeroize::Zeroizing::new(
        STANDARD
            .decode(private_key_b64.trim())
            .map_err(|e| CipherError::KeyFormat(format!("private key base64: {e}")))?,
    );
    RsaPrivateKey::from_pkcs8_der(&der)
        .map_err(|e| CipherError::KeyFormat(format!("private key DER: {e}")))
}

/// Largest plaintext, in bytes, that [`encrypt`] accepts for `key`.
pub fn max_plaintext_len(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(PKCS1_PADDING_LEN)
}

/// Encrypt `plaintext` for the holder of `public_key_b64`.
///
/// Output is base64. Each call uses fresh random padding, so encrypting the
/// same plaintext twice gives different ciphertexts.
///
/// # Errors
///
/// Returns [`CipherError::KeyFormat`] for a malformed key and
/// [`CipherError::PlaintextTooLarge`] if `plaintext` is longer than
/// [`max_plaintext_len`].
pub fn encrypt(public_key_b64: &str, plaintext: &[u8]) -> Result<String, CipherError> {
    let key = parse_public_key(public_key_b64)?;
    let max = max_plaintext_len(&key);
    if plaintext.len() > max {
        return Err(CipherError::PlaintextTooLarge {
            len: plaintext.len(),
            max,
        });
    }
    let ciphertext = key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
        .map_err(|e| CipherError::Crypto(e.to_string()))?;
    Ok(STANDARD.encode(ciphertext))
}

/// Decrypt a base64 ciphertext produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CipherError::KeyFormat`] for a malformed key and
/// [`CipherError::Crypto`] for malformed base64, a padding mismatch or a
/// ciphertext made for a different key.
pub fn decrypt(private_key_b64: &str, ciphertext_b64: &str) -> Result<Vec<u8>, CipherError> {
    let key = parse_private_key(private_key_b64)?;
    let ciphertext = STANDARD
        .decode(ciphertext_b64)
        .map_err(|e| CipherError::Crypto(format!("ciphertext base64: {e}")))?;
    key.decrypt(Pkcs1v15Encrypt, &ciphertext)
        .map_err(|e| CipherError::Crypto(e.to_string()))
}

/// Sign SHA-1(`message`) with PKCS#1 v1.5. Returns the signature as base64.
///
/// # Errors
///
/// Returns [`CipherError::KeyFormat`] for a malformed key.
pub fn sign(private_key_b64: &str, message: &[u8]) -> Result<String, CipherError> {
    let key = parse_private_key(private_key_b64)?;
    let hashed = Sha1::digest(message);
    let signature = key
        .sign(Pkcs1v15Sign::new::<Sha1>(), &hashed)
        .map_err(|e| CipherError::Crypto(e.to_string()))?;
    Ok(STANDARD.encode(signature))
}

/// Verify a signature produced by [`sign`].
///
/// A mismatch is a normal outcome and returns `false`, as does a signature
/// that is not valid base64.
///
/// # Errors
///
/// Returns [`CipherError::KeyFormat`] only when the public key is malformed.
pub fn verify(
    public_key_b64: &str,
    message: &[u8],
    signature_b64: &str,
) -> Result<bool, CipherError> {
    let key = parse_public_key(public_key_b64)?;
    let Ok(signature) = STANDARD.decode(signature_b64) else {
        return Ok(false);
    };
    let hashed = Sha1::digest(message);
    Ok(key
        .verify(Pkcs1v15Sign::new::<Sha1>(), &hashed, &signature)
        .is_ok())
}
