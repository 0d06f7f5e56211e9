//! [`KeyRing`]: the service's own key pair and signing identity.

use std::path::PathBuf;

use common::protocol::Strategy;
use rsa::RsaPublicKey;
use zeroize::Zeroizing;

use super::{
    private_key_b64, public_key_b64, resolve_private_key, resolve_public_key, KeyError,
    PrivateKeySource,
};
use crate::config::{Config, PrivateKeyFormat};

/// Base64 PKCS#8 private key. Overwritten with zeroes when dropped.
pub struct PrivateKeyB64(Zeroizing<String>);

impl PrivateKeyB64 {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKeyB64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("PrivateKeyB64([REDACTED])")
    }
}

/// Keys and identity the service seals, signs and translates with.
///
/// Built once at startup and shared read-only behind an `Arc`.
#[derive(Debug)]
pub struct KeyRing {
    public_key: String,
    private_key: PrivateKeyB64,
    partner: String,
    strategy: Strategy,
}

impl KeyRing {
    /// Build a key ring from base64 DER keys.
    ///
    /// # Errors
    ///
    /// [`KeyError::Format`] if either key is malformed or the public key is
    /// not the counterpart of the private key.
    pub fn new(
        public_key_b64: String,
        private_key_b64: Zeroizing<String>,
        partner: String,
        strategy: Strategy,
    ) -> Result<Self, KeyError> {
        let private = crate::crypto::cipher::parse_private_key(&private_key_b64)
            .map_err(|e| KeyError::Format(e.to_string()))?;
        let public = crate::crypto::cipher::parse_public_key(&public_key_b64)
            .map_err(|e| KeyError::Format(e.to_string()))?;
        if RsaPublicKey::from(&private) != public {
            return Err(KeyError::Format(
                "public key does not belong to the private key".into(),
            ));
        }
        Ok(Self {
            public_key: public_key_b64,
            private_key: PrivateKeyB64(private_key_b64),
            partner,
            strategy,
        })
    }

    /// Resolve both keys named in `cfg` and build the key ring.
    ///
    /// Takes the key-store password out of `cfg`; it is wiped once the
    /// private key has been resolved.
    ///
    /// # Errors
    ///
    /// Any [`KeyError`] from key resolution.
    pub fn load(cfg: &mut Config) -> Result<Self, KeyError> {
        let public = resolve_public_key(&PathBuf::from(&cfg.security.public_key_path))?;

        let private_path = PathBuf::from(&cfg.security.private_key_path);
        let source = match cfg.security.private_key_format {
            PrivateKeyFormat::Pem => PrivateKeySource::Pem(private_path),
            PrivateKeyFormat::Keystore => PrivateKeySource::KeyStore {
                path: private_path,
                alias: cfg.keystore_alias().to_owned(),
                password: cfg
                    .take_keystore_password()?
                    .ok_or_else(|| KeyError::Auth("no key-store password configured".into()))?,
            },
        };
        let private = resolve_private_key(source)?;

        Self::new(
            public_key_b64(&public)?,
            private_key_b64(&private)?,
            cfg.merchant.partner.clone(),
            cfg.security.strategy(),
        )
    }

    /// Base64 PKIX DER of the service's public key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Base64 PKCS#8 DER of the service's private key.
    pub fn private_key(&self) -> &str {
        self.private_key.expose()
    }

    pub fn partner(&self) -> &str {
        &self.partner
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }
}

#[cfg(test)]
pub(crate) fn owner_ring() -> KeyRing {
    let kp = crate::crypto::testkeys::owner();
    KeyRing::new(
        kp.public_b64.clone(),
        Zeroizing::new(kp.private_b64.clone()),
        "acme".into(),
        Strategy::default(),
    )
    .unwrap()
}
