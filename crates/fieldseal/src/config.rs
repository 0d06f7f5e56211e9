//! Configuration loading and validation for the fieldseal service.
//!
//! Values come from an optional INI file overlaid with environment
//! variables of the form `FIELDSEAL__<SECTION>__<KEY>`, for example
//! `FIELDSEAL__SECURITY__KS_PWD`. The process exits with a clear error if a
//! required value is missing or invalid.
//!
//! A `ks_pwd` given inline passes through the `config` crate's own buffers
//! and the process environment, neither of which is wiped. Set
//! `ks_pwd_file` instead to read the password straight into a zeroized
//! buffer; an inline `ks_pwd` takes precedence when both are set.
//!
//! ```ini
//! [security]
//! public_key_path = /etc/fieldseal/pubkey.pem
//! private_key_path = /etc/fieldseal/keystore.json
//! ks_pwd = changeit
//! crypto_method = RSA
//! digests_method = MD5
//! signature_method = SHA1withRSA
//!
//! [merchant]
//! partner = acme
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use common::protocol::Strategy;
use serde::Deserialize;

use crate::keys::{KeyError, Password};

/// Validated service configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(alias = "Security")]
    pub security: SecuritySettings,

    #[serde(alias = "Merchant")]
    pub merchant: MerchantSettings,

    #[serde(default, alias = "Server")]
    pub server: ServerSettings,
}

/// How the private key file is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivateKeyFormat {
    /// Password-protected key-store; see [`crate::keys::KeyStore`].
    #[default]
    Keystore,
    /// Unencrypted PKCS#8 PEM.
    Pem,
}

/// `[security]` section: key locations and algorithm labels.
#[derive(Debug, Deserialize)]
pub struct SecuritySettings {
    /// PEM file holding the service's public key. **Required.**
    pub public_key_path: String,

    /// Key-store or PEM file holding the service's private key. **Required.**
    pub private_key_path: String,

    #[serde(default)]
    pub private_key_format: PrivateKeyFormat,

    /// Key-store alias of the private key. Defaults to the partner name.
    #[serde(default)]
    pub ks_alias: Option<String>,

    /// Key-store password. `ks_pwd` or `ks_pwd_file` is required when the
    /// format is `keystore`.
    #[serde(default)]
    pub ks_pwd: Option<Password>,

    /// File holding the key-store password.
    #[serde(default)]
    pub ks_pwd_file: Option<String>,

    #[serde(default = "default_crypto_method")]
    pub crypto_method: String,

    #[serde(default = "default_digests_method")]
    pub digests_method: String,

    #[serde(default = "default_signature_method")]
    pub signature_method: String,
}

/// `[merchant]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MerchantSettings {
    /// Identity of the partner owning this service's keys. **Required.**
    pub partner: String,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP collector endpoint. Traces are exported only when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            log_level: default_log_level(),
            otel_exporter_otlp_endpoint: None,
        }
    }
}

fn default_crypto_method() -> String {
    "RSA".into()
}
fn default_digests_method() -> String {
    "MD5".into()
}
fn default_signature_method() -> String {
    "SHA1withRSA".into()
}
fn default_listen_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "FIELDSEAL";

impl Config {
    /// Load configuration from the INI file at `path` (if any) and the
    /// environment, then validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed, a required value is
    /// absent, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path).format(config::FileFormat::Ini),
            );
        }
        let cfg = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("failed to build configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.security.public_key_path, "security.public_key_path")?;
        ensure_non_empty(&self.security.private_key_path, "security.private_key_path")?;
        ensure_non_empty(&self.merchant.partner, "merchant.partner")?;
        ensure_non_empty(&self.security.crypto_method, "security.crypto_method")?;
        ensure_non_empty(&self.security.digests_method, "security.digests_method")?;
        ensure_non_empty(&self.security.signature_method, "security.signature_method")?;

        if self.security.private_key_format == PrivateKeyFormat::Keystore
            && self.security.ks_pwd.is_none()
            && self.security.ks_pwd_file.is_none()
        {
            anyhow::bail!(
                "security.ks_pwd or security.ks_pwd_file is required when private_key_format = keystore"
            );
        }
        if self.server.listen_port == 0 {
            anyhow::bail!("server.listen_port must be > 0");
        }
        Ok(())
    }

    /// Key-store alias of the private key: `ks_alias`, else the partner name.
    pub fn keystore_alias(&self) -> &str {
        self.security
            .ks_alias
            .as_deref()
            .unwrap_or(&self.merchant.partner)
    }

    /// Move the key-store password out of the configuration, reading
    /// `ks_pwd_file` if no inline password is set. Returns `Ok(None)` on
    /// every call after the first.
    ///
    /// # Errors
    ///
    /// [`KeyError::Io`] if the password file cannot be read.
    pub fn take_keystore_password(&mut self) -> Result<Option<Password>, KeyError> {
        if let Some(password) = self.security.ks_pwd.take() {
            self.security.ks_pwd_file = None;
            return Ok(Some(password));
        }
        self.security
            .ks_pwd_file
            .take()
            .map(|path| Password::from_file(Path::new(&path)))
            .transpose()
    }
}

impl SecuritySettings {
    /// Algorithm labels recorded in every header.
    pub fn strategy(&self) -> Strategy {
        Strategy {
            crypto: self.crypto_method.clone(),
            digest: self.digests_method.clone(),
            signature: self.signature_method.clone(),
        }
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
