//! RSA field encryption primitives and the integrity footer.
//!
//! This module is intentionally free of ledger and HTTP dependencies.
//! Every function is a pure transform over its inputs.
//!
//! # Ciphertext format
//!
//! ```text
//! base64(RSA-PKCS1v15(pubkey, plaintext))
//! ```
//!
//! One RSA block per field: the plaintext of a single field is limited to
//! the key size minus 11 bytes.

pub mod cipher;
pub mod footer;

pub use cipher::CipherError;
pub use footer::{build_footer, canonical_payload, verify_footer};

#[cfg(test)]
pub(crate) mod testkeys {
    //! Key pairs shared by the unit tests. Generating RSA keys is slow in
    //! debug builds, so each pair is created once per test binary.

    use std::sync::OnceLock;

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use rsa::{
        pkcs8::{EncodePrivateKey, EncodePublicKey},
        rand_core::OsRng,
        RsaPrivateKey, RsaPublicKey,
    };

    pub struct TestKeyPair {
        pub private: RsaPrivateKey,
        pub public_b64: String,
        pub private_b64: String,
    }

    fn generate() -> TestKeyPair {
        let private = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let public = RsaPublicKey::from(&private);
        let public_b64 = STANDARD.encode(public.to_public_key_der().unwrap().as_bytes());
        let private_b64 = STANDARD.encode(private.to_pkcs8_der().unwrap().as_bytes());
        TestKeyPair {
            private,
            public_b64,
            private_b64,
        }
    }

    pub fn owner() -> &'static TestKeyPair {
        static OWNER: OnceLock<TestKeyPair> = OnceLock::new();
        OWNER.get_or_init(generate)
    }

    pub fn licensee() -> &'static TestKeyPair {
        static LICENSEE: OnceLock<TestKeyPair> = OnceLock::new();
        LICENSEE.get_or_init(generate)
    }
}
