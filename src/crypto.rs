//! Cryptogragic logics.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

/// Session tokens are hex-encoded from this many random bytes.
const SESSION_TOKEN_BYTES: usize = 32;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
    #[error("invalid base32 secret")]
    Base32,
    #[error("hmac key is invalid")]
    Hmac,
    #[error("system time is before unix epoch")]
    Time(#[from] std::time::SystemTimeError),
}

/// Cryptographic manager.
pub struct Crypto {
    pub pwd: PasswordManager,
}

impl Crypto {
    /// Create a new [`Crypto`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        Ok(Self {
            pwd: PasswordManager::new(config)?,
        })
    }

    /// Generate an opaque session token.
    pub fn session_token(&self) -> String {
        let mut bytes = [0u8; SESSION_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
pub struct PasswordManager {
    params: Params,
    /// Hash of random bytes, checked when no user matches.
    dummy_hash: String,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        let mut manager = Self {
            params,
            dummy_hash: String::new(),
        };
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        manager.dummy_hash = manager.hash_password(secret)?;

        Ok(manager)
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash password using Argon2id.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_ref(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify password against a PHC string.
    ///
    /// Any malformed hash is treated as a mismatch.
    pub fn verify_password(
        &self,
        password: impl AsRef<[u8]>,
        phc_hash: &str,
    ) -> bool {
        PasswordHash::new(phc_hash)
            .map(|parsed| {
                self.argon2()
                    .verify_password(password.as_ref(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Run a verification bound to fail, so unknown accounts take as long
    /// as known ones.
    pub fn dummy_verify(&self, password: impl AsRef<[u8]>) -> bool {
        self.verify_password(password, &self.dummy_hash)
    }
}
