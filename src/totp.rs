//! Time-based one-time passwords used to confirm password recovery.

use std::time::{SystemTime, UNIX_EPOCH};

use base32::Alphabet;
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha1::Sha1;

use crate::crypto::CryptoError;

const ALPHABET: Alphabet = Alphabet::Rfc4648 { padding: false };
const SECRET_LENGTH: usize = 20;
/// Window for code usage, in seconds.
pub const PERIOD: u64 = 30;
/// Number of digits for the code.
pub const DIGITS: u32 = 6;

/// Generate a random base32 secret.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    base32::encode(ALPHABET, &bytes)
}

/// Generates the TOTP code valid at `timestamp` (seconds).
pub fn generate_totp_at(
    secret: &str,
    timestamp: u64,
) -> Result<String, CryptoError> {
    let key = base32::decode(ALPHABET, secret).ok_or(CryptoError::Base32)?;

    let counter_bytes = (timestamp / PERIOD).to_be_bytes();
    let mut mac =
        Hmac::<Sha1>::new_from_slice(&key).map_err(|_| CryptoError::Hmac)?;
    mac.update(&counter_bytes);
    let result = mac.finalize().into_bytes();

    let offset = (result[19] & 0x0f) as usize;
    let binary_code = ((result[offset] as u32 & 0x7f) << 24)
        | ((result[offset + 1] as u32) << 16)
        | ((result[offset + 2] as u32) << 8)
        | (result[offset + 3] as u32);

    Ok(format!(
        "{:0width$}",
        binary_code % 10u32.pow(DIGITS),
        width = DIGITS as usize
    ))
}

/// Generates the current TOTP code.
pub fn generate_totp(secret: &str) -> Result<String, CryptoError> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    generate_totp_at(secret, now)
}

/// Check `code` for the current or previous time step.
pub fn verify(secret: &str, code: &str) -> Result<bool, CryptoError> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    for timestamp in [now, now.saturating_sub(PERIOD)] {
        if generate_totp_at(secret, timestamp)? == code.trim() {
            return Ok(true);
        }
    }

    Ok(false)
}
