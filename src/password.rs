//! Password strength policy applied on every password-setting path.

use serde::{Deserialize, Serialize};

use crate::i18n::Message;

/// Minimum zxcvbn score (0 to 4) required by default.
pub const DEFAULT_MIN_SCORE: u8 = 2;
pub const DEFAULT_MIN_LENGTH: usize = 8;

/// Password strength requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Minimum number of characters.
    pub min_length: usize,
    /// Dropbox password strength measurement, disabled if `None`.
    pub min_score: Option<u8>,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            min_score: Some(DEFAULT_MIN_SCORE),
        }
    }
}

impl PasswordPolicy {
    /// Check `password` against every rule.
    ///
    /// `user_inputs` are values the password must not resemble, such as
    /// username or email. Returns all failed rules.
    pub fn check(&self, password: &str, user_inputs: &[&str]) -> Result<(), Vec<Message>> {
        let mut failures = Vec::new();

        if password.chars().count() < self.min_length {
            failures.push(Message::PasswordTooShort {
                min_length: self.min_length,
            });
        }

        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            failures.push(Message::PasswordEntirelyNumeric);
        }

        if let Some(min_score) = self.min_score {
            // An empty password is the only zxcvbn error, already too short.
            let weak = zxcvbn::zxcvbn(password, user_inputs)
                .map(|entropy| entropy.score() < min_score)
                .unwrap_or(true);

            if weak {
                failures.push(Message::PasswordTooWeak);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}
