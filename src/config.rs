//! Configuration manager for accounts.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;
use crate::i18n::Locale;
use crate::password::PasswordPolicy;
use crate::user::BirthYearRange;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_ADDRESS: &str = "0.0.0.0:8888";
const DEFAULT_MEDIA_ROOT: &str = "media";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Domain name of current instance.
    pub url: String,
    /// Socket address to listen on.
    #[serde(skip_serializing)]
    pub address: Option<String>,
    /// Language of user-facing messages.
    #[serde(default)]
    pub language: Locale,
    #[serde(default)]
    pub(crate) version: String,
    #[serde(skip)]
    pub(crate) path: PathBuf,
    /// Accepted birth years, `BIRTH_YEAR_MIN` and `BIRTH_YEAR_MAX`.
    #[serde(default)]
    pub birth_year: BirthYearRange,
    /// Password strength policy.
    #[serde(default, skip_serializing)]
    pub password: PasswordPolicy,
    /// Uploaded files location.
    #[serde(default, skip_serializing)]
    pub media: Media,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
    /// Attempts allowed on login and password recovery.
    #[serde(default, skip_serializing)]
    pub rate_limit: RateLimit,
    /// Password recovery behavior.
    #[serde(default, skip_serializing)]
    pub password_reset: PasswordReset,
    /// Related to OTLP and Prometheus configuration.
    #[serde(skip_serializing)]
    pub telemetry: Option<Telemetry>,
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Argon2 {
    /// Memory used while hashing.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

/// Media storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    /// Root directory of uploaded files.
    pub root: PathBuf,
}

impl Default for Media {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_MEDIA_ROOT),
        }
    }
}

/// Sliding window limit, applied per account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimit {
    /// Attempts allowed within the window.
    pub max_requests: usize,
    /// Window length in seconds.
    pub window: u64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: 60,
        }
    }
}

/// Password recovery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordReset {
    /// Return the OTP secret from `POST /password/forgot`.
    pub expose_otp_secret: bool,
}

impl Default for PasswordReset {
    fn default() -> Self {
        Self {
            expose_otp_secret: true,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Expose Prometheus metrics on `/metrics`.
    #[serde(default)]
    pub prometheus: bool,
    /// OTLP gRPC collector endpoint for traces and logs.
    pub otlp_endpoint: Option<String>,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Address to bind server on.
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(DEFAULT_ADDRESS)
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Override birth year bounds with `BIRTH_YEAR_MIN` and `BIRTH_YEAR_MAX`
    /// environment variables.
    fn apply_env(&mut self) {
        for (key, bound) in [
            ("BIRTH_YEAR_MIN", &mut self.birth_year.min),
            ("BIRTH_YEAR_MAX", &mut self.birth_year.max),
        ] {
            match std::env::var(key).map(|value| value.parse::<i32>()) {
                Ok(Ok(value)) => *bound = value,
                Ok(Err(err)) => {
                    tracing::warn!(%key, error = %err, "ignoring invalid environment variable")
                },
                Err(_) => (),
            }
        }
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let mut config = match File::open(file_path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file) {
                Ok(mut config) => {
                    config.url = self.normalize_url(&config.url)?;
                    config
                },
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        };

        // set app version.
        config.version = VERSION.to_owned();
        config.apply_env();

        if config.birth_year.min >= config.birth_year.max {
            tracing::warn!(
                min = config.birth_year.min,
                max = config.birth_year.max,
                "birth year range is empty, every birth year will be rejected"
            );
        }

        Ok(Arc::new(config))
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or invalid");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}
