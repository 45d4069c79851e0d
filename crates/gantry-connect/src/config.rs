//! Client configuration
//!
//! Configuration is an explicit value handed to [`ConnectClient::new`]; there
//! is no process-wide credential store. [`ConnectConfig::from_env`] covers the
//! common CI case.
//!
//! [`ConnectClient::new`]: crate::client::ConnectClient::new

use std::time::Duration;

use crate::error::{ConnectError, Result};

/// TLS verification mode for the API and upload transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsVerification {
    /// Full chain verification, revocation failures are terminal.
    #[default]
    Strict,
    /// Full verification, but a CRL distribution point that cannot be
    /// reached is treated as a transient fault rather than a hard failure.
    /// A certificate known to be revoked is still rejected.
    TolerateCrlOutage,
    /// No verification. Test environments only.
    Insecure,
}

/// Retry policy for requests and chunk uploads.
///
/// Backoff is linear: the wait before retry attempt `n` is
/// `base_sleep * n` plus up to 100ms of jitter. Uploads are short-lived and
/// bounded by `max_retries`, so there is no exponential growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt. Zero means single-shot.
    pub max_retries: u32,
    /// Base wait unit for linear backoff.
    pub base_sleep: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_sleep: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_sleep: Duration) -> Self {
        Self {
            max_retries,
            base_sleep,
        }
    }
}

/// App Store Connect API configuration
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// API key ID (the `kid` JWT header)
    pub key_id: String,

    /// Issuer ID for the key's team
    pub issuer_id: String,

    /// Path to the .p8 key file, or the PEM contents directly
    pub private_key: String,

    /// Default app ID for commands that operate on a single app
    pub app_id: Option<String>,

    /// TLS verification mode
    pub tls: TlsVerification,

    /// Retry policy applied to requests and chunk uploads
    pub retry: RetryPolicy,
}

impl ConnectConfig {
    /// Create a configuration from explicit credentials.
    pub fn new(
        key_id: impl Into<String>,
        issuer_id: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            issuer_id: issuer_id.into(),
            private_key: private_key.into(),
            app_id: None,
            tls: TlsVerification::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn with_tls(mut self, tls: TlsVerification) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create a configuration from environment variables.
    ///
    /// Reads `APP_STORE_CONNECT_API_KEY_ID`, `APP_STORE_CONNECT_ISSUER_ID`,
    /// `APP_STORE_CONNECT_API_KEY` (PEM contents) or
    /// `APP_STORE_CONNECT_API_KEY_PATH`, and optionally
    /// `APP_STORE_CONNECT_APP_ID`, `GANTRY_SSL_VERIFY`,
    /// `GANTRY_TOLERATE_CRL_OUTAGE`, `GANTRY_RETRY_COUNT`,
    /// `GANTRY_RETRY_BASE_SLEEP` (seconds, fractional allowed).
    pub fn from_env() -> Result<Self> {
        let key_id = require_env("APP_STORE_CONNECT_API_KEY_ID")?;
        let issuer_id = require_env("APP_STORE_CONNECT_ISSUER_ID")?;

        let private_key = std::env::var("APP_STORE_CONNECT_API_KEY")
            .or_else(|_| std::env::var("APP_STORE_CONNECT_API_KEY_PATH"))
            .map_err(|_| {
                ConnectError::Configuration(
                    "APP_STORE_CONNECT_API_KEY or APP_STORE_CONNECT_API_KEY_PATH not set"
                        .to_string(),
                )
            })?;

        let mut config = Self::new(key_id, issuer_id, private_key);
        config.app_id = std::env::var("APP_STORE_CONNECT_APP_ID").ok();

        if env_flag_off("GANTRY_SSL_VERIFY") {
            config.tls = TlsVerification::Insecure;
        } else if env_flag_on("GANTRY_TOLERATE_CRL_OUTAGE") {
            config.tls = TlsVerification::TolerateCrlOutage;
        }

        if let Ok(count) = std::env::var("GANTRY_RETRY_COUNT") {
            config.retry.max_retries = count.parse().map_err(|_| {
                ConnectError::Configuration(format!("GANTRY_RETRY_COUNT is not a number: {count}"))
            })?;
        }
        if let Ok(secs) = std::env::var("GANTRY_RETRY_BASE_SLEEP") {
            let secs: f64 = secs.parse().map_err(|_| {
                ConnectError::Configuration(format!(
                    "GANTRY_RETRY_BASE_SLEEP is not a number: {secs}"
                ))
            })?;
            config.retry.base_sleep = Duration::from_secs_f64(secs);
        }

        Ok(config)
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ConnectError::Configuration(format!("{name} not set")))
}

fn env_flag_on(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn env_flag_off(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("0") | Ok("false") | Ok("no")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_defaults_to_single_shot() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.base_sleep, Duration::from_secs(1));
    }

    #[test]
    fn builder_setters() {
        let config = ConnectConfig::new("KEY", "ISSUER", "pem")
            .with_app_id("12345")
            .with_tls(TlsVerification::TolerateCrlOutage)
            .with_retry(RetryPolicy::new(3, Duration::from_millis(250)));

        assert_eq!(config.app_id.as_deref(), Some("12345"));
        assert_eq!(config.tls, TlsVerification::TolerateCrlOutage);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_sleep, Duration::from_millis(250));
    }
}
