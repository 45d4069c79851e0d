//! Command implementations

pub mod apps;
pub mod builds;
pub mod reviews;
pub mod screenshots;
pub mod testflight;
pub mod versions;

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use gantry_connect::transport::CurlTransport;
use gantry_connect::{ConnectClient, ConnectConfig, ConnectError, RetryPolicy, TlsVerification};

/// Credentials and transport options shared by every command.
#[derive(Args)]
pub struct ConnectArgs {
    /// API key ID
    #[arg(long, env = "APP_STORE_CONNECT_API_KEY_ID")]
    pub api_key_id: String,

    /// Issuer ID
    #[arg(long, env = "APP_STORE_CONNECT_ISSUER_ID")]
    pub issuer_id: String,

    /// Path to the .p8 private key file, or the PEM contents directly
    #[arg(long, env = "APP_STORE_CONNECT_API_KEY")]
    pub api_key: String,

    /// App Store Connect app ID
    #[arg(long, env = "APP_STORE_CONNECT_APP_ID")]
    pub app_id: Option<String>,

    /// Retry transient failures this many times
    #[arg(long, default_value_t = 0, env = "GANTRY_RETRY_COUNT")]
    pub retries: u32,

    /// Base wait between retries, in seconds
    #[arg(long, default_value_t = 1)]
    pub retry_base_sleep: u64,

    /// Treat an unreachable CRL distribution point as transient
    #[arg(long, env = "GANTRY_TOLERATE_CRL_OUTAGE")]
    pub tolerate_crl_outage: bool,

    /// Disable TLS certificate verification (test environments only)
    #[arg(long)]
    pub insecure: bool,

    /// Use a curl subprocess instead of the built-in HTTP client
    #[arg(long)]
    pub curl: bool,
}

impl ConnectArgs {
    fn config(&self) -> ConnectConfig {
        let tls = if self.insecure {
            TlsVerification::Insecure
        } else if self.tolerate_crl_outage {
            TlsVerification::TolerateCrlOutage
        } else {
            TlsVerification::Strict
        };

        let mut config = ConnectConfig::new(&self.api_key_id, &self.issuer_id, &self.api_key)
            .with_tls(tls)
            .with_retry(RetryPolicy::new(
                self.retries,
                Duration::from_secs(self.retry_base_sleep),
            ));
        if let Some(app_id) = &self.app_id {
            config = config.with_app_id(app_id);
        }
        config
    }

    /// Build the API client from the parsed arguments.
    pub fn client(&self) -> Result<ConnectClient> {
        let config = self.config();
        if self.curl {
            let transport = CurlTransport::new(config.tls).map_err(ConnectError::Transport)?;
            Ok(ConnectClient::with_transport(config, Box::new(transport)))
        } else {
            Ok(ConnectClient::new(config)?)
        }
    }

    /// App id from `--app-id` or the environment, required by most
    /// subcommands.
    pub fn require_app_id(&self) -> Result<&str> {
        self.app_id.as_deref().ok_or_else(|| {
            ConnectError::Configuration(
                "no app id; pass --app-id or set APP_STORE_CONNECT_APP_ID".to_string(),
            )
            .into()
        })
    }
}

/// Run an async command body on a fresh runtime.
pub fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> ConnectArgs {
        #[derive(clap::Parser)]
        struct Wrapper {
            #[command(flatten)]
            connect: ConnectArgs,
        }

        let base = [
            "test",
            "--api-key-id",
            "KEY1",
            "--issuer-id",
            "ISS1",
            "--api-key",
            "key.p8",
        ];
        let argv: Vec<&str> = base.iter().chain(extra.iter()).copied().collect();
        <Wrapper as clap::Parser>::parse_from(argv).connect
    }

    #[test]
    fn insecure_flag_wins_over_crl_tolerance() {
        let config = args(&["--insecure", "--tolerate-crl-outage"]).config();
        assert_eq!(config.tls, TlsVerification::Insecure);
    }

    #[test]
    fn retry_flags_map_to_policy() {
        let config = args(&["--retries", "3", "--retry-base-sleep", "2"]).config();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_sleep, Duration::from_secs(2));
    }

    #[test]
    fn missing_app_id_is_a_config_error() {
        let connect = args(&[]);
        let error = connect.require_app_id().unwrap_err();
        assert!(error.to_string().contains("--app-id"));
    }
}
