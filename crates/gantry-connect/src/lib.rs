//! App Store Connect API client for Gantry
//!
//! Authenticates with a signed token, wraps the JSON:API resource endpoints
//! behind flat result types, and drives the chunked asset upload flow
//! (reserve, upload parts to pre-signed URLs, commit, poll).
//!
//! ## Usage
//!
//! ```ignore
//! use gantry_connect::{ConnectClient, ConnectConfig};
//!
//! let config = ConnectConfig::from_env()?;
//! let client = ConnectClient::new(config)?;
//! let app = client.find_app_by_bundle_id("com.example.demo").await?;
//! ```
//!
//! ## Transports
//!
//! The client speaks HTTP through a [`transport::HttpTransport`] chosen at
//! construction: the in-process reqwest backend by default, or a `curl`
//! subprocess backend via [`ConnectClient::with_transport`].

pub mod assets;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod jsonapi;
pub mod retry;
pub mod transport;
pub mod upload;

pub mod resources;

pub use assets::{AssetDeliveryState, ReservedAsset};
pub use client::{try_candidates, ConnectClient};
pub use config::{ConnectConfig, RetryPolicy, TlsVerification};
pub use error::{ConnectError, Result};
pub use upload::{UploadHeader, UploadOperation};

pub use resources::*;
