//! `gantry builds` - build listing and management

use anyhow::Result;
use clap::{Args, Subcommand};
use gantry_connect::{Build, BuildProcessingState};
use serde_json::json;

use crate::cli::{output, Cli, OutputFormat};

use super::{block_on, ConnectArgs};

#[derive(Args)]
pub struct BuildsCommand {
    #[command(subcommand)]
    command: BuildsSubcommand,
}

#[derive(Subcommand)]
enum BuildsSubcommand {
    /// List builds for the app, newest first
    List {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Maximum number of builds to show
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },
    /// Show one build's processing status
    Status {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Build ID
        build_id: String,
    },
    /// Expire a build, removing it from TestFlight
    Expire {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Build ID
        build_id: String,
    },
    /// Record export compliance for a build
    Compliance {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Build ID
        build_id: String,

        /// The build uses non-exempt encryption
        #[arg(long)]
        uses_encryption: bool,
    },
}

impl BuildsCommand {
    pub fn execute(&self, cli: &Cli) -> Result<()> {
        block_on(self.run(cli))
    }

    async fn run(&self, cli: &Cli) -> Result<()> {
        match &self.command {
            BuildsSubcommand::List { connect, limit } => {
                let client = connect.client()?;
                let builds = client
                    .list_builds(connect.require_app_id()?, Some(*limit))
                    .await?;

                if cli.format == OutputFormat::Json {
                    let rows: Vec<_> = builds.iter().map(build_json).collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                    return Ok(());
                }

                output::header(&format!("Builds ({})", builds.len()));
                for build in &builds {
                    let uploaded = build
                        .uploaded_at
                        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    output::key_value(
                        &build.version,
                        &format!("{} uploaded {uploaded}", state_label(build)),
                    );
                }
                Ok(())
            }
            BuildsSubcommand::Status { connect, build_id } => {
                let client = connect.client()?;
                let build = client.get_build(build_id).await?;

                if cli.format == OutputFormat::Json {
                    println!("{}", serde_json::to_string_pretty(&build_json(&build))?);
                    return Ok(());
                }

                output::header(&format!("Build {}", build.version));
                output::key_value("ID", &build.id);
                output::key_value("State", state_label(&build));
                if let Some(expires) = build.expires_at {
                    output::key_value("Expires", &expires.format("%Y-%m-%d").to_string());
                }
                if let Some(encryption) = build.uses_non_exempt_encryption {
                    output::key_value("Non-exempt encryption", &encryption.to_string());
                }
                Ok(())
            }
            BuildsSubcommand::Expire { connect, build_id } => {
                let client = connect.client()?;
                client.expire_build(build_id).await?;
                output::success(&format!("Build {build_id} expired"));
                Ok(())
            }
            BuildsSubcommand::Compliance {
                connect,
                build_id,
                uses_encryption,
            } => {
                let client = connect.client()?;
                client
                    .set_export_compliance(build_id, *uses_encryption)
                    .await?;
                output::success(&format!("Export compliance recorded for build {build_id}"));
                Ok(())
            }
        }
    }
}

fn state_label(build: &Build) -> &'static str {
    if build.expired {
        return "EXPIRED";
    }
    match build.processing_state {
        BuildProcessingState::Processing => "PROCESSING",
        BuildProcessingState::Failed => "FAILED",
        BuildProcessingState::Invalid => "INVALID",
        BuildProcessingState::Valid => "VALID",
    }
}

fn build_json(build: &Build) -> serde_json::Value {
    json!({
        "id": build.id,
        "version": build.version,
        "state": state_label(build),
        "expired": build.expired,
        "uploadedAt": build.uploaded_at.map(|d| d.to_rfc3339()),
        "expiresAt": build.expires_at.map(|d| d.to_rfc3339()),
        "usesNonExemptEncryption": build.uses_non_exempt_encryption,
    })
}
