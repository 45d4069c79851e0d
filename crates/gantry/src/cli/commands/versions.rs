//! `gantry versions` - App Store versions and phased release

use anyhow::Result;
use clap::{Args, Subcommand};
use gantry_connect::PhasedReleaseState;
use serde_json::json;

use crate::cli::{output, Cli, OutputFormat};

use super::{block_on, ConnectArgs};

#[derive(Args)]
pub struct VersionsCommand {
    #[command(subcommand)]
    command: VersionsSubcommand,
}

#[derive(Subcommand)]
enum VersionsSubcommand {
    /// List App Store versions for the app
    List {
        #[command(flatten)]
        connect: ConnectArgs,
    },
    /// Create a new App Store version
    Create {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Version string, for example 2.1.0
        #[arg(id = "version_string", value_name = "VERSION")]
        version: String,

        /// Platform
        #[arg(long, default_value = "IOS")]
        platform: String,
    },
    /// Attach a build to a version
    SetBuild {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Version ID
        version_id: String,

        /// Build ID
        build_id: String,
    },
    /// Submit a version for App Review
    Submit {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Version ID
        version_id: String,
    },
    /// Manage the phased release of a version
    PhasedRelease {
        #[command(subcommand)]
        command: PhasedReleaseSubcommand,
    },
}

#[derive(Subcommand)]
enum PhasedReleaseSubcommand {
    /// Show phased release state for a version
    Status {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Version ID
        version_id: String,
    },
    /// Start a phased release on a version
    Start {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Version ID
        version_id: String,
    },
    /// Pause the phased release
    Pause {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Version ID
        version_id: String,
    },
    /// Resume a paused phased release
    Resume {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Version ID
        version_id: String,
    },
    /// Release to all users immediately
    Complete {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Version ID
        version_id: String,
    },
}

impl VersionsCommand {
    pub fn execute(&self, cli: &Cli) -> Result<()> {
        block_on(self.run(cli))
    }

    async fn run(&self, cli: &Cli) -> Result<()> {
        match &self.command {
            VersionsSubcommand::List { connect } => {
                let client = connect.client()?;
                let versions = client.list_versions(connect.require_app_id()?).await?;

                if cli.format == OutputFormat::Json {
                    let rows: Vec<_> = versions
                        .iter()
                        .map(|v| {
                            json!({
                                "id": v.id,
                                "version": v.version_string,
                                "platform": v.platform,
                                "state": v.state,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                    return Ok(());
                }

                output::header(&format!("Versions ({})", versions.len()));
                for version in &versions {
                    output::key_value(
                        &version.version_string,
                        &format!("{} {} ({})", version.platform, version.state, version.id),
                    );
                }
                Ok(())
            }
            VersionsSubcommand::Create {
                connect,
                version,
                platform,
            } => {
                let client = connect.client()?;
                let created = client
                    .create_version(connect.require_app_id()?, platform, version)
                    .await?;
                output::success(&format!(
                    "Created version {} ({})",
                    created.version_string, created.id
                ));
                Ok(())
            }
            VersionsSubcommand::SetBuild {
                connect,
                version_id,
                build_id,
            } => {
                let client = connect.client()?;
                client.set_version_build(version_id, build_id).await?;
                output::success(&format!("Build {build_id} attached to version {version_id}"));
                Ok(())
            }
            VersionsSubcommand::Submit {
                connect,
                version_id,
            } => {
                let client = connect.client()?;
                client.submit_version_for_review(version_id).await?;
                output::success(&format!("Version {version_id} submitted for review"));
                Ok(())
            }
            VersionsSubcommand::PhasedRelease { command } => run_phased(command, cli).await,
        }
    }
}

async fn run_phased(command: &PhasedReleaseSubcommand, cli: &Cli) -> Result<()> {
    match command {
        PhasedReleaseSubcommand::Status {
            connect,
            version_id,
        } => {
            let client = connect.client()?;
            let release = client.find_phased_release(version_id).await?;

            if cli.format == OutputFormat::Json {
                let value = match &release {
                    Some(r) => json!({
                        "id": r.id,
                        "state": r.state.as_str(),
                        "currentDayNumber": r.current_day_number,
                    }),
                    None => json!(null),
                };
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(());
            }

            match release {
                Some(release) => {
                    output::key_value("State", release.state.as_str());
                    if let Some(day) = release.current_day_number {
                        output::key_value("Day", &format!("{day}/7"));
                    }
                }
                None => output::info("No phased release on this version"),
            }
            Ok(())
        }
        PhasedReleaseSubcommand::Start {
            connect,
            version_id,
        } => {
            let client = connect.client()?;
            let release = client
                .create_phased_release(version_id, PhasedReleaseState::Active)
                .await?;
            output::success(&format!("Phased release started ({})", release.id));
            Ok(())
        }
        PhasedReleaseSubcommand::Pause {
            connect,
            version_id,
        } => {
            set_phased_state(connect, version_id, PhasedReleaseState::Paused).await?;
            output::success("Phased release paused");
            Ok(())
        }
        PhasedReleaseSubcommand::Resume {
            connect,
            version_id,
        } => {
            set_phased_state(connect, version_id, PhasedReleaseState::Active).await?;
            output::success("Phased release resumed");
            Ok(())
        }
        PhasedReleaseSubcommand::Complete {
            connect,
            version_id,
        } => {
            set_phased_state(connect, version_id, PhasedReleaseState::Complete).await?;
            output::success("Released to all users");
            Ok(())
        }
    }
}

/// Update the phased release attached to a version, looking it up first.
async fn set_phased_state(
    connect: &ConnectArgs,
    version_id: &str,
    state: PhasedReleaseState,
) -> Result<()> {
    let client = connect.client()?;
    let release = client.find_phased_release(version_id).await?.ok_or_else(|| {
        gantry_connect::ConnectError::Other(format!(
            "version {version_id} has no phased release"
        ))
    })?;
    client.update_phased_release(&release.id, state).await?;
    Ok(())
}
