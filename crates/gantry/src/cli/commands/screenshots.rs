//! `gantry screenshots` - screenshot sets and uploads
//!
//! `upload` drives the full asset delivery flow: reserve the slot, upload
//! every byte range, commit with the checksum, and optionally poll until
//! the platform finishes processing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use gantry_connect::{AssetDeliveryState, ConnectError};
use serde_json::json;

use crate::cli::{output, Cli, OutputFormat};

use super::{block_on, ConnectArgs};

#[derive(Args)]
pub struct ScreenshotsCommand {
    #[command(subcommand)]
    command: ScreenshotsSubcommand,
}

#[derive(Subcommand)]
enum ScreenshotsSubcommand {
    /// List screenshot sets for a version localization
    Sets {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Version ID; sets are listed per localization
        version_id: String,
    },
    /// List screenshots in a set with their delivery states
    List {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Screenshot set ID
        set_id: String,
    },
    /// Upload a screenshot file into a set
    Upload {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Screenshot set ID
        set_id: String,

        /// Path to the image file
        file: PathBuf,

        /// Poll until processing finishes
        #[arg(long)]
        wait: bool,

        /// Seconds between polls when waiting
        #[arg(long, default_value_t = 5)]
        poll_interval: u64,

        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 300)]
        poll_timeout: u64,
    },
    /// Delete a screenshot
    Delete {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Screenshot ID
        screenshot_id: String,
    },
}

impl ScreenshotsCommand {
    pub fn execute(&self, cli: &Cli) -> Result<()> {
        block_on(self.run(cli))
    }

    async fn run(&self, cli: &Cli) -> Result<()> {
        match &self.command {
            ScreenshotsSubcommand::Sets {
                connect,
                version_id,
            } => {
                let client = connect.client()?;
                let localizations = client.list_version_localizations(version_id).await?;

                for localization in &localizations {
                    let sets = client.list_screenshot_sets(&localization.id).await?;

                    if cli.format == OutputFormat::Json {
                        let rows: Vec<_> = sets
                            .iter()
                            .map(|s| {
                                json!({
                                    "id": s.id,
                                    "locale": localization.locale,
                                    "displayType": s.display_type,
                                })
                            })
                            .collect();
                        println!("{}", serde_json::to_string_pretty(&rows)?);
                        continue;
                    }

                    output::header(&localization.locale);
                    for set in &sets {
                        output::key_value(&set.display_type, &set.id);
                    }
                }
                Ok(())
            }
            ScreenshotsSubcommand::List { connect, set_id } => {
                let client = connect.client()?;
                let screenshots = client.list_screenshots(set_id).await?;

                if cli.format == OutputFormat::Json {
                    let rows: Vec<_> = screenshots
                        .iter()
                        .map(|s| {
                            json!({
                                "id": s.id,
                                "fileName": s.file_name,
                                "state": format!("{:?}", s.state),
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                    return Ok(());
                }

                output::header(&format!("Screenshots ({})", screenshots.len()));
                for screenshot in &screenshots {
                    output::key_value(&screenshot.file_name, &format!("{:?}", screenshot.state));
                }
                Ok(())
            }
            ScreenshotsSubcommand::Upload {
                connect,
                set_id,
                file,
                wait,
                poll_interval,
                poll_timeout,
            } => {
                let client = connect.client()?;
                let bytes = std::fs::read(file)?;
                let file_name = file_name_of(file)?;

                output::info(&format!(
                    "Uploading {file_name} ({} bytes)",
                    bytes.len()
                ));
                let screenshot_id = client.upload_screenshot(set_id, file_name, &bytes).await?;
                output::success(&format!("Uploaded screenshot {screenshot_id}"));

                if *wait {
                    let state = client
                        .wait_for_asset(
                            "appScreenshots",
                            &screenshot_id,
                            Duration::from_secs(*poll_interval),
                            Duration::from_secs(*poll_timeout),
                        )
                        .await?;
                    match state {
                        AssetDeliveryState::Complete => output::success("Processing complete"),
                        state => output::warning(&format!("Processing ended in {state:?}")),
                    }
                }
                Ok(())
            }
            ScreenshotsSubcommand::Delete {
                connect,
                screenshot_id,
            } => {
                let client = connect.client()?;
                client.delete_screenshot(screenshot_id).await?;
                output::success(&format!("Deleted screenshot {screenshot_id}"));
                Ok(())
            }
        }
    }
}

fn file_name_of(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ConnectError::Other(format!("bad file name: {}", path.display())).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_extraction() {
        assert_eq!(
            file_name_of(Path::new("/tmp/shots/home.png")).unwrap(),
            "home.png"
        );
        assert!(file_name_of(Path::new("/")).is_err());
    }
}
