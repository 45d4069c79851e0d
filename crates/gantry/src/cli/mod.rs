//! CLI argument parsing and command dispatch

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use commands::{
    apps::AppsCommand, builds::BuildsCommand, reviews::ReviewsCommand,
    screenshots::ScreenshotsCommand, testflight::TestflightCommand, versions::VersionsCommand,
};

#[derive(Parser)]
#[command(name = "gantry")]
#[command(author, version, about = "App Store Connect from the command line")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Machine-readable JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Apps registered in App Store Connect
    Apps(AppsCommand),
    /// Builds uploaded for an app
    Builds(BuildsCommand),
    /// TestFlight groups, testers, and beta review
    Testflight(TestflightCommand),
    /// App Store versions and phased release
    Versions(VersionsCommand),
    /// Screenshot sets and screenshot uploads
    Screenshots(ScreenshotsCommand),
    /// Customer reviews and responses
    Reviews(ReviewsCommand),
}

impl Cli {
    pub fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Apps(cmd) => cmd.execute(self),
            Commands::Builds(cmd) => cmd.execute(self),
            Commands::Testflight(cmd) => cmd.execute(self),
            Commands::Versions(cmd) => cmd.execute(self),
            Commands::Screenshots(cmd) => cmd.execute(self),
            Commands::Reviews(cmd) => cmd.execute(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_format_flag() {
        let cli = Cli::parse_from([
            "gantry",
            "apps",
            "list",
            "--api-key-id",
            "KEY1",
            "--issuer-id",
            "ISS1",
            "--api-key",
            "key.p8",
            "--format",
            "json",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["gantry", "--quiet", "--verbose", "apps", "list"]);
        assert!(result.is_err());
    }
}
