//! `gantry testflight` - beta groups, testers, and beta review

use anyhow::Result;
use clap::{Args, Subcommand};
use gantry_connect::BetaReviewState;
use serde_json::json;

use crate::cli::{output, Cli, OutputFormat};

use super::{block_on, ConnectArgs};

#[derive(Args)]
pub struct TestflightCommand {
    #[command(subcommand)]
    command: TestflightSubcommand,
}

#[derive(Subcommand)]
enum TestflightSubcommand {
    /// Manage beta groups
    Groups {
        #[command(subcommand)]
        command: GroupsSubcommand,
    },
    /// Manage beta testers
    Testers {
        #[command(subcommand)]
        command: TestersSubcommand,
    },
    /// Submit a build for external beta review
    Submit {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Build ID
        build_id: String,

        /// Set the "What's New" text before submitting
        #[arg(long)]
        whats_new: Option<String>,

        /// Locale for the "What's New" text
        #[arg(long, default_value = "en-US")]
        locale: String,
    },
    /// Show the state of a beta review submission
    Status {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Submission ID
        submission_id: String,
    },
}

#[derive(Subcommand)]
enum GroupsSubcommand {
    /// List beta groups for the app
    List {
        #[command(flatten)]
        connect: ConnectArgs,
    },
    /// Create a beta group
    Create {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Group name
        name: String,

        /// Create as an internal group
        #[arg(long)]
        internal: bool,
    },
    /// Delete a beta group
    Delete {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Group ID
        group_id: String,
    },
    /// Add a build to a group
    AddBuild {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Group ID
        group_id: String,

        /// Build ID
        build_id: String,
    },
}

#[derive(Subcommand)]
enum TestersSubcommand {
    /// List testers for the app, or one group with --group-id
    List {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Restrict to one beta group
        #[arg(long)]
        group_id: Option<String>,
    },
    /// Invite a tester into one or more groups
    Invite {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Tester email
        email: String,

        /// Beta group IDs to add the tester to
        #[arg(long, required = true)]
        group_id: Vec<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
    },
    /// Remove a tester from the account
    Remove {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Tester ID
        tester_id: String,
    },
}

impl TestflightCommand {
    pub fn execute(&self, cli: &Cli) -> Result<()> {
        block_on(self.run(cli))
    }

    async fn run(&self, cli: &Cli) -> Result<()> {
        match &self.command {
            TestflightSubcommand::Groups { command } => run_groups(command, cli).await,
            TestflightSubcommand::Testers { command } => run_testers(command, cli).await,
            TestflightSubcommand::Submit {
                connect,
                build_id,
                whats_new,
                locale,
            } => {
                let client = connect.client()?;
                if let Some(text) = whats_new {
                    client.set_whats_new(build_id, locale, text).await?;
                    output::info(&format!("\"What's New\" set for {locale}"));
                }
                let submission = client.submit_for_beta_review(build_id).await?;
                output::success(&format!(
                    "Build submitted for beta review (submission {})",
                    submission.id
                ));
                Ok(())
            }
            TestflightSubcommand::Status {
                connect,
                submission_id,
            } => {
                let client = connect.client()?;
                let submission = client.get_beta_review_status(submission_id).await?;

                if cli.format == OutputFormat::Json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "id": submission.id,
                            "state": review_state_label(submission.state),
                            "submittedAt": submission.submitted_at.map(|d| d.to_rfc3339()),
                        }))?
                    );
                    return Ok(());
                }

                output::key_value("Submission", &submission.id);
                output::key_value("State", review_state_label(submission.state));
                Ok(())
            }
        }
    }
}

async fn run_groups(command: &GroupsSubcommand, cli: &Cli) -> Result<()> {
    match command {
        GroupsSubcommand::List { connect } => {
            let client = connect.client()?;
            let groups = client.list_beta_groups(connect.require_app_id()?).await?;

            if cli.format == OutputFormat::Json {
                let rows: Vec<_> = groups
                    .iter()
                    .map(|g| {
                        json!({
                            "id": g.id,
                            "name": g.name,
                            "internal": g.is_internal,
                            "publicLink": g.public_link,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }

            output::header(&format!("Beta groups ({})", groups.len()));
            for group in &groups {
                let kind = if group.is_internal {
                    "internal"
                } else {
                    "external"
                };
                output::key_value(&group.name, &format!("{kind} ({})", group.id));
            }
            Ok(())
        }
        GroupsSubcommand::Create {
            connect,
            name,
            internal,
        } => {
            let client = connect.client()?;
            let group = client
                .create_beta_group(connect.require_app_id()?, name, *internal)
                .await?;
            output::success(&format!("Created beta group {} ({})", group.name, group.id));
            Ok(())
        }
        GroupsSubcommand::Delete { connect, group_id } => {
            let client = connect.client()?;
            client.delete_beta_group(group_id).await?;
            output::success(&format!("Deleted beta group {group_id}"));
            Ok(())
        }
        GroupsSubcommand::AddBuild {
            connect,
            group_id,
            build_id,
        } => {
            let client = connect.client()?;
            client
                .add_builds_to_group(group_id, &[build_id.as_str()])
                .await?;
            output::success(&format!("Added build {build_id} to group {group_id}"));
            Ok(())
        }
    }
}

async fn run_testers(command: &TestersSubcommand, cli: &Cli) -> Result<()> {
    match command {
        TestersSubcommand::List { connect, group_id } => {
            let client = connect.client()?;
            let testers = client
                .list_beta_testers(connect.require_app_id()?, group_id.as_deref())
                .await?;

            if cli.format == OutputFormat::Json {
                let rows: Vec<_> = testers
                    .iter()
                    .map(|t| {
                        json!({
                            "id": t.id,
                            "email": t.email,
                            "firstName": t.first_name,
                            "lastName": t.last_name,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }

            output::header(&format!("Beta testers ({})", testers.len()));
            for tester in &testers {
                let name = [tester.first_name.as_deref(), tester.last_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ");
                output::key_value(&tester.email, &name);
            }
            Ok(())
        }
        TestersSubcommand::Invite {
            connect,
            email,
            group_id,
            first_name,
            last_name,
        } => {
            let client = connect.client()?;
            let group_ids: Vec<&str> = group_id.iter().map(String::as_str).collect();
            let tester = client
                .invite_beta_tester(
                    email,
                    first_name.as_deref(),
                    last_name.as_deref(),
                    &group_ids,
                )
                .await?;
            output::success(&format!("Invited {} ({})", tester.email, tester.id));
            Ok(())
        }
        TestersSubcommand::Remove { connect, tester_id } => {
            let client = connect.client()?;
            client.remove_beta_tester(tester_id).await?;
            output::success(&format!("Removed tester {tester_id}"));
            Ok(())
        }
    }
}

fn review_state_label(state: BetaReviewState) -> &'static str {
    match state {
        BetaReviewState::WaitingForReview => "WAITING_FOR_REVIEW",
        BetaReviewState::InReview => "IN_REVIEW",
        BetaReviewState::Rejected => "REJECTED",
        BetaReviewState::Approved => "APPROVED",
    }
}
