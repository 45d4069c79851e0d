//! `gantry apps` - app lookup and listing

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;

use crate::cli::{output, Cli, OutputFormat};

use super::{block_on, ConnectArgs};

#[derive(Args)]
pub struct AppsCommand {
    #[command(subcommand)]
    command: AppsSubcommand,
}

#[derive(Subcommand)]
enum AppsSubcommand {
    /// List every app visible to the API key
    List {
        #[command(flatten)]
        connect: ConnectArgs,
    },
    /// Show one app by bundle id or configured app id
    Info {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Look up by bundle id instead of app id
        #[arg(long)]
        bundle_id: Option<String>,
    },
}

impl AppsCommand {
    pub fn execute(&self, cli: &Cli) -> Result<()> {
        block_on(self.run(cli))
    }

    async fn run(&self, cli: &Cli) -> Result<()> {
        match &self.command {
            AppsSubcommand::List { connect } => {
                let client = connect.client()?;
                let apps = client.list_apps().await?;

                if cli.format == OutputFormat::Json {
                    let rows: Vec<_> = apps.iter().map(app_json).collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                    return Ok(());
                }

                output::header(&format!("Apps ({})", apps.len()));
                for app in &apps {
                    output::key_value(&app.bundle_id, &format!("{} ({})", app.name, app.id));
                }
                Ok(())
            }
            AppsSubcommand::Info { connect, bundle_id } => {
                let client = connect.client()?;
                let app = match bundle_id {
                    Some(bundle_id) => client
                        .find_app_by_bundle_id(bundle_id)
                        .await?
                        .ok_or_else(|| {
                            gantry_connect::ConnectError::AppNotFound(bundle_id.clone())
                        })?,
                    None => client.get_app(connect.require_app_id()?).await?,
                };

                if cli.format == OutputFormat::Json {
                    println!("{}", serde_json::to_string_pretty(&app_json(&app))?);
                    return Ok(());
                }

                output::header(&app.name);
                output::key_value("ID", &app.id);
                output::key_value("Bundle ID", &app.bundle_id);
                if let Some(sku) = &app.sku {
                    output::key_value("SKU", sku);
                }
                if let Some(locale) = &app.primary_locale {
                    output::key_value("Primary locale", locale);
                }
                Ok(())
            }
        }
    }
}

fn app_json(app: &gantry_connect::App) -> serde_json::Value {
    json!({
        "id": app.id,
        "name": app.name,
        "bundleId": app.bundle_id,
        "sku": app.sku,
        "primaryLocale": app.primary_locale,
    })
}
