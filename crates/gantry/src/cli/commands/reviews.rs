//! `gantry reviews` - customer reviews and responses

use anyhow::Result;
use clap::{Args, Subcommand};
use gantry_connect::ReviewFilter;
use serde_json::json;

use crate::cli::{output, Cli, OutputFormat};

use super::{block_on, ConnectArgs};

#[derive(Args)]
pub struct ReviewsCommand {
    #[command(subcommand)]
    command: ReviewsSubcommand,
}

#[derive(Subcommand)]
enum ReviewsSubcommand {
    /// List customer reviews, newest first
    List {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Only reviews with this star rating (1-5)
        #[arg(long)]
        rating: Option<u8>,

        /// Only reviews from this territory, for example USA
        #[arg(long)]
        territory: Option<String>,
    },
    /// Show the developer response on a review
    Response {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Review ID
        review_id: String,
    },
    /// Create or replace the developer response on a review
    Respond {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Review ID
        review_id: String,

        /// Response text
        body: String,
    },
    /// Delete a developer response
    DeleteResponse {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Response ID
        response_id: String,
    },
}

impl ReviewsCommand {
    pub fn execute(&self, cli: &Cli) -> Result<()> {
        block_on(self.run(cli))
    }

    async fn run(&self, cli: &Cli) -> Result<()> {
        match &self.command {
            ReviewsSubcommand::List {
                connect,
                rating,
                territory,
            } => {
                let client = connect.client()?;
                let filter = ReviewFilter {
                    rating: *rating,
                    territory: territory.clone(),
                };
                let reviews = client
                    .list_customer_reviews(connect.require_app_id()?, &filter)
                    .await?;

                if cli.format == OutputFormat::Json {
                    let rows: Vec<_> = reviews
                        .iter()
                        .map(|r| {
                            json!({
                                "id": r.id,
                                "rating": r.rating,
                                "title": r.title,
                                "body": r.body,
                                "reviewer": r.reviewer_nickname,
                                "territory": r.territory,
                                "createdAt": r.created_at.map(|d| d.to_rfc3339()),
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                    return Ok(());
                }

                output::header(&format!("Reviews ({})", reviews.len()));
                for review in &reviews {
                    let stars = "★".repeat(review.rating as usize);
                    let title = review.title.as_deref().unwrap_or("(no title)");
                    output::key_value(&stars, &format!("{title} ({})", review.id));
                    if let Some(body) = &review.body {
                        println!("    {body}");
                    }
                }
                Ok(())
            }
            ReviewsSubcommand::Response { connect, review_id } => {
                let client = connect.client()?;
                match client.find_review_response(review_id).await? {
                    Some(response) => {
                        output::key_value("ID", &response.id);
                        output::key_value("State", &response.state);
                        println!("    {}", response.body);
                    }
                    None => output::info("No response on this review"),
                }
                Ok(())
            }
            ReviewsSubcommand::Respond {
                connect,
                review_id,
                body,
            } => {
                let client = connect.client()?;
                let response = client.respond_to_review(review_id, body).await?;
                output::success(&format!("Response published ({})", response.id));
                Ok(())
            }
            ReviewsSubcommand::DeleteResponse {
                connect,
                response_id,
            } => {
                let client = connect.client()?;
                client.delete_review_response(response_id).await?;
                output::success(&format!("Deleted response {response_id}"));
                Ok(())
            }
        }
    }
}
