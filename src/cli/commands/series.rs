use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::state::AppState;

#[derive(Subcommand)]
pub enum SeriesCommands {
    #[command(about = "Email an announcement to every subscriber of a series")]
    Notify {
        #[arg(help = "Series id")]
        id: String,
        #[arg(long, help = "Announcement title")]
        title: String,
        #[arg(long, help = "Announcement body")]
        message: String,
    },
}

pub async fn handle(cmd: SeriesCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SeriesCommands::Notify { id, title, message } => {
            let config = AppConfig::from_env();
            let database = connect(&config)?;
            let state = AppState::from_config(config, database.clone())
                .context("Failed to configure the mailer")?;

            let report = state.series.notify_as_admin(&id, &title, &message).await;
            database.close().await;
            let report = report?;

            output_success(
                &output_format,
                &format!("Announcement sent to {} subscribers", report.recipient_count),
                Some(json!({
                    "recipient_count": report.recipient_count,
                    "message_ids": report.message_ids
                })),
            )
        }
    }
}
