use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;

use crate::cli::utils::{connect, output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::RoleChange;
use crate::database::PgStore;
use crate::services::UserService;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Give a user the instructor role")]
    Promote {
        #[arg(help = "Email address of the user")]
        email: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Promote { email } => {
            let config = AppConfig::from_env();
            let database = connect(&config)?;
            let users = UserService::new(Arc::new(PgStore::new(database.pool().clone())));

            let outcome = users.promote_to_instructor(&email).await;
            database.close().await;

            match outcome? {
                RoleChange::Updated => output_success(
                    &output_format,
                    &format!("{} is now an instructor", email),
                    Some(json!({ "email": email, "role": "instructor" })),
                ),
                RoleChange::Unchanged => output_success(
                    &output_format,
                    &format!("{} is already an instructor", email),
                    Some(json!({ "email": email, "role": "instructor", "changed": false })),
                ),
                RoleChange::NotFound => {
                    output_error(
                        &output_format,
                        &format!("No user found with email {}", email),
                        Some("not_found"),
                    )?;
                    anyhow::bail!("user not found")
                }
            }
        }
    }
}
