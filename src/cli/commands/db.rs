use clap::Subcommand;

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Apply pending schema migrations")]
    Migrate,
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DbCommands::Migrate => {
            let config = AppConfig::from_env();
            let database = connect(&config)?;

            let result = database.migrate().await;
            database.close().await;
            result?;

            output_success(&output_format, "Migrations applied", None)
        }
    }
}
