//! Command-line entry: picks the role to run, or applies the schema and
//! exits.

use clap::{Parser, Subcommand};

use crate::{
    configuration::{get_configuration, set_configuration, Config},
    error::Error,
    helpers::Role,
    provider::DatabasePool,
};

/// Leverage ratio dashboard and Telegram bot
#[derive(Parser)]
#[command(name = "leverage-watch")]
#[command(about = "Leverage ratio dashboard and Telegram bot", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Serve the dashboard and the JSON API
    Web,

    /// Run the Telegram bot and its daily report
    Bot,

    /// Run the web and bot roles in one process
    All,

    /// Apply the database schema and exit
    Migrate,
}

impl Commands {
    pub fn role(&self) -> Option<Role> {
        match self {
            Commands::Web => Some(Role::Web),
            Commands::Bot => Some(Role::Bot),
            Commands::All => Some(Role::All),
            Commands::Migrate => None,
        }
    }
}

/// Initialize configuration and return Config
pub async fn init_config() -> Result<Config, Error> {
    set_configuration().await?;
    get_configuration()
}

pub async fn run_migrate() -> Result<(), Error> {
    let config = init_config().await?;

    let database_url = config.database_url.ok_or_else(|| {
        Error::ConfigurationError(String::from(
            "DATABASE_URL is required to run migrations",
        ))
    })?;

    let database = DatabasePool::new(&database_url).await?;
    tracing::info!("Running database migrations...");
    database.init_migrations().await?;
    tracing::info!("Migrations complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["leverage-watch", "bot"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Bot));
        assert_eq!(cli.command.and_then(|c| c.role()), Some(Role::Bot));

        let cli = Cli::try_parse_from(["leverage-watch"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["leverage-watch", "migrate"]).unwrap();
        assert_eq!(cli.command.and_then(|c| c.role()), None);

        assert!(Cli::try_parse_from(["leverage-watch", "worker"]).is_err());
    }
}
