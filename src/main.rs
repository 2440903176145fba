use clap::Parser;
use tracing::{error, info, warn, Level};

use leverage_watch::{
    cli::{init_config, run_migrate, Cli, Commands},
    configuration::{AppState, Config, State},
    error::Error,
    handler::{bot, daily_report, refresh},
    provider::{DatabasePool, HTTP},
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level({
            #[cfg(debug_assertions)]
            {
                Level::DEBUG
            }

            #[cfg(not(debug_assertions))]
            {
                Level::INFO
            }
        })
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    if let Some(Commands::Migrate) = cli.command {
        return run_migrate().await;
    }

    let mut config = match init_config().await {
        Ok(config) => config,
        Err(e) => return Err(Error::ConfigurationError(e.to_string())),
    };

    if let Some(role) = cli.command.and_then(|command| command.role()) {
        config.role = role;
    }

    let app_state = AppState::new(init(config).await?);
    let configured = app_state.config.role;
    let role = configured.with_bot_available(app_state.telegram.is_some());

    if role != configured {
        warn!("TELEGRAM_TOKEN not set, running as {} instead of {}", role, configured);
    }

    info!("starting as {}", role);

    match (role.runs_web(), role.runs_bot()) {
        (true, true) => {
            tokio::try_join!(
                server::server_task(&app_state),
                refresh::refresh_task(app_state.clone()),
                bot::bot_task(app_state.clone()),
                daily_report::daily_report_task(app_state.clone()),
            )?;
        },
        (true, false) => {
            tokio::try_join!(
                server::server_task(&app_state),
                refresh::refresh_task(app_state.clone()),
            )?;
        },
        _ => {
            tokio::try_join!(
                refresh::refresh_task(app_state.clone()),
                bot::bot_task(app_state.clone()),
                daily_report::daily_report_task(app_state.clone()),
            )?;
        },
    }

    Ok(())
}

async fn init(config: Config) -> Result<State, Error> {
    let database = match &config.database_url {
        Some(url) => Some(DatabasePool::new(url).await?),
        None => {
            info!("DATABASE_URL not set, running without the store");
            None
        },
    };

    let http = HTTP::new(config.clone())?;
    State::new(config, database, http).await
}
