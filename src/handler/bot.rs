use std::{io, str::FromStr};

use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::{
    configuration::{AppState, State},
    error::Error,
    helpers::{escape_html, format_utc},
    pipeline::Snapshot,
    provider::MessageSender,
    types::Message,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Margin,
    Subscribe,
    Unsubscribe,
    Status,
}

impl FromStr for Command {
    type Err = io::Error;

    /// Parses the first word of a message: `/margin`, `/margin@SomeBot`.
    fn from_str(text: &str) -> Result<Command, Self::Err> {
        let word = text.split_whitespace().next().unwrap_or_default();
        let name = word
            .strip_prefix('/')
            .and_then(|command| command.split('@').next())
            .unwrap_or_default()
            .to_lowercase();

        match name.as_str() {
            "start" | "help" => Ok(Command::Start),
            "margin" => Ok(Command::Margin),
            "subscribe" => Ok(Command::Subscribe),
            "unsubscribe" => Ok(Command::Unsubscribe),
            "status" => Ok(Command::Status),
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("Command not supported: {}", word),
            )),
        }
    }
}

/// Long-polls `getUpdates` and answers every command in its own task.
pub async fn bot_task(app_state: AppState<State>) -> Result<(), Error> {
    tokio::spawn(async move {
        let telegram = match &app_state.telegram {
            Some(telegram) => telegram,
            None => {
                return Err(Error::ConfigurationError(String::from(
                    "TELEGRAM_TOKEN is required by the bot role",
                )));
            },
        };

        let reconnect = Duration::from_secs(app_state.config.reconnect_interval);
        let mut offset = 0;

        info!("Telegram bot started");

        loop {
            match telegram.get_updates(offset).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);

                        if let Some(message) = update.message {
                            let app = app_state.clone();
                            tokio::spawn(async move {
                                handle_message(&app, message).await;
                            });
                        }
                    }
                },
                Err(err) => {
                    error!("getUpdates failed, retrying: {}", err);
                    sleep(reconnect).await;
                },
            }
        }
    })
    .await?
}

async fn handle_message(app_state: &AppState<State>, message: Message) {
    let text = match message.text.as_deref() {
        Some(text) if text.starts_with('/') => text,
        _ => return,
    };

    let command = match Command::from_str(text) {
        Ok(command) => command,
        Err(err) => {
            debug!("{}", err);
            return;
        },
    };

    let chat_id = message.chat.id;
    info!("chat {} sent {:?}", chat_id, command);

    let reply = reply(app_state, command, chat_id).await;

    if let Some(telegram) = &app_state.telegram {
        if let Err(err) = telegram.send_message(chat_id, &reply).await {
            warn!("reply to chat {} failed: {}", chat_id, err);
        }
    }
}

pub async fn reply(app_state: &AppState<State>, command: Command, chat_id: i64) -> String {
    let config = &app_state.config;
    let (hour, minute) = config.daily_report_time;

    match command {
        Command::Start => format!(
            "Hello! I'm the Crypto Borrow/Repay Ratio Bot.\n\
             I track cryptocurrencies with Borrow/Repay Ratio &gt; {}.\n\n\
             /margin - view current data\n\
             /subscribe - subscribe to daily reports\n\
             /unsubscribe - unsubscribe from reports\n\
             /status - bot status",
            config.ratio_threshold
        ),
        Command::Margin => {
            match app_state.chat.latest(config.snapshot_max_age()).await {
                Ok(snapshot) => format_report(&snapshot, config.ratio_threshold),
                Err(err) => {
                    error!("/margin failed: {}", err);
                    String::from(
                        "<pre>Data temporarily unavailable. Please try again later.</pre>",
                    )
                },
            }
        },
        Command::Subscribe => {
            if app_state.subscribers.add(chat_id).await {
                format!(
                    "You've subscribed to daily reports at {:02}:{:02} UTC.",
                    hour, minute
                )
            } else {
                String::from("Could not save your subscription, please try again later.")
            }
        },
        Command::Unsubscribe => {
            if app_state.subscribers.remove(chat_id).await {
                String::from("You've unsubscribed from daily reports.")
            } else {
                String::from("Could not update your subscription, please try again later.")
            }
        },
        Command::Status => {
            let subscribers = app_state.subscribers.count().await;
            let snapshot = match app_state.chat.current().await {
                Some(snapshot) => format!(
                    "{} ({} min ago, {})",
                    format_utc(&snapshot.timestamp),
                    snapshot.age(chrono::Utc::now()).num_minutes(),
                    snapshot.source.as_deref().unwrap_or("unknown")
                ),
                None => String::from("not loaded yet"),
            };

            let mut status = format!(
                "Subscribers: {}\nLast update: {}\nDaily report: {:02}:{:02} UTC",
                subscribers,
                escape_html(&snapshot),
                hour,
                minute
            );

            if let Some(database) = &app_state.database {
                match database.asset_history.count().await {
                    Ok(rows) => status.push_str(&format!("\nHistory rows: {}", rows)),
                    Err(err) => warn!("history count failed: {}", err),
                }
            }

            status
        },
    }
}

/// Fixed-width `<pre>` table sent for `/margin` and the daily report.
pub fn format_report(snapshot: &Snapshot, threshold: f64) -> String {
    let mut body = format!(
        "TOP CRYPTOCURRENCIES WITH B/R RATIO > {}\n\
         ASSET      BOR.D   REP.D     B/R\n\
         -------------------------------\n",
        threshold
    );

    for record in &snapshot.data {
        body.push_str(&format!(
            "{:<10} {:>6.1}M  {:>6.1}M  {:>6.1}\n",
            record.symbol,
            record.borrow_amount / 1e6,
            record.repay_amount / 1e6,
            record.ratio
        ));
    }

    body.push_str(&format!(
        "\nUpdated: {}",
        snapshot.timestamp.format("%Y-%m-%d %H:%M UTC")
    ));

    if snapshot.is_sample() {
        body.push_str("\nSample data, live sources unavailable.");
    }

    format!("<pre>{}</pre>", escape_html(&body))
}
