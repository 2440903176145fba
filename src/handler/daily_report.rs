use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use tokio::time::sleep;
use tracing::{error, info};

use super::bot::format_report;
use crate::{
    configuration::{AppState, State},
    error::Error,
    provider::MessageSender,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sleeps until `DAILY_REPORT_TIME` (UTC) and broadcasts the chat snapshot,
/// once per day.
pub async fn daily_report_task(app_state: AppState<State>) -> Result<(), Error> {
    tokio::spawn(async move {
        let telegram = match &app_state.telegram {
            Some(telegram) => telegram,
            None => {
                return Err(Error::ConfigurationError(String::from(
                    "TELEGRAM_TOKEN is required by the bot role",
                )));
            },
        };

        let (hour, minute) = app_state.config.daily_report_time;

        loop {
            let now = Utc::now();
            let next = next_run(now, hour, minute);
            info!("next daily report at {}", next);

            sleep((next - now).to_std().unwrap_or_default()).await;

            match send_daily_report(&app_state, telegram).await {
                Ok(report) => info!(
                    "daily report sent to {} chats, {} failed",
                    report.sent, report.failed
                ),
                Err(err) => error!("daily report failed: {}", err),
            }
        }
    })
    .await?
}

pub async fn send_daily_report(
    app_state: &AppState<State>,
    sender: &dyn MessageSender,
) -> Result<BroadcastReport, Error> {
    let config = &app_state.config;
    let snapshot = app_state.chat.latest(config.snapshot_max_age()).await?;
    let text = format_report(&snapshot, config.ratio_threshold);
    let chat_ids = app_state.subscribers.load().await;

    let delay = std::time::Duration::from_millis(config.broadcast_delay);
    Ok(broadcast(sender, &chat_ids, &text, delay).await)
}

/// Sends to every chat in order, pausing `delay` between sends. A failed
/// send is logged and counted, the rest still go out.
pub async fn broadcast(
    sender: &dyn MessageSender,
    chat_ids: &[i64],
    text: &str,
    delay: std::time::Duration,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for (index, chat_id) in chat_ids.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            sleep(delay).await;
        }

        match sender.send_message(*chat_id, text).await {
            Ok(()) => report.sent += 1,
            Err(err) => {
                error!("daily report to chat {} failed: {}", chat_id, err);
                report.failed += 1;
            },
        }
    }

    report
}

/// The next `hour:minute` UTC strictly after `now`.
pub fn next_run(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(time));

    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}
