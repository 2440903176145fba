use tokio::{time, time::Duration};
use tracing::{error, info};

use crate::{
    configuration::{AppState, State},
    error::Error,
    source::PipelineKind,
};

/// Runs the pipelines the current role serves every
/// `REFRESH_INTERVAL_IN_MINUTES`, starting immediately.
pub async fn refresh_task(app_state: AppState<State>) -> Result<(), Error> {
    let interval: u64 = app_state.config.refresh_interval * 60;
    let mut interval = time::interval(Duration::from_secs(interval));

    tokio::spawn(async move {
        loop {
            interval.tick().await;
            refresh(&app_state).await;
        }
    })
    .await?
}

pub async fn refresh(app_state: &AppState<State>) {
    for kind in kinds(app_state) {
        let pipeline = app_state.pipeline(kind);

        match pipeline.run().await {
            Ok(snapshot) => info!(
                "[{}] refreshed {} records from {}",
                pipeline.name(),
                snapshot.data.len(),
                snapshot.source.as_deref().unwrap_or("unknown")
            ),
            Err(err) => error!("[{}] refresh failed: {}", pipeline.name(), err),
        }
    }
}

fn kinds(app_state: &AppState<State>) -> Vec<PipelineKind> {
    let role = app_state
        .config
        .role
        .with_bot_available(app_state.telegram.is_some());
    let mut kinds = vec![];

    if role.runs_web() {
        kinds.push(PipelineKind::Web);
    }

    if role.runs_bot() {
        kinds.push(PipelineKind::Chat);
    }

    kinds
}
