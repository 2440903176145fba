use actix_web::{get, web, Responder};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::{
    configuration::{AppState, State},
    error::Error,
    pipeline::history::{clamp_days, group_by_day, DailyRanking},
    types::{DataResponse, HistoryResponse, VersionResponse},
};

#[get("/data")]
async fn data(state: web::Data<AppState<State>>) -> Result<impl Responder, Error> {
    let snapshot = state.web.run().await?;
    Ok(web::Json(DataResponse::from(snapshot.as_ref())))
}

/// Older path of `/api/data`, still polled by bot-only deployments.
#[get("/crypto-data")]
async fn crypto_data(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let snapshot = state.web.run().await?;
    Ok(web::Json(DataResponse::from(snapshot.as_ref())))
}

#[get("/history")]
async fn history(
    state: web::Data<AppState<State>>,
    query: web::Query<HistoryQuery>,
) -> Result<impl Responder, Error> {
    let days = clamp_days(query.days, state.config.history_max_days);
    let rankings = daily_rankings(&state, days).await?;

    Ok(web::Json(HistoryResponse {
        days,
        data: rankings,
    }))
}

#[get("/version")]
async fn version() -> Result<impl Responder, Error> {
    Ok(web::Json(VersionResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<i64>,
}

/// Stored rows of the last `days` days, ranked per UTC day. Empty without
/// a database.
pub async fn daily_rankings(
    state: &AppState<State>,
    days: i64,
) -> Result<Vec<DailyRanking>, Error> {
    let database = match &state.database {
        Some(database) => database,
        None => return Ok(vec![]),
    };

    let since = Utc::now() - Duration::days(days);
    let rows = database.asset_history.get_since(since).await?;

    Ok(group_by_day(rows, state.web.policy()))
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};

    use super::*;
    use crate::{configuration::test_config, provider::HTTP};

    async fn state(dir: &std::path::Path) -> AppState<State> {
        let mut config = test_config();
        config.sources = vec![];
        config.web_cache_file = dir.join("web.json");
        config.chat_cache_file = dir.join("chat.json");
        config.subscribers_file = dir.join("subscribers.json");
        let http = HTTP::new(config.clone()).unwrap();
        AppState::new(State::new(config, None, http).await.unwrap())
    }

    #[actix_web::test]
    async fn test_data_route() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(dir.path()).await))
                .service(web::scope("/api").service(data).service(crypto_data)),
        )
        .await;

        for uri in ["/api/data", "/api/crypto-data"] {
            let request = test::TestRequest::get().uri(uri).to_request();
            let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;

            assert_eq!(body["data"].as_array().unwrap().len(), 20);
            assert_eq!(body["source"], "sample:web");
            assert_eq!(body["data"][0]["symbol"], "APE");
            assert_eq!(body["data"][0]["borrow_formatted"], "320.0M");
            assert!(body["timestamp"].as_str().unwrap().ends_with(" UTC"));
        }
    }

    #[actix_web::test]
    async fn test_history_without_database() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(dir.path()).await))
                .service(web::scope("/api").service(history).service(version)),
        )
        .await;

        let request = test::TestRequest::get().uri("/api/history?days=5000").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["days"], 90);
        assert!(body["data"].as_array().unwrap().is_empty());

        let request = test::TestRequest::get().uri("/api/version").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
