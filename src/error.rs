use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use anyhow::Error as ANYHOW_ERROR;
use reqwest::Error as REQWEST_ERROR;
use serde_json::Error as JSON_ERROR;
use sqlx::error::Error as SQL_ERROR;
use std::num::{ParseFloatError, ParseIntError};
use std::{
    env::VarError, io::Error as IO_ERROR,
    str::ParseBoolError as PARSE_BOOL_ERROR,
};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    FLOAT(#[from] ParseFloatError),

    #[error("{0}")]
    SQL(#[from] SQL_ERROR),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("{0}")]
    ParseBoolError(#[from] PARSE_BOOL_ERROR),

    #[error("{0}")]
    AnyHowError(#[from] ANYHOW_ERROR),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream returned no usable records: {0}")]
    UpstreamEmptyPayload(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Subscriber store failure: {0}")]
    SubscriberIOFailure(String),

    #[error("Snapshot is stale: {0}")]
    StaleSnapshot(String),

    #[error("Pipeline {0} has no stages")]
    NoStages(String),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("Server end with error: {0}")]
    ServerError(String),
}

impl From<REQWEST_ERROR> for Error {
    fn from(e: REQWEST_ERROR) -> Self {
        let url = e
            .url()
            .map(|u| format!("{}{}", u.host_str().unwrap_or_default(), u.path()))
            .unwrap_or_default();

        if e.is_timeout() {
            return Error::UpstreamUnavailable(format!("timeout {}", url));
        }

        if let Some(status) = e.status() {
            return Error::UpstreamUnavailable(format!("{} {}", status, url));
        }

        Error::UpstreamUnavailable(e.without_url().to_string())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::INT(_)
            | Error::FLOAT(_)
            | Error::ParseBoolError(_) => StatusCode::BAD_REQUEST,

            Error::UpstreamUnavailable(_)
            | Error::UpstreamEmptyPayload(_)
            | Error::Telegram(_) => StatusCode::BAD_GATEWAY,

            Error::Io(_)
            | Error::URL(_)
            | Error::SQL(_)
            | Error::VAR(_)
            | Error::TokioJoinError(_)
            | Error::JsonError(_)
            | Error::AnyHowError(_)
            | Error::SetGlobalDefaultError(_)
            | Error::ConfigurationError(_)
            | Error::PersistenceFailure(_)
            | Error::SubscriberIOFailure(_)
            | Error::StaleSnapshot(_)
            | Error::NoStages(_)
            | Error::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Unknown"),
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_stages_maps_to_internal_error() {
        let err = Error::NoStages(String::from("web"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Pipeline web has no stages");
    }

    #[test]
    fn test_upstream_errors_map_to_bad_gateway() {
        let err = Error::UpstreamUnavailable(String::from("503 api.coingecko.com"));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = Error::UpstreamEmptyPayload(String::from("coingecko"));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_error_response_body() {
        let err = Error::NoStages(String::from("chat"));
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
