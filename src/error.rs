use std::io;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors raised while loading the readings file. Any of them aborts the load.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset file '{}' could not be opened: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: missing temperature value")]
    MissingValue { line: u64 },

    #[error("line {line}: '{value}' is not an integer temperature")]
    InvalidReading { line: u64, value: String },

    #[error("dataset contains no readings")]
    Empty,
}

/// Errors returned to callers of the station. They never reach the tree itself.
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("invalid day {day}: expected a day between 0 and {}", days.saturating_sub(1))]
    InvalidDay { day: usize, days: usize },

    #[error(
        "invalid date range {start}-{end}: expected 0 <= start <= end <= {}",
        days.saturating_sub(1)
    )]
    InvalidRange { start: usize, end: usize, days: usize },

    #[error("weather station is not available")]
    StationUnavailable,
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = match &self {
            RequestError::StationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
