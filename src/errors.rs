use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use http::StatusCode;
use thiserror::Error;

use crate::external::cost_provider::CostProviderError;
use crate::models::JobStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found")]
    NotFound,
    #[error("External error: {0}")]
    External(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Job {job_id} cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        job_id: i64,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("Job timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unknown job type: {0}")]
    UnknownJobType(String),
    #[error("Export error: {0}")]
    Export(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::UnknownJobType(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            AppError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, self.to_string()).into_response()
            }
            AppError::External(msg) => {
                let mut headers = HeaderMap::new();
                headers.insert("Retry-After", HeaderValue::from_static("60"));
                (StatusCode::BAD_GATEWAY, headers, msg).into_response()
            }
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.to_string()).into_response(),
            AppError::Db(_)
            | AppError::Migration(_)
            | AppError::Serialization(_)
            | AppError::Export(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Serialization(value.to_string())
    }
}

impl From<CostProviderError> for AppError {
    fn from(value: CostProviderError) -> Self {
        AppError::External(value.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        AppError::Export(value.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Export(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Validation("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::External("upstream".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        let transition = AppError::InvalidTransition {
            job_id: 7,
            from: JobStatus::Pending,
            to: JobStatus::Completed,
        };
        assert_eq!(transition.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_transition_message_names_states() {
        let err = AppError::InvalidTransition {
            job_id: 3,
            from: JobStatus::Completed,
            to: JobStatus::Error,
        };
        assert_eq!(err.to_string(), "Job 3 cannot move from 'completed' to 'error'");
    }

    #[test]
    fn test_timeout_message_keeps_sub_second_limits() {
        let err = AppError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Job timed out after 250ms");
        assert_eq!(
            AppError::Timeout(Duration::from_secs(90)).to_string(),
            "Job timed out after 90s"
        );
        assert_eq!(
            AppError::Timeout(Duration::from_millis(250)).into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_unknown_job_type_message_is_bare() {
        let err = AppError::UnknownJobType("bogus".into());
        assert_eq!(err.to_string(), "Unknown job type: bogus");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
