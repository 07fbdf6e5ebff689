use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use santa_core::{BuildError, RepoError, RosterError, ServiceError};
use serde_json::json;
use thiserror::Error;

/// Request-level failure, rendered as a JSON `{"error": ...}` body.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("store did not answer within {timeout_ms}ms")]
    StoreTimeout { timeout_ms: u128 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Service(err) => match err {
                ServiceError::InvalidToken | ServiceError::UnknownParticipant(_) => {
                    StatusCode::NOT_FOUND
                }
                // Roster size is server configuration, not request input.
                ServiceError::Draw(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError::RosterChanged => StatusCode::CONFLICT,
                ServiceError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            AppError::StoreTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                "event=request_failed module=http status=error http_status={} error={}",
                status.as_u16(),
                self
            );
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Startup and serve-loop failure.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("store error: {0}")]
    Store(#[from] RepoError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key}=`{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("cannot resolve working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
}
