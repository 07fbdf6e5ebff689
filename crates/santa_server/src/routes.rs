//! HTTP handlers.
//!
//! Every store call runs on the blocking pool under the configured
//! timeout; a timed-out call answers 503 and never retries.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use log::{info, warn};
use santa_core::{SantaService, ServiceResult, Store};
use tokio::{task, time};

use crate::{error::AppError, state::AppState};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

async fn run_blocking<T, F>(state: &AppState, call: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&SantaService<dyn Store>) -> ServiceResult<T> + Send + 'static,
{
    let service = state.service.clone();
    let handle = task::spawn_blocking(move || call(service.as_ref()));

    match time::timeout(state.store_timeout, handle).await {
        Ok(Ok(result)) => result.map_err(AppError::from),
        Ok(Err(join_err)) => Err(AppError::Internal(join_err.to_string())),
        Err(_) => {
            warn!(
                "event=store_call module=http status=error error_code=timeout timeout_ms={}",
                state.store_timeout.as_millis()
            );
            Err(AppError::StoreTimeout {
                timeout_ms: state.store_timeout.as_millis(),
            })
        }
    }
}

pub async fn health_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let health = run_blocking(&state, |service| Ok(service.health())).await?;
    let status = if health.reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((status, Json(health)))
}

pub async fn reveal_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let reveal = run_blocking(&state, move |service| service.reveal(&token)).await?;
    Ok(Json(reveal))
}

pub async fn assignments_csv_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let base_url = state.base_url.clone();
    let body = run_blocking(&state, move |service| {
        service.export_assignments_csv(&base_url)
    })
    .await?;
    Ok(([(header::CONTENT_TYPE, CSV_CONTENT_TYPE)], body))
}

pub async fn links_csv_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let base_url = state.base_url.clone();
    let body = run_blocking(&state, move |service| service.export_links_csv(&base_url)).await?;
    Ok(([(header::CONTENT_TYPE, CSV_CONTENT_TYPE)], body))
}

pub async fn reset_handler(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    run_blocking(&state, |service| service.reset()).await?;
    info!("event=reset module=http status=ok");
    Ok(StatusCode::NO_CONTENT)
}
