//! HTTP surface for the gift draw.
//!
//! # Routes
//! - `GET /health` reports store reachability without touching state.
//! - `GET /reveal/:token` returns the caller's receiver, drawing on first use.
//! - `GET /admin/assignments.csv` and `GET /admin/links.csv` export tables.
//! - `POST /admin/reset` clears assignments; tokens survive.
//!
//! Admin routes carry no authentication; deploy behind a trusted proxy.

use axum::{
    routing::{get, post},
    Router,
};
use log::info;
use tokio::{
    net::TcpListener,
    signal::{self, ctrl_c},
};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use config::ServerConfig;
use error::ServerError;
use routes::{
    assignments_csv_handler, health_handler, links_csv_handler, reset_handler, reveal_handler,
};
use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/reveal/:token", get(reveal_handler))
        .route("/admin/assignments.csv", get(assignments_csv_handler))
        .route("/admin/links.csv", get(links_csv_handler))
        .route("/admin/reset", post(reset_handler))
        .with_state(state)
}

pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!(
        "event=server_init module=http status=start backend={}",
        config.backend.name()
    );
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let address = config.address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
    info!("event=server_listen module=http status=ok address={address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("event=server_stop module=http status=ok");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if ctrl_c().await.is_ok() {
            info!("event=shutdown module=http signal=ctrl_c");
        } else {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("event=shutdown module=http signal=terminate");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
