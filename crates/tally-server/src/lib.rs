//! HTTP surface for the Tally run controller.
//!
//! Two operations over a request/response channel: start a run
//! (`POST /report/invoke`) and resume an interrupted one
//! (`POST /report/resume`). Every response is a well-formed run envelope;
//! protocol and run failures never cross the boundary as transport errors.

pub mod routes;

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tally_controller::RunController;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server io failure: {0}")]
    Io(#[from] std::io::Error),
}

pub fn build_router(controller: Arc<RunController>) -> Router {
    Router::new()
        .route("/", get(routes::info))
        .route("/report/invoke", post(routes::invoke))
        .route("/report/resume", post(routes::resume))
        .with_state(controller)
}

pub async fn serve(controller: Arc<RunController>, addr: SocketAddr) -> Result<(), ServerError> {
    let router = build_router(controller);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    axum::serve(listener, router).await?;
    Ok(())
}
