use crate::LeasedbInstance;
use crate::error::LeasedbError;
use crate::records::Record;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertResponse {
    pub latency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub latency: String,
    pub records: Vec<Record>,
}

/// Collaborator surface: `POST /insert` writes one random record through
/// the lease, `GET /fetch` reads the recent window lock-free. Any other
/// method on these paths gets a 405.
pub fn router(instance: Arc<LeasedbInstance>) -> Router {
    Router::new()
        .route("/insert", post(insert_record).fallback(method_not_allowed))
        .route("/fetch", get(fetch_recent).fallback(method_not_allowed))
        .with_state(instance)
}

pub async fn serve(instance: Arc<LeasedbInstance>, addr: SocketAddr) -> Result<(), LeasedbError> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "http surface listening");
    axum::serve(listener, router(instance)).await?;
    Ok(())
}

async fn insert_record(
    State(instance): State<Arc<LeasedbInstance>>,
) -> Result<Json<InsertResponse>, (StatusCode, String)> {
    let payload = rand::random::<u32>() as i64;
    let receipt = instance
        .insert_record(payload)
        .await
        .map_err(internal_error)?;
    Ok(Json(InsertResponse {
        latency: format_latency(receipt.latency),
    }))
}

async fn fetch_recent(
    State(instance): State<Arc<LeasedbInstance>>,
) -> Result<Json<FetchResponse>, (StatusCode, String)> {
    let recent = instance.fetch_recent().await.map_err(internal_error)?;
    Ok(Json(FetchResponse {
        latency: format_latency(recent.latency),
        records: recent.records,
    }))
}

async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

fn internal_error(err: LeasedbError) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn format_latency(latency: Duration) -> String {
    format!("{latency:?}")
}
