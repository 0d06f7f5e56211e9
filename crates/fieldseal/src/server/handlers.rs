//! Axum request handlers for all service endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    ErrorResponse, HealthResponse, QueryRequest, TranslateRequest, VerifyResponse, WriteRequest,
};
use common::ServiceError;
use serde::Serialize;
use tracing::warn;

use super::state::AppState;

/// `PUT /records/:key`: seal `value` and store it under `key`.
pub async fn write(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<WriteRequest>,
) -> Response {
    respond(state.records.write(&key, req.value, &req.descriptors))
}

/// `GET /records/:key`: open the record under `key`.
pub async fn query(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    respond(state.records.query(&key))
}

/// `DELETE /records/:key`
pub async fn delete(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    respond(state.records.delete(&key))
}

/// `GET /records/:key/verify`: check the record's footer.
pub async fn verify(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    respond(
        state
            .records
            .verify(&key)
            .map(|valid| VerifyResponse { valid }),
    )
}

/// `POST /records/:key/translate`: re-seal record `pid` for `licensee` as `id`.
pub async fn translate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TranslateRequest>,
) -> Response {
    respond(state.records.translate(&id, &req.pid, &req.licensee))
}

/// `POST /query`: run a ledger query and open every match.
pub async fn query_by_param(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Response {
    respond(state.records.query_by_param(&req.query))
}

/// `GET /health`: liveness check.
///
/// Keys are loaded before the router is built, so a running service is
/// always ready.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        partner: state.records.keys().partner().to_owned(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn respond<T: Serialize>(result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Render a [`ServiceError`] as its status code and an [`ErrorResponse`].
pub fn error_response(e: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!(code = e.code(), error = %e, "request failed");
    }
    (status, Json(ErrorResponse::new(e.code(), e.to_string()))).into_response()
}
