use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::storage::{ListQuery, PurchaseRecord, PurchaseSummary, PurchaseUpdate, StoreError};

#[derive(Serialize)]
pub struct SystemStatus {
    pub service: &'static str,
    pub version: &'static str,
    pub records: i64,
}

/// Admin-facing error. Unlike the SOAP endpoint, admin calls report
/// failures through the status code.
#[derive(Debug)]
pub struct AdminError(StoreError);

impl From<StoreError> for AdminError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Duplicate(_) => StatusCode::CONFLICT,
            StoreError::Backend(e) => {
                tracing::error!(error = %e, "Admin request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

type AdminResult<T> = Result<T, AdminError>;

pub async fn get_status(State(state): State<AppState>) -> AdminResult<Json<SystemStatus>> {
    Ok(Json(SystemStatus {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        records: state.store().count().await?,
    }))
}

pub async fn list_purchases(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AdminResult<Json<Vec<PurchaseSummary>>> {
    Ok(Json(state.store().list(&query).await?))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AdminResult<Json<PurchaseRecord>> {
    state
        .store()
        .get(id)
        .await?
        .map(Json)
        .ok_or(AdminError(StoreError::NotFound(id)))
}

pub async fn update_purchase(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(update): Json<PurchaseUpdate>,
) -> AdminResult<Json<PurchaseRecord>> {
    let record = state.store().update(id, update).await?;
    tracing::info!(id, hash = %record.content_hash.short(), "Purchases record edited");
    Ok(Json(record))
}

pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AdminResult<StatusCode> {
    state.store().delete(id).await?;
    tracing::info!(id, "Purchases record deleted");
    Ok(StatusCode::NO_CONTENT)
}
