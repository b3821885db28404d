//! HTTP handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use super::dto::{AppendRecordRequest, ErrorResponse, UploadFilesRequest, UploadFilesResponse};
use crate::error::Error;
use crate::ledger::LedgerAdapter;

pub(super) struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotConnected | Error::ConnectionError(_) => StatusCode::SERVICE_UNAVAILABLE,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorResponse {
            error: self.0.status_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub(super) async fn health() -> &'static str {
    "OK"
}

pub(super) async fn upload_files(
    State(adapter): State<Arc<LedgerAdapter>>,
    Json(body): Json<UploadFilesRequest>,
) -> Result<Json<UploadFilesResponse>, ApiError> {
    let requests = body
        .files
        .into_iter()
        .map(|file| file.into_request())
        .collect::<Result<Vec<_>, _>>()?;
    let cids = adapter.uploader().upload_batch(requests).await?;
    Ok(Json(UploadFilesResponse { cids }))
}

pub(super) async fn list_records(
    State(adapter): State<Arc<LedgerAdapter>>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(adapter.list_records().await?))
}

pub(super) async fn append_record(
    State(adapter): State<Arc<LedgerAdapter>>,
    Json(body): Json<AppendRecordRequest>,
) -> Result<Json<Value>, ApiError> {
    let (file, camp) = body.into_parts()?;
    let (path, content) = file.into_parts();
    let receipt = adapter.append_record(&path, content, &camp).await?;
    Ok(Json(receipt))
}

pub(super) async fn list_accounts(
    State(adapter): State<Arc<LedgerAdapter>>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(adapter.list_accounts().await?))
}
