use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::FieldErrors;

/// Success envelope: `{"ok": true, ...data}`.
#[derive(Debug, Serialize)]
pub struct APIResponse<T> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

/// Failure envelope: `{"ok": false, "error": {...}}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub status: &'static str,
}

pub fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(APIResponse { ok: true, data })).into_response()
}

pub fn failure(status: StatusCode, error: ErrorBody) -> Response {
    (status, Json(ErrorResponse { ok: false, error })).into_response()
}
