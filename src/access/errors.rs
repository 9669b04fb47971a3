use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

use crate::store::errors::StoreError;

#[derive(Debug, Error, Diagnostic)]
pub enum AccessError {
    #[error("Permission denied: {0}")]
    #[diagnostic(
        code(switcher::access::permission_denied),
        help("Ask a domain owner to grant one of your teams the required action")
    )]
    PermissionDenied(String),

    #[error("{entity} `{id}` not found")]
    #[diagnostic(code(switcher::access::not_found))]
    NotFound { entity: &'static str, id: String },

    #[error("Bad request: {0}")]
    #[diagnostic(code(switcher::access::bad_request))]
    BadRequest(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = match &self {
            AccessError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AccessError::NotFound { .. } => StatusCode::NOT_FOUND,
            AccessError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AccessError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
