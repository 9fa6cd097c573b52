use crate::services::verifier::Caller;
use axum::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub mod users;

/// JSON error payload every surface in the workspace responds with.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorDetail {
    pub error_code: String,
    pub message: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Wraps [`framework::Error`] so handlers can use `?` and still produce
/// the HTTP mapping for the shared taxonomy.
#[derive(Debug)]
pub struct ApiError(pub framework::Error);

impl From<framework::Error> for ApiError {
    fn from(e: framework::Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            framework::Error::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            framework::Error::InvalidInput => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            framework::Error::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            framework::Error::PermissionsDenied => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            framework::Error::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            framework::Error::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM"),
            framework::Error::DeserializeError(_) | framework::Error::BusinessPanic(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorResponse {
            error: ErrorDetail {
                error_code: code.to_string(),
                message: self.0.to_string(),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

/// Pulls the authenticated caller out of request extensions; absence means
/// the request never presented a usable bearer token.
pub fn require_caller(caller: Option<Extension<Caller>>) -> Result<Caller, ApiError> {
    caller
        .map(|Extension(c)| c)
        .ok_or(ApiError(framework::Error::Unauthorized))
}

pub fn parse_uuid(raw: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw).map_err(|_| ApiError(framework::Error::InvalidInput))
}
