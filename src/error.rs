//! Handler-boundary errors and their HTTP mapping

use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Rejection, Reply};

use crate::llm::LlmError;
use crate::models::ErrorBody;
use crate::store::StoreError;

/// Errors surfaced to HTTP callers as `{"error": message}`
#[derive(Debug, Error)]
pub enum ApiError {
    /// Client omitted a required field (400)
    #[error("{0}")]
    MissingParameter(String),

    /// Request body could not be used (400)
    #[error("{0}")]
    BadRequest(String),

    /// Single-row fetch or update matched nothing (404)
    #[error("{0}")]
    NotFound(String),

    /// Model or storage service failed; message passed through verbatim (500)
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    /// Build a `MissingParameter` naming the required fields, e.g. "user_id and title required"
    pub fn missing(fields: &[&str]) -> Self {
        ApiError::MissingParameter(format!("{} required", fields.join(" and ")))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl Reply for ApiError {
    fn into_response(self) -> Response {
        error_reply(self.status(), self.to_string())
    }
}

/// JSON `{"error": ...}` reply with the given status
pub fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: message.into(),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// Turn warp's own rejections into the same JSON error shape
pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", err))
    } else if let Some(err) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, err.to_string())
    } else if rejection.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected a JSON body".to_string(),
        )
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        tracing::error!(?rejection, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(error_reply(status, message))
}
