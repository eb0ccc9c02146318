use axum::{
    Json,
    body::Body,
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{Response, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::services::CatalogError;

/// Malformed requests rejected before any work is done.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("File is required")]
    MissingFile,
    #[error("Invalid multipart body: {0}")]
    Multipart(String),
    #[error("Invalid request body: {0}")]
    Body(String),
    #[error("Invalid path: {0}")]
    Path(String),
    #[error("Invalid query string: {0}")]
    Query(String),
}

impl From<JsonRejection> for RequestError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection.body_text())
    }
}

impl From<PathRejection> for RequestError {
    fn from(rejection: PathRejection) -> Self {
        Self::Path(rejection.body_text())
    }
}

impl From<QueryRejection> for RequestError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Query(rejection.body_text())
    }
}

impl From<MultipartRejection> for RequestError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Multipart(rejection.body_text())
    }
}

// Extractor rejections are answered like any other handler error
impl IntoResponse for RequestError {
    fn into_response(self) -> Response<Body> {
        Report::from(self).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// A generic error report
// Produced via `Err(some_err).wrap_err("Some context")`
// or `Err(color_eyre::eyre::Report::new(SomeError))`
pub struct Report(color_eyre::Report);

impl std::fmt::Debug for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<E> From<E> for Report
where
    E: Into<color_eyre::Report>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl Report {
    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<CatalogError>() {
            return match err {
                CatalogError::NameRequired { .. } => StatusCode::BAD_REQUEST,
                CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            };
        }

        if self.0.downcast_ref::<RequestError>().is_some() {
            return StatusCode::BAD_REQUEST;
        }

        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// Tell axum how to convert `Report` into a response.
impl IntoResponse for Report {
    fn into_response(self) -> Response<Body> {
        let status = self.status();

        if status.is_server_error() {
            log::error!("{:?}", self.0);
        } else {
            log::debug!("Rejected request: {}", self.0);
        }

        // Only the outermost message is shown, handlers attach a readable one
        let body = ErrorBody {
            error: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
