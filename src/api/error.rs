use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

const INTERNAL_ERROR_PAGE: &str = "<!DOCTYPE html>\n<html><head><title>Internal error</title></head>\
<body><h1>Something went wrong</h1><p>The error has been logged. Please try again later.</p></body></html>";

/// Infrastructure failures surfaced by handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("template rendering failed: {0}")]
    Render(#[from] handlebars::RenderError),
    #[error("form values do not match the record: {0}")]
    Form(#[from] serde_json::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("request failed: {self}");
        (StatusCode::INTERNAL_SERVER_ERROR, Html(INTERNAL_ERROR_PAGE)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_become_internal_server_error() {
        let err = AppError::Store(StoreError::IdExhausted(8));
        assert_eq!(err.to_string(), "no unused id found after 8 attempts");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
