use actix_web::{
    http::{header::ContentType, StatusCode},
    HttpResponse, ResponseError,
};
use thiserror::Error;

/// Prefix of every failure body so rejections are easy to spot in logs and tooling.
pub const FAILURE_MARKER: &str = "❌";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        plain_text_failure(self.status_code(), &self.to_string())
    }
}

/// Single-line `text/plain` failure body, shared by handlers and middleware.
pub fn plain_text_failure(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(ContentType::plaintext())
        .body(format!("{} {}\n", FAILURE_MARKER, message.replace(['\r', '\n'], " ")))
}

pub type AppResult<T> = Result<T, AppError>;
