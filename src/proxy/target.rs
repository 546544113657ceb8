use thiserror::Error;
use url::Url;

use crate::error::AppError;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TargetError {
    #[error("An URL must be specified in the `url` query parameter")]
    MissingParameter,

    #[error("A single `url` query parameter must be specified")]
    MultipleValues,

    #[error("The URL ({0}) is invalid")]
    InvalidUrl(String),
}

impl From<TargetError> for AppError {
    fn from(err: TargetError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Validates the raw `url` query values and returns the upstream target.
///
/// Exactly one non-empty value is accepted and it must be an absolute URL with
/// an authority; relative references such as `/relative/path` are rejected.
pub fn validate_target(values: &[String]) -> Result<Url, TargetError> {
    let raw = match values {
        [] => return Err(TargetError::MissingParameter),
        [value] if value.is_empty() => return Err(TargetError::MissingParameter),
        [value] => value,
        _ => return Err(TargetError::MultipleValues),
    };

    match Url::parse(raw) {
        Ok(url) if url.has_host() => Ok(url),
        _ => Err(TargetError::InvalidUrl(raw.clone())),
    }
}
