use std::time::Duration;

use mask::MaskError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Invalid data URI: {0}")]
    DataUri(String),

    #[error("Invalid provider configuration: {0}")]
    Config(String),
}

/// Failures of the point-prompt route, which has no fallback
#[derive(Error, Debug)]
pub enum PointMaskError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Mask(#[from] MaskError),

    #[error("Invalid point prompt: {0}")]
    Validation(String),
}
