use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::io;

/// Errors raised while starting the deployer (config loading, logging setup)
#[derive(Debug, thiserror::Error)]
pub enum DeployerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Helper type for Results that use DeployerError
pub type Result<T> = std::result::Result<T, DeployerError>;

/// Reasons a webhook delivery is rejected or fails.
///
/// Each variant maps to one stable status/body pair; the detail carried by a
/// variant is only logged, never sent back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("missing or unreadable signature header")]
    InvalidRequest,

    #[error("HMAC computation failed: {0}")]
    HmacFailed(String),

    #[error("signature mismatch")]
    InvalidSignature,

    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("deployment failed: {0}")]
    DeploymentFailed(String),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidRequest | WebhookError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::FORBIDDEN,
            WebhookError::HmacFailed(_) | WebhookError::DeploymentFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Response body sent to GitHub
    pub fn body(&self) -> &'static str {
        match self {
            WebhookError::InvalidRequest => "Invalid request",
            WebhookError::HmacFailed(_) => "HMAC failed",
            WebhookError::InvalidSignature => "Invalid signature",
            WebhookError::InvalidJson(_) => "Invalid JSON",
            WebhookError::DeploymentFailed(_) => "Deployment failed",
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status_code(), self.body()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_body_pairs() {
        let cases = [
            (WebhookError::InvalidRequest, 400, "Invalid request"),
            (WebhookError::HmacFailed("x".into()), 500, "HMAC failed"),
            (WebhookError::InvalidSignature, 403, "Invalid signature"),
            (WebhookError::DeploymentFailed("x".into()), 500, "Deployment failed"),
        ];
        for (err, status, body) in cases {
            assert_eq!(err.status_code().as_u16(), status);
            assert_eq!(err.body(), body);
        }

        let json_err = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let err = WebhookError::from(json_err);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body(), "Invalid JSON");
    }
}
