use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Everything that can go wrong between the webhook gateway and the platform.
///
/// The user-facing behavior is uniform (one generic apology per failed event);
/// the variant and its `kind()` tag exist so logs are not.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("invalid webhook signature")]
    SignatureInvalid,

    #[error("malformed payload: {0}")]
    PayloadMalformed(String),

    #[error("storage error: {0}")]
    Storage(#[from] diesel::result::Error),

    #[error("storage pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("profile already exists for subscriber {0}")]
    ProfileExists(String),

    #[error("platform send failed: {0}")]
    PlatformSend(String),
}

impl BotError {
    /// Stable classification tag for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SignatureInvalid => "signature_invalid",
            Self::PayloadMalformed(_) => "payload_malformed",
            Self::Storage(_) | Self::Pool(_) => "storage",
            Self::ProfileExists(_) => "unique_violation",
            Self::PlatformSend(_) => "platform_send",
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        Self::PayloadMalformed(err.to_string())
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        Self::PlatformSend(err.to_string())
    }
}

impl IntoResponse for BotError {
    fn into_response(self) -> Response {
        let status = match &self {
            BotError::SignatureInvalid => StatusCode::FORBIDDEN,
            // The delivery contract is 500 for anything that breaks after the
            // signature check; the platform retries on its own schedule.
            _ => {
                tracing::error!(kind = self.kind(), error = %self, "webhook processing failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        status.into_response()
    }
}

pub type BotResult<T> = Result<T, BotError>;
