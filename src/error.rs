use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrendingError {
    /// Backing store could not serve the request. Not retried here; the caller decides.
    #[error("event store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("unknown engagement kind `{0}`")]
    UnknownEngagementKind(String),

    #[error("timestamp {0} ms is out of range")]
    InvalidTimestamp(i64),
}

impl From<redis::RedisError> for TrendingError {
    fn from(e: redis::RedisError) -> Self {
        TrendingError::StoreUnavailable(e.to_string())
    }
}

impl IntoResponse for TrendingError {
    fn into_response(self) -> Response {
        match self {
            TrendingError::StoreUnavailable(_) => {
                tracing::error!(error = %self, "engagement request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            TrendingError::UnknownEngagementKind(_) | TrendingError::InvalidTimestamp(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
        }
    }
}
