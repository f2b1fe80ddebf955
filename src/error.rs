use axum::http::StatusCode;

/// Failure taxonomy for the ingest pipeline. Configuration problems are
/// reported synchronously to the caller of `start`; everything else is
/// contained locally and surfaces through counters, logs, or the observer
/// error channel.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("stream transport error: {0}")]
    Transport(String),

    #[error("station directory load failed: {0}")]
    StorageUnavailable(#[source] sqlx::Error),

    #[error("noise sample write failed: {0}")]
    Persistence(#[source] sqlx::Error),

    #[error("timed out waiting for a pooled database connection")]
    PoolExhausted,
}

impl IngestError {
    /// Classifies a failed sample write. A pool acquisition timeout is its
    /// own condition; everything else is a persistence failure.
    pub fn from_write(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::PoolExhausted,
            other => Self::Persistence(other),
        }
    }
}

pub fn map_db_error(err: sqlx::Error) -> (StatusCode, String) {
    let status = match &err {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        sqlx::Error::PoolTimedOut => StatusCode::SERVICE_UNAVAILABLE,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => StatusCode::CONFLICT,    // unique_violation
            Some("23503") => StatusCode::BAD_REQUEST, // foreign_key_violation
            Some("23502") => StatusCode::BAD_REQUEST, // not_null_violation
            Some("22P02") => StatusCode::BAD_REQUEST, // invalid_text_representation
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    tracing::error!(error = %err, status = %status, "database error");

    let message = match status {
        StatusCode::NOT_FOUND => "Resource not found",
        StatusCode::SERVICE_UNAVAILABLE => "Database unavailable",
        StatusCode::CONFLICT => "Resource already exists",
        StatusCode::BAD_REQUEST => "Invalid request",
        _ => "Database error",
    };

    (status, message.to_string())
}
