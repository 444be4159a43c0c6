use thiserror::Error;

/// Result type for table service operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error types for table service operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The REST endpoint answered with a non-success status
    #[error("{body}")]
    Http { status: u16, body: String },

    /// Connection error - backend unreachable or misconfigured
    #[error("Connection error: {0}")]
    Connection(String),

    /// Database error - SQL errors, constraint violations
    #[error("Database error: {0}")]
    Database(String),

    /// Pool error - connection pool issues
    #[error("Pool error: {0}")]
    Pool(String),

    /// A table or column name that is not a plain identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Row payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => StoreError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => StoreError::Connection(err.to_string()),
        }
    }
}

/// Convert tokio-postgres errors, keeping the SQLSTATE code when the server sent one
impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_error) = err.as_db_error() {
            return StoreError::Database(format!(
                "{}: {}",
                db_error.code().code(),
                db_error.message()
            ));
        }

        StoreError::Database(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        StoreError::Pool(err.to_string())
    }
}

impl From<deadpool_postgres::BuildError> for StoreError {
    fn from(err: deadpool_postgres::BuildError) -> Self {
        StoreError::Connection(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
