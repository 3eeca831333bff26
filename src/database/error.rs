use warp::http::StatusCode;
use warp::reject::Reject;

/// Error taxonomy surfaced to the caller. Every variant carries a
/// human-readable message; the kind decides the response status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Database(_) | ApiError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{entity} does not exist"))
    }
}

// warp's blanket `impl<T: Reject> From<T> for Rejection` makes `?`
// propagation work in handlers.
impl Reject for ApiError {}

/// The store's constraints are the last line of defense against races:
/// a bypassed advisory pre-check lands here and still surfaces as a
/// `Conflict` instead of a 500.
impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                if e.is_unique_violation() {
                    Self::Conflict("entry already exists".to_string())
                } else if e.is_check_violation() || e.is_foreign_key_violation() {
                    Self::Conflict(format!("constraint violated: {e}"))
                } else {
                    Self::Database(format!("{e}"))
                }
            }
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut => Self::Database("pool timed out".to_string()),
            sqlx::Error::PoolClosed => Self::Database("pool closed".to_string()),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::Database(format!("column decode {index} ({source})"))
            }
            e => Self::Database(format!("{e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(
            ApiError::NotFound(String::new()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict(String::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Validation(String::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Forbidden(String::new()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Unauthorized(String::new()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Database(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
