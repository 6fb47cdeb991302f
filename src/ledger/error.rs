//! Ledger Store Errors
//!
//! Error types for ledger store operations.

/// Errors that can occur in a ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint hit (e.g. transaction identifier collision)
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Stored row could not be mapped to a domain value
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Store temporarily unable to serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Database refused the values themselves (SQLSTATE class 22 or 23)
    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// SQLSTATE codes that fail the same way on every attempt: data exceptions
/// (class 22) and integrity violations (class 23) other than unique violations.
pub fn is_data_error_code(code: &str) -> bool {
    code.starts_with("22") || (code.starts_with("23") && code != UNIQUE_VIOLATION)
}

const UNIQUE_VIOLATION: &str = "23505";

impl StoreError {
    /// Check if this error is retryable
    ///
    /// Units of work never commit partially, so every infrastructure
    /// failure is safe to resubmit. Corrupt rows and rejected values are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::InvalidData(_) | StoreError::Rejected(_) => false,
            StoreError::Database(sqlx::Error::Database(db)) => {
                !db.code().is_some_and(|code| is_data_error_code(&code))
            }
            _ => true,
        }
    }

    /// Map a sqlx error, turning unique violations into conflicts and
    /// data errors into rejections
    pub fn from_write(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db)
                if db.code().is_some_and(|code| is_data_error_code(&code)) =>
            {
                StoreError::Rejected(db.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_is_retryable() {
        assert!(StoreError::Conflict("duplicate".into()).is_retryable());
        assert!(StoreError::Unavailable("down".into()).is_retryable());
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!StoreError::InvalidData("bad status".into()).is_retryable());
        assert!(!StoreError::Rejected("value too long".into()).is_retryable());
    }

    #[test]
    fn test_data_error_codes() {
        // string_data_right_truncation, numeric_value_out_of_range
        assert!(is_data_error_code("22001"));
        assert!(is_data_error_code("22003"));
        // not_null_violation, foreign_key_violation, check_violation
        assert!(is_data_error_code("23502"));
        assert!(is_data_error_code("23503"));
        assert!(is_data_error_code("23514"));

        assert!(!is_data_error_code("23505"));
        // serialization_failure, deadlock_detected, admin_shutdown
        assert!(!is_data_error_code("40001"));
        assert!(!is_data_error_code("40P01"));
        assert!(!is_data_error_code("57P01"));
    }

    #[test]
    fn test_from_write_passes_through_other_errors() {
        let err = StoreError::from_write(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
