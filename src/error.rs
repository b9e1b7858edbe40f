use thiserror::Error;
use tracing::{Span, error, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Duplicate key in table {table}: {detail}")]
    Duplicate { table: &'static str, detail: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Store was written by schema version {found}, this build understands up to {expected}")]
    SchemaVersionMismatch { found: i64, expected: i64 },

    #[error("Transaction '{operation}' aborted, no changes were kept: {source}")]
    TransactionAborted {
        operation: &'static str,
        #[source]
        source: Box<StoreError>,
    },

    #[error("Malformed backup document: {0}")]
    MalformedBackup(String),

    #[error("Restore aborted, the previous store contents are intact: {0}")]
    RestoreAborted(Box<StoreError>),

    #[error("Protected record: {0}")]
    Protected(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cryptography error: {0}")]
    Crypto(#[from] bcrypt::BcryptError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Maps a failed write against `table`, turning unique-index violations
    /// into [`StoreError::Duplicate`].
    pub fn from_write(table: &'static str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Duplicate {
                table,
                detail: db_err.message().to_string(),
            },
            _ => StoreError::Database(err),
        }
    }

    pub fn aborted(operation: &'static str, source: StoreError) -> Self {
        StoreError::TransactionAborted {
            operation,
            source: Box::new(source),
        }
    }

    /// True when the failure was caused by a unique or compound-unique key,
    /// including when it surfaced from inside an aborted transaction.
    pub fn is_duplicate(&self) -> bool {
        match self {
            StoreError::Duplicate { .. } => true,
            StoreError::TransactionAborted { source, .. } => source.is_duplicate(),
            StoreError::RestoreAborted(source) => source.is_duplicate(),
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Database(_) => "database_error",
            StoreError::Duplicate { .. } => "duplicate_key",
            StoreError::NotFound(_) => "not_found_error",
            StoreError::Validation(_) => "validation_error",
            StoreError::Authentication(_) => "authentication_error",
            StoreError::SchemaVersionMismatch { .. } => "schema_version_mismatch",
            StoreError::TransactionAborted { .. } => "transaction_aborted",
            StoreError::MalformedBackup(_) => "malformed_backup",
            StoreError::RestoreAborted(_) => "restore_aborted",
            StoreError::Protected(_) => "protected_record",
            StoreError::Serialization(_) => "serialization_error",
            StoreError::Io(_) => "io_error",
            StoreError::Crypto(_) => "crypto_error",
            StoreError::Internal(_) => "internal_error",
        }
    }

    pub fn log_and_record(&self, ctx: &str) {
        let current_span = Span::current();
        let is_valid_span = !current_span.is_none();

        let message = self.to_string();
        let error_kind = self.kind();

        match self {
            StoreError::Duplicate { .. }
            | StoreError::NotFound(_)
            | StoreError::Validation(_)
            | StoreError::Authentication(_)
            | StoreError::MalformedBackup(_)
            | StoreError::Protected(_) => {
                warn!(error = %message, context = %ctx, kind = error_kind, "Store request rejected");
            }
            _ => {
                error!(error = %message, context = %ctx, kind = error_kind, "Store operation failed");
            }
        }

        if is_valid_span {
            current_span.record("error", tracing::field::display(true));
            current_span.record("error.type", tracing::field::display(error_kind));
            current_span.record("error.message", tracing::field::display(&message));
        }
    }
}

impl From<validator::ValidationErrors> for StoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        StoreError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_is_detected_through_aborted_transactions() {
        let dup = StoreError::Duplicate {
            table: "teachers",
            detail: "UNIQUE constraint failed".to_string(),
        };
        assert!(dup.is_duplicate());

        let wrapped = StoreError::aborted("seed", dup);
        assert!(wrapped.is_duplicate());
        assert_eq!(wrapped.kind(), "transaction_aborted");

        let other = StoreError::aborted("seed", StoreError::Internal("boom".to_string()));
        assert!(!other.is_duplicate());
    }

    #[test]
    fn restore_aborted_says_store_is_intact() {
        let err = StoreError::RestoreAborted(Box::new(StoreError::Internal("x".to_string())));
        assert!(err.to_string().contains("previous store contents are intact"));
    }
}
