// Error kinds raised below the HTTP layer: token codec and user store

/// Failures from the token codec
///
/// Expired and InvalidSignature stay distinguishable so callers that care
/// about expiry specifically (session pruning, refresh) can tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature mismatch, wrong secret, or a token that does not parse
    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Failures from a user or job store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique email constraint rejected a write
    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateEmail
            }
            // A session array or enum column that no longer decodes
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(error.to_string())
            }
            _ => StoreError::Database(error.to_string()),
        }
    }
}
