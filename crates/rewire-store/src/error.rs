use rewire_core::CoreError;

/// Errors raised by [`crate::SqliteStore`].
///
/// All variants that wrap an underlying `sqlx::Error` are reported to the
/// caller as retriable per SPEC_FULL.md §7 — the Checker logs and continues
/// to the next tick, Ingress maps them to a 5xx.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("expectation with id {0} already exists")]
    DuplicateExpectationId(String),

    #[error(transparent)]
    InvalidExpectation(#[from] CoreError),

    #[error("malformed evidence or meta JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// A short machine-readable code, mirroring `rewire_core::CoreError::error_code`.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateExpectationId(_) => "duplicate_expectation_id",
            Self::InvalidExpectation(e) => e.error_code(),
            Self::MalformedJson(_) => "malformed_json",
            Self::Database(_) => "database_error",
        }
    }

    /// True for failures a caller should treat as transient and retry on
    /// the next Checker tick or the next request, per SPEC_FULL.md §7.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}
