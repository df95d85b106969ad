/// Errors raised while constructing or validating domain values.
///
/// `CoreError` covers failures that are detectable without any I/O: a
/// malformed `params_json`, an out-of-range interval, an unrecognized
/// expectation type. Downstream crates (`rewire-store`, `rewire-server`)
/// compose this into their own error enums via `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("expected_interval_s must be >= 60, got {0}")]
    IntervalTooShort(i64),

    #[error("tolerance_s must be >= 0, got {0}")]
    NegativeTolerance(i64),

    #[error("unknown expectation type: {0}")]
    UnknownExpectationType(String),

    #[error("unknown observation kind: {0}")]
    UnknownObservationKind(String),

    #[error("invalid params_json for type {expectation_type}: {reason}")]
    InvalidParams {
        expectation_type: &'static str,
        reason: String,
    },

    #[error("ack_window_s must be > 0, got {0}")]
    NonPositiveAckWindow(i64),

    #[error("test_interval_s must be > 0, got {0}")]
    NonPositiveTestInterval(i64),
}

impl CoreError {
    /// A short machine-readable code, stable across variants, suitable for
    /// surfacing in an HTTP error body without leaking internal detail.
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::IntervalTooShort(_) => "interval_too_short",
            Self::NegativeTolerance(_) => "negative_tolerance",
            Self::UnknownExpectationType(_) => "unknown_expectation_type",
            Self::UnknownObservationKind(_) => "unknown_observation_kind",
            Self::InvalidParams { .. } => "invalid_params",
            Self::NonPositiveAckWindow(_) => "non_positive_ack_window",
            Self::NonPositiveTestInterval(_) => "non_positive_test_interval",
        }
    }
}
