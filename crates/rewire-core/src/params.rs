use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::ExpectationType;

fn default_false() -> bool {
    false
}

/// Tuning knobs for a `schedule` expectation.
///
/// `max_runtime_s = 0` disables the longrun check; `min_spacing_s = 0`
/// disables the spacing check. Unknown JSON keys are ignored; missing
/// optional keys take these defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleParams {
    #[serde(default)]
    pub max_runtime_s: i64,
    #[serde(default)]
    pub min_spacing_s: i64,
    #[serde(default = "default_false")]
    pub allow_overlap: bool,
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self {
            max_runtime_s: 0,
            min_spacing_s: 0,
            allow_overlap: false,
        }
    }
}

/// Tuning knobs for an `alert_path` expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPathParams {
    pub ack_window_s: i64,
    pub test_interval_s: i64,
}

/// The type-discriminated `params` record attached to an [`crate::Expectation`].
///
/// Modeled as a tagged sum rather than a generic JSON bag per the core
/// design note: RuleEngine pattern-matches on this, never on a raw map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    Schedule(ScheduleParams),
    AlertPath(AlertPathParams),
}

impl Params {
    /// Returns the schedule params, if this is a schedule expectation.
    #[must_use]
    pub const fn as_schedule(&self) -> Option<&ScheduleParams> {
        match self {
            Self::Schedule(p) => Some(p),
            Self::AlertPath(_) => None,
        }
    }

    /// Returns the alert-path params, if this is an alert-path expectation.
    #[must_use]
    pub const fn as_alert_path(&self) -> Option<&AlertPathParams> {
        match self {
            Self::AlertPath(p) => Some(p),
            Self::Schedule(_) => None,
        }
    }
}

/// Parses a stored `params_json` string into the params variant matching
/// `exp_type`, applying the documented validation and defaults.
///
/// Unknown discriminators (an `exp_type` that is neither schedule nor
/// alert_path) are rejected; that rejection belongs to
/// [`ExpectationType::from_str`], not here — this function assumes a
/// already-validated type.
pub fn parse_params(exp_type: ExpectationType, params_json: &str) -> Result<Params, CoreError> {
    match exp_type {
        ExpectationType::Schedule => {
            let raw: ScheduleParams =
                serde_json::from_str(params_json).map_err(|e| CoreError::InvalidParams {
                    expectation_type: "schedule",
                    reason: e.to_string(),
                })?;
            if raw.max_runtime_s < 0 {
                return Err(CoreError::InvalidParams {
                    expectation_type: "schedule",
                    reason: "max_runtime_s must be >= 0".to_string(),
                });
            }
            if raw.min_spacing_s < 0 {
                return Err(CoreError::InvalidParams {
                    expectation_type: "schedule",
                    reason: "min_spacing_s must be >= 0".to_string(),
                });
            }
            Ok(Params::Schedule(raw))
        }
        ExpectationType::AlertPath => {
            let raw: AlertPathParams =
                serde_json::from_str(params_json).map_err(|e| CoreError::InvalidParams {
                    expectation_type: "alert_path",
                    reason: e.to_string(),
                })?;
            if raw.ack_window_s <= 0 {
                return Err(CoreError::NonPositiveAckWindow(raw.ack_window_s));
            }
            if raw.test_interval_s <= 0 {
                return Err(CoreError::NonPositiveTestInterval(raw.test_interval_s));
            }
            Ok(Params::AlertPath(raw))
        }
    }
}
