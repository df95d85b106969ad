use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::params::Params;

/// The declared contract kind an [`Expectation`] enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectationType {
    /// Asserts an instrumented job emits `start`/`end` beacons on schedule.
    Schedule,
    /// Asserts a notification path delivers synthetic tests and is acked in time.
    AlertPath,
}

impl ExpectationType {
    /// The wire/storage representation, matching the SQL `CHECK` constraint values.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::AlertPath => "alert_path",
        }
    }
}

impl fmt::Display for ExpectationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExpectationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schedule" => Ok(Self::Schedule),
            "alert_path" => Ok(Self::AlertPath),
            other => Err(CoreError::UnknownExpectationType(other.to_string())),
        }
    }
}

/// The kind of primitive fact an [`Observation`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    /// Emitted by an instrumented job when work begins.
    Start,
    /// Emitted by an instrumented job when work ends.
    End,
    /// Emitted internally when the Checker sends a synthetic alert-path test.
    Ping,
    /// Reserved for explicit ack-via-observation (distinct from the `/ack` endpoint).
    Ack,
}

impl ObservationKind {
    /// The wire/storage representation, matching the SQL `CHECK` constraint values.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Ping => "ping",
            Self::Ack => "ack",
        }
    }
}

impl fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObservationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            "ping" => Ok(Self::Ping),
            "ack" => Ok(Self::Ack),
            other => Err(CoreError::UnknownObservationKind(other.to_string())),
        }
    }
}

/// The lifecycle state of one synthetic delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    /// Sent, awaiting acknowledgement.
    Pending,
    /// Acknowledged via `/ack/{trial_id}` before the ack window elapsed.
    Acked,
    /// Not acknowledged before the ack window elapsed; `no_ack` was raised.
    Expired,
}

impl TrialStatus {
    /// The wire/storage representation, matching the SQL `CHECK` constraint values.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Acked => "acked",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A violation code raised by [`crate::schedule_evaluate`] or the Checker's
/// alert-path loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    /// No `start` observed within `expected_interval_s + tolerance_s`.
    Missed,
    /// A job has been running longer than `max_runtime_s`.
    Longrun,
    /// A new `start` was observed while a previous run had no matching `end`.
    Overlap,
    /// The gap between the end of one run and the start of the next is too short.
    Spacing,
    /// A synthetic alert-path test was not acknowledged within its window.
    NoAck,
}

impl ViolationCode {
    /// The wire/storage representation, matching the `violations.code` column values.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Missed => "missed",
            Self::Longrun => "longrun",
            Self::Overlap => "overlap",
            Self::Spacing => "spacing",
            Self::NoAck => "no_ack",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ViolationCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "missed" => Ok(Self::Missed),
            "longrun" => Ok(Self::Longrun),
            "overlap" => Ok(Self::Overlap),
            "spacing" => Ok(Self::Spacing),
            "no_ack" => Ok(Self::NoAck),
            other => Err(CoreError::InvalidParams {
                expectation_type: "violation_code",
                reason: format!("unknown code: {other}"),
            }),
        }
    }
}

/// A structured evidence bag attached to a violation or used in a webhook
/// payload. Wraps a JSON object so RuleEngine can build evidence without
/// needing a bespoke struct per violation code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence(pub Value);

impl Evidence {
    /// Builds an evidence bag from a fixed list of key/value pairs.
    #[must_use]
    pub fn new(fields: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        let map: serde_json::Map<String, Value> =
            fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        Self(Value::Object(map))
    }

    /// Serializes the evidence bag to a JSON string for storage.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }

    /// Parses a stored JSON string back into an evidence bag.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::from_str(s)?))
    }
}

/// The declared contract: an instrumented job's schedule, or an
/// alert-delivery path's liveness.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub id: String,
    pub exp_type: ExpectationType,
    pub name: String,
    pub owner_email: String,
    pub expected_interval_s: i64,
    pub tolerance_s: i64,
    pub params: Params,
    pub enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A single timestamped, append-only fact tied to one expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub seq: i64,
    pub expectation_id: String,
    pub kind: ObservationKind,
    pub observed_at: i64,
    pub meta: Option<String>,
}

/// One synthetic delivery attempt belonging to an alert-path expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTrial {
    pub id: String,
    pub expectation_id: String,
    pub sent_at: i64,
    pub acked_at: Option<i64>,
    pub status: TrialStatus,
    pub meta: Option<String>,
}

/// A reported mismatch between a contract and its evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub id: i64,
    pub expectation_id: String,
    pub code: ViolationCode,
    pub message: String,
    pub evidence: Evidence,
    pub detected_at: i64,
    pub last_notified_at: Option<i64>,
    pub is_open: bool,
}
