use std::time::{SystemTime, UNIX_EPOCH};

use rewire_core::{ExpectationType, ObservationKind, TrialStatus, ViolationCode};
use rewire_store::SqliteStore;
use serde_json::{json, Value};

fn now_i() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

/// The outcome of one invariant check, re-evaluated from evidence.
#[derive(Debug, Clone)]
pub struct InvariantResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub evidence: Option<Value>,
}

/// Read-only diagnostic: re-derives each invariant from the current
/// evidence and compares it to persisted state, catching Store corruption
/// or Checker drift without mutating anything (SPEC_FULL.md §4.4).
pub struct InvariantProbe<'a> {
    store: &'a SqliteStore,
}

impl<'a> InvariantProbe<'a> {
    #[must_use]
    pub const fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Runs every check. Returns `(passed, failed, results)`.
    ///
    /// # Errors
    ///
    /// Returns a [`rewire_store::StoreError`] if any underlying read fails.
    pub async fn check_all(&self) -> Result<(usize, usize, Vec<InvariantResult>), rewire_store::StoreError> {
        let mut results = Vec::new();
        results.extend(self.check_missed_correct().await?);
        results.extend(self.check_longrun_correct().await?);
        results.extend(self.check_trial_states().await?);
        results.extend(self.check_observation_monotonicity().await?);

        let passed = results.iter().filter(|r| r.passed).count();
        let failed = results.len() - passed;
        Ok((passed, failed, results))
    }

    /// INV1: a `missed` violation exists iff time since the last `start`
    /// exceeds `expected_interval_s + tolerance_s`. No prior `start` at
    /// all is never evidence of lateness (epistemic silence).
    async fn check_missed_correct(&self) -> Result<Vec<InvariantResult>, rewire_store::StoreError> {
        let mut results = Vec::new();
        let now = now_i();

        for expectation in self.store.list_enabled_expectations().await? {
            if expectation.exp_type != ExpectationType::Schedule {
                continue;
            }
            let threshold = expectation.expected_interval_s + expectation.tolerance_s;
            let last_start = self
                .store
                .last_observation_time(&expectation.id, Some(ObservationKind::Start))
                .await?;
            let should_be_missed = last_start.is_some_and(|start| now - start > threshold);
            let has_violation = self.store.open_violation(&expectation.id, ViolationCode::Missed).await?.is_some();

            results.push(invariant(
                format!("inv_missed_correct:{}", expectation.id),
                should_be_missed == has_violation,
                "Missed violation state matches evidence",
                || {
                    json!({
                        "last_start": last_start,
                        "threshold": threshold,
                        "now": now,
                        "age": last_start.map(|s| now - s),
                        "should_be_missed": should_be_missed,
                        "has_violation": has_violation,
                    })
                },
            ));
        }

        Ok(results)
    }

    /// INV2: a `longrun` violation exists iff the running duration of the
    /// current (unmatched) run exceeds `max_runtime_s`, when that check is
    /// enabled (`max_runtime_s != 0`).
    async fn check_longrun_correct(&self) -> Result<Vec<InvariantResult>, rewire_store::StoreError> {
        let mut results = Vec::new();
        let now = now_i();

        for expectation in self.store.list_enabled_expectations().await? {
            if expectation.exp_type != ExpectationType::Schedule {
                continue;
            }
            let Some(params) = expectation.params.as_schedule() else { continue };
            if params.max_runtime_s == 0 {
                continue;
            }

            let last_start = self
                .store
                .last_observation_time(&expectation.id, Some(ObservationKind::Start))
                .await?;
            let last_end = self
                .store
                .last_observation_time(&expectation.id, Some(ObservationKind::End))
                .await?;
            let is_running = last_start.is_some_and(|start| last_end.is_none_or(|end| start > end));
            let should_be_longrun = is_running && last_start.is_some_and(|start| now - start > params.max_runtime_s);
            let has_violation = self.store.open_violation(&expectation.id, ViolationCode::Longrun).await?.is_some();

            results.push(invariant(
                format!("inv_longrun_correct:{}", expectation.id),
                should_be_longrun == has_violation,
                "Longrun violation state matches evidence",
                || {
                    json!({
                        "last_start": last_start,
                        "last_end": last_end,
                        "is_running": is_running,
                        "max_runtime_s": params.max_runtime_s,
                    })
                },
            ));
        }

        Ok(results)
    }

    /// INV3 & INV4: `status=acked` implies `acked_at` is set;
    /// `status=expired` implies `acked_at` is absent.
    async fn check_trial_states(&self) -> Result<Vec<InvariantResult>, rewire_store::StoreError> {
        let mut results = Vec::new();

        for trial in self.store.all_trials().await? {
            match trial.status {
                TrialStatus::Acked => {
                    results.push(invariant(
                        format!("inv_acked_has_timestamp:{}", trial.id),
                        trial.acked_at.is_some_and(|t| t > 0),
                        "Acked trial has timestamp",
                        || json!({"acked_at": trial.acked_at}),
                    ));
                }
                TrialStatus::Expired => {
                    results.push(invariant(
                        format!("inv_expired_not_acked:{}", trial.id),
                        trial.acked_at.is_none(),
                        "Expired trial has no acked_at",
                        || json!({"acked_at": trial.acked_at}),
                    ));
                }
                TrialStatus::Pending => {}
            }
        }

        Ok(results)
    }

    /// INV5: observations are append-only with non-increasing timestamps
    /// when read newest-first.
    async fn check_observation_monotonicity(&self) -> Result<Vec<InvariantResult>, rewire_store::StoreError> {
        let mut results = Vec::new();

        for expectation in self.store.list_enabled_expectations().await? {
            let observations = self.store.all_observations(&expectation.id).await?;
            let mut prev: Option<i64> = None;
            let mut monotonic = true;
            for observation in &observations {
                if let Some(prev_time) = prev {
                    if observation.observed_at > prev_time {
                        monotonic = false;
                        break;
                    }
                }
                prev = Some(observation.observed_at);
            }

            results.push(invariant(
                format!("inv_observation_monotonic:{}", expectation.id),
                monotonic,
                format!("Observations monotonic ({} checked)", observations.len()),
                || Value::Null,
            ));
        }

        Ok(results)
    }
}

fn invariant(
    name: String,
    passed: bool,
    message: impl Into<String>,
    evidence: impl FnOnce() -> Value,
) -> InvariantResult {
    InvariantResult {
        name,
        passed,
        message: message.into(),
        evidence: if passed { None } else { Some(evidence()) },
    }
}
