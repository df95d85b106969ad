//! SQLite-backed durable storage for Rewire.
//!
//! `SqliteStore` is the sole owner of the four entity tables described in
//! SPEC_FULL.md §3: expectations, observations, alert trials, and
//! violations. Every public method is its own transaction-equivalent
//! unit of work (a single autocommit statement or an explicit `BEGIN
//! ... COMMIT` where more than one statement must be atomic); no
//! multi-call transaction is exposed, matching §4.1's contract.

mod error;
mod schema;

use std::time::{SystemTime, UNIX_EPOCH};

use rewire_core::{
    AlertTrial, Evidence, Expectation, ExpectationType, Observation, ObservationKind,
    TrialStatus, Violation, ViolationCode,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

pub use error::StoreError;

fn now_i() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

/// SQLite-backed implementation of the Store contract from SPEC_FULL.md §4.1.
///
/// Thread-safe via connection pooling: `sqlx::SqlitePool` permits concurrent
/// readers while a writer holds SQLite's `WAL`-mode write lock, matching the
/// single-writer-serialized / snapshot-read discipline the spec requires.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if absent) a SQLite database at `connection_string`
    /// and initializes the schema. `connection_string` is a `sqlx` SQLite
    /// URL, e.g. `sqlite:./rewire.db` or `sqlite::memory:`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the pool cannot be established
    /// or the schema fails to initialize; per SPEC_FULL.md §7 this is a
    /// fatal startup error, not a retriable one.
    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        Self::with_pool_size(connection_string, 8).await
    }

    /// Like [`Self::connect`], with an explicit maximum pool size.
    ///
    /// # Errors
    ///
    /// See [`Self::connect`].
    pub async fn with_pool_size(connection_string: &str, max_size: u32) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_size)
            .connect(connection_string)
            .await?;
        sqlx::query(schema::SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Opens an in-memory database, schema-initialized. Intended for tests.
    ///
    /// # Errors
    ///
    /// See [`Self::connect`].
    pub async fn in_memory() -> Result<Self, StoreError> {
        // A single pooled connection: `sqlite::memory:` creates a fresh,
        // unshared database per connection, so a pool of >1 would silently
        // fragment state across callers.
        Self::with_pool_size("sqlite::memory:", 1).await
    }

    // === Expectations ===

    /// Inserts a new expectation. `enabled` starts `true`; `created_at`
    /// and `updated_at` are stamped to now.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateExpectationId`] if `id` already
    /// exists, or a validation error if `expected_interval_s < 60` or
    /// `tolerance_s < 0`.
    pub async fn create_expectation(
        &self,
        id: &str,
        exp_type: ExpectationType,
        name: &str,
        owner_email: &str,
        expected_interval_s: i64,
        tolerance_s: i64,
        params_json: &str,
    ) -> Result<(), StoreError> {
        if expected_interval_s < 60 {
            return Err(rewire_core::CoreError::IntervalTooShort(expected_interval_s).into());
        }
        if tolerance_s < 0 {
            return Err(rewire_core::CoreError::NegativeTolerance(tolerance_s).into());
        }
        // Validate that the params parse for this type before committing a row.
        rewire_core::parse_params(exp_type, params_json)?;

        let t = now_i();
        let result = sqlx::query(
            "INSERT INTO expectations
               (id, type, name, expected_interval_s, tolerance_s,
                params_json, owner_email, is_enabled, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(id)
        .bind(exp_type.as_str())
        .bind(name)
        .bind(expected_interval_s)
        .bind(tolerance_s)
        .bind(params_json)
        .bind(owner_email)
        .bind(t)
        .bind(t)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateExpectationId(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reads one expectation by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn get_expectation(&self, id: &str) -> Result<Option<Expectation>, StoreError> {
        let row = sqlx::query("SELECT * FROM expectations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(expectation_from_row).transpose()
    }

    /// Lists every expectation with `is_enabled = 1`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn list_enabled_expectations(&self) -> Result<Vec<Expectation>, StoreError> {
        let rows = sqlx::query("SELECT * FROM expectations WHERE is_enabled = 1")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(expectation_from_row).collect()
    }

    /// Enables or disables an expectation and bumps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    ///
    /// Returns `Ok(false)` rather than an error when `id` does not match
    /// any row — matching the Store contract's "returns whether a row
    /// matched" semantics.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE expectations SET is_enabled = ?, updated_at = ? WHERE id = ?")
            .bind(enabled)
            .bind(now_i())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // === Observations ===

    /// Appends an observation, stamping `observed_at = now`. Returns the
    /// new `seq`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn add_observation(
        &self,
        expectation_id: &str,
        kind: ObservationKind,
        meta: Option<&str>,
    ) -> Result<i64, StoreError> {
        let t = now_i();
        let result = sqlx::query(
            "INSERT INTO observations (expectation_id, kind, observed_at, meta_json)
             VALUES (?, ?, ?, ?)",
        )
        .bind(expectation_id)
        .bind(kind.as_str())
        .bind(t)
        .bind(meta)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Returns the most recent `limit` observations for an expectation,
    /// newest-first by `observed_at` then `seq` — the tie-break order
    /// [`rewire_core::schedule_evaluate`] requires.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure, or a
    /// parse error if a stored `kind` is not one of the four known values
    /// (schema `CHECK` constraints make this unreachable in practice).
    pub async fn recent_observations(
        &self,
        expectation_id: &str,
        limit: i64,
    ) -> Result<Vec<Observation>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM observations
             WHERE expectation_id = ?
             ORDER BY observed_at DESC, id DESC
             LIMIT ?",
        )
        .bind(expectation_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(observation_from_row).collect()
    }

    /// Returns the timestamp of the most recent observation, optionally
    /// filtered to one `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn last_observation_time(
        &self,
        expectation_id: &str,
        kind: Option<ObservationKind>,
    ) -> Result<Option<i64>, StoreError> {
        let row = if let Some(kind) = kind {
            sqlx::query(
                "SELECT observed_at FROM observations
                 WHERE expectation_id = ? AND kind = ?
                 ORDER BY observed_at DESC LIMIT 1",
            )
            .bind(expectation_id)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT observed_at FROM observations
                 WHERE expectation_id = ?
                 ORDER BY observed_at DESC LIMIT 1",
            )
            .bind(expectation_id)
            .fetch_optional(&self.pool)
            .await?
        };
        Ok(row.map(|r| r.get::<i64, _>("observed_at")))
    }

    // === Alert trials ===

    /// Creates a pending alert trial.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn create_trial(
        &self,
        id: &str,
        expectation_id: &str,
        meta_json: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO alert_trials (id, expectation_id, sent_at, acked_at, status, meta_json)
             VALUES (?, ?, ?, NULL, 'pending', ?)",
        )
        .bind(id)
        .bind(expectation_id)
        .bind(now_i())
        .bind(meta_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Transitions a trial `pending -> acked`. Returns whether the
    /// transition happened — `false` if the trial is unknown or already
    /// terminal, making this safe to call twice (§8 invariant 6).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn ack_trial(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE alert_trials SET acked_at = ?, status = 'acked'
             WHERE id = ? AND status = 'pending'",
        )
        .bind(now_i())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lists every trial in `pending` status for an expectation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn pending_trials(&self, expectation_id: &str) -> Result<Vec<AlertTrial>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM alert_trials WHERE expectation_id = ? AND status = 'pending'",
        )
        .bind(expectation_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(trial_from_row).collect()
    }

    /// Transitions a trial `pending -> expired`. A no-op (not an error)
    /// if the trial is unknown or already terminal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn expire_trial(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE alert_trials SET status = 'expired' WHERE id = ? AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns the most recently sent trial for an expectation, if any.
    /// Used by the Checker to decide whether a `no_ack` violation has
    /// recovered: only a later trial's successful ack counts as evidence
    /// of recovery, never the mere passage of time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn latest_trial(&self, expectation_id: &str) -> Result<Option<AlertTrial>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM alert_trials WHERE expectation_id = ? ORDER BY sent_at DESC, rowid DESC LIMIT 1",
        )
        .bind(expectation_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(trial_from_row).transpose()
    }

    // === Violations ===

    /// Returns the single open violation for `(expectation_id, code)`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn open_violation(
        &self,
        expectation_id: &str,
        code: ViolationCode,
    ) -> Result<Option<Violation>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM violations
             WHERE expectation_id = ? AND code = ? AND is_open = 1
             ORDER BY detected_at DESC LIMIT 1",
        )
        .bind(expectation_id)
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(violation_from_row).transpose()
    }

    /// Inserts a new open violation. Returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn create_violation(
        &self,
        expectation_id: &str,
        code: ViolationCode,
        message: &str,
        evidence: &Evidence,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO violations
               (expectation_id, detected_at, code, message, evidence_json, is_open, last_notified_at)
             VALUES (?, ?, ?, ?, ?, 1, NULL)",
        )
        .bind(expectation_id)
        .bind(now_i())
        .bind(code.as_str())
        .bind(message)
        .bind(evidence.to_json_string())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Closes every open violation for `expectation_id` whose code is in
    /// `codes`. Returns the number of rows closed. A no-op (`Ok(0)`, no
    /// query issued) when `codes` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn close_violations(
        &self,
        expectation_id: &str,
        codes: &[ViolationCode],
    ) -> Result<u64, StoreError> {
        if codes.is_empty() {
            return Ok(0);
        }
        let placeholders = codes.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "UPDATE violations SET is_open = 0
             WHERE expectation_id = ? AND is_open = 1 AND code IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql).bind(expectation_id);
        for code in codes {
            query = query.bind(code.as_str());
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Stamps `last_notified_at = now` on a violation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn mark_notified(&self, violation_id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE violations SET last_notified_at = ? WHERE id = ?")
            .bind(now_i())
            .bind(violation_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Counts open violations, optionally scoped to one expectation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn open_violations_count(&self, expectation_id: Option<&str>) -> Result<i64, StoreError> {
        let row = if let Some(id) = expectation_id {
            sqlx::query("SELECT COUNT(*) AS cnt FROM violations WHERE expectation_id = ? AND is_open = 1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query("SELECT COUNT(*) AS cnt FROM violations WHERE is_open = 1")
                .fetch_one(&self.pool)
                .await?
        };
        Ok(row.get("cnt"))
    }

    /// Returns every observation for an expectation, newest-first. Used
    /// by the `InvariantProbe` to check monotonicity over the full
    /// history rather than a capped recent window.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn all_observations(&self, expectation_id: &str) -> Result<Vec<Observation>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM observations WHERE expectation_id = ? ORDER BY observed_at DESC, id DESC",
        )
        .bind(expectation_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(observation_from_row).collect()
    }

    /// Returns every alert trial in the database, regardless of status.
    /// Used by the `InvariantProbe` to verify trial state invariants
    /// hold globally, not just for pending trials.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on a transport failure.
    pub async fn all_trials(&self) -> Result<Vec<AlertTrial>, StoreError> {
        let rows = sqlx::query("SELECT * FROM alert_trials").fetch_all(&self.pool).await?;
        rows.into_iter().map(trial_from_row).collect()
    }
}

fn expectation_from_row(row: SqliteRow) -> Result<Expectation, StoreError> {
    let exp_type: ExpectationType = row.get::<String, _>("type").parse()?;
    let params_json: String = row.get("params_json");
    let params = rewire_core::parse_params(exp_type, &params_json)?;
    Ok(Expectation {
        id: row.get("id"),
        exp_type,
        name: row.get("name"),
        owner_email: row.get("owner_email"),
        expected_interval_s: row.get("expected_interval_s"),
        tolerance_s: row.get("tolerance_s"),
        params,
        enabled: row.get("is_enabled"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn observation_from_row(row: SqliteRow) -> Result<Observation, StoreError> {
    let kind: ObservationKind = row.get::<String, _>("kind").parse()?;
    Ok(Observation {
        seq: row.get("id"),
        expectation_id: row.get("expectation_id"),
        kind,
        observed_at: row.get("observed_at"),
        meta: row.get("meta_json"),
    })
}

fn trial_from_row(row: SqliteRow) -> Result<AlertTrial, StoreError> {
    let status = match row.get::<String, _>("status").as_str() {
        "pending" => TrialStatus::Pending,
        "acked" => TrialStatus::Acked,
        "expired" => TrialStatus::Expired,
        other => {
            return Err(rewire_core::CoreError::InvalidParams {
                expectation_type: "alert_trial_status",
                reason: format!("unknown status: {other}"),
            }
            .into())
        }
    };
    Ok(AlertTrial {
        id: row.get("id"),
        expectation_id: row.get("expectation_id"),
        sent_at: row.get("sent_at"),
        acked_at: row.get("acked_at"),
        status,
        meta: row.get("meta_json"),
    })
}

fn violation_from_row(row: SqliteRow) -> Result<Violation, StoreError> {
    let code: ViolationCode = row.get::<String, _>("code").parse()?;
    let evidence_json: String = row.get("evidence_json");
    Ok(Violation {
        id: row.get("id"),
        expectation_id: row.get("expectation_id"),
        code,
        message: row.get("message"),
        evidence: Evidence::from_json_str(&evidence_json)?,
        detected_at: row.get("detected_at"),
        last_notified_at: row.get("last_notified_at"),
        is_open: row.get("is_open"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewire_core::generate_token;
    use serde_json::json;

    async fn store() -> SqliteStore {
        SqliteStore::in_memory().await.expect("in-memory store")
    }

    async fn make_schedule(store: &SqliteStore, id: &str) {
        store
            .create_expectation(
                id,
                ExpectationType::Schedule,
                "nightly-etl",
                "owner@example.com",
                60,
                10,
                "{}",
            )
            .await
            .expect("create");
    }

    #[tokio::test]
    async fn create_then_get_round_trips_fields() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        let got = store.get_expectation("exp-1").await.unwrap().expect("present");
        assert_eq!(got.id, "exp-1");
        assert_eq!(got.name, "nightly-etl");
        assert_eq!(got.expected_interval_s, 60);
        assert!(got.enabled);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        let err = store
            .create_expectation(
                "exp-1",
                ExpectationType::Schedule,
                "other",
                "owner@example.com",
                60,
                0,
                "{}",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateExpectationId(_)));
    }

    #[tokio::test]
    async fn interval_too_short_is_rejected() {
        let store = store().await;
        let err = store
            .create_expectation(
                "exp-1",
                ExpectationType::Schedule,
                "other",
                "owner@example.com",
                30,
                0,
                "{}",
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidExpectation(rewire_core::CoreError::IntervalTooShort(30))
        ));
    }

    #[tokio::test]
    async fn set_enabled_reports_whether_a_row_matched() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        assert!(store.set_enabled("exp-1", false).await.unwrap());
        assert!(!store.get_expectation("exp-1").await.unwrap().unwrap().enabled);
        assert!(!store.set_enabled("no-such-id", false).await.unwrap());
    }

    #[tokio::test]
    async fn observations_are_ordered_newest_first_with_seq_tiebreak() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        store.add_observation("exp-1", ObservationKind::Start, None).await.unwrap();
        store.add_observation("exp-1", ObservationKind::End, None).await.unwrap();
        let obs = store.recent_observations("exp-1", 10).await.unwrap();
        assert_eq!(obs.len(), 2);
        assert!(obs[0].seq > obs[1].seq);
    }

    #[tokio::test]
    async fn last_observation_time_filters_by_kind() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        store.add_observation("exp-1", ObservationKind::Start, None).await.unwrap();
        store.add_observation("exp-1", ObservationKind::End, None).await.unwrap();
        assert!(store
            .last_observation_time("exp-1", Some(ObservationKind::Start))
            .await
            .unwrap()
            .is_some());
        assert!(store
            .last_observation_time("exp-1", Some(ObservationKind::Ack))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn trial_ack_is_idempotent_after_success() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        let trial_id = generate_token(16);
        store.create_trial(&trial_id, "exp-1", r#"{"ack_url":"x"}"#).await.unwrap();
        assert!(store.ack_trial(&trial_id).await.unwrap());
        assert!(!store.ack_trial(&trial_id).await.unwrap());
    }

    #[tokio::test]
    async fn latest_trial_picks_the_most_recently_sent_one() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        let first = generate_token(16);
        let second = generate_token(16);
        store.create_trial(&first, "exp-1", "{}").await.unwrap();
        store.create_trial(&second, "exp-1", "{}").await.unwrap();
        store.ack_trial(&second).await.unwrap();
        let latest = store.latest_trial("exp-1").await.unwrap().expect("a trial exists");
        assert_eq!(latest.id, second);
        assert_eq!(latest.status, TrialStatus::Acked);
    }

    #[tokio::test]
    async fn expire_is_noop_on_already_acked_trial() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        let trial_id = generate_token(16);
        store.create_trial(&trial_id, "exp-1", "{}").await.unwrap();
        store.ack_trial(&trial_id).await.unwrap();
        store.expire_trial(&trial_id).await.unwrap();
        let trials = store.all_trials().await.unwrap();
        assert_eq!(trials[0].status, TrialStatus::Acked);
    }

    #[tokio::test]
    async fn create_violation_then_open_violation_round_trips() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        let evidence = Evidence::new([("age_s", json!(71))]);
        store
            .create_violation("exp-1", ViolationCode::Missed, "late", &evidence)
            .await
            .unwrap();
        let open = store
            .open_violation("exp-1", ViolationCode::Missed)
            .await
            .unwrap()
            .expect("open violation present");
        assert_eq!(open.message, "late");
        assert!(open.is_open);
    }

    #[tokio::test]
    async fn close_violations_clears_open_state() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        let evidence = Evidence::new([]);
        store
            .create_violation("exp-1", ViolationCode::Missed, "late", &evidence)
            .await
            .unwrap();
        let closed = store
            .close_violations("exp-1", &[ViolationCode::Missed])
            .await
            .unwrap();
        assert_eq!(closed, 1);
        assert!(store.open_violation("exp-1", ViolationCode::Missed).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn close_violations_with_empty_codes_is_a_noop() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        let closed = store.close_violations("exp-1", &[]).await.unwrap();
        assert_eq!(closed, 0);
    }

    #[tokio::test]
    async fn open_violations_count_scopes_by_expectation() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        make_schedule(&store, "exp-2").await;
        let evidence = Evidence::new([]);
        store.create_violation("exp-1", ViolationCode::Missed, "m", &evidence).await.unwrap();
        store.create_violation("exp-2", ViolationCode::Missed, "m", &evidence).await.unwrap();
        assert_eq!(store.open_violations_count(Some("exp-1")).await.unwrap(), 1);
        assert_eq!(store.open_violations_count(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn mark_notified_stamps_last_notified_at() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        let evidence = Evidence::new([]);
        let id = store.create_violation("exp-1", ViolationCode::Missed, "m", &evidence).await.unwrap();
        store.mark_notified(id).await.unwrap();
        let v = store.open_violation("exp-1", ViolationCode::Missed).await.unwrap().unwrap();
        assert!(v.last_notified_at.is_some());
    }

    #[tokio::test]
    async fn list_enabled_expectations_excludes_disabled() {
        let store = store().await;
        make_schedule(&store, "exp-1").await;
        make_schedule(&store, "exp-2").await;
        store.set_enabled("exp-2", false).await.unwrap();
        let enabled = store.list_enabled_expectations().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, "exp-1");
    }
}
