use std::time::{SystemTime, UNIX_EPOCH};

use rewire_core::{
    schedule_evaluate, Evidence, Expectation, ExpectationType, ObservationKind, ViolationCode,
};
use rewire_notify::{EmailNotifier, WebhookEvent, WebhookNotifier, WebhookPayload};
use rewire_store::SqliteStore;
use serde_json::json;
use tokio::time::MissedTickBehavior;

use crate::config::CheckerConfig;
use crate::error::CheckerError;

fn now_i() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

/// Summary of one completed tick, logged at `info` per SPEC_FULL.md §9.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickReport {
    pub evaluated: u32,
    pub opened: u32,
    pub closed: u32,
    pub errors: u32,
}

/// The periodic evaluator: walks enabled expectations, reconciles
/// violation state against evidence, drives alert-path trials, and
/// dispatches notifications for newly-opened (or re-notifiable)
/// violations. Runs as a single coordinator loop, non-overlapping with
/// itself (SPEC_FULL.md §4.3).
pub struct Checker {
    store: SqliteStore,
    email: EmailNotifier,
    webhooks: WebhookNotifier,
    config: CheckerConfig,
}

impl Checker {
    #[must_use]
    pub const fn new(store: SqliteStore, email: EmailNotifier, webhooks: WebhookNotifier, config: CheckerConfig) -> Self {
        Self { store, email, webhooks, config }
    }

    /// Runs the tick loop forever on `config.check_every_s`, until
    /// `shutdown` resolves. Each tick runs to completion (every enabled
    /// expectation) before the next is scheduled; the wait between ticks
    /// is interrupted immediately by shutdown.
    pub async fn run(&self, shutdown: impl std::future::Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(self.config.check_every_s));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    match report {
                        Ok(report) => tracing::info!(
                            evaluated = report.evaluated,
                            opened = report.opened,
                            closed = report.closed,
                            errors = report.errors,
                            "checker tick complete"
                        ),
                        Err(error) => tracing::error!(%error, "checker tick aborted"),
                    }
                }
                () = &mut shutdown => {
                    tracing::info!("checker stopping");
                    break;
                }
            }
        }
    }

    /// Runs one evaluation pass over every enabled expectation.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError`] only for a failure that prevents listing
    /// expectations at all; a failure evaluating one expectation is
    /// logged at `warn` and does not stop the tick.
    pub async fn tick(&self) -> Result<TickReport, CheckerError> {
        let expectations = self.store.list_enabled_expectations().await?;
        let now = now_i();
        let mut report = TickReport { evaluated: expectations.len() as u32, ..TickReport::default() };

        for expectation in &expectations {
            let outcome = match expectation.exp_type {
                ExpectationType::Schedule => self.check_schedule(expectation, now).await,
                ExpectationType::AlertPath => self.check_alertpath(expectation, now).await,
            };
            match outcome {
                Ok((opened, closed)) => {
                    report.opened += opened;
                    report.closed += closed;
                }
                Err(error) => {
                    report.errors += 1;
                    tracing::warn!(expectation_id = %expectation.id, %error, "expectation evaluation failed");
                }
            }
        }

        Ok(report)
    }

    async fn check_schedule(
        &self,
        expectation: &Expectation,
        now: i64,
    ) -> Result<(u32, u32), rewire_store::StoreError> {
        let observations = self.store.recent_observations(&expectation.id, 80).await?;
        let outcome = schedule_evaluate(expectation, &observations, now);

        let closed = self.close_with_recovery(expectation, &outcome.close).await?;

        let mut opened = 0;
        for (code, message, evidence) in &outcome.open {
            if self.open_or_renotify(expectation, *code, message, evidence, now).await? {
                opened += 1;
            }
        }

        Ok((opened, closed))
    }

    async fn check_alertpath(
        &self,
        expectation: &Expectation,
        now: i64,
    ) -> Result<(u32, u32), rewire_store::StoreError> {
        let Some(params) = expectation.params.as_alert_path() else {
            return Ok((0, 0));
        };

        let last_obs = self.store.last_observation_time(&expectation.id, None).await?;
        if rewire_core::alertpath_should_send_test(expectation, last_obs, now) {
            self.send_alertpath_test(expectation).await?;
        }

        let mut opened = 0;
        let pending = self.store.pending_trials(&expectation.id).await?;
        for trial in &pending {
            let age = now - trial.sent_at;
            if age > params.ack_window_s + expectation.tolerance_s {
                self.store.expire_trial(&trial.id).await?;
                let message = format!(
                    "No ACK received within {}s (+{}s).",
                    params.ack_window_s, expectation.tolerance_s
                );
                let evidence = Evidence::new([
                    ("trial_id", json!(trial.id)),
                    ("sent_at", json!(trial.sent_at)),
                    ("age_s", json!(age)),
                ]);
                if self
                    .open_or_renotify(expectation, ViolationCode::NoAck, &message, &evidence, now)
                    .await?
                {
                    opened += 1;
                }
            }
        }

        // Recovery evidence for `no_ack` is a later trial's successful ack —
        // never the mere passage of time (diverges deliberately from the
        // reference implementation's unconditional close here; see
        // DESIGN.md).
        let closed = match self.store.latest_trial(&expectation.id).await? {
            Some(trial) if trial.status == rewire_core::TrialStatus::Acked => {
                self.close_with_recovery(expectation, &[ViolationCode::NoAck]).await?
            }
            _ => 0,
        };
        Ok((opened, closed))
    }

    /// Closes `codes` for `expectation`, optionally emitting a
    /// `violation.closed` webhook per closed row when `send_recovery` is
    /// configured. The pre-close lookup is only performed when recovery
    /// notices are enabled, so the common (disabled) path costs one UPDATE
    /// and nothing else.
    async fn close_with_recovery(
        &self,
        expectation: &Expectation,
        codes: &[ViolationCode],
    ) -> Result<u32, rewire_store::StoreError> {
        if codes.is_empty() {
            return Ok(0);
        }

        let mut closing = Vec::new();
        if self.config.send_recovery {
            for &code in codes {
                if let Some(violation) = self.store.open_violation(&expectation.id, code).await? {
                    closing.push(violation);
                }
            }
        }

        let closed = self.store.close_violations(&expectation.id, codes).await? as u32;

        for violation in closing {
            self.notify_closed(expectation, violation.code, &violation.message, &violation.evidence)
                .await;
        }

        Ok(closed)
    }

    /// Emits a `violation.closed` webhook event for a recovered violation.
    /// No email is composed — recovery is a quieter signal than an open
    /// violation, and the spec only requires an email for the opened case.
    async fn notify_closed(&self, expectation: &Expectation, code: ViolationCode, message: &str, evidence: &Evidence) {
        if self.webhooks.is_empty() {
            return;
        }
        let payload = WebhookPayload {
            event: WebhookEvent::ViolationClosed,
            expectation_id: expectation.id.clone(),
            expectation_name: expectation.name.clone(),
            expectation_type: expectation.exp_type.as_str().to_string(),
            violation_code: Some(code.as_str().to_string()),
            message: message.to_string(),
            evidence: evidence.0.clone(),
            timestamp: now_i(),
        };
        self.webhooks.notify(&payload).await;
    }

    async fn send_alertpath_test(&self, expectation: &Expectation) -> Result<(), rewire_store::StoreError> {
        let trial_id = rewire_core::generate_token(16);
        let ack_url = format!("{}/ack/{trial_id}", self.config.base_url.trim_end_matches('/'));
        let meta = json!({"ack_url": ack_url, "note": "synthetic test"}).to_string();
        self.store.create_trial(&trial_id, &expectation.id, &meta).await?;
        self.store
            .add_observation(&expectation.id, ObservationKind::Ping, Some(&json!({"sent_trial": trial_id}).to_string()))
            .await?;

        let subject = format!("[rewire] Alert-path test: {}", expectation.name);
        let body = format!(
            "This is a synthetic Rewire alert-path test.\n\n\
             Path: {}\n\
             Expectation ID: {}\n\
             To acknowledge delivery, open this link:\n{ack_url}\n\n\
             If no ack is received in time, Rewire will open a violation.\n",
            expectation.name, expectation.id
        );
        if let Err(error) = self.email.send_email(&expectation.owner_email, &subject, &body).await {
            tracing::warn!(expectation_id = %expectation.id, %error, "alert-path test email failed");
        }
        Ok(())
    }

    /// Opens a new violation, or re-notifies an already-open one if
    /// `renotify_after_s` is configured and elapsed. Returns whether a
    /// *new* violation was opened (used only for the tick summary).
    async fn open_or_renotify(
        &self,
        expectation: &Expectation,
        code: ViolationCode,
        message: &str,
        evidence: &Evidence,
        now: i64,
    ) -> Result<bool, rewire_store::StoreError> {
        match self.store.open_violation(&expectation.id, code).await? {
            None => {
                let violation_id = self.store.create_violation(&expectation.id, code, message, evidence).await?;
                self.notify_violation(expectation, code, message, evidence, violation_id, WebhookEvent::ViolationOpened)
                    .await;
                Ok(true)
            }
            Some(existing) => {
                let due = self.config.renotify_after_s > 0
                    && existing
                        .last_notified_at
                        .is_some_and(|last| now - last >= self.config.renotify_after_s);
                if due {
                    self.notify_violation(
                        expectation,
                        code,
                        &existing.message,
                        &existing.evidence,
                        existing.id,
                        WebhookEvent::ViolationOpened,
                    )
                    .await;
                }
                Ok(false)
            }
        }
    }

    async fn notify_violation(
        &self,
        expectation: &Expectation,
        code: ViolationCode,
        message: &str,
        evidence: &Evidence,
        violation_id: i64,
        event: WebhookEvent,
    ) {
        let subject = format!("[rewire] VIOLATION {code}: {}", expectation.name);
        let body = format!(
            "Rewire detected an expectation violation.\n\n\
             Name: {}\nType: {}\nCode: {code}\nMessage: {message}\n\n\
             Evidence:\n{}\n\n\
             Rewire reports only mismatches it can justify with evidence.\n",
            expectation.name,
            expectation.exp_type,
            serde_json::to_string_pretty(&evidence.0).unwrap_or_default(),
        );
        if let Err(error) = self.email.send_email(&expectation.owner_email, &subject, &body).await {
            tracing::warn!(expectation_id = %expectation.id, %error, "violation email failed");
        }

        if !self.webhooks.is_empty() {
            let payload = WebhookPayload {
                event,
                expectation_id: expectation.id.clone(),
                expectation_name: expectation.name.clone(),
                expectation_type: expectation.exp_type.as_str().to_string(),
                violation_code: Some(code.as_str().to_string()),
                message: message.to_string(),
                evidence: evidence.0.clone(),
                timestamp: now_i(),
            };
            self.webhooks.notify(&payload).await;
        }

        self.store.mark_notified(violation_id).await.unwrap_or_else(|error| {
            tracing::warn!(expectation_id = %expectation.id, %error, "failed to stamp last_notified_at");
        });
    }
}
