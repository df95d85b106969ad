use serde_json::json;

use crate::model::{Evidence, Expectation, Observation, ObservationKind, ViolationCode};

/// The result of evaluating a schedule expectation against its observations.
///
/// `open` pairs each code a caller must open-if-not-already with the
/// human-readable message and evidence bag to attach; `close` lists codes a
/// caller must close-if-open. The two sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub open: Vec<(ViolationCode, String, Evidence)>,
    pub close: Vec<ViolationCode>,
}

impl RuleOutcome {
    fn open(&mut self, code: ViolationCode, message: impl Into<String>, evidence: Evidence) {
        self.open.push((code, message.into(), evidence));
    }

    fn close(&mut self, code: ViolationCode) {
        self.close.push(code);
    }
}

/// Evaluates a schedule expectation's constraints against its observations.
///
/// `observations_desc` must be ordered newest-first by `observed_at`, with
/// ties broken by `seq` descending (the order [`crate::Observation`] rows
/// come back from Store's `recent_observations`). `now` is injected rather
/// than read from the system clock so the function stays pure and
/// trivially testable.
///
/// Per the epistemic-silence principle: if no `start` has ever been
/// observed, this returns an empty outcome — absence of starts is never
/// evidence of lateness.
#[must_use]
pub fn schedule_evaluate(
    expectation: &Expectation,
    observations_desc: &[Observation],
    now: i64,
) -> RuleOutcome {
    let mut outcome = RuleOutcome::default();

    let Some(params) = expectation.params.as_schedule() else {
        return outcome;
    };

    let Some(last_start) = observations_desc
        .iter()
        .find(|o| o.kind == ObservationKind::Start)
    else {
        return outcome;
    };

    let start_at = last_start.observed_at;

    // 1. missed
    let age = now - start_at;
    let threshold = expectation.expected_interval_s + expectation.tolerance_s;
    if age > threshold {
        outcome.open(
            ViolationCode::Missed,
            format!(
                "Expected a start within {}s (+{}s); last start was {}s ago.",
                expectation.expected_interval_s, expectation.tolerance_s, age
            ),
            Evidence::new([
                ("last_start_at", json!(start_at)),
                ("age_s", json!(age)),
                ("expected_s", json!(expectation.expected_interval_s)),
                ("tolerance_s", json!(expectation.tolerance_s)),
            ]),
        );
    } else {
        outcome.close(ViolationCode::Missed);
    }

    // 2. longrun / overlap / spacing
    let newer_end = observations_desc
        .iter()
        .find(|o| o.kind == ObservationKind::End && o.observed_at >= start_at);

    match newer_end {
        None => {
            // Job presumed running.
            let run_for = now - start_at;
            if params.max_runtime_s > 0 && run_for > params.max_runtime_s {
                outcome.open(
                    ViolationCode::Longrun,
                    format!(
                        "Run exceeded max_runtime_s={}; running for {}s.",
                        params.max_runtime_s, run_for
                    ),
                    Evidence::new([
                        ("start_at", json!(start_at)),
                        ("running_for_s", json!(run_for)),
                        ("max_runtime_s", json!(params.max_runtime_s)),
                    ]),
                );
            } else {
                outcome.close(ViolationCode::Longrun);
            }

            if !params.allow_overlap {
                let overlapping_start = observations_desc.iter().find(|o| {
                    o.kind == ObservationKind::Start && o.observed_at < start_at
                }).filter(|candidate| {
                    !observations_desc.iter().any(|o| {
                        o.kind == ObservationKind::End && o.observed_at >= candidate.observed_at
                    })
                });

                match overlapping_start {
                    Some(other) => outcome.open(
                        ViolationCode::Overlap,
                        "Detected overlapping runs.",
                        Evidence::new([
                            ("newest_start_at", json!(start_at)),
                            ("other_start_at", json!(other.observed_at)),
                        ]),
                    ),
                    None => outcome.close(ViolationCode::Overlap),
                }
            }
            // allow_overlap=true: overlap is never raised, and we leave any
            // prior state alone rather than forcing a close every tick.
        }
        Some(end) => {
            // Job completed: longrun/overlap no longer apply.
            outcome.close(ViolationCode::Longrun);
            outcome.close(ViolationCode::Overlap);
            let _ = end;

            if params.min_spacing_s > 0 {
                let prev_end = observations_desc
                    .iter()
                    .find(|o| o.kind == ObservationKind::End && o.observed_at < start_at);

                if let Some(prev_end) = prev_end {
                    let gap = start_at - prev_end.observed_at;
                    if gap < params.min_spacing_s {
                        outcome.open(
                            ViolationCode::Spacing,
                            format!(
                                "Start occurred {}s after previous end; min_spacing_s={}.",
                                gap, params.min_spacing_s
                            ),
                            Evidence::new([
                                ("gap_s", json!(gap)),
                                ("min_spacing_s", json!(params.min_spacing_s)),
                                ("prev_end_at", json!(prev_end.observed_at)),
                                ("start_at", json!(start_at)),
                            ]),
                        );
                    } else {
                        outcome.close(ViolationCode::Spacing);
                    }
                }
                // No prior end at all: nothing to measure the gap against yet.
            }
        }
    }

    outcome
}

/// Determines whether the Checker should send a fresh synthetic alert-path
/// test: true if no prior observation of any kind exists, else true iff
/// `now - last_obs_time >= test_interval_s`.
///
/// `last_obs_time` considers any observation kind, including the synthetic
/// `ping`s the Checker itself records when a test is sent.
#[must_use]
pub fn alertpath_should_send_test(expectation: &Expectation, last_obs_time: Option<i64>, now: i64) -> bool {
    let Some(params) = expectation.params.as_alert_path() else {
        return false;
    };
    match last_obs_time {
        None => true,
        Some(last) => now - last >= params.test_interval_s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExpectationType;
    use crate::params::{AlertPathParams, Params, ScheduleParams};

    fn schedule_exp(expected_interval_s: i64, tolerance_s: i64, params: ScheduleParams) -> Expectation {
        Expectation {
            id: "e1".to_string(),
            exp_type: ExpectationType::Schedule,
            name: "job-e1".to_string(),
            owner_email: "owner@example.com".to_string(),
            expected_interval_s,
            tolerance_s,
            params: Params::Schedule(params),
            enabled: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn alertpath_exp(ack_window_s: i64, test_interval_s: i64) -> Expectation {
        Expectation {
            id: "e1".to_string(),
            exp_type: ExpectationType::AlertPath,
            name: "pager".to_string(),
            owner_email: "owner@example.com".to_string(),
            expected_interval_s: 3600,
            tolerance_s: 0,
            params: Params::AlertPath(AlertPathParams {
                ack_window_s,
                test_interval_s,
            }),
            enabled: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn obs(seq: i64, kind: ObservationKind, observed_at: i64) -> Observation {
        Observation {
            seq,
            expectation_id: "e1".to_string(),
            kind,
            observed_at,
            meta: None,
        }
    }

    /// Scenario S1: missed detection, open then close on a fresh start.
    #[test]
    fn s1_missed_detection() {
        let exp = schedule_exp(60, 10, ScheduleParams::default());
        let observations = vec![obs(1, ObservationKind::Start, 0)];

        let outcome = schedule_evaluate(&exp, &observations, 71);
        assert_eq!(outcome.open.len(), 1);
        let (code, _, evidence) = &outcome.open[0];
        assert_eq!(*code, ViolationCode::Missed);
        assert_eq!(
            evidence.0,
            json!({"last_start_at": 0, "age_s": 71, "expected_s": 60, "tolerance_s": 10})
        );

        let observations = vec![obs(2, ObservationKind::Start, 72), obs(1, ObservationKind::Start, 0)];
        let outcome = schedule_evaluate(&exp, &observations, 72);
        assert!(outcome.close.contains(&ViolationCode::Missed));
        assert!(outcome.open.is_empty());
    }

    /// Scenario S2: longrun opens past max_runtime_s, closes once the job ends.
    #[test]
    fn s2_longrun_detection() {
        let exp = schedule_exp(
            3600,
            0,
            ScheduleParams {
                max_runtime_s: 30,
                min_spacing_s: 0,
                allow_overlap: false,
            },
        );
        let observations = vec![obs(1, ObservationKind::Start, 0)];

        let outcome = schedule_evaluate(&exp, &observations, 25);
        assert!(outcome.close.contains(&ViolationCode::Longrun));
        assert!(!outcome.open.iter().any(|(c, ..)| *c == ViolationCode::Longrun));

        let outcome = schedule_evaluate(&exp, &observations, 35);
        assert!(outcome.open.iter().any(|(c, ..)| *c == ViolationCode::Longrun));

        let observations = vec![obs(2, ObservationKind::End, 36), obs(1, ObservationKind::Start, 0)];
        let outcome = schedule_evaluate(&exp, &observations, 36);
        assert!(outcome.close.contains(&ViolationCode::Longrun));
    }

    /// Scenario S3: spacing violation when the gap between end and the next start is too short.
    #[test]
    fn s3_spacing() {
        let exp = schedule_exp(
            3600,
            0,
            ScheduleParams {
                max_runtime_s: 0,
                min_spacing_s: 100,
                allow_overlap: false,
            },
        );
        let observations = vec![
            obs(3, ObservationKind::Start, 50),
            obs(2, ObservationKind::End, 10),
            obs(1, ObservationKind::Start, 0),
        ];
        let outcome = schedule_evaluate(&exp, &observations, 60);
        let (code, _, evidence) = outcome
            .open
            .iter()
            .find(|(c, ..)| *c == ViolationCode::Spacing)
            .expect("spacing violation expected");
        assert_eq!(*code, ViolationCode::Spacing);
        assert_eq!(evidence.0["gap_s"], json!(40));

        let observations = vec![
            obs(3, ObservationKind::Start, 200),
            obs(2, ObservationKind::End, 10),
            obs(1, ObservationKind::Start, 0),
        ];
        let outcome = schedule_evaluate(&exp, &observations, 210);
        assert!(!outcome.open.iter().any(|(c, ..)| *c == ViolationCode::Spacing));
        assert!(outcome.close.contains(&ViolationCode::Spacing));
    }

    /// Scenario S6: overlapping starts without an intervening end.
    #[test]
    fn s6_overlap() {
        let exp = schedule_exp(3600, 0, ScheduleParams::default());
        let observations = vec![obs(2, ObservationKind::Start, 50), obs(1, ObservationKind::Start, 0)];
        let outcome = schedule_evaluate(&exp, &observations, 60);
        let (code, _, evidence) = outcome
            .open
            .iter()
            .find(|(c, ..)| *c == ViolationCode::Overlap)
            .expect("overlap violation expected");
        assert_eq!(*code, ViolationCode::Overlap);
        assert_eq!(evidence.0["newest_start_at"], json!(50));
        assert_eq!(evidence.0["other_start_at"], json!(0));

        let observations = vec![
            obs(3, ObservationKind::End, 70),
            obs(2, ObservationKind::Start, 50),
            obs(1, ObservationKind::Start, 0),
        ];
        let outcome = schedule_evaluate(&exp, &observations, 70);
        assert!(outcome.close.contains(&ViolationCode::Overlap));
        assert!(outcome.close.contains(&ViolationCode::Longrun));
    }

    #[test]
    fn epistemic_silence_before_any_start() {
        let exp = schedule_exp(60, 0, ScheduleParams::default());
        let outcome = schedule_evaluate(&exp, &[], 10_000);
        assert!(outcome.open.is_empty());
        assert!(outcome.close.is_empty());
    }

    #[test]
    fn overlap_not_raised_when_earlier_start_already_ended() {
        // An earlier start that itself completed is not an overlap, even
        // though its timestamp precedes the current (still-running) start.
        let exp = schedule_exp(3600, 0, ScheduleParams::default());
        let observations = vec![
            obs(4, ObservationKind::Start, 50),
            obs(3, ObservationKind::End, 9),
            obs(2, ObservationKind::Start, 0),
        ];
        let outcome = schedule_evaluate(&exp, &observations, 60);
        assert!(!outcome.open.iter().any(|(c, ..)| *c == ViolationCode::Overlap));
        assert!(outcome.close.contains(&ViolationCode::Overlap));
    }

    #[test]
    fn allow_overlap_true_never_raises_overlap() {
        let exp = schedule_exp(
            3600,
            0,
            ScheduleParams {
                max_runtime_s: 0,
                min_spacing_s: 0,
                allow_overlap: true,
            },
        );
        let observations = vec![obs(2, ObservationKind::Start, 50), obs(1, ObservationKind::Start, 0)];
        let outcome = schedule_evaluate(&exp, &observations, 60);
        assert!(!outcome.open.iter().any(|(c, ..)| *c == ViolationCode::Overlap));
        assert!(!outcome.close.contains(&ViolationCode::Overlap));
    }

    /// Scenario S4/S5 groundwork: alertpath_should_send_test gating.
    #[test]
    fn alertpath_sends_when_no_prior_observation() {
        let exp = alertpath_exp(300, 3600);
        assert!(alertpath_should_send_test(&exp, None, 0));
    }

    #[test]
    fn alertpath_waits_for_test_interval() {
        let exp = alertpath_exp(300, 3600);
        assert!(!alertpath_should_send_test(&exp, Some(0), 3599));
        assert!(alertpath_should_send_test(&exp, Some(0), 3600));
        assert!(alertpath_should_send_test(&exp, Some(0), 3700));
    }
}
