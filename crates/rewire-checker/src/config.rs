/// Tunables for the periodic evaluator, mirroring the reference CLI's
/// `--check-every`, `--renotify-after`, `--send-recovery`, and `--base-url`
/// flags (SPEC_FULL.md §10).
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Tick period, seconds. Ticks never overlap: the next tick is not
    /// scheduled until the current one (all enabled expectations) finishes.
    pub check_every_s: u64,
    /// Re-notify window for a still-open violation, seconds. `0` disables
    /// re-notification; the violation is only announced once, at open.
    pub renotify_after_s: i64,
    /// Whether a `violation.closed` webhook event fires on recovery. Off by
    /// default — see DESIGN.md for why this stays opt-in.
    pub send_recovery: bool,
    /// Public base URL used to build ack links embedded in alert-path test emails.
    pub base_url: String,
}

impl CheckerConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            check_every_s: 60,
            renotify_after_s: 0,
            send_recovery: false,
            base_url: base_url.into(),
        }
    }
}
