use std::time::Duration;

use serde_json::{json, Value};

/// The kind of notification a webhook payload carries. `TestSent` and
/// `TestExpired` have formatters but are not emitted by the Checker's
/// default tick — see SPEC_FULL.md §4.5/§9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEvent {
    ViolationOpened,
    ViolationClosed,
    TestSent,
    TestExpired,
}

impl WebhookEvent {
    /// The wire string used in the generic payload's `event` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViolationOpened => "violation.opened",
            Self::ViolationClosed => "violation.closed",
            Self::TestSent => "test.sent",
            Self::TestExpired => "test.expired",
        }
    }

    const fn slack_color(self) -> &'static str {
        match self {
            Self::ViolationOpened => "#dc2626",
            Self::ViolationClosed => "#16a34a",
            Self::TestSent => "#2563eb",
            Self::TestExpired => "#f59e0b",
        }
    }

    const fn discord_color(self) -> u32 {
        match self {
            Self::ViolationOpened => 0xdc2626,
            Self::ViolationClosed => 0x16a34a,
            Self::TestSent => 0x2563eb,
            Self::TestExpired => 0xf59e0b,
        }
    }
}

/// The event-agnostic payload a webhook notification carries. Kept as
/// primitive fields rather than domain types so this crate stays
/// decoupled from `rewire-core` — the Checker is responsible for
/// projecting an `Expectation`/`Violation` pair into one of these.
#[derive(Debug, Clone)]
pub struct WebhookPayload {
    pub event: WebhookEvent,
    pub expectation_id: String,
    pub expectation_name: String,
    pub expectation_type: String,
    pub violation_code: Option<String>,
    pub message: String,
    pub evidence: Value,
    pub timestamp: i64,
}

/// The generic JSON shape every plain webhook target receives, per
/// SPEC_FULL.md §4.5.
#[must_use]
pub fn format_generic_payload(p: &WebhookPayload) -> Value {
    json!({
        "event": p.event.as_str(),
        "expectation": {
            "id": p.expectation_id,
            "name": p.expectation_name,
            "type": p.expectation_type,
        },
        "violation": {
            "code": p.violation_code,
            "message": p.message,
            "evidence": p.evidence,
        },
        "timestamp": p.timestamp,
    })
}

/// A Slack Block Kit attachment: colored header, name/type fields,
/// code/message body, id footer.
#[must_use]
pub fn format_slack_payload(p: &WebhookPayload) -> Value {
    json!({
        "attachments": [{
            "color": p.event.slack_color(),
            "blocks": [
                {
                    "type": "header",
                    "text": {"type": "plain_text", "text": format!("Rewire: {}", p.event.as_str())},
                },
                {
                    "type": "section",
                    "fields": [
                        {"type": "mrkdwn", "text": format!("*Expectation:*\n{}", p.expectation_name)},
                        {"type": "mrkdwn", "text": format!("*Type:*\n{}", p.expectation_type)},
                    ],
                },
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": format!("*{}:* {}", p.violation_code.as_deref().unwrap_or("Info"), p.message),
                    },
                },
                {
                    "type": "context",
                    "elements": [{"type": "mrkdwn", "text": format!("ID: `{}`", p.expectation_id)}],
                },
            ],
        }]
    })
}

/// A single Discord embed with the same fields as Slack's attachment,
/// colors as 24-bit ints per SPEC_FULL.md §4.5.
#[must_use]
pub fn format_discord_payload(p: &WebhookPayload) -> Value {
    json!({
        "embeds": [{
            "title": format!("Rewire: {}", p.event.as_str()),
            "color": p.event.discord_color(),
            "fields": [
                {"name": "Expectation", "value": p.expectation_name, "inline": true},
                {"name": "Type", "value": p.expectation_type, "inline": true},
                {"name": p.violation_code.as_deref().unwrap_or("Info"), "value": p.message},
            ],
            "footer": {"text": format!("ID: {}", p.expectation_id)},
        }]
    })
}

/// Fans a [`WebhookPayload`] out to zero or more generic endpoints plus
/// optional first-class Slack and Discord URLs, per SPEC_FULL.md §4.5.
/// Each target's failure is independent; `notify` never short-circuits.
#[derive(Debug, Clone, Default)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    generic_webhooks: Vec<String>,
    slack_url: Option<String>,
    discord_url: Option<String>,
}

impl WebhookNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a generic endpoint that receives [`format_generic_payload`].
    #[must_use]
    pub fn with_generic_webhook(mut self, url: impl Into<String>) -> Self {
        self.generic_webhooks.push(url.into());
        self
    }

    /// Sets the first-class Slack incoming-webhook URL.
    #[must_use]
    pub fn with_slack(mut self, url: impl Into<String>) -> Self {
        self.slack_url = Some(url.into());
        self
    }

    /// Sets the first-class Discord webhook URL.
    #[must_use]
    pub fn with_discord(mut self, url: impl Into<String>) -> Self {
        self.discord_url = Some(url.into());
        self
    }

    /// True if at least one target is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generic_webhooks.is_empty() && self.slack_url.is_none() && self.discord_url.is_none()
    }

    /// Sends `payload` to every configured target. Returns the number of
    /// targets that accepted the delivery (2xx response); never errors —
    /// per-target failures are logged and do not affect other targets.
    pub async fn notify(&self, payload: &WebhookPayload) -> usize {
        let mut successes = 0;

        for url in &self.generic_webhooks {
            if self.post(url, &format_generic_payload(payload)).await {
                successes += 1;
            }
        }
        if let Some(url) = &self.slack_url {
            if self.post(url, &format_slack_payload(payload)).await {
                successes += 1;
            }
        }
        if let Some(url) = &self.discord_url {
            if self.post(url, &format_discord_payload(payload)).await {
                successes += 1;
            }
        }

        successes
    }

    async fn post(&self, url: &str, body: &Value) -> bool {
        let result = self
            .client
            .post(url)
            .timeout(Duration::from_secs(10))
            .json(body)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(url, status = %response.status(), "webhook target returned non-2xx");
                false
            }
            Err(error) => {
                tracing::warn!(url, %error, "webhook delivery failed");
                false
            }
        }
    }
}
