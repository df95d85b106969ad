use std::time::Duration;

use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::NotifyError;

/// SMTP configuration. `host = None` selects dev mode: messages are
/// formatted to the tracing log instead of sent.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
}

impl SmtpConfig {
    /// Dev-mode configuration: no host, every send is logged instead.
    #[must_use]
    pub fn dev_mode(from_email: impl Into<String>) -> Self {
        Self {
            host: None,
            port: 587,
            user: None,
            password: None,
            from_email: from_email.into(),
        }
    }
}

/// Composes and sends plain-text violation/test emails.
///
/// In the presence of a configured SMTP host this connects, issues
/// `EHLO`, attempts `STARTTLS` (the attempt is best-effort — a server
/// that doesn't support it is not treated as a failure), authenticates
/// if credentials are present, then sends. With no host configured it
/// formats to the operator log, matching SPEC_FULL.md §4.5's dev-mode
/// fallback.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    config: SmtpConfig,
}

impl EmailNotifier {
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Sends a single plain-text email. Per-send timeout is fixed at 20s
    /// per SPEC_FULL.md §4.5.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the addresses don't parse, the message
    /// can't be built, the transport can't be configured, or the send
    /// itself fails (connection refused, auth rejected, etc).
    pub async fn send_email(&self, to_email: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let Some(host) = self.config.host.as_deref() else {
            tracing::info!(
                to = to_email,
                subject,
                body,
                "dev-mode email (no SMTP host configured)"
            );
            return Ok(());
        };

        let message = Message::builder()
            .from(
                self.config
                    .from_email
                    .parse()
                    .map_err(|e| NotifyError::InvalidAddress(format!("from={}: {e}", self.config.from_email)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| NotifyError::InvalidAddress(format!("to={to_email}: {e}")))?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        let tls_parameters =
            TlsParameters::new(host.to_string()).map_err(|e| NotifyError::Transport(e.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(self.config.port)
            .tls(Tls::Opportunistic(tls_parameters))
            .timeout(Some(Duration::from_secs(20)));

        if let (Some(user), Some(password)) = (&self.config.user, &self.config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        let transport = builder.build();
        transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Send(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dev_mode_send_never_touches_the_network() {
        let notifier = EmailNotifier::new(SmtpConfig::dev_mode("rewire@example.com"));
        notifier
            .send_email("owner@example.com", "[rewire] VIOLATION missed: nightly-etl", "body")
            .await
            .expect("dev-mode send always succeeds");
    }

    #[tokio::test]
    async fn invalid_from_address_is_rejected_before_connecting() {
        let config = SmtpConfig {
            host: Some("smtp.example.com".to_string()),
            port: 587,
            user: None,
            password: None,
            from_email: "not-an-email".to_string(),
        };
        let notifier = EmailNotifier::new(config);
        let result = notifier.send_email("owner@example.com", "subj", "body").await;
        assert!(matches!(result, Err(NotifyError::InvalidAddress(_))));
    }
}
