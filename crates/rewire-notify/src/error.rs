/// Errors raised while composing or dispatching a notification.
///
/// Per SPEC_FULL.md §7, notifier errors are logged by the Checker and
/// never roll back the violation that triggered them or block the tick;
/// this enum exists so the Checker has something structured to log.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build email message: {0}")]
    Message(String),

    #[error("failed to configure SMTP transport: {0}")]
    Transport(String),

    #[error("failed to send email: {0}")]
    Send(String),
}
