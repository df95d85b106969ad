//! Outbound notification dispatch for Rewire: email composition and
//! webhook fan-out, both fire-and-forget from the Checker's standpoint.
//!
//! Neither sink depends on `rewire-core` or `rewire-store` — they take
//! primitive fields and leave projecting domain values into them to the
//! caller, matching SPEC_FULL.md §4.5's "external collaborator" framing
//! for the transport (only the trigger/payload shapes are in scope here).

mod email;
mod error;
mod webhook;

pub use email::{EmailNotifier, SmtpConfig};
pub use error::NotifyError;
pub use webhook::{
    format_discord_payload, format_generic_payload, format_slack_payload, WebhookEvent,
    WebhookNotifier, WebhookPayload,
};
