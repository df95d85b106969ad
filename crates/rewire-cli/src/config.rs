//! Command-line surface for the `rewire` server binary.
//!
//! A `clap`-derived CLI is the single configuration surface: every flag
//! below is also readable from an environment variable of the same name
//! (`REWIRE_`-prefixed, upper-cased), so a process supervisor can configure
//! the service identically to an interactive shell invocation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Rewire: epistemic monitoring for schedule and alert-path contracts.
#[derive(Debug, Parser)]
#[command(name = "rewire", author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level `rewire` subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the Ingress HTTP server and the Checker loop.
    Serve(Box<ServeArgs>),
    /// Run `InvariantProbe` against a database file and exit non-zero on
    /// any failed check.
    Probe(ProbeArgs),
}

/// Flags for `rewire serve`: database, listener, and notifier configuration.
#[derive(Debug, Parser)]
pub struct ServeArgs {
    /// SQLite database file path.
    #[arg(long, env = "REWIRE_DB")]
    pub db: PathBuf,

    /// Initialize schema on startup (idempotent).
    #[arg(long, env = "REWIRE_INIT_DB")]
    pub init_db: bool,

    /// Bind address.
    #[arg(long, env = "REWIRE_LISTEN", default_value = "127.0.0.1")]
    pub listen: String,

    /// Bind port.
    #[arg(long, env = "REWIRE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Public base URL used to build ack links.
    #[arg(long, env = "REWIRE_BASE_URL")]
    pub base_url: String,

    /// Bearer token for `/admin/*`.
    #[arg(long, env = "REWIRE_ADMIN_TOKEN", default_value = "dev-admin-token")]
    pub admin_token: String,

    /// Checker tick period, seconds.
    #[arg(long, env = "REWIRE_CHECK_EVERY", default_value_t = 60)]
    pub check_every: u64,

    /// Re-notify window for still-open violations, seconds (0 disables).
    #[arg(long, env = "REWIRE_RENOTIFY_AFTER", default_value_t = 0)]
    pub renotify_after: i64,

    /// Emit `violation.closed` webhook events.
    #[arg(long, env = "REWIRE_SEND_RECOVERY")]
    pub send_recovery: bool,

    /// SMTP host; unset means dev-mode log-only email.
    #[arg(long, env = "REWIRE_SMTP_HOST")]
    pub smtp_host: Option<String>,

    /// SMTP port.
    #[arg(long, env = "REWIRE_SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    /// SMTP username; login is skipped if either this or `smtp_pass` is absent.
    #[arg(long, env = "REWIRE_SMTP_USER")]
    pub smtp_user: Option<String>,

    /// SMTP password.
    #[arg(long, env = "REWIRE_SMTP_PASS")]
    pub smtp_pass: Option<String>,

    /// Envelope/header From address.
    #[arg(long, env = "REWIRE_FROM_EMAIL", default_value = "rewire@localhost")]
    pub from_email: String,

    /// Slack incoming-webhook URL.
    #[arg(long, env = "REWIRE_SLACK_WEBHOOK")]
    pub slack_webhook: Option<String>,

    /// Discord webhook URL.
    #[arg(long, env = "REWIRE_DISCORD_WEBHOOK")]
    pub discord_webhook: Option<String>,

    /// Generic webhook URL(s); may be repeated.
    #[arg(long)]
    pub webhook: Vec<String>,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[arg(long, env = "REWIRE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServeArgs {
    /// Validates the numeric flags that `clap`'s type system can't bound on
    /// its own. Returns a short, stderr-suitable message on failure.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `check_every` is zero or `renotify_after` is negative.
    pub fn validate(&self) -> Result<(), String> {
        if self.check_every == 0 {
            return Err("--check-every must be >= 1".to_string());
        }
        if self.renotify_after < 0 {
            return Err("--renotify-after must be >= 0 (0 disables)".to_string());
        }
        Ok(())
    }
}

/// Flags for `rewire probe`: an offline invariant check against a database file.
#[derive(Debug, Parser)]
pub struct ProbeArgs {
    /// SQLite database file path.
    #[arg(long, env = "REWIRE_DB")]
    pub db: PathBuf,

    /// Print every check, not just failures.
    #[arg(long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    #[test]
    fn serve_applies_documented_defaults() {
        let cli = parse(&["rewire", "serve", "--db", "rewire.db", "--base-url", "https://example.com"]);
        let Command::Serve(args) = cli.command else { panic!("expected serve") };
        assert_eq!(args.listen, "127.0.0.1");
        assert_eq!(args.port, 8080);
        assert_eq!(args.admin_token, "dev-admin-token");
        assert_eq!(args.check_every, 60);
        assert_eq!(args.renotify_after, 0);
        assert!(!args.send_recovery);
        assert_eq!(args.smtp_port, 587);
        assert_eq!(args.from_email, "rewire@localhost");
        assert_eq!(args.log_level, "info");
        assert!(args.webhook.is_empty());
    }

    #[test]
    fn serve_collects_repeated_webhook_flags() {
        let cli = parse(&[
            "rewire",
            "serve",
            "--db",
            "rewire.db",
            "--base-url",
            "https://example.com",
            "--webhook",
            "https://a.example/hook",
            "--webhook",
            "https://b.example/hook",
        ]);
        let Command::Serve(args) = cli.command else { panic!("expected serve") };
        assert_eq!(args.webhook, vec!["https://a.example/hook", "https://b.example/hook"]);
    }

    #[test]
    fn serve_rejects_zero_check_every() {
        let cli = parse(&[
            "rewire",
            "serve",
            "--db",
            "rewire.db",
            "--base-url",
            "https://example.com",
            "--check-every",
            "0",
        ]);
        let Command::Serve(args) = cli.command else { panic!("expected serve") };
        assert!(args.validate().is_err());
    }

    #[test]
    fn serve_rejects_negative_renotify_after() {
        let cli = parse(&[
            "rewire",
            "serve",
            "--db",
            "rewire.db",
            "--base-url",
            "https://example.com",
            "--renotify-after",
            "-5",
        ]);
        let Command::Serve(args) = cli.command else { panic!("expected serve") };
        assert!(args.validate().is_err());
    }

    #[test]
    fn probe_requires_db() {
        let cli = parse(&["rewire", "probe", "--db", "rewire.db"]);
        let Command::Probe(args) = cli.command else { panic!("expected probe") };
        assert_eq!(args.db, PathBuf::from("rewire.db"));
        assert!(!args.verbose);
    }
}
