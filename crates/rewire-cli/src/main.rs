//! `rewire`: runs the Ingress HTTP server and the Checker loop as two
//! concurrent tasks inside one process, coordinated by a shared
//! `SqliteStore` handle, exactly as a single `tokio` runtime hosts an HTTP
//! listener and a background ticker side by side (SPEC_FULL.md §2).
//!
//! A `probe` subcommand runs `InvariantProbe` against a database file
//! offline and exits non-zero on any failed check.

use clap::Parser;
use rewire_checker::{Checker, CheckerConfig, InvariantProbe};
use rewire_cli::config::{Cli, Command, ProbeArgs, ServeArgs};
use rewire_notify::{EmailNotifier, SmtpConfig, WebhookNotifier};
use rewire_server::AppState;
use rewire_store::SqliteStore;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match cli.command {
        Command::Serve(args) => run_serve(*args).await,
        Command::Probe(args) => run_probe(args).await,
    };
    std::process::exit(exit_code);
}

async fn run_serve(args: ServeArgs) -> i32 {
    if let Err(message) = args.validate() {
        eprintln!("error: {message}");
        return 1;
    }
    init_logging(&args.log_level);

    let connection_string = if args.init_db {
        format!("sqlite://{}?mode=rwc", args.db.display())
    } else {
        format!("sqlite://{}", args.db.display())
    };

    let store = match SqliteStore::connect(&connection_string).await {
        Ok(store) => store,
        Err(error) => {
            eprintln!("fatal: could not open database: {error}");
            return 1;
        }
    };
    if args.init_db {
        eprintln!("db initialized");
    }

    let smtp_config = SmtpConfig {
        host: args.smtp_host.clone(),
        port: args.smtp_port,
        user: args.smtp_user.clone(),
        password: args.smtp_pass.clone(),
        from_email: args.from_email.clone(),
    };
    let email = EmailNotifier::new(smtp_config);

    let mut webhooks = WebhookNotifier::new();
    if let Some(url) = &args.slack_webhook {
        webhooks = webhooks.with_slack(url.clone());
        eprintln!("slack webhook configured");
    }
    if let Some(url) = &args.discord_webhook {
        webhooks = webhooks.with_discord(url.clone());
        eprintln!("discord webhook configured");
    }
    for url in &args.webhook {
        webhooks = webhooks.with_generic_webhook(url.clone());
        eprintln!("webhook configured: {url}");
    }

    let mut checker_config = CheckerConfig::new(args.base_url.clone());
    checker_config.check_every_s = args.check_every;
    checker_config.renotify_after_s = args.renotify_after;
    checker_config.send_recovery = args.send_recovery;

    let state = AppState::new(store.clone(), args.admin_token.clone(), args.base_url.clone());
    let checker = Checker::new(store, email, webhooks, checker_config);

    let addr = format!("{}:{}", args.listen, args.port);
    tracing::info!(%addr, "rewire starting");

    let (server_result, ()) = tokio::join!(
        rewire_server::serve(&addr, state),
        checker.run(wait_for_shutdown_signal()),
    );

    if let Err(error) = server_result {
        eprintln!("fatal: server exited with an error: {error}");
        return 1;
    }
    0
}

async fn run_probe(args: ProbeArgs) -> i32 {
    let connection_string = format!("sqlite://{}", args.db.display());
    let store = match SqliteStore::connect(&connection_string).await {
        Ok(store) => store,
        Err(error) => {
            eprintln!("fatal: could not open database: {error}");
            return 1;
        }
    };

    let probe = InvariantProbe::new(&store);
    let (passed, failed, results) = match probe.check_all().await {
        Ok(outcome) => outcome,
        Err(error) => {
            eprintln!("fatal: probe could not read store: {error}");
            return 1;
        }
    };

    for result in &results {
        if result.passed {
            if args.verbose {
                println!("PASS  {}: {}", result.name, result.message);
            }
        } else {
            println!("FAIL  {}: {}", result.name, result.message);
            if let Some(evidence) = &result.evidence {
                println!("      evidence: {evidence}");
            }
        }
    }
    println!("{passed} passed, {failed} failed");

    i32::from(failed > 0)
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
