//! Argument parsing and HTTP plumbing for the `rewire-ctl` admin client.
//!
//! A thin, authenticated HTTP client over the admin surface from
//! SPEC_FULL.md §6: `new-schedule`, `new-alertpath`, `enable`, `disable`.
//! Mirrors the reference `cli.py`'s subcommand surface and its
//! post-creation usage hints.

use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

/// `rewire-ctl`: Rewire administration CLI.
#[derive(Debug, Parser)]
#[command(name = "rewire-ctl", author, version, about = "Rewire administration CLI")]
pub struct CtlCli {
    /// Rewire server URL.
    #[arg(long, env = "REWIRE_BASE_URL")]
    pub base_url: String,

    /// Admin API token.
    #[arg(long, env = "REWIRE_ADMIN_TOKEN")]
    pub admin_token: String,

    #[command(subcommand)]
    pub command: CtlCommand,
}

/// Admin subcommands exposed by `rewire-ctl`.
#[derive(Debug, Subcommand)]
pub enum CtlCommand {
    /// Create a schedule expectation.
    NewSchedule(NewScheduleArgs),
    /// Create an alert-path expectation.
    NewAlertpath(NewAlertpathArgs),
    /// Enable an expectation.
    Enable(IdArgs),
    /// Disable an expectation.
    Disable(IdArgs),
}

/// Flags for `rewire-ctl new-schedule`.
#[derive(Debug, Parser)]
pub struct NewScheduleArgs {
    /// Expectation name.
    #[arg(long)]
    pub name: String,
    /// Owner email.
    #[arg(long)]
    pub email: String,
    /// Expected interval between runs, seconds.
    #[arg(long)]
    pub expected_interval_s: i64,
    /// Grace period, seconds.
    #[arg(long, default_value_t = 0)]
    pub tolerance_s: i64,
    /// Max runtime before a `longrun` violation (0 disables).
    #[arg(long, default_value_t = 0)]
    pub max_runtime_s: i64,
    /// Min gap between runs (0 disables).
    #[arg(long, default_value_t = 0)]
    pub min_spacing_s: i64,
    /// Allow overlapping runs.
    #[arg(long)]
    pub allow_overlap: bool,
}

impl NewScheduleArgs {
    #[must_use]
    pub fn form(&self) -> Vec<(&'static str, String)> {
        let params_json = serde_json::json!({
            "max_runtime_s": self.max_runtime_s,
            "min_spacing_s": self.min_spacing_s,
            "allow_overlap": self.allow_overlap,
        })
        .to_string();
        vec![
            ("type", "schedule".to_string()),
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("expected_interval_s", self.expected_interval_s.to_string()),
            ("tolerance_s", self.tolerance_s.to_string()),
            ("params_json", params_json),
        ]
    }
}

/// Flags for `rewire-ctl new-alertpath`.
#[derive(Debug, Parser)]
pub struct NewAlertpathArgs {
    /// Expectation name.
    #[arg(long)]
    pub name: String,
    /// Owner email.
    #[arg(long)]
    pub email: String,
    /// How often to send synthetic tests, seconds.
    #[arg(long)]
    pub test_interval_s: i64,
    /// Time allowed to acknowledge, seconds.
    #[arg(long)]
    pub ack_window_s: i64,
    /// Expected interval, seconds (schedule-shaped field every expectation carries).
    #[arg(long, default_value_t = 3600)]
    pub expected_interval_s: i64,
    /// Grace period, seconds.
    #[arg(long, default_value_t = 0)]
    pub tolerance_s: i64,
}

impl NewAlertpathArgs {
    #[must_use]
    pub fn form(&self) -> Vec<(&'static str, String)> {
        let params_json = serde_json::json!({
            "test_interval_s": self.test_interval_s,
            "ack_window_s": self.ack_window_s,
        })
        .to_string();
        vec![
            ("type", "alert_path".to_string()),
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("expected_interval_s", self.expected_interval_s.to_string()),
            ("tolerance_s", self.tolerance_s.to_string()),
            ("params_json", params_json),
        ]
    }
}

/// A bare expectation ID, shared by `enable` and `disable`.
#[derive(Debug, Parser)]
pub struct IdArgs {
    /// Expectation ID.
    #[arg(long)]
    pub id: String,
}

impl IdArgs {
    #[must_use]
    pub fn form(&self) -> Vec<(&'static str, String)> {
        vec![("id", self.id.clone())]
    }
}

/// Errors raised while talking to the admin surface.
#[derive(Debug, thiserror::Error)]
pub enum CtlError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// A thin authenticated HTTP client over `/admin/*`.
pub struct AdminClient {
    client: reqwest::Client,
    base_url: String,
    admin_token: String,
}

impl AdminClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, admin_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            admin_token: admin_token.into(),
        }
    }

    /// POSTs a form-encoded body to `path` under `base_url`, bearer-authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`CtlError`] if the request fails or the response body
    /// isn't valid JSON.
    pub async fn post(&self, path: &str, form: &[(&str, String)]) -> Result<Value, CtlError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.admin_token)
            .timeout(Duration::from_secs(20))
            .form(form)
            .send()
            .await?;
        let value = response.error_for_status()?.json::<Value>().await?;
        Ok(value)
    }
}

/// Runs a parsed `rewire-ctl` invocation: issues the admin request and
/// prints the server's JSON response plus the reference CLI's
/// post-creation usage hints.
///
/// # Errors
///
/// Returns an error if the HTTP request fails.
pub async fn run(cli: CtlCli) -> Result<(), CtlError> {
    let client = AdminClient::new(&cli.base_url, &cli.admin_token);

    match &cli.command {
        CtlCommand::NewSchedule(args) => {
            let out = client.post("/admin/new", &args.form()).await?;
            print_json(&out);
            if let Some(observe_url) = out.get("observe_url").and_then(Value::as_str) {
                println!("\nInstrument your job:");
                println!("  curl -fsS -X POST '{observe_url}' -d kind=start");
                println!("  # ... do work ...");
                println!("  curl -fsS -X POST '{observe_url}' -d kind=end");
            }
        }
        CtlCommand::NewAlertpath(args) => {
            let out = client.post("/admin/new", &args.form()).await?;
            print_json(&out);
            println!("\nSynthetic tests will be sent to {}", args.email);
            println!("ACK via the /ack/<trial> link in each email.");
        }
        CtlCommand::Enable(args) => {
            let out = client.post("/admin/enable", &args.form()).await?;
            print_json(&out);
        }
        CtlCommand::Disable(args) => {
            let out = client.post("/admin/disable", &args.form()).await?;
            print_json(&out);
        }
    }

    Ok(())
}

fn print_json(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn new_schedule_form_encodes_params_json() {
        let args = NewScheduleArgs {
            name: "nightly".to_string(),
            email: "o@example.com".to_string(),
            expected_interval_s: 60,
            tolerance_s: 10,
            max_runtime_s: 30,
            min_spacing_s: 0,
            allow_overlap: false,
        };
        let form = args.form();
        assert!(form.contains(&("type", "schedule".to_string())));
        let params: Value = serde_json::from_str(
            &form.iter().find(|(k, _)| *k == "params_json").unwrap().1,
        )
        .unwrap();
        assert_eq!(params["max_runtime_s"], 30);
        assert_eq!(params["allow_overlap"], false);
    }

    #[test]
    fn new_alertpath_form_encodes_params_json() {
        let args = NewAlertpathArgs {
            name: "pager".to_string(),
            email: "o@example.com".to_string(),
            test_interval_s: 3600,
            ack_window_s: 300,
            expected_interval_s: 3600,
            tolerance_s: 0,
        };
        let form = args.form();
        assert!(form.contains(&("type", "alert_path".to_string())));
        let params: Value = serde_json::from_str(
            &form.iter().find(|(k, _)| *k == "params_json").unwrap().1,
        )
        .unwrap();
        assert_eq!(params["ack_window_s"], 300);
        assert_eq!(params["test_interval_s"], 3600);
    }

    #[tokio::test]
    async fn admin_client_posts_bearer_auth_and_parses_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/enable"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true, "enabled": true})))
            .mount(&server)
            .await;

        let client = AdminClient::new(server.uri(), "secret-token");
        let out = client
            .post("/admin/enable", &IdArgs { id: "exp-1".to_string() }.form())
            .await
            .unwrap();
        assert_eq!(out["ok"], true);
        assert_eq!(out["enabled"], true);
    }

    #[tokio::test]
    async fn admin_client_surfaces_non_2xx_as_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/disable"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = AdminClient::new(server.uri(), "wrong-token");
        let result = client
            .post("/admin/disable", &IdArgs { id: "exp-1".to_string() }.form())
            .await;
        assert!(result.is_err());
    }
}
