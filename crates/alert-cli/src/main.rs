//! alertctl - operator CLI for the alert classification & publishing
//! dispatch daemon.
//!
//! Talks to a running `alertd` over its HTTP API rather than touching any
//! storage directly — every subcommand is a thin `reqwest` call plus
//! human-readable formatting of the response.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "alertctl")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the alert classification & publishing dispatch daemon", long_about = None)]
struct Cli {
    /// Base URL of the alertd HTTP API.
    #[arg(long, global = true, env = "ALERTCTL_ENDPOINT", default_value = "http://127.0.0.1:8080")]
    endpoint: String,

    /// Print raw JSON responses instead of a formatted summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an alert without dispatching it anywhere
    Classify {
        /// Path to a JSON file containing `{"alert": {...}}`, or `-` for stdin
        #[arg(short, long)]
        file: PathBuf,
        /// Bypass the classification cache
        #[arg(long)]
        force: bool,
    },

    /// Submit an alert: classify it, then fan it out to every enabled target
    Submit {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show classifier stats
    Stats,

    /// Publishing targets
    Targets {
        #[command(subcommand)]
        action: TargetsAction,
    },

    /// Priority queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },

    /// Dead-letter queue
    Dlq {
        #[command(subcommand)]
        action: DlqAction,
    },

    /// Current publishing mode (normal / metrics-only)
    Mode,

    /// Live configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TargetsAction {
    /// List registered targets
    List {
        #[arg(long)]
        target_type: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Show one target
    Get { name: String },
    /// Force an immediate re-discovery of targets
    Refresh,
    /// Send a synthetic test alert to one target
    Test {
        name: String,
        #[arg(long)]
        timeout_seconds: Option<u64>,
    },
}

#[derive(Subcommand)]
enum QueueAction {
    /// Queue depth and completion counters
    Status,
    /// Status plus registry/mode context
    Stats,
}

#[derive(Subcommand)]
enum DlqAction {
    /// List dead-lettered jobs
    List {
        #[arg(long)]
        target_name: Option<String>,
        #[arg(long)]
        error_type: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        replayed: Option<bool>,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Replay one dead-lettered job
    Replay { id: String },
    /// Purge old entries
    Purge {
        #[arg(long, default_value_t = 168)]
        older_than_hours: i64,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Push a new configuration document
    Update {
        /// Path to the document (json or yaml, per --format)
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long, default_value = "json")]
        format: String,
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value = "api")]
        source: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        force: bool,
    },
    /// Roll back to a previously stored version
    Rollback { version: u64 },
    /// Show version history
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Classify { file, force } => cmd_classify(&client, &cli.endpoint, &file, force, cli.json).await,
        Commands::Submit { file } => cmd_submit(&client, &cli.endpoint, &file, cli.json).await,
        Commands::Stats => cmd_get(&client, &cli.endpoint, "/classify/stats", cli.json).await,
        Commands::Mode => cmd_get(&client, &cli.endpoint, "/publishing/mode", cli.json).await,
        Commands::Targets { action } => cmd_targets(&client, &cli.endpoint, action, cli.json).await,
        Commands::Queue { action } => cmd_queue(&client, &cli.endpoint, action, cli.json).await,
        Commands::Dlq { action } => cmd_dlq(&client, &cli.endpoint, action, cli.json).await,
        Commands::Config { action } => cmd_config(&client, &cli.endpoint, action, cli.json).await,
    }
}

async fn read_alert_body(file: &PathBuf) -> Result<Value> {
    let raw = if file.as_os_str() == "-" {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        tokio::fs::read_to_string(file).await.with_context(|| format!("reading {}", file.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("parsing {} as JSON", file.display()))
}

async fn print_response(response: reqwest::Response, json: bool) -> Result<()> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    if json {
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{status}");
        println!("{}", serde_json::to_string_pretty(&body)?);
    }
    if !status.is_success() {
        bail!("request failed with status {status}");
    }
    Ok(())
}

async fn cmd_get(client: &reqwest::Client, endpoint: &str, path: &str, json: bool) -> Result<()> {
    let response = client.get(format!("{endpoint}{path}")).send().await.with_context(|| format!("GET {path}"))?;
    print_response(response, json).await
}

async fn cmd_classify(client: &reqwest::Client, endpoint: &str, file: &PathBuf, force: bool, json: bool) -> Result<()> {
    let alert = read_alert_body(file).await?;
    let body = serde_json::json!({ "alert": alert["alert"].clone(), "force": force });
    let response = client.post(format!("{endpoint}/classify")).json(&body).send().await.context("POST /classify")?;
    print_response(response, json).await
}

async fn cmd_submit(client: &reqwest::Client, endpoint: &str, file: &PathBuf, json: bool) -> Result<()> {
    let alert = read_alert_body(file).await?;
    let response = client.post(format!("{endpoint}/alerts")).json(&alert).send().await.context("POST /alerts")?;
    print_response(response, json).await
}

async fn cmd_targets(client: &reqwest::Client, endpoint: &str, action: TargetsAction, json: bool) -> Result<()> {
    match action {
        TargetsAction::List { target_type, enabled } => {
            let mut query = Vec::new();
            if let Some(t) = &target_type {
                query.push(("type", t.clone()));
            }
            if let Some(e) = enabled {
                query.push(("enabled", e.to_string()));
            }
            let response = client.get(format!("{endpoint}/targets")).query(&query).send().await.context("GET /targets")?;
            print_response(response, json).await
        }
        TargetsAction::Get { name } => cmd_get(client, endpoint, &format!("/targets/{name}"), json).await,
        TargetsAction::Refresh => {
            let response = client.post(format!("{endpoint}/targets/refresh")).send().await.context("POST /targets/refresh")?;
            print_response(response, json).await
        }
        TargetsAction::Test { name, timeout_seconds } => {
            let body = serde_json::json!({ "timeout_seconds": timeout_seconds });
            let response = client
                .post(format!("{endpoint}/targets/{name}/test"))
                .json(&body)
                .send()
                .await
                .with_context(|| format!("POST /targets/{name}/test"))?;
            print_response(response, json).await
        }
    }
}

async fn cmd_queue(client: &reqwest::Client, endpoint: &str, action: QueueAction, json: bool) -> Result<()> {
    match action {
        QueueAction::Status => cmd_get(client, endpoint, "/queue/status", json).await,
        QueueAction::Stats => cmd_get(client, endpoint, "/queue/stats", json).await,
    }
}

async fn cmd_dlq(client: &reqwest::Client, endpoint: &str, action: DlqAction, json: bool) -> Result<()> {
    match action {
        DlqAction::List { target_name, error_type, priority, replayed, limit } => {
            let mut query = vec![("limit", limit.to_string())];
            if let Some(v) = target_name {
                query.push(("target_name", v));
            }
            if let Some(v) = error_type {
                query.push(("error_type", v));
            }
            if let Some(v) = priority {
                query.push(("priority", v));
            }
            if let Some(v) = replayed {
                query.push(("replayed", v.to_string()));
            }
            let response = client.get(format!("{endpoint}/dlq")).query(&query).send().await.context("GET /dlq")?;
            print_response(response, json).await
        }
        DlqAction::Replay { id } => {
            let response = client.post(format!("{endpoint}/dlq/{id}/replay")).send().await.with_context(|| format!("POST /dlq/{id}/replay"))?;
            print_response(response, json).await
        }
        DlqAction::Purge { older_than_hours } => {
            let body = serde_json::json!({ "older_than_hours": older_than_hours });
            let response = client.delete(format!("{endpoint}/dlq/purge")).json(&body).send().await.context("DELETE /dlq/purge")?;
            print_response(response, json).await
        }
    }
}

async fn cmd_config(client: &reqwest::Client, endpoint: &str, action: ConfigAction, json: bool) -> Result<()> {
    match action {
        ConfigAction::Update { file, format, dry_run, source, description, force } => {
            let raw = tokio::fs::read_to_string(&file).await.with_context(|| format!("reading {}", file.display()))?;
            let config: Value = if format.eq_ignore_ascii_case("yaml") {
                serde_yaml::from_str(&raw).with_context(|| format!("parsing {} as yaml", file.display()))?
            } else {
                serde_json::from_str(&raw).with_context(|| format!("parsing {} as JSON", file.display()))?
            };
            let body = serde_json::json!({
                "config": config,
                "format": format,
                "dry_run": dry_run,
                "source": source,
                "description": description,
                "force": force,
            });
            let response = client.post(format!("{endpoint}/config")).json(&body).send().await.context("POST /config")?;
            print_response(response, json).await
        }
        ConfigAction::Rollback { version } => {
            let body = serde_json::json!({ "version": version });
            let response = client.post(format!("{endpoint}/config/rollback")).json(&body).send().await.context("POST /config/rollback")?;
            print_response(response, json).await
        }
        ConfigAction::History { limit } => {
            let response = client
                .get(format!("{endpoint}/config/history"))
                .query(&[("limit", limit.to_string())])
                .send()
                .await
                .context("GET /config/history")?;
            print_response(response, json).await
        }
    }
}
