//! `analy`: drive a data analysis session from the command line.
//!
//! Files given on the command line are loaded as datasets. Each stdin line is
//! one JSON command and produces one JSON line on stdout:
//!
//! ```text
//! {"tool": "query_dataset", "args": {"columns": ["city"], "sort_by": "amt"}}
//! {"mode": "cleaning"}
//! {"user": "which city sells most?"}
//! ```
//!
//! Logs go to stderr (`RUST_LOG` controls the level).

use std::path::PathBuf;
use std::sync::Arc;

use agent_host::AgentHost;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use serde_json::{json, Value};
use services::catalog::SocrataClient;
use shared::dataset::FailureKind;
use shared::settings::AnalysisSettings;
use shared::skill::{Mode, ToolOutcome};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "analy")]
#[command(about = "Tabular analysis tools for a conversational agent", version)]
struct Cli {
    /// CSV or TSV files to load before reading commands
    files: Vec<PathBuf>,

    /// Mode the session starts in
    #[arg(long, short = 'm', value_enum, default_value = "analysis")]
    mode: CliMode,

    /// Approve a Sensitive tool for the session (repeatable)
    #[arg(long = "approve", value_name = "TOOL")]
    approvals: Vec<String>,

    /// Catalog app token
    #[arg(long, env = "ANALY_CATALOG_TOKEN", hide_env_values = true)]
    catalog_token: Option<String>,

    /// Print the system prompt for the starting mode and exit
    #[arg(long)]
    print_prompt: bool,

    /// Print the session report to stderr on exit
    #[arg(long)]
    report: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    Cleaning,
    Analysis,
    Dashboard,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Cleaning => Mode::Cleaning,
            CliMode::Analysis => Mode::Analysis,
            CliMode::Dashboard => Mode::Dashboard,
        }
    }
}

/// One stdin line.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
enum Command {
    Tool {
        tool: String,
        #[serde(default)]
        args: Value,
    },
    Mode {
        mode: String,
    },
    User {
        user: String,
    },
}

fn parse_mode(s: &str) -> Option<Mode> {
    Mode::all()
        .iter()
        .copied()
        .find(|m| format!("{m:?}").eq_ignore_ascii_case(s.trim()))
}

fn invalid(message: impl Into<String>) -> Value {
    serde_json::to_value(ToolOutcome::HardFailure {
        kind: FailureKind::InvalidParams,
        message: message.into(),
    })
    .unwrap_or(Value::Null)
}

/// Run one command line against the session.
async fn handle_line(host: &mut AgentHost, line: &str) -> Value {
    let command: Command = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(e) => return invalid(format!("unreadable command: {e}")),
    };

    match command {
        Command::Tool { tool, args } => {
            let args = if args.is_null() { json!({}) } else { args };
            let outcome = host.dispatch(&tool, args).await;
            serde_json::to_value(outcome).unwrap_or(Value::Null)
        }
        Command::Mode { mode } => match parse_mode(&mode) {
            Some(mode) => {
                host.set_mode(mode);
                json!({ "mode": format!("{mode:?}").to_lowercase() })
            }
            None => invalid(format!("unknown mode: {mode}")),
        },
        Command::User { user } => json!({ "turn": host.user_message(&user) }),
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut settings = AnalysisSettings::load();
    if let Some(token) = cli.catalog_token.filter(|t| !t.trim().is_empty()) {
        settings.catalog.app_token = Some(token);
    }

    let catalog = Arc::new(SocrataClient::new(&settings.catalog)?);
    let mut host = AgentHost::new(settings, catalog);
    host.set_mode(cli.mode.into());
    for tool in &cli.approvals {
        host.approve(tool);
    }

    if cli.print_prompt {
        println!("{}", host.system_prompt());
        return Ok(());
    }

    for path in &cli.files {
        let dataset = services::load_csv(path)?;
        host.load_dataset(dataset)
            .with_context(|| format!("cannot load {}", path.display()))?;
    }

    tracing::info!(datasets = host.datasets().len(), mode = ?host.mode(), "session ready");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&mut host, &line).await;
        stdout.write_all(response.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    if cli.report {
        eprintln!("{}", host.report());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use services::catalog::{CatalogClient, CatalogEntry, CatalogQuery, DatasetMetadata};
    use shared::dataset::Row;

    struct Offline;

    #[async_trait]
    impl CatalogClient for Offline {
        async fn fetch(&self, _query: &CatalogQuery) -> Result<Vec<Row>> {
            Err(anyhow!("offline"))
        }

        async fn search(&self, _query: &str) -> Result<Vec<CatalogEntry>> {
            Err(anyhow!("offline"))
        }

        async fn metadata(&self, _dataset_id: &str) -> Result<DatasetMetadata> {
            Err(anyhow!("offline"))
        }
    }

    fn host() -> AgentHost {
        let mut host = AgentHost::new(AnalysisSettings::default(), Arc::new(Offline));
        let dataset = services::load_csv_str("sales.csv", "city,amt\nX,10\nY,20\nX,5\n").unwrap();
        host.load_dataset(dataset).unwrap();
        host
    }

    #[test]
    fn test_parse_commands() {
        let cmd: Command = serde_json::from_str(r#"{"tool": "list_datasets"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Tool {
                tool: "list_datasets".into(),
                args: Value::Null
            }
        );
        let cmd: Command = serde_json::from_str(r#"{"mode": "Dashboard"}"#).unwrap();
        assert_eq!(cmd, Command::Mode { mode: "Dashboard".into() });
        assert_eq!(parse_mode("cleaning"), Some(Mode::Cleaning));
        assert_eq!(parse_mode("find"), None);
    }

    #[tokio::test]
    async fn test_tool_line() {
        let mut host = host();
        let out = handle_line(
            &mut host,
            r#"{"tool": "analyze_column", "args": {"column_name": "city"}}"#,
        )
        .await;

        assert_eq!(out["status"], "ok");
        assert_eq!(out["value"]["data"][0], json!({"label": "X", "value": 2}));
    }

    #[tokio::test]
    async fn test_mode_and_bad_lines() {
        let mut host = host();
        assert_eq!(handle_line(&mut host, r#"{"mode": "cleaning"}"#).await["mode"], "cleaning");
        assert_eq!(host.mode(), Mode::Cleaning);

        let out = handle_line(&mut host, "not json").await;
        assert_eq!(out["status"], "hard_failure");
        assert_eq!(out["kind"], "invalid_params");
    }

    #[tokio::test]
    async fn test_catalog_failure_is_internal() {
        let mut host = host();
        host.approve("fetch_dataset");
        let out = handle_line(&mut host, r#"{"tool": "fetch_dataset", "args": {"dataset_id": "x"}}"#).await;
        assert_eq!(out["status"], "hard_failure");
        assert_eq!(out["kind"], "internal");
    }
}
