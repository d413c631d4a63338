//! The tool contract between the agent and the data engine.
//!
//! Each data operation the agent may call is a [`Skill`]. Skills receive
//! their JSON parameters in a [`SkillInput`], read and mutate the session's
//! dataset registry through the [`SkillContext`], and answer with a
//! [`SkillOutput`]. Hard failures travel as `Err` (usually a
//! [`DataError`](crate::dataset::DataError)); recoverable misuse is returned
//! as a soft error output so the agent can try again with other arguments.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::chart::ChartConfig;
use crate::dataset::{DataError, DatasetRegistry, FailureKind, Row};
use crate::settings::AnalysisSettings;

/// How much trust a tool needs before it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionLevel {
    /// Local, reads or rewrites session data only
    Safe,
    /// Leaves the process (network); approved once per session
    Sensitive,
}

/// Per-tool override chosen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Permission {
    Enabled,
    Disabled,
    #[default]
    Ask,
}

/// What the user is trying to do with their data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Cleaning,
    Analysis,
    Dashboard,
}

impl Mode {
    pub fn all() -> &'static [Mode] {
        &[Mode::Cleaning, Mode::Analysis, Mode::Dashboard]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Cleaning => "Data Cleaning",
            Mode::Analysis => "Data Analysis",
            Mode::Dashboard => "Chart Generation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

/// Shape of a skill's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultType {
    /// Structured object (stats, analysis, summaries)
    Data,
    /// Rows meant to be shown as a table
    Table,
    /// A resolved chart
    Chart,
    /// Soft error: the call was understood but cannot be answered
    Error,
}

/// Arguments of one tool call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillInput {
    /// Tool-call arguments as sent by the model
    pub params: serde_json::Map<String, Value>,
}

impl SkillInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object of arguments. Non-object values yield empty params.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(params) => Self { params },
            _ => Self::default(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    /// Deserialize the arguments into a typed parameter struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, DataError> {
        serde_json::from_value(Value::Object(self.params.clone()))
            .map_err(|e| DataError::invalid(e.to_string()))
    }
}

/// What a skill produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillOutput {
    pub result_type: ResultType,
    /// Short status line for the activity log
    pub text: Option<String>,
    /// Payload returned to the agent
    pub data: Option<Value>,
    /// Resolved chart, for the rendering layer
    pub chart: Option<ChartConfig>,
}

impl SkillOutput {
    pub fn data(value: Value) -> Self {
        Self {
            result_type: ResultType::Data,
            text: None,
            data: Some(value),
            chart: None,
        }
    }

    pub fn table(rows: Vec<Row>) -> Self {
        Self {
            result_type: ResultType::Table,
            text: None,
            data: Some(Value::Array(rows.into_iter().map(Value::Object).collect())),
            chart: None,
        }
    }

    pub fn chart(config: ChartConfig) -> Self {
        Self {
            result_type: ResultType::Chart,
            text: None,
            data: serde_json::to_value(&config).ok(),
            chart: Some(config),
        }
    }

    /// Recoverable failure reported back to the agent as `{"error": ...}`.
    pub fn soft_error(message: impl Into<String>) -> Self {
        Self {
            result_type: ResultType::Error,
            text: None,
            data: Some(serde_json::json!({ "error": message.into() })),
            chart: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn is_soft_error(&self) -> bool {
        self.result_type == ResultType::Error
    }
}

/// What the dispatcher hands back for one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Ok { value: Value },
    SoftError { error: String },
    HardFailure { kind: FailureKind, message: String },
}

impl ToolOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ToolOutcome::Ok { .. })
    }
}

impl From<&SkillOutput> for ToolOutcome {
    fn from(output: &SkillOutput) -> Self {
        if output.is_soft_error() {
            let error = output
                .data
                .as_ref()
                .and_then(|d| d.get("error"))
                .and_then(|e| e.as_str())
                .unwrap_or("unknown error")
                .to_string();
            ToolOutcome::SoftError { error }
        } else {
            ToolOutcome::Ok {
                value: output.data.clone().unwrap_or(Value::Null),
            }
        }
    }
}

/// Per-session state shared by every skill invocation
pub struct SkillContext {
    pub mode: Mode,
    /// Sensitive tools the user approved for this session
    pub session_approvals: Arc<RwLock<HashSet<String>>>,
    /// The session's datasets; the single source of truth
    pub datasets: Arc<RwLock<DatasetRegistry>>,
    /// Engine tunables
    pub settings: AnalysisSettings,
}

impl SkillContext {
    pub fn new(mode: Mode, settings: AnalysisSettings) -> Self {
        let registry = DatasetRegistry::with_capacity(settings.max_datasets);
        Self {
            mode,
            session_approvals: Arc::new(RwLock::new(HashSet::new())),
            datasets: Arc::new(RwLock::new(registry)),
            settings,
        }
    }

    pub fn is_session_approved(&self, skill_id: &str) -> bool {
        self.session_approvals.read().contains(skill_id)
    }

    pub fn approve_session(&self, skill_id: &str) {
        self.session_approvals.write().insert(skill_id.to_string());
    }
}

/// One finished (or running) tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillExecution {
    pub id: Uuid,
    pub skill_id: String,
    pub mode: Mode,
    pub timestamp: DateTime<Utc>,
    pub input: SkillInput,
    pub output: Option<SkillOutput>,
    pub status: ExecutionStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
}

impl SkillExecution {
    pub fn new(skill_id: impl Into<String>, mode: Mode, input: SkillInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            skill_id: skill_id.into(),
            mode,
            timestamp: Utc::now(),
            input,
            output: None,
            status: ExecutionStatus::Running,
            duration_ms: 0,
            error: None,
            failure: None,
        }
    }

    pub fn complete(mut self, output: SkillOutput, duration_ms: u64) -> Self {
        self.status = ExecutionStatus::Completed;
        self.output = Some(output);
        self.duration_ms = duration_ms;
        self
    }

    pub fn fail(mut self, error: &anyhow::Error, duration_ms: u64) -> Self {
        self.status = ExecutionStatus::Failed;
        // Anything that is not a DataError is our bug, not the caller's
        self.failure = Some(
            error
                .downcast_ref::<DataError>()
                .map_or(FailureKind::Internal, DataError::kind),
        );
        self.error = Some(error.to_string());
        self.duration_ms = duration_ms;
        self
    }

    /// Collapse the record into the three-way tool result.
    pub fn outcome(&self) -> ToolOutcome {
        match (&self.output, &self.error) {
            (Some(output), _) => ToolOutcome::from(output),
            (None, Some(error)) => ToolOutcome::HardFailure {
                kind: self.failure.unwrap_or(FailureKind::Internal),
                message: error.clone(),
            },
            (None, None) => ToolOutcome::HardFailure {
                kind: FailureKind::Internal,
                message: "execution did not finish".to_string(),
            },
        }
    }
}

/// A tool the agent can call.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Unique skill identifier (snake_case), also the tool name
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    /// Description shown to the model in the tool list
    fn description(&self) -> &'static str;

    fn permission_level(&self) -> PermissionLevel;

    /// Modes in which the tool is offered
    fn modes(&self) -> &'static [Mode];

    /// Run the tool. `Err` is a hard failure; misuse the agent can fix is an
    /// `Ok` soft error.
    async fn execute(&self, input: SkillInput, ctx: &SkillContext) -> anyhow::Result<SkillOutput>;

    /// Cheap checks before `execute`; failures never reach the skill
    fn validate_input(&self, _input: &SkillInput) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Dispatcher-level errors (the skill never ran)
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("Skill not found: {skill_id}")]
    NotFound { skill_id: String },

    #[error("Permission denied for skill: {skill_id}")]
    PermissionDenied { skill_id: String },

    #[error("Skill {skill_id} not available in {mode:?} mode")]
    ModeNotSupported { skill_id: String, mode: Mode },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl SkillError {
    pub fn into_outcome(self) -> ToolOutcome {
        let kind = match &self {
            SkillError::InvalidInput { .. } => FailureKind::InvalidParams,
            _ => FailureKind::Internal,
        };
        ToolOutcome::HardFailure {
            kind,
            message: self.to_string(),
        }
    }
}
