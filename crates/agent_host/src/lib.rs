//! Agent Host - tool dispatcher for a data analysis session
//!
//! This crate provides:
//! - The data skills (one per engine operation) and their registry
//! - A sequential skill executor with lifecycle events
//! - The per-session `AgentHost` that owns the dataset registry, routes tool
//!   calls, and keeps a user-facing activity transcript
//! - Prompt and dataset-context builders for the conversational layer

pub mod prompts;
pub mod skill_executor;
pub mod skills;

pub use prompts::{dataset_context, get_mode_prompt, get_system_prompt, user_turn, ModePrompt};
pub use skill_executor::{BatchExecutionResult, SkillExecutor};
pub use skills::{init_registry, SkillInfo, SkillRegistry};

use std::sync::Arc;

use parking_lot::RwLockReadGuard;
use serde_json::Value;
use services::catalog::CatalogClient;
use shared::dataset::{DataError, Dataset, DatasetRegistry};
use shared::events::{ActivityEntry, ActivityRole, SkillEvent};
use shared::settings::AnalysisSettings;
use shared::skill::{Mode, Permission, SkillContext, SkillInput, ToolOutcome};
use tokio::sync::mpsc;

/// One analysis session: its datasets, its tools and its transcript.
///
/// Tool calls take `&mut self`, so a session can only ever run one call at a
/// time. Separate sessions get separate hosts and share nothing.
pub struct AgentHost {
    skills: SkillRegistry,
    executor: SkillExecutor,
    ctx: SkillContext,
    transcript: Vec<ActivityEntry>,
}

impl AgentHost {
    pub fn new(settings: AnalysisSettings, catalog: Arc<dyn CatalogClient>) -> Self {
        Self {
            skills: init_registry(catalog),
            executor: SkillExecutor::new(),
            ctx: SkillContext::new(Mode::Analysis, settings),
            transcript: Vec::new(),
        }
    }

    /// Stream skill lifecycle events to `sender`.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<SkillEvent>) -> Self {
        self.executor = SkillExecutor::with_events(sender);
        self
    }

    pub fn mode(&self) -> Mode {
        self.ctx.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.ctx.mode != mode {
            tracing::info!(?mode, "mode changed");
            self.log(ActivityRole::System, format!("Mode: {}", mode.display_name()));
        }
        self.ctx.mode = mode;
    }

    /// Approve a Sensitive skill for the rest of the session.
    pub fn approve(&self, skill_id: &str) {
        self.ctx.approve_session(skill_id);
    }

    pub fn set_permission(&mut self, skill_id: &str, permission: Permission) {
        self.skills.set_permission(skill_id, permission);
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.ctx.settings
    }

    /// Read access to the session's datasets.
    pub fn datasets(&self) -> RwLockReadGuard<'_, DatasetRegistry> {
        self.ctx.datasets.read()
    }

    /// Register an uploaded dataset. Refused when every slot is taken.
    pub fn load_dataset(&mut self, dataset: Dataset) -> Result<(), DataError> {
        let (name, rows) = (dataset.name().to_string(), dataset.row_count());
        {
            let mut registry = self.ctx.datasets.write();
            registry.ensure_capacity()?;
            registry.add(dataset)?;
        }
        tracing::info!(dataset = %name, rows, "dataset uploaded");
        self.log(
            ActivityRole::System,
            format!("Uploaded {} ({} rows processed)", name, rows),
        );
        Ok(())
    }

    /// Record a user message and build the turn text for the model.
    pub fn user_message(&mut self, message: &str) -> String {
        self.log(ActivityRole::User, message);
        user_turn(&self.datasets(), message)
    }

    /// System prompt for the current mode and its tools.
    pub fn system_prompt(&self) -> String {
        let tools = self.skills.skills_info_for_mode(self.ctx.mode);
        get_system_prompt(self.ctx.mode, &tools, self.ctx.settings.max_datasets)
    }

    /// Run one tool call and return its three-way result.
    pub async fn dispatch(&mut self, tool: &str, params: Value) -> ToolOutcome {
        tracing::debug!(tool, "dispatching tool call");

        if let Err(e) = self.skills.can_execute(tool, &self.ctx) {
            tracing::warn!(tool, error = %e, "tool call refused");
            self.log(ActivityRole::Model, format!("Error: {}", e));
            return e.into_outcome();
        }
        let Some(skill) = self.skills.get(tool).cloned() else {
            return ToolOutcome::HardFailure {
                kind: shared::FailureKind::Internal,
                message: format!("Skill not found: {tool}"),
            };
        };

        let input = SkillInput::from_value(params);
        let outcome = match self.executor.execute(&skill, input, &self.ctx).await {
            Ok(execution) => {
                if let Some(text) = execution.output.as_ref().and_then(|o| o.text.clone()) {
                    self.transcript.push(ActivityEntry::tool(tool, text));
                }
                execution.outcome()
            }
            Err(e) => e.into_outcome(),
        };

        match &outcome {
            ToolOutcome::HardFailure { message, .. } => {
                self.log(ActivityRole::Model, format!("Error: {}", message));
            }
            ToolOutcome::SoftError { error } => {
                tracing::debug!(tool, %error, "tool returned soft error");
            }
            ToolOutcome::Ok { .. } => {}
        }
        outcome
    }

    pub fn transcript(&self) -> &[ActivityEntry] {
        &self.transcript
    }

    /// Plain-text session report: the transcript plus the datasets left loaded.
    pub fn report(&self) -> String {
        let mut lines: Vec<String> = self.transcript.iter().map(ActivityEntry::render).collect();
        let context = dataset_context(&self.datasets());
        if !context.is_empty() {
            lines.push(String::new());
            lines.push(context);
        }
        lines.join("\n")
    }

    fn log(&mut self, role: ActivityRole, content: impl Into<String>) {
        self.transcript.push(ActivityEntry::new(role, content));
    }
}
