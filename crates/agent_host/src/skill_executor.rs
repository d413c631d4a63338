//! Skill execution wrapper.
//!
//! Runs one skill to completion, records the execution and reports lifecycle
//! events. There is no timeout: every data operation is bounded by the
//! dataset size cap, and calls within a session never overlap.

use std::sync::Arc;
use std::time::Instant;

use shared::events::SkillEvent;
use shared::skill::{Skill, SkillContext, SkillError, SkillExecution, SkillInput, ToolOutcome};
use tokio::sync::mpsc;

/// Runs skills one at a time, optionally reporting lifecycle events.
pub struct SkillExecutor {
    events: Option<mpsc::UnboundedSender<SkillEvent>>,
}

impl SkillExecutor {
    pub fn new() -> Self {
        Self { events: None }
    }

    pub fn with_events(events: mpsc::UnboundedSender<SkillEvent>) -> Self {
        Self { events: Some(events) }
    }

    /// Execute a skill. Hard failures inside the skill come back as a failed
    /// execution; `Err` means the skill never ran.
    pub async fn execute(
        &self,
        skill: &Arc<dyn Skill>,
        input: SkillInput,
        ctx: &SkillContext,
    ) -> Result<SkillExecution, SkillError> {
        let skill_id = skill.id();
        let mode = ctx.mode;

        skill
            .validate_input(&input)
            .map_err(|e| SkillError::InvalidInput {
                message: e.to_string(),
            })?;

        let execution = SkillExecution::new(skill_id, mode, input.clone());
        let execution_id = execution.id;
        self.emit(SkillEvent::Started {
            execution_id,
            skill_id: skill_id.to_string(),
            mode,
        });

        let start = Instant::now();
        let result = skill.execute(input, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                tracing::debug!(skill_id, duration_ms, soft_error = output.is_soft_error(), "skill completed");
                self.emit(SkillEvent::Completed {
                    execution_id,
                    duration_ms,
                });
                Ok(execution.complete(output, duration_ms))
            }
            Err(e) => {
                let execution = execution.fail(&e, duration_ms);
                tracing::warn!(skill_id, error = %e, "skill failed");
                self.emit(SkillEvent::Failed {
                    execution_id,
                    kind: execution.failure.unwrap_or(shared::FailureKind::Internal),
                    error: e.to_string(),
                    duration_ms,
                });
                Ok(execution)
            }
        }
    }

    fn emit(&self, event: SkillEvent) {
        // A dropped receiver just means nobody is listening any more
        if let Some(events) = &self.events {
            events.send(event).ok();
        }
    }
}

impl Default for SkillExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Every call of a batch, in call order.
pub struct BatchExecutionResult {
    pub executions: Vec<(String, Result<SkillExecution, SkillError>)>,
    pub total_duration_ms: u64,
}

impl BatchExecutionResult {
    /// The tool result of every call, in order.
    pub fn outcomes(self) -> Vec<ToolOutcome> {
        self.executions
            .into_iter()
            .map(|(_, result)| match result {
                Ok(execution) => execution.outcome(),
                Err(e) => e.into_outcome(),
            })
            .collect()
    }
}

impl SkillExecutor {
    /// Execute multiple skills strictly one after another; each call sees the
    /// registry as the previous one left it.
    pub async fn execute_batch(
        &self,
        skills: Vec<(Arc<dyn Skill>, SkillInput)>,
        ctx: &SkillContext,
    ) -> BatchExecutionResult {
        let start = Instant::now();
        let mut executions = Vec::with_capacity(skills.len());

        for (skill, input) in skills {
            let result = self.execute(&skill, input, ctx).await;
            executions.push((skill.id().to_string(), result));
        }

        BatchExecutionResult {
            executions,
            total_duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}
