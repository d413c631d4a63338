//! Event types for skill execution and the session activity log.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dataset::FailureKind;
use crate::skill::Mode;

/// Who produced an activity line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityRole {
    User,
    Model,
    System,
}

impl ActivityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityRole::User => "user",
            ActivityRole::Model => "model",
            ActivityRole::System => "system",
        }
    }
}

/// One line of the user-facing session transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: ActivityRole,
    /// Tool that produced the line, if any
    pub skill_id: Option<String>,
    pub content: String,
}

impl ActivityEntry {
    pub fn new(role: ActivityRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            skill_id: None,
            content: content.into(),
        }
    }

    /// Status line emitted while a tool runs
    pub fn tool(skill_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            skill_id: Some(skill_id.into()),
            ..Self::new(ActivityRole::System, content)
        }
    }

    /// `[ROLE] HH:MM:SS: content`, in local time
    pub fn render(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.role.as_str().to_uppercase(),
            self.timestamp.with_timezone(&Local).format("%H:%M:%S"),
            self.content
        )
    }
}

/// Lifecycle of one tool call, streamed to whoever listens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SkillEvent {
    Started {
        execution_id: Uuid,
        skill_id: String,
        mode: Mode,
    },
    /// Skill execution completed (including soft errors)
    Completed {
        execution_id: Uuid,
        duration_ms: u64,
    },
    /// Skill execution failed with a hard error
    Failed {
        execution_id: Uuid,
        kind: FailureKind,
        error: String,
        duration_ms: u64,
    },
}

impl SkillEvent {
    pub fn execution_id(&self) -> Uuid {
        match self {
            SkillEvent::Started { execution_id, .. } => *execution_id,
            SkillEvent::Completed { execution_id, .. } => *execution_id,
            SkillEvent::Failed { execution_id, .. } => *execution_id,
        }
    }
}
