//! Tool registry for the data skills.
//!
//! Every tool the agent may call lives here together with the user's
//! permission for it. Listings come out ordered by id.

use std::collections::BTreeMap;
use std::sync::Arc;

use services::catalog::CatalogClient;
use shared::skill::{Mode, Permission, PermissionLevel, Skill, SkillContext, SkillError};

pub mod data;

pub struct SkillRegistry {
    skills: BTreeMap<String, Arc<dyn Skill>>,
    permissions: BTreeMap<String, Permission>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self {
            skills: BTreeMap::new(),
            permissions: BTreeMap::new(),
        }
    }

    /// Add a tool. Safe tools start enabled, Sensitive ones start at `Ask`;
    /// a permission set earlier survives re-registration.
    pub fn register(&mut self, skill: Arc<dyn Skill>) {
        let id = skill.id().to_string();
        self.permissions.entry(id.clone()).or_insert(match skill.permission_level() {
            PermissionLevel::Safe => Permission::Enabled,
            PermissionLevel::Sensitive => Permission::Ask,
        });
        self.skills.insert(id, skill);
    }

    pub fn get(&self, skill_id: &str) -> Option<&Arc<dyn Skill>> {
        self.skills.get(skill_id)
    }

    /// Tools callable in `mode`.
    pub fn for_mode(&self, mode: Mode) -> Vec<&Arc<dyn Skill>> {
        self.skills
            .values()
            .filter(|skill| skill.modes().contains(&mode))
            .collect()
    }

    pub fn get_permission(&self, skill_id: &str) -> Permission {
        self.permissions.get(skill_id).copied().unwrap_or(Permission::Ask)
    }

    pub fn set_permission(&mut self, skill_id: &str, permission: Permission) {
        self.permissions.insert(skill_id.to_string(), permission);
    }

    /// Whether `skill_id` may run right now: it must exist, list the current
    /// mode, and be enabled or (when Sensitive) approved for the session.
    pub fn can_execute(&self, skill_id: &str, ctx: &SkillContext) -> Result<(), SkillError> {
        let skill = self.skills.get(skill_id).ok_or_else(|| SkillError::NotFound {
            skill_id: skill_id.to_string(),
        })?;

        if !skill.modes().contains(&ctx.mode) {
            return Err(SkillError::ModeNotSupported {
                skill_id: skill_id.to_string(),
                mode: ctx.mode,
            });
        }

        let denied = match self.get_permission(skill_id) {
            Permission::Disabled => true,
            Permission::Ask => self.requires_approval(skill_id, ctx),
            Permission::Enabled => false,
        };
        if denied {
            return Err(SkillError::PermissionDenied {
                skill_id: skill_id.to_string(),
            });
        }
        Ok(())
    }

    /// A Sensitive tool at `Ask` that the session has not approved yet.
    pub fn requires_approval(&self, skill_id: &str, ctx: &SkillContext) -> bool {
        self.skills.get(skill_id).is_some_and(|skill| {
            skill.permission_level() == PermissionLevel::Sensitive
                && self.get_permission(skill_id) == Permission::Ask
                && !ctx.is_session_approved(skill_id)
        })
    }

    /// Tool descriptions for the prompt, ordered by id.
    pub fn skills_info_for_mode(&self, mode: Mode) -> Vec<SkillInfo> {
        self.for_mode(mode)
            .into_iter()
            .map(|skill| SkillInfo {
                id: skill.id(),
                name: skill.name(),
                description: skill.description(),
                permission_level: skill.permission_level(),
                modes: skill.modes().to_vec(),
                user_permission: self.get_permission(skill.id()),
            })
            .collect()
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct SkillInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub permission_level: PermissionLevel,
    pub modes: Vec<Mode>,
    pub user_permission: Permission,
}

/// Registry holding every data tool.
pub fn init_registry(catalog: Arc<dyn CatalogClient>) -> SkillRegistry {
    let mut registry = SkillRegistry::new();
    data::register_skills(&mut registry, catalog);
    registry
}
