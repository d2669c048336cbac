//! Permission and parent-context collaborators
//!
//! Project membership and the task/need hierarchy live outside this crate.
//! The moderation core only asks two questions of them: which project does a
//! comment belong to, and may this actor moderate that project.

use crate::comment::{Comment, ParentRef};
use crate::config::{ContextConfig, PermissionsConfig};
use crate::types::{Actor, ProjectId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Moderator seniority, which restricts the decisions a moderator may issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModeratorLevel {
    Junior,
    Senior,
    Admin,
}

impl std::fmt::Display for ModeratorLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeratorLevel::Junior => write!(f, "Junior Moderator"),
            ModeratorLevel::Senior => write!(f, "Senior Moderator"),
            ModeratorLevel::Admin => write!(f, "Administrator"),
        }
    }
}

/// Answers project-scoped permission questions
pub trait PermissionResolver: Send + Sync {
    /// Whether the actor holds moderation rights in the project
    fn can_moderate_project(&self, actor: &Actor, project: &ProjectId) -> bool;

    /// The actor's moderator level, if they moderate at all
    fn moderator_level(&self, actor: &Actor) -> Option<ModeratorLevel> {
        if actor.is_superuser {
            Some(ModeratorLevel::Admin)
        } else if actor.is_staff {
            Some(ModeratorLevel::Senior)
        } else {
            None
        }
    }
}

/// Resolves a comment attachment to the project that governs it
pub trait ParentResolver: Send + Sync {
    /// Project for a non-comment attachment. `ParentRef::Comment` is
    /// resolved by the board through the referenced comment.
    fn project_for(&self, parent: &ParentRef) -> Option<ProjectId>;
}

/// Staff and superusers moderate everything; otherwise the project decides
pub fn can_moderate(
    actor: &Actor,
    project: Option<&ProjectId>,
    permissions: &dyn PermissionResolver,
) -> bool {
    if actor.is_platform_moderator() {
        return true;
    }
    project
        .map(|p| permissions.can_moderate_project(actor, p))
        .unwrap_or(false)
}

/// Authors edit their own comments; moderators edit any
pub fn can_edit(
    actor: &Actor,
    comment: &Comment,
    project: Option<&ProjectId>,
    permissions: &dyn PermissionResolver,
) -> bool {
    comment.author.user_id() == Some(&actor.id) || can_moderate(actor, project, permissions)
}

/// Moderators see the moderation history of a comment
pub fn can_view_history(
    actor: &Actor,
    project: Option<&ProjectId>,
    permissions: &dyn PermissionResolver,
) -> bool {
    can_moderate(actor, project, permissions)
}

/// Only platform staff see user edits alongside moderation changes
pub fn can_view_all_changes(actor: &Actor) -> bool {
    actor.is_platform_moderator()
}

/// Permission grants read from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    superusers: HashSet<UserId>,
    staff: HashSet<UserId>,
    senior: HashSet<UserId>,
    junior: HashSet<UserId>,
    project_moderators: HashMap<ProjectId, HashSet<UserId>>,
}

impl StaticPermissions {
    /// Create an empty grant table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[permissions]` config section
    pub fn from_config(config: &PermissionsConfig) -> Self {
        let ids = |list: &[String]| list.iter().map(UserId::from_string).collect::<HashSet<_>>();

        Self {
            superusers: ids(&config.superusers),
            staff: ids(&config.staff),
            senior: ids(&config.senior_moderators),
            junior: ids(&config.junior_moderators),
            project_moderators: config
                .project_moderators
                .iter()
                .map(|(project, users)| (ProjectId::from_string(project.clone()), ids(users)))
                .collect(),
        }
    }

    /// Grant moderation rights on a project
    pub fn grant_project(&mut self, project: ProjectId, user: UserId) {
        self.project_moderators.entry(project).or_default().insert(user);
    }

    /// Mark a user as junior moderator
    pub fn set_junior(&mut self, user: UserId) {
        self.junior.insert(user);
    }

    /// Build the actor for a user id, applying staff/superuser flags
    pub fn actor_for(&self, id: &UserId) -> Actor {
        Actor {
            id: id.clone(),
            is_staff: self.staff.contains(id),
            is_superuser: self.superusers.contains(id),
        }
    }

    fn moderates_any_project(&self, id: &UserId) -> bool {
        self.project_moderators.values().any(|users| users.contains(id))
    }
}

impl PermissionResolver for StaticPermissions {
    fn can_moderate_project(&self, actor: &Actor, project: &ProjectId) -> bool {
        self.project_moderators
            .get(project)
            .map(|users| users.contains(&actor.id))
            .unwrap_or(false)
    }

    fn moderator_level(&self, actor: &Actor) -> Option<ModeratorLevel> {
        if actor.is_superuser || self.superusers.contains(&actor.id) {
            Some(ModeratorLevel::Admin)
        } else if self.junior.contains(&actor.id) {
            Some(ModeratorLevel::Junior)
        } else if actor.is_staff
            || self.staff.contains(&actor.id)
            || self.senior.contains(&actor.id)
            || self.moderates_any_project(&actor.id)
        {
            Some(ModeratorLevel::Senior)
        } else {
            None
        }
    }
}

/// Task/need -> project table read from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticParentResolver {
    tasks: HashMap<String, ProjectId>,
    needs: HashMap<String, ProjectId>,
}

impl StaticParentResolver {
    /// Create an empty resolver (only direct project attachments resolve)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[context]` config section
    pub fn from_config(config: &ContextConfig) -> Self {
        let table = |map: &std::collections::BTreeMap<String, String>| {
            map.iter()
                .map(|(k, v)| (k.clone(), ProjectId::from_string(v.clone())))
                .collect::<HashMap<_, _>>()
        };
        Self {
            tasks: table(&config.tasks),
            needs: table(&config.needs),
        }
    }

    /// Register the project a task belongs to
    pub fn with_task(mut self, task: impl Into<String>, project: impl Into<String>) -> Self {
        self.tasks.insert(task.into(), ProjectId::from_string(project));
        self
    }

    /// Register the project a need belongs to
    pub fn with_need(mut self, need: impl Into<String>, project: impl Into<String>) -> Self {
        self.needs.insert(need.into(), ProjectId::from_string(project));
        self
    }
}

impl ParentResolver for StaticParentResolver {
    fn project_for(&self, parent: &ParentRef) -> Option<ProjectId> {
        match parent {
            ParentRef::Project(id) => Some(id.clone()),
            ParentRef::Task(id) => self.tasks.get(id.as_str()).cloned(),
            ParentRef::Need(id) => self.needs.get(id.as_str()).cloned(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NeedId, TaskId};

    fn permissions() -> StaticPermissions {
        let mut config = PermissionsConfig::default();
        config.superusers = vec!["root".to_string()];
        config.staff = vec!["staffer".to_string()];
        config.junior_moderators = vec!["junior".to_string()];
        config
            .project_moderators
            .insert("p1".to_string(), vec!["mod".to_string(), "junior".to_string()]);
        StaticPermissions::from_config(&config)
    }

    #[test]
    fn test_project_moderation() {
        let perms = permissions();
        let p1 = ProjectId::from_string("p1");
        let p2 = ProjectId::from_string("p2");

        let moderator = Actor::user("mod");
        assert!(can_moderate(&moderator, Some(&p1), &perms));
        assert!(!can_moderate(&moderator, Some(&p2), &perms));
        assert!(!can_moderate(&moderator, None, &perms));

        let staff = perms.actor_for(&UserId::from_string("staffer"));
        assert!(staff.is_staff);
        assert!(can_moderate(&staff, None, &perms));
    }

    #[test]
    fn test_moderator_levels() {
        let perms = permissions();
        let level = |id: &str| perms.moderator_level(&perms.actor_for(&UserId::from_string(id)));

        assert_eq!(level("root"), Some(ModeratorLevel::Admin));
        assert_eq!(level("staffer"), Some(ModeratorLevel::Senior));
        assert_eq!(level("mod"), Some(ModeratorLevel::Senior));
        assert_eq!(level("junior"), Some(ModeratorLevel::Junior));
        assert_eq!(level("nobody"), None);
    }

    #[test]
    fn test_history_visibility() {
        let perms = permissions();
        let p1 = ProjectId::from_string("p1");

        assert!(can_view_history(&Actor::user("mod"), Some(&p1), &perms));
        assert!(!can_view_history(&Actor::user("rando"), Some(&p1), &perms));
        assert!(!can_view_all_changes(&Actor::user("mod")));
        assert!(can_view_all_changes(&Actor::staff("s")));
    }

    #[test]
    fn test_parent_resolver() {
        let resolver = StaticParentResolver::new()
            .with_task("t1", "p1")
            .with_need("n1", "p2");

        assert_eq!(
            resolver.project_for(&ParentRef::Project(ProjectId::from_string("p9"))),
            Some(ProjectId::from_string("p9"))
        );
        assert_eq!(
            resolver.project_for(&ParentRef::Task(TaskId::from_string("t1"))),
            Some(ProjectId::from_string("p1"))
        );
        assert_eq!(
            resolver.project_for(&ParentRef::Need(NeedId::from_string("n1"))),
            Some(ProjectId::from_string("p2"))
        );
        assert_eq!(
            resolver.project_for(&ParentRef::Task(TaskId::from_string("unknown"))),
            None
        );
        assert_eq!(resolver.project_for(&ParentRef::None), None);
    }
}
