//! Best-effort plan execution.
//!
//! Actions run in array order. Each action is isolated: a failure produces a
//! report line and execution continues. No rollback, no transaction. A
//! fixed pause between actions keeps the bot under the platform's request
//! rate ceiling.

use crate::error::PlanError;
use crate::plan::actions::{Action, ActionPlan, EVERYONE, PermissionFlags, parse_color};
use crate::store::ReactionRoleStore;
use std::collections::HashMap;
use std::time::Duration;

/// Target of a permission overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleTarget {
    /// The platform's implicit default role.
    Everyone,
    /// A role looked up by name.
    Named(String),
}

/// Permission overwrites resolved from a plan's `permissions` map.
pub type Overwrites = Vec<(RoleTarget, PermissionFlags)>;

/// The slice of the chat platform the executor depends on: role, channel
/// and category CRUD, member mutation, and message send/react. The serenity
/// implementation lives in `discord::guild`; tests use a mock.
#[async_trait::async_trait]
pub trait GuildOps: Send + Sync {
    async fn create_role(
        &self,
        name: &str,
        color: Option<u32>,
        hoist: bool,
    ) -> Result<(), PlanError>;

    /// Create a grouping container, returning its ID.
    async fn create_category(&self, name: &str, overwrites: &Overwrites)
    -> Result<u64, PlanError>;

    /// Look up an existing category by name. First match wins; duplicate
    /// names are not disambiguated.
    async fn find_category(&self, name: &str) -> Option<u64>;

    /// Create a messaging channel, optionally under a category.
    async fn create_text_channel(
        &self,
        name: &str,
        category: Option<u64>,
        overwrites: &Overwrites,
        topic: Option<&str>,
    ) -> Result<u64, PlanError>;

    /// Delete a channel by name. Returns false when no channel matched.
    async fn delete_channel(&self, name: &str) -> Result<bool, PlanError>;

    /// Kick a member matched by display name. Returns false when absent.
    async fn kick_member(&self, display_name: &str) -> Result<bool, PlanError>;

    /// Post a message in a named channel and seed it with a reaction.
    /// Returns the message ID, or None when the channel does not exist.
    async fn post_reaction_message(
        &self,
        channel: &str,
        content: &str,
        emoji: &str,
    ) -> Result<Option<u64>, PlanError>;
}

/// One line of the execution report, already user-formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionReport {
    Done(String),
    Skipped(String),
    Failed(String),
}

impl ActionReport {
    pub fn line(&self) -> &str {
        match self {
            ActionReport::Done(line)
            | ActionReport::Skipped(line)
            | ActionReport::Failed(line) => line,
        }
    }
}

/// Executes a parsed plan against a guild.
///
/// The caller must have verified the invoking user holds administrator
/// privilege; the executor does not re-check.
pub struct Executor<'a> {
    guild: &'a dyn GuildOps,
    reaction_roles: &'a ReactionRoleStore,
    pause: Duration,
}

/// Pause between actions; not adaptive.
const ACTION_PAUSE: Duration = Duration::from_secs(1);

impl<'a> Executor<'a> {
    pub fn new(guild: &'a dyn GuildOps, reaction_roles: &'a ReactionRoleStore) -> Self {
        Self {
            guild,
            reaction_roles,
            pause: ACTION_PAUSE,
        }
    }

    /// Override the inter-action pause (tests use zero).
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Run every action in order, collecting one report line per element.
    pub async fn execute(&self, plan: &ActionPlan) -> Vec<ActionReport> {
        let mut reports = Vec::with_capacity(plan.actions.len());
        // Categories created by this plan, looked up before pre-existing
        // ones when a later create_text references them by name.
        let mut created_categories: HashMap<String, u64> = HashMap::new();

        for (index, raw) in plan.actions.iter().enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            let action = match Action::decode(raw) {
                Ok(action) => action,
                Err(error) => {
                    reports.push(ActionReport::Skipped(format!(
                        "⚠️ Skipped action {}: {error}",
                        index + 1
                    )));
                    continue;
                }
            };

            let report = self.run(action, &mut created_categories).await;
            reports.push(report);
        }

        reports
    }

    async fn run(
        &self,
        action: Action,
        created_categories: &mut HashMap<String, u64>,
    ) -> ActionReport {
        match action {
            Action::CreateRole { name, color, hoist } => {
                let color = color.as_deref().and_then(parse_color);
                match self
                    .guild
                    .create_role(&name, color, hoist.unwrap_or(false))
                    .await
                {
                    Ok(()) => ActionReport::Done(format!("🎨 Created role: **{name}**")),
                    Err(error) => failed("create_role", &name, error),
                }
            }
            Action::CreateCategory { name, permissions } => {
                let overwrites = resolve_overwrites(permissions);
                match self.guild.create_category(&name, &overwrites).await {
                    Ok(id) => {
                        created_categories.insert(name.clone(), id);
                        ActionReport::Done(format!("📂 Created: **{name}**"))
                    }
                    Err(error) => failed("create_category", &name, error),
                }
            }
            Action::CreateText {
                name,
                category,
                permissions,
                description,
            } => {
                // Just-created categories win over pre-existing same-named
                // ones; no match at all falls back to no category.
                let parent = category.as_deref().and_then(|category_name| {
                    created_categories.get(category_name).copied()
                });
                let parent = match (parent, category.as_deref()) {
                    (Some(id), _) => Some(id),
                    (None, Some(category_name)) => self.guild.find_category(category_name).await,
                    (None, None) => None,
                };

                let overwrites = resolve_overwrites(permissions);
                match self
                    .guild
                    .create_text_channel(&name, parent, &overwrites, description.as_deref())
                    .await
                {
                    Ok(_) => ActionReport::Done(format!("💬 Created text: **{name}**")),
                    Err(error) => failed("create_text", &name, error),
                }
            }
            Action::DeleteChannel { name } => match self.guild.delete_channel(&name).await {
                Ok(true) => ActionReport::Done(format!("🗑️ Deleted: **{name}**")),
                Ok(false) => {
                    ActionReport::Skipped(format!("🗑️ No channel named **{name}**, skipped"))
                }
                Err(error) => failed("delete_channel", &name, error),
            },
            Action::Kick { user } => match self.guild.kick_member(&user).await {
                Ok(true) => ActionReport::Done(format!("🥾 Kicked: **{user}**")),
                Ok(false) => ActionReport::Skipped(format!("🥾 No member named **{user}**, skipped")),
                Err(error) => failed("kick", &user, error),
            },
            Action::ReactionRoleMessage {
                channel,
                emoji,
                role,
                description,
            } => {
                let content = format!(
                    "{emoji} **Want the `{role}` role?** {description}\nReact with {emoji} to opt in; remove your reaction to opt out."
                );
                match self
                    .guild
                    .post_reaction_message(&channel, &content, &emoji)
                    .await
                {
                    Ok(Some(message_id)) => {
                        if let Err(error) = self.reaction_roles.register(message_id, &role).await {
                            return ActionReport::Failed(format!(
                                "⚠️ Posted opt-in but failed to register it: {error}"
                            ));
                        }
                        ActionReport::Done(format!("🔔 Opt-in for **{role}** posted in #{channel}"))
                    }
                    Ok(None) => {
                        ActionReport::Skipped(format!("⚠️ No channel named #{channel}, skipped"))
                    }
                    Err(error) => failed("reaction_role_message", &role, error),
                }
            }
        }
    }
}

fn failed(kind: &str, target: &str, error: PlanError) -> ActionReport {
    ActionReport::Failed(format!("⚠️ {kind} **{target}** failed: {error}"))
}

/// Turn a plan `permissions` map into overwrite targets. The `@everyone`
/// key maps to the default role sentinel.
fn resolve_overwrites(permissions: Option<HashMap<String, PermissionFlags>>) -> Overwrites {
    permissions
        .map(|map| {
            map.into_iter()
                .map(|(role_name, flags)| {
                    let target = if role_name == EVERYONE {
                        RoleTarget::Everyone
                    } else {
                        RoleTarget::Named(role_name)
                    };
                    (target, flags)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::sync::Mutex;

    /// Records calls; `find_category` always answers with a pre-existing ID.
    #[derive(Default)]
    struct MockGuild {
        existing_categories: HashMap<String, u64>,
        created_text: Mutex<Vec<(String, Option<u64>)>>,
        deleted: Mutex<Vec<String>>,
        next_category_id: Mutex<u64>,
        fail_category: bool,
    }

    #[async_trait::async_trait]
    impl GuildOps for MockGuild {
        async fn create_role(
            &self,
            _name: &str,
            _color: Option<u32>,
            _hoist: bool,
        ) -> Result<(), PlanError> {
            Ok(())
        }

        async fn create_category(
            &self,
            _name: &str,
            _overwrites: &Overwrites,
        ) -> Result<u64, PlanError> {
            if self.fail_category {
                return Err(PlanError::GuildOp("permission denied".into()));
            }
            let mut next = self.next_category_id.lock().unwrap();
            *next += 1;
            Ok(1000 + *next)
        }

        async fn find_category(&self, name: &str) -> Option<u64> {
            self.existing_categories.get(name).copied()
        }

        async fn create_text_channel(
            &self,
            name: &str,
            category: Option<u64>,
            _overwrites: &Overwrites,
            _topic: Option<&str>,
        ) -> Result<u64, PlanError> {
            self.created_text
                .lock()
                .unwrap()
                .push((name.to_string(), category));
            Ok(1)
        }

        async fn delete_channel(&self, name: &str) -> Result<bool, PlanError> {
            if name == "ghost" {
                return Ok(false);
            }
            self.deleted.lock().unwrap().push(name.to_string());
            Ok(true)
        }

        async fn kick_member(&self, display_name: &str) -> Result<bool, PlanError> {
            Ok(display_name != "ghost")
        }

        async fn post_reaction_message(
            &self,
            channel: &str,
            _content: &str,
            _emoji: &str,
        ) -> Result<Option<u64>, PlanError> {
            if channel == "missing" {
                return Ok(None);
            }
            Ok(Some(777))
        }
    }

    fn reaction_store(dir: &tempfile::TempDir) -> ReactionRoleStore {
        ReactionRoleStore::load(dir.path().join("reaction_roles.json"))
    }

    fn plan(json: &str) -> ActionPlan {
        ActionPlan::parse(&format!("```json\n{json}\n```")).unwrap()
    }

    #[tokio::test]
    async fn unknown_action_is_skipped_without_aborting() {
        let guild = MockGuild::default();
        let dir = tempfile::tempdir().unwrap();
        let store = reaction_store(&dir);
        let executor = Executor::new(&guild, &store).with_pause(Duration::ZERO);

        let plan = plan(indoc! {r#"
            {"plan_name": "p", "actions": [
              {"type": "summon_dragon"},
              {"type": "delete_channel", "name": "old-news"}
            ]}
        "#});

        let reports = executor.execute(&plan).await;
        assert!(matches!(reports[0], ActionReport::Skipped(_)));
        assert!(matches!(reports[1], ActionReport::Done(_)));
        assert_eq!(*guild.deleted.lock().unwrap(), vec!["old-news"]);
    }

    #[tokio::test]
    async fn create_text_falls_back_to_no_category() {
        let guild = MockGuild::default();
        let dir = tempfile::tempdir().unwrap();
        let store = reaction_store(&dir);
        let executor = Executor::new(&guild, &store).with_pause(Duration::ZERO);

        let plan = plan(
            r#"{"plan_name": "p", "actions": [
                {"type": "create_text", "name": "lounge", "category": "Nowhere"}
            ]}"#,
        );

        let reports = executor.execute(&plan).await;
        assert!(matches!(reports[0], ActionReport::Done(_)));
        assert_eq!(
            *guild.created_text.lock().unwrap(),
            vec![("lounge".to_string(), None)]
        );
    }

    #[tokio::test]
    async fn just_created_category_wins_over_preexisting() {
        let guild = MockGuild {
            existing_categories: HashMap::from([("Mentors".to_string(), 42)]),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let store = reaction_store(&dir);
        let executor = Executor::new(&guild, &store).with_pause(Duration::ZERO);

        let plan = plan(indoc! {r#"
            {"plan_name": "p", "actions": [
              {"type": "create_category", "name": "Mentors"},
              {"type": "create_text", "name": "mentor-lounge", "category": "Mentors"}
            ]}
        "#});

        executor.execute(&plan).await;

        let created = guild.created_text.lock().unwrap();
        let (_, parent) = &created[0];
        // 1001 is the freshly created category, 42 the pre-existing one.
        assert_eq!(*parent, Some(1001));
    }

    #[tokio::test]
    async fn failure_is_isolated_per_action() {
        let guild = MockGuild {
            fail_category: true,
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let store = reaction_store(&dir);
        let executor = Executor::new(&guild, &store).with_pause(Duration::ZERO);

        let plan = plan(indoc! {r#"
            {"plan_name": "p", "actions": [
              {"type": "create_category", "name": "Broken"},
              {"type": "kick", "user": "spammer"}
            ]}
        "#});

        let reports = executor.execute(&plan).await;
        assert!(matches!(reports[0], ActionReport::Failed(_)));
        assert!(matches!(reports[1], ActionReport::Done(_)));
    }

    #[tokio::test]
    async fn missing_targets_are_noops() {
        let guild = MockGuild::default();
        let dir = tempfile::tempdir().unwrap();
        let store = reaction_store(&dir);
        let executor = Executor::new(&guild, &store).with_pause(Duration::ZERO);

        let plan = plan(indoc! {r#"
            {"plan_name": "p", "actions": [
              {"type": "delete_channel", "name": "ghost"},
              {"type": "kick", "user": "ghost"}
            ]}
        "#});

        let reports = executor.execute(&plan).await;
        assert!(matches!(reports[0], ActionReport::Skipped(_)));
        assert!(matches!(reports[1], ActionReport::Skipped(_)));
    }

    #[tokio::test]
    async fn reaction_role_message_registers_mapping() {
        let guild = MockGuild::default();
        let dir = tempfile::tempdir().unwrap();
        let store = reaction_store(&dir);
        let executor = Executor::new(&guild, &store).with_pause(Duration::ZERO);

        let plan = plan(indoc! {r#"
            {"plan_name": "p", "actions": [
              {"type": "reaction_role_message", "channel": "get-roles",
               "emoji": "🔔", "role": "Night Owls", "description": "Join us!"}
            ]}
        "#});

        let reports = executor.execute(&plan).await;
        assert!(matches!(reports[0], ActionReport::Done(_)));
        assert_eq!(store.role_for(777).await.as_deref(), Some("Night Owls"));
    }
}
