//! Serenity-backed implementation of the executor's guild operations.

use crate::error::PlanError;
use crate::plan::executor::{GuildOps, Overwrites, RoleTarget};
use crate::plan::actions::PermissionFlags;

use serenity::all::{
    ChannelId, ChannelType, Colour, CreateChannel, EditRole, GuildChannel, GuildId, Http, Member,
    PermissionOverwrite, PermissionOverwriteType, Permissions, ReactionType, Role, RoleId,
};
use std::sync::Arc;

/// One guild as seen through the HTTP API.
pub struct SerenityGuild {
    http: Arc<Http>,
    guild_id: GuildId,
}

impl SerenityGuild {
    pub fn new(http: Arc<Http>, guild_id: GuildId) -> Self {
        Self { http, guild_id }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Look up a role by exact name. First match wins.
    pub async fn find_role(&self, name: &str) -> Result<Option<Role>, PlanError> {
        let roles = self.guild_id.roles(&self.http).await.map_err(guild_op)?;
        Ok(roles.into_values().find(|role| role.name == name))
    }

    /// Look up a channel by name, optionally restricted to one kind.
    pub async fn find_channel(
        &self,
        name: &str,
        kind: Option<ChannelType>,
    ) -> Result<Option<GuildChannel>, PlanError> {
        let channels = self.guild_id.channels(&self.http).await.map_err(guild_op)?;
        Ok(channels.into_values().find(|channel| {
            channel.name == name && kind.is_none_or(|kind| channel.kind == kind)
        }))
    }

    /// Resolve plan overwrite targets to platform permission primitives.
    /// A named role that does not exist is skipped, mirroring the rest of
    /// the executor's best-effort stance.
    async fn build_overwrites(&self, overwrites: &Overwrites) -> Vec<PermissionOverwrite> {
        if overwrites.is_empty() {
            return Vec::new();
        }

        let roles = match self.guild_id.roles(&self.http).await {
            Ok(roles) => roles,
            Err(error) => {
                tracing::warn!(%error, "failed to list roles for overwrites");
                return Vec::new();
            }
        };

        let mut resolved = Vec::with_capacity(overwrites.len());
        for (target, flags) in overwrites {
            let role_id = match target {
                // The default role shares the guild's own ID.
                RoleTarget::Everyone => RoleId::new(self.guild_id.get()),
                RoleTarget::Named(name) => {
                    match roles.values().find(|role| &role.name == name) {
                        Some(role) => role.id,
                        None => {
                            tracing::warn!(role = %name, "overwrite role not found, skipping");
                            continue;
                        }
                    }
                }
            };
            resolved.push(flags_to_overwrite(*flags, role_id));
        }
        resolved
    }
}

fn guild_op(error: serenity::Error) -> PlanError {
    PlanError::GuildOp(error.to_string())
}

/// Map the plan's boolean capability flags onto allow/deny bits.
/// `read_messages` is the platform's legacy alias for channel visibility.
pub fn flags_to_overwrite(flags: PermissionFlags, role_id: RoleId) -> PermissionOverwrite {
    let mut allow = Permissions::empty();
    let mut deny = Permissions::empty();

    let mut apply = |value: Option<bool>, bit: Permissions| match value {
        Some(true) => allow |= bit,
        Some(false) => deny |= bit,
        None => {}
    };
    apply(flags.view_channel, Permissions::VIEW_CHANNEL);
    apply(flags.read_messages, Permissions::VIEW_CHANNEL);
    apply(flags.send_messages, Permissions::SEND_MESSAGES);

    PermissionOverwrite {
        allow,
        deny,
        kind: PermissionOverwriteType::Role(role_id),
    }
}

#[async_trait::async_trait]
impl GuildOps for SerenityGuild {
    async fn create_role(
        &self,
        name: &str,
        color: Option<u32>,
        hoist: bool,
    ) -> Result<(), PlanError> {
        let mut builder = EditRole::new().name(name).hoist(hoist).mentionable(true);
        if let Some(color) = color {
            builder = builder.colour(Colour::new(color));
        }
        self.guild_id
            .create_role(&self.http, builder)
            .await
            .map_err(guild_op)?;
        Ok(())
    }

    async fn create_category(
        &self,
        name: &str,
        overwrites: &Overwrites,
    ) -> Result<u64, PlanError> {
        let permissions = self.build_overwrites(overwrites).await;
        let builder = CreateChannel::new(name)
            .kind(ChannelType::Category)
            .permissions(permissions);
        let category = self
            .guild_id
            .create_channel(&self.http, builder)
            .await
            .map_err(guild_op)?;
        Ok(category.id.get())
    }

    async fn find_category(&self, name: &str) -> Option<u64> {
        match self.find_channel(name, Some(ChannelType::Category)).await {
            Ok(channel) => channel.map(|channel| channel.id.get()),
            Err(error) => {
                tracing::warn!(%error, category = %name, "category lookup failed");
                None
            }
        }
    }

    async fn create_text_channel(
        &self,
        name: &str,
        category: Option<u64>,
        overwrites: &Overwrites,
        topic: Option<&str>,
    ) -> Result<u64, PlanError> {
        let permissions = self.build_overwrites(overwrites).await;
        let mut builder = CreateChannel::new(name)
            .kind(ChannelType::Text)
            .permissions(permissions);
        if let Some(category) = category {
            builder = builder.category(ChannelId::new(category));
        }
        if let Some(topic) = topic {
            builder = builder.topic(topic);
        }
        let channel = self
            .guild_id
            .create_channel(&self.http, builder)
            .await
            .map_err(guild_op)?;
        Ok(channel.id.get())
    }

    async fn delete_channel(&self, name: &str) -> Result<bool, PlanError> {
        let Some(channel) = self.find_channel(name, None).await? else {
            return Ok(false);
        };
        channel.id.delete(&self.http).await.map_err(guild_op)?;
        Ok(true)
    }

    async fn kick_member(&self, display_name: &str) -> Result<bool, PlanError> {
        let members = self
            .guild_id
            .members(&self.http, None, None)
            .await
            .map_err(guild_op)?;
        let Some(member) = members
            .iter()
            .find(|member| member_matches(member, display_name))
        else {
            return Ok(false);
        };
        member
            .kick_with_reason(&self.http, "Maestro Bot admin action")
            .await
            .map_err(guild_op)?;
        Ok(true)
    }

    async fn post_reaction_message(
        &self,
        channel: &str,
        content: &str,
        emoji: &str,
    ) -> Result<Option<u64>, PlanError> {
        let Some(target) = self.find_channel(channel, Some(ChannelType::Text)).await? else {
            return Ok(None);
        };

        let message = target.id.say(&self.http, content).await.map_err(guild_op)?;
        message
            .react(&self.http, ReactionType::Unicode(emoji.to_string()))
            .await
            .map_err(guild_op)?;
        Ok(Some(message.id.get()))
    }
}

fn member_matches(member: &Member, display_name: &str) -> bool {
    member.user.name == display_name || member.display_name() == display_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serenity_guild_satisfies_the_executor_seam() {
        fn assert_ops<T: GuildOps>() {}
        assert_ops::<SerenityGuild>();
    }

    #[test]
    fn read_messages_is_a_visibility_alias() {
        let flags = PermissionFlags {
            view_channel: None,
            send_messages: Some(true),
            read_messages: Some(false),
        };
        let overwrite = flags_to_overwrite(flags, RoleId::new(1));
        assert!(overwrite.deny.contains(Permissions::VIEW_CHANNEL));
        assert!(overwrite.allow.contains(Permissions::SEND_MESSAGES));
    }
}
