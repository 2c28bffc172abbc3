//! Serenity event handler: command dispatch, reaction roles, member join,
//! and the AI architect flow.

use crate::commands::{self, Command, Dispatch};
use crate::config::{Config, GuildConfig};
use crate::discord::guild::SerenityGuild;
use crate::llm::Gateway;
use crate::plan::actions::{ActionPlan, PermissionFlags, parse_color};
use crate::plan::executor::{Executor, GuildOps, RoleTarget};
use crate::prompts;
use crate::store::{OptInStore, ReactionRoleStore};
use crate::tasks::TaskSet;

use serenity::all::{
    ChannelId, ChannelType, Colour, Context, CreateChannel, CreateEmbed, CreateMessage,
    EditMessage, EditRole, EventHandler, Member, Mentionable, Message, PermissionOverwrite,
    PermissionOverwriteType, Permissions, Reaction, ReactionType, Ready, RoleId, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Regional indicator emojis used for poll options (A through E).
const POLL_EMOJIS: [&str; 5] = ["🇦", "🇧", "🇨", "🇩", "🇪"];

/// Shared bot state behind the serenity event handler.
pub struct Handler {
    config: Arc<Config>,
    gateway: Arc<Gateway>,
    optin: Arc<OptInStore>,
    reaction_roles: Arc<ReactionRoleStore>,
    tasks: TaskSet,
    /// Flashcard answers waiting for the user's next DM, keyed by user ID.
    pending_flashcards: Arc<Mutex<HashMap<u64, String>>>,
}

impl Handler {
    pub fn new(
        config: Arc<Config>,
        gateway: Arc<Gateway>,
        optin: Arc<OptInStore>,
        reaction_roles: Arc<ReactionRoleStore>,
        tasks: TaskSet,
    ) -> Self {
        Self {
            config,
            gateway,
            optin,
            reaction_roles,
            tasks,
            pending_flashcards: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[serenity::async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(
            bot_name = %ready.user.name,
            guild_count = ready.guilds.len(),
            "maestro online"
        );
    }

    async fn guild_member_addition(&self, ctx: Context, member: Member) {
        let guild = SerenityGuild::new(ctx.http.clone(), member.guild_id);
        let join_role = &self.config.guild.join_role;

        match guild.find_role(join_role).await {
            Ok(Some(role)) => {
                if let Err(error) = member.add_role(&ctx.http, role.id).await {
                    tracing::warn!(%error, role = %join_role, "failed to assign join role");
                } else {
                    tracing::info!(member = %member.user.name, role = %join_role, "assigned join role");
                }
            }
            Ok(None) => tracing::warn!(role = %join_role, "join role not found in guild"),
            Err(error) => tracing::warn!(%error, "join role lookup failed"),
        }

        let welcome = format!(
            "👋 Welcome to Maestro, {}!\n\n\
             You're officially part of the community. Check out #{} to customize your \
             experience, and type `!help` in any public channel for everything I can do.\n\n\
             If you want important DM announcements, type `!optin` in the server at any time!",
            member.display_name(),
            self.config.guild.roles_channel,
        );
        if let Err(error) = member
            .user
            .direct_message(&ctx.http, CreateMessage::new().content(welcome))
            .await
        {
            tracing::warn!(%error, member = %member.user.name, "could not DM new member (privacy settings?)");
        }
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        self.apply_reaction(&ctx, &reaction, true).await;
    }

    async fn reaction_remove(&self, ctx: Context, reaction: Reaction) {
        self.apply_reaction(&ctx, &reaction, false).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let bot_id = ctx.cache.current_user().id;
        if msg.author.id == bot_id {
            return;
        }

        // A DM while a flashcard is pending reveals the answer.
        if msg.guild_id.is_none()
            && let Some(answer) = self
                .pending_flashcards
                .lock()
                .await
                .remove(&msg.author.id.get())
        {
            say(&ctx, msg.channel_id, format!("**Answer:** {answer}")).await;
            return;
        }

        match Command::parse(&msg.content) {
            Dispatch::Usage(usage) => say(&ctx, msg.channel_id, usage).await,
            Dispatch::Command(command) => {
                if command.requires_admin() && !is_admin(&ctx, &msg).await {
                    say(&ctx, msg.channel_id, "⛔ Only admins can use this.").await;
                    return;
                }
                self.run_command(&ctx, &msg, command).await;
            }
            Dispatch::None => {
                if msg.mentions_me(&ctx).await.unwrap_or(false) {
                    self.handle_mention(&ctx, &msg, bot_id).await;
                }
            }
        }
    }
}

impl Handler {
    async fn run_command(&self, ctx: &Context, msg: &Message, command: Command) {
        match command {
            Command::OptIn => self.handle_optin(ctx, msg).await,
            Command::OptOut => self.handle_optout(ctx, msg).await,
            Command::DmToUser { user_id, message } => {
                self.handle_dm_to_user(ctx, msg, user_id, message).await;
            }
            Command::DmAll { message } => self.handle_dm_all(ctx, msg, message).await,
            Command::SetupPrivateRole {
                role,
                category,
                channel,
                description,
                emoji,
            } => {
                self.handle_setup_private_role(ctx, msg, role, category, channel, description, emoji)
                    .await;
            }
            Command::SetupCourse => self.handle_setup_course(ctx, msg).await,
            Command::MakeRole { name, color, hoist } => {
                self.handle_make_role(ctx, msg, name, color, hoist).await;
            }
            Command::PostIn { channel, message } => {
                self.handle_post_in(ctx, msg, channel, message).await;
            }
            Command::Yt { query } => {
                let prompt = format!(
                    "Find a high-quality, relevant YouTube video link for this topic: {query}. Return ONLY the URL."
                );
                let header = format!("🎬 **Maestro's Top Pick for '{query}':**\n");
                self.ai_reply(ctx, msg, &prompt, &header).await;
            }
            Command::Ask { question } => {
                let prompt =
                    format!("Answer as an expert Python tutor, step by step. Student: {question}");
                self.ai_reply(ctx, msg, &prompt, "").await;
            }
            Command::Flashcard { topic } => self.handle_flashcard(ctx, msg, topic).await,
            Command::Challenge => {
                let prompt = "Give me today's quick Python coding challenge. Keep it under 1 paragraph, beginner friendly. No solution, just the challenge.";
                self.ai_reply(ctx, msg, prompt, "🧩 **Daily Challenge:**\n").await;
            }
            Command::Earn => self.handle_earn(ctx, msg).await,
            Command::Dev => self.handle_dev(ctx, msg).await,
            Command::Review { code } => {
                let prompt = format!(
                    "Review the following code, spot mistakes, and give one improvement suggestion. Be positive and short. Code:\n{code}"
                );
                self.ai_reply(ctx, msg, &prompt, "📝 **Review:**\n").await;
            }
            Command::Resource { topic } => {
                let prompt = format!(
                    "Give 2 top beginner-friendly, free resources for learning {topic}. Include links."
                );
                self.ai_reply(ctx, msg, &prompt, "🔗 ").await;
            }
            Command::StudyGroup => self.handle_studygroup(ctx, msg).await,
            Command::Announce { title, body } => {
                say(ctx, msg.channel_id, format!("📢 **{title}**\n\n{body}")).await;
            }
            Command::RemindMe { delay, text } => self.handle_remindme(ctx, msg, delay, text).await,
            Command::Poll { question, options } => {
                self.handle_poll(ctx, msg, question, options).await;
            }
            Command::Help => {
                let is_mod = is_moderator(ctx, msg).await;
                say(ctx, msg.channel_id, commands::help_text(is_mod)).await;
            }
        }
    }

    // -- Opt-in / opt-out --

    async fn handle_optin(&self, ctx: &Context, msg: &Message) {
        match self.optin.opt_in(&msg.author.id.to_string()).await {
            Ok(_) => {
                say(
                    ctx,
                    msg.channel_id,
                    format!("✅ {} opted in to DM announcements.", msg.author.mention()),
                )
                .await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to persist opt-in");
                say(ctx, msg.channel_id, "❌ Could not save your opt-in, try again.").await;
            }
        }
    }

    async fn handle_optout(&self, ctx: &Context, msg: &Message) {
        match self.optin.opt_out(&msg.author.id.to_string()).await {
            Ok(true) => {
                say(
                    ctx,
                    msg.channel_id,
                    format!("✅ {} opted out of DM announcements.", msg.author.mention()),
                )
                .await;
            }
            Ok(false) => say(ctx, msg.channel_id, "You're not opted in!").await,
            Err(error) => {
                tracing::error!(%error, "failed to persist opt-out");
                say(ctx, msg.channel_id, "❌ Could not save your opt-out, try again.").await;
            }
        }
    }

    // -- Admin DM commands --

    async fn handle_dm_to_user(&self, ctx: &Context, msg: &Message, user_id: u64, message: String) {
        let user = match ctx.http.get_user(UserId::new(user_id)).await {
            Ok(user) => user,
            Err(_) => {
                say(ctx, msg.channel_id, "❌ User not found.").await;
                return;
            }
        };
        match user
            .direct_message(&ctx.http, CreateMessage::new().content(message))
            .await
        {
            Ok(_) => say(ctx, msg.channel_id, "✅ Direct message sent!").await,
            Err(_) => {
                say(
                    ctx,
                    msg.channel_id,
                    "❌ I couldn't DM this user (privacy settings may block it).",
                )
                .await;
            }
        }
    }

    async fn handle_dm_all(&self, ctx: &Context, msg: &Message, message: String) {
        if self.optin.is_empty().await {
            say(ctx, msg.channel_id, "No users have opted in to DM announcements.").await;
            return;
        }

        let recipients = self.optin.snapshot().await;
        let http = ctx.http.clone();
        let optin = self.optin.clone();
        let origin = msg.channel_id;

        self.tasks.spawn(move |token| async move {
            let mut delivered = 0usize;
            for raw_id in recipients {
                let Ok(id) = raw_id.parse::<u64>() else {
                    optin.discard(&raw_id).await;
                    continue;
                };
                let delivery = match http.get_user(UserId::new(id)).await {
                    Ok(user) => {
                        user.direct_message(&http, CreateMessage::new().content(message.clone()))
                            .await
                    }
                    Err(error) => Err(error),
                };
                match delivery {
                    Ok(_) => delivered += 1,
                    Err(_) => {
                        // DMs disabled or user gone; drop them from the set.
                        optin.discard(&raw_id).await;
                    }
                }
                if !TaskSet::sleep(&token, Duration::from_millis(1200)).await {
                    return;
                }
            }
            let _ = origin
                .say(&http, format!("✅ DM sent to {delivered} opted-in users."))
                .await;
        });
    }

    // -- Server setup commands --

    #[allow(clippy::too_many_arguments)]
    async fn handle_setup_private_role(
        &self,
        ctx: &Context,
        msg: &Message,
        role: String,
        category: String,
        channel: String,
        description: String,
        emoji: String,
    ) {
        let Some(guild_id) = msg.guild_id else {
            say(ctx, msg.channel_id, "This command only works in a server.").await;
            return;
        };

        let mut private = serde_json::Map::new();
        private.insert(
            crate::plan::actions::EVERYONE.to_string(),
            serde_json::json!({"view_channel": false}),
        );
        private.insert(
            role.clone(),
            serde_json::json!({"view_channel": true, "send_messages": true}),
        );
        let private = serde_json::Value::Object(private);
        let plan = ActionPlan {
            plan_name: format!("Private role setup: {role}"),
            actions: vec![
                serde_json::json!({"type": "create_role", "name": role.clone()}),
                serde_json::json!({
                    "type": "create_category", "name": category.clone(),
                    "permissions": private.clone(),
                }),
                serde_json::json!({
                    "type": "create_text", "name": channel, "category": category,
                    "permissions": private, "description": description.clone(),
                }),
                serde_json::json!({
                    "type": "reaction_role_message",
                    "channel": self.config.guild.roles_channel.clone(),
                    "emoji": emoji, "role": role.clone(), "description": description,
                }),
            ],
        };

        let guild = SerenityGuild::new(ctx.http.clone(), guild_id);
        let executor = Executor::new(&guild, &self.reaction_roles);
        let reports = executor.execute(&plan).await;
        let summary: Vec<&str> = reports.iter().map(|report| report.line()).collect();
        say(ctx, msg.channel_id, summary.join("\n")).await;
        say(
            ctx,
            msg.channel_id,
            format!(
                "✅ Private role/channel for `{role}` live! Opt-in posted in #{}.",
                self.config.guild.roles_channel
            ),
        )
        .await;
    }

    async fn handle_setup_course(&self, ctx: &Context, msg: &Message) {
        let Some(guild_id) = msg.guild_id else {
            say(ctx, msg.channel_id, "This command only works in a server.").await;
            return;
        };

        let status = msg
            .channel_id
            .say(&ctx.http, "⏳ Setting up PY101 Environment...")
            .await;

        let guild = SerenityGuild::new(ctx.http.clone(), guild_id);
        // Read-only for everyone: visible, not writable.
        let overwrites = vec![(
            RoleTarget::Everyone,
            PermissionFlags {
                view_channel: Some(true),
                send_messages: Some(false),
                read_messages: None,
            },
        )];

        let result: Result<(), crate::error::PlanError> = async {
            let category = guild
                .create_category("PY101 Curriculum 🐍", &overwrites)
                .await?;
            let channel_id = ChannelId::new(
                guild
                    .create_text_channel("study-plan", Some(category), &overwrites, None)
                    .await?,
            );
            channel_id
                .say(&ctx.http, "📘 **OFFICIAL PY101 STUDY PLAN & NOTES**")
                .await
                .map_err(|error| crate::error::PlanError::GuildOp(error.to_string()))?;
            for chunk in split_message(prompts::COURSE_NOTES, 2000) {
                channel_id
                    .say(&ctx.http, chunk)
                    .await
                    .map_err(|error| crate::error::PlanError::GuildOp(error.to_string()))?;
            }
            Ok(())
        }
        .await;

        let outcome = match result {
            Ok(()) => "✅ Success! Created the PY101 curriculum and posted the notes.".to_string(),
            Err(error) => format!("❌ Setup Failed: {error}"),
        };
        if let Ok(mut status_msg) = status {
            let _ = status_msg
                .edit(&ctx.http, EditMessage::new().content(outcome))
                .await;
        } else {
            say(ctx, msg.channel_id, outcome).await;
        }
    }

    async fn handle_make_role(
        &self,
        ctx: &Context,
        msg: &Message,
        name: String,
        color: Option<String>,
        hoist: bool,
    ) {
        let Some(guild_id) = msg.guild_id else {
            say(ctx, msg.channel_id, "This command only works in a server.").await;
            return;
        };

        let guild = SerenityGuild::new(ctx.http.clone(), guild_id);
        match guild.find_role(&name).await {
            Ok(Some(_)) => {
                say(ctx, msg.channel_id, "A role with that name already exists.").await;
                return;
            }
            Ok(None) => {}
            Err(error) => {
                say(ctx, msg.channel_id, format!("❌ Could not create role: {error}")).await;
                return;
            }
        }

        let mut builder = EditRole::new().name(&name).hoist(hoist);
        if let Some(color) = color.as_deref().and_then(parse_color) {
            builder = builder.colour(Colour::new(color));
        }
        match guild_id.create_role(&ctx.http, builder).await {
            Ok(role) => {
                say(ctx, msg.channel_id, format!("✅ Created role **{}**.", role.name)).await;
            }
            Err(error) => {
                say(ctx, msg.channel_id, format!("❌ Could not create role: {error}")).await;
            }
        }
    }

    async fn handle_post_in(&self, ctx: &Context, msg: &Message, channel: String, message: String) {
        let Some(guild_id) = msg.guild_id else {
            say(ctx, msg.channel_id, "This command only works in a server.").await;
            return;
        };

        let guild = SerenityGuild::new(ctx.http.clone(), guild_id);
        match guild.find_channel(&channel, Some(ChannelType::Text)).await {
            Ok(Some(target)) => {
                if let Err(error) = target.id.say(&ctx.http, message).await {
                    say(ctx, msg.channel_id, format!("❌ Could not send message: {error}")).await;
                } else {
                    say(ctx, msg.channel_id, format!("✅ Posted in {}", target.mention())).await;
                }
            }
            Ok(None) => {
                say(ctx, msg.channel_id, format!("Couldn't find channel: {channel}")).await;
            }
            Err(error) => {
                say(ctx, msg.channel_id, format!("❌ Could not send message: {error}")).await;
            }
        }
    }

    // -- AI commands --

    /// Query the gateway and send the reply with an optional header. The
    /// exhaustion sentinel becomes a soft-failure notice instead.
    async fn ai_reply(&self, ctx: &Context, msg: &Message, prompt: &str, header: &str) {
        let _typing = msg.channel_id.start_typing(&ctx.http);
        let response = self.gateway.query(prompt, false).await;
        if Gateway::is_exhausted(&response) {
            say(ctx, msg.channel_id, prompts::AI_UNAVAILABLE).await;
            return;
        }
        say(ctx, msg.channel_id, format!("{header}{response}")).await;
    }

    async fn handle_flashcard(&self, ctx: &Context, msg: &Message, topic: String) {
        let _typing = msg.channel_id.start_typing(&ctx.http);
        let prompt = format!(
            "Give me a simple {topic} flashcard: one short question and answer, format:\nQuestion: ...\nAnswer: ...\nDo not show answer immediately."
        );
        let response = self.gateway.query(&prompt, false).await;
        if Gateway::is_exhausted(&response) {
            say(ctx, msg.channel_id, prompts::AI_UNAVAILABLE).await;
            return;
        }

        let Some((question, answer)) = response.split_once("Answer:") else {
            say(ctx, msg.channel_id, "⚠️ Couldn't generate flashcard. Try again.").await;
            return;
        };

        let dm = msg
            .author
            .direct_message(
                &ctx.http,
                CreateMessage::new().content(format!(
                    "**Flashcard Question:**\n{}\nReply with anything to see the answer.",
                    question.trim()
                )),
            )
            .await;
        if dm.is_err() {
            say(
                ctx,
                msg.channel_id,
                "❗ I couldn't DM you. Please enable DMs from server members.",
            )
            .await;
            return;
        }

        self.pending_flashcards
            .lock()
            .await
            .insert(msg.author.id.get(), answer.trim().to_string());

        // Expire the pending answer if the user never replies.
        let pending = self.pending_flashcards.clone();
        let http = ctx.http.clone();
        let author = msg.author.clone();
        self.tasks.spawn(move |token| async move {
            if !TaskSet::sleep(&token, Duration::from_secs(60)).await {
                return;
            }
            if pending.lock().await.remove(&author.id.get()).is_some() {
                let _ = author
                    .direct_message(
                        &http,
                        CreateMessage::new().content("⏰ Timed out! Try `!flashcard` again."),
                    )
                    .await;
            }
        });
    }

    // -- Community commands --

    async fn handle_earn(&self, ctx: &Context, msg: &Message) {
        let Some(guild_id) = msg.guild_id else {
            say(ctx, msg.channel_id, "This command only works in a server.").await;
            return;
        };

        let learner_role = &self.config.guild.learner_role;
        let guild = SerenityGuild::new(ctx.http.clone(), guild_id);
        let role = match guild.find_role(learner_role).await {
            Ok(Some(role)) => role,
            Ok(None) => {
                let builder = EditRole::new()
                    .name(learner_role)
                    .colour(Colour::GOLD)
                    .hoist(true);
                match guild_id.create_role(&ctx.http, builder).await {
                    Ok(role) => role,
                    Err(error) => {
                        tracing::warn!(%error, "failed to create badge role");
                        say(
                            ctx,
                            msg.channel_id,
                            "❌ Could not create the badge role. Please contact an admin.",
                        )
                        .await;
                        return;
                    }
                }
            }
            Err(error) => {
                tracing::warn!(%error, "badge role lookup failed");
                return;
            }
        };

        let Ok(member) = guild_id.member(&ctx.http, msg.author.id).await else {
            return;
        };
        if member.roles.contains(&role.id) {
            say(
                ctx,
                msg.channel_id,
                format!(
                    "{}, you already have the **{learner_role}** badge! 🥇",
                    msg.author.mention()
                ),
            )
            .await;
            return;
        }

        if let Err(error) = member.add_role(&ctx.http, role.id).await {
            tracing::warn!(%error, "failed to grant badge role");
            return;
        }
        let embed = CreateEmbed::new()
            .title("Achievement Unlocked!")
            .description(format!(
                "{} has officially earned the **{learner_role}** badge! 🐍✨",
                msg.author.mention()
            ))
            .colour(Colour::GOLD);
        if let Err(error) = msg
            .channel_id
            .send_message(&ctx.http, CreateMessage::new().embed(embed))
            .await
        {
            tracing::warn!(%error, "failed to send badge embed");
        }
    }

    async fn handle_dev(&self, ctx: &Context, msg: &Message) {
        let embed = CreateEmbed::new()
            .title("About the Developer")
            .description(
                "Hi, I'm **Kaleb McIntosh**, one of your February cohorts!\n\n\
                 I'm grateful for everyone in this community and eager to help 🎉\n\n\
                 [🌐 My Portfolio](https://www.kalebmcintosh.com)\n\
                 [💻 McIntosh Digital](https://www.mcintoshdigital.com)",
            )
            .footer(serenity::all::CreateEmbedFooter::new(
                "Let's code and grow together! 🚀",
            ))
            .colour(Colour::BLUE);
        if let Err(error) = msg
            .channel_id
            .send_message(&ctx.http, CreateMessage::new().embed(embed))
            .await
        {
            tracing::warn!(%error, "failed to send dev embed");
        }
    }

    async fn handle_studygroup(&self, ctx: &Context, msg: &Message) {
        let Some(guild_id) = msg.guild_id else {
            say(ctx, msg.channel_id, "This command only works in a server.").await;
            return;
        };

        let guild = SerenityGuild::new(ctx.http.clone(), guild_id);
        let category = match guild.find_category("Study Groups").await {
            Some(id) => Some(id),
            None => match guild.create_category("Study Groups", &Vec::new()).await {
                Ok(id) => Some(id),
                Err(error) => {
                    tracing::warn!(%error, "failed to create study group category");
                    None
                }
            },
        };

        let group_name = format!("studygroup-{}", msg.author.name.to_lowercase());
        let overwrites = vec![
            PermissionOverwrite {
                allow: Permissions::empty(),
                deny: Permissions::VIEW_CHANNEL,
                kind: PermissionOverwriteType::Role(RoleId::new(guild_id.get())),
            },
            PermissionOverwrite {
                allow: Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Member(msg.author.id),
            },
        ];

        let mut builder = CreateChannel::new(&group_name)
            .kind(ChannelType::Text)
            .permissions(overwrites);
        if let Some(category) = category {
            builder = builder.category(ChannelId::new(category));
        }

        match guild_id.create_channel(&ctx.http, builder).await {
            Ok(channel) => {
                let _ = channel
                    .id
                    .say(
                        &ctx.http,
                        format!(
                            "🧑‍💻 Welcome to your private study group, {}!",
                            msg.author.mention()
                        ),
                    )
                    .await;
                say(
                    ctx,
                    msg.channel_id,
                    format!("🔒 Study group created: {}", channel.mention()),
                )
                .await;
            }
            Err(error) => {
                say(ctx, msg.channel_id, format!("❌ Could not create study group: {error}")).await;
            }
        }
    }

    async fn handle_remindme(&self, ctx: &Context, msg: &Message, delay: Duration, text: String) {
        say(
            ctx,
            msg.channel_id,
            format!("⏰ I'll DM you in {}: {text}", format_delay(delay)),
        )
        .await;

        let http = ctx.http.clone();
        let author = msg.author.clone();
        let origin = msg.channel_id;
        self.tasks.spawn(move |token| async move {
            if !TaskSet::sleep(&token, delay).await {
                return;
            }
            if author
                .direct_message(
                    &http,
                    CreateMessage::new().content(format!("⏰ Reminder: {text}")),
                )
                .await
                .is_err()
            {
                let _ = origin
                    .say(
                        &http,
                        "❗ I couldn't DM you the reminder. Please enable DMs from server members.",
                    )
                    .await;
            }
        });
    }

    async fn handle_poll(&self, ctx: &Context, msg: &Message, question: String, options: Vec<String>) {
        let mut body = format!("📊 **{question}**");
        for (emoji, option) in POLL_EMOJIS.iter().zip(&options) {
            body.push_str(&format!("\n{emoji} {option}"));
        }

        let poll_msg = match msg.channel_id.say(&ctx.http, body).await {
            Ok(poll_msg) => poll_msg,
            Err(error) => {
                tracing::warn!(%error, "failed to post poll");
                return;
            }
        };
        for emoji in POLL_EMOJIS.iter().take(options.len()) {
            if let Err(error) = poll_msg
                .react(&ctx.http, ReactionType::Unicode(emoji.to_string()))
                .await
            {
                tracing::warn!(%error, "failed to seed poll reaction");
            }
        }
    }

    // -- AI architect --

    async fn handle_mention(&self, ctx: &Context, msg: &Message, bot_id: UserId) {
        let prompt = msg
            .content
            .replace(&format!("<@{bot_id}>"), "")
            .replace(&format!("<@!{bot_id}>"), "")
            .trim()
            .to_string();

        let _typing = msg.channel_id.start_typing(&ctx.http);
        let response = self.gateway.query(&prompt, true).await;
        if Gateway::is_exhausted(&response) {
            say(ctx, msg.channel_id, prompts::AI_UNAVAILABLE).await;
            return;
        }

        if !ActionPlan::present_in(&response) {
            say(ctx, msg.channel_id, response).await;
            return;
        }

        // Plans mutate the server; only admins may trigger execution.
        if !is_admin(ctx, msg).await {
            say(ctx, msg.channel_id, "⛔ **Security Alert:** You are not an Admin.").await;
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            say(ctx, msg.channel_id, "Architect plans only run inside a server.").await;
            return;
        };

        let plan = match ActionPlan::parse(&response) {
            Ok(plan) => plan,
            Err(error) => {
                tracing::warn!(%error, "architect response had unparseable plan");
                say(ctx, msg.channel_id, "❌ AI JSON Error. Please retry.").await;
                return;
            }
        };

        say(
            ctx,
            msg.channel_id,
            format!("🛡️ **Architect Mode:** Executing *{}*...", plan.plan_name),
        )
        .await;

        let guild = SerenityGuild::new(ctx.http.clone(), guild_id);
        let executor = Executor::new(&guild, &self.reaction_roles);
        let reports = executor.execute(&plan).await;
        let summary: Vec<&str> = reports.iter().map(|report| report.line()).collect();
        say(ctx, msg.channel_id, summary.join("\n")).await;
        say(ctx, msg.channel_id, "✅ **Execution Complete.**").await;
    }

    // -- Reaction roles --

    async fn apply_reaction(&self, ctx: &Context, reaction: &Reaction, grant: bool) {
        let bot_id = ctx.cache.current_user().id;
        if reaction.user_id == Some(bot_id) {
            return;
        }
        let Some(guild_id) = reaction.guild_id else {
            return;
        };
        let Some(user_id) = reaction.user_id else {
            return;
        };

        let registered = self.reaction_roles.role_for(reaction.message_id.get()).await;
        let channel_name = reaction
            .channel_id
            .to_channel(&ctx.http)
            .await
            .ok()
            .and_then(|channel| channel.guild())
            .map(|channel| channel.name);
        let emoji = reaction.emoji.to_string();

        let Some(role_name) = reaction_role_decision(
            registered.as_deref(),
            channel_name.as_deref(),
            &emoji,
            &self.config.guild,
        ) else {
            return;
        };

        let guild = SerenityGuild::new(ctx.http.clone(), guild_id);
        let role = match guild.find_role(&role_name).await {
            Ok(Some(role)) => role,
            Ok(None) => {
                tracing::warn!(role = %role_name, "reaction role no longer exists");
                return;
            }
            Err(error) => {
                tracing::warn!(%error, "reaction role lookup failed");
                return;
            }
        };

        let Ok(member) = guild_id.member(&ctx.http, user_id).await else {
            return;
        };
        let has_role = member.roles.contains(&role.id);

        // Membership check makes repeated add/remove events no-ops.
        let result = match (grant, has_role) {
            (true, false) => member.add_role(&ctx.http, role.id).await,
            (false, true) => member.remove_role(&ctx.http, role.id).await,
            _ => return,
        };
        if let Err(error) = result {
            tracing::warn!(%error, role = %role_name, grant, "reaction role mutation failed");
        }
    }
}

/// Which role, if any, a reaction event should toggle.
///
/// A registered message always wins. Unregistered messages fall back to the
/// hard-wired supporter rule: the supporter emoji inside the roles channel.
pub fn reaction_role_decision(
    registered: Option<&str>,
    channel_name: Option<&str>,
    emoji: &str,
    guild: &GuildConfig,
) -> Option<String> {
    if let Some(role) = registered {
        return Some(role.to_string());
    }
    if channel_name == Some(guild.roles_channel.as_str()) && emoji == guild.supporter_emoji {
        return Some(guild.supporter_role.clone());
    }
    None
}

/// Administrator check for the invoking member. DMs are never admin.
async fn is_admin(ctx: &Context, msg: &Message) -> bool {
    member_permissions(ctx, msg)
        .await
        .is_some_and(|permissions| permissions.administrator())
}

/// Looser privilege check used only for showing the admin help section.
async fn is_moderator(ctx: &Context, msg: &Message) -> bool {
    member_permissions(ctx, msg)
        .await
        .is_some_and(|permissions| {
            permissions.administrator()
                || permissions.manage_guild()
                || permissions.manage_channels()
                || permissions.kick_members()
        })
}

/// Guild-level permissions for the message author. The owner holds
/// everything; otherwise the everyone role unioned with each member role.
async fn member_permissions(ctx: &Context, msg: &Message) -> Option<Permissions> {
    let guild_id = msg.guild_id?;
    let guild = guild_id.to_partial_guild(&ctx.http).await.ok()?;
    if guild.owner_id == msg.author.id {
        return Some(Permissions::all());
    }
    let member = guild_id.member(&ctx.http, msg.author.id).await.ok()?;
    // The everyone role shares the guild's own ID.
    let everyone = guild
        .roles
        .get(&RoleId::new(guild_id.get()))
        .map(|role| role.permissions)
        .unwrap_or_else(Permissions::empty);
    Some(fold_role_permissions(everyone, &member.roles, |role_id| {
        guild.roles.get(&role_id).map(|role| role.permissions)
    }))
}

/// Union of the base (everyone) permissions and the member's role grants.
/// Roles the lookup cannot resolve contribute nothing.
fn fold_role_permissions(
    base: Permissions,
    member_roles: &[RoleId],
    lookup: impl Fn(RoleId) -> Option<Permissions>,
) -> Permissions {
    member_roles
        .iter()
        .filter_map(|role_id| lookup(*role_id))
        .fold(base, |acc, permissions| acc | permissions)
}

/// Send a reply, chunked to the platform's 2000 character message limit.
async fn say(ctx: &Context, channel_id: ChannelId, text: impl Into<String>) {
    for chunk in split_message(&text.into(), 2000) {
        if let Err(error) = channel_id.say(&ctx.http, chunk).await {
            tracing::warn!(%error, "failed to send message");
        }
    }
}

/// Split text into chunks within `max_len` bytes, preferring newline then
/// space boundaries, and never splitting inside a UTF-8 character.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let window_end = floor_char_boundary(remaining, max_len);
        let window = &remaining[..window_end];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&index| index > 0)
            .unwrap_or(window_end);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }
    chunks
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Human-readable delay for the reminder confirmation.
fn format_delay(delay: Duration) -> String {
    let secs = delay.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}m", secs.div_ceil(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild_config() -> GuildConfig {
        GuildConfig::default()
    }

    #[test]
    fn registered_message_wins() {
        let decision =
            reaction_role_decision(Some("Night Owls"), Some("general"), "🎉", &guild_config());
        assert_eq!(decision.as_deref(), Some("Night Owls"));
    }

    #[test]
    fn supporter_fallback_requires_roles_channel_and_emoji() {
        let config = guild_config();

        let hit = reaction_role_decision(None, Some("get-roles"), "🔔", &config);
        assert_eq!(hit.as_deref(), Some("YouTube Supporter"));

        // Wrong channel: no mutation.
        assert_eq!(reaction_role_decision(None, Some("general"), "🔔", &config), None);
        // Wrong emoji: no mutation.
        assert_eq!(reaction_role_decision(None, Some("get-roles"), "🎉", &config), None);
        // No channel name at all (DM or fetch failure): no mutation.
        assert_eq!(reaction_role_decision(None, None, "🔔", &config), None);
    }

    #[test]
    fn split_message_short_text_is_one_chunk() {
        assert_eq!(split_message("hello", 2000), vec!["hello"]);
    }

    #[test]
    fn split_message_prefers_newlines() {
        let text = format!("{}\n{}", "a".repeat(1500), "b".repeat(1000));
        let chunks = split_message(&text, 2000);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(1500));
        assert_eq!(chunks[1], "b".repeat(1000));
    }

    #[test]
    fn split_message_never_splits_a_char() {
        let text = "é".repeat(1500);
        for chunk in split_message(&text, 2000) {
            assert!(chunk.len() <= 2000);
            assert!(chunk.chars().all(|c| c == 'é'));
        }
    }

    #[test]
    fn role_permissions_union_over_member_roles() {
        let grants = HashMap::from([
            (RoleId::new(10), Permissions::SEND_MESSAGES),
            (RoleId::new(11), Permissions::ADMINISTRATOR),
        ]);
        let lookup = |role_id: RoleId| grants.get(&role_id).copied();

        let folded = fold_role_permissions(
            Permissions::VIEW_CHANNEL,
            &[RoleId::new(10), RoleId::new(11)],
            lookup,
        );
        assert!(folded.administrator());
        assert!(folded.contains(Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES));

        // A role the lookup cannot resolve contributes nothing.
        let folded = fold_role_permissions(Permissions::empty(), &[RoleId::new(99)], lookup);
        assert_eq!(folded, Permissions::empty());
    }

    #[test]
    fn delay_formatting() {
        assert_eq!(format_delay(Duration::from_secs(300)), "5m");
        assert_eq!(format_delay(Duration::from_secs(7200)), "2h");
        assert_eq!(format_delay(Duration::from_secs(90 * 60)), "90m");
    }
}
