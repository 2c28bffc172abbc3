//! Configuration loading and validation.
//!
//! Everything is read once at startup from the environment. A missing bot
//! token is the only fatal condition; a missing provider key just disables
//! that provider.

use crate::error::{ConfigError, Result};
use std::sync::Arc;

/// Maestro configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token. Required.
    pub discord_token: String,

    /// Data directory holding the JSON stores.
    pub data_dir: std::path::PathBuf,

    /// Keep-alive HTTP port.
    pub port: u16,

    /// LLM provider configuration.
    pub llm: LlmConfig,

    /// Server conventions (role and channel names).
    pub guild: GuildConfig,
}

/// LLM provider configuration. A `None` key disables that provider silently;
/// provider identity and model strings are configuration, not behavior.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Google Gemini API key (from env).
    pub gemini_key: Option<String>,

    /// OpenAI API key (from env).
    pub openai_key: Option<String>,

    /// Groq API key (from env).
    pub groq_key: Option<String>,

    /// Model identifiers per provider.
    pub gemini_model: String,
    pub openai_model: String,
    pub groq_model: String,
}

/// Role and channel name conventions for the course server.
#[derive(Debug, Clone)]
pub struct GuildConfig {
    /// Role auto-assigned on member join.
    pub join_role: String,

    /// Channel where reaction-role opt-in messages are posted.
    pub roles_channel: String,

    /// Role granted by the hard-wired supporter reaction.
    pub supporter_role: String,

    /// Emoji driving the supporter reaction rule.
    pub supporter_emoji: String,

    /// Badge role granted by `!earn`.
    pub learner_role: String,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            join_role: "FebruaryCohort".into(),
            roles_channel: "get-roles".into(),
            supporter_role: "YouTube Supporter".into(),
            supporter_emoji: "🔔".into(),
            learner_role: "Python Learner".into(),
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let discord_token = std::env::var("DISCORD_TOKEN")
            .map_err(|_| ConfigError::MissingKey("DISCORD_TOKEN".into()))?;

        let data_dir = match std::env::var("MAESTRO_DATA_DIR") {
            Ok(dir) => std::path::PathBuf::from(dir),
            Err(_) => dirs::data_dir()
                .map(|d| d.join("maestro"))
                .unwrap_or_else(|| std::path::PathBuf::from("./data")),
        };

        std::fs::create_dir_all(&data_dir).map_err(|source| ConfigError::DataDir {
            path: data_dir.display().to_string(),
            source: Arc::new(source),
        })?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a port number: {raw}")))?,
            Err(_) => 8080,
        };

        let llm = LlmConfig {
            gemini_key: std::env::var("GOOGLE_API_KEY").ok(),
            openai_key: std::env::var("OPENAI_API_KEY").ok(),
            groq_key: std::env::var("GROQ_API_KEY").ok(),
            gemini_model: std::env::var("MAESTRO_GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-flash-latest".into()),
            openai_model: std::env::var("MAESTRO_OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".into()),
            groq_model: std::env::var("MAESTRO_GROQ_MODEL")
                .unwrap_or_else(|_| "llama3-8b-8192".into()),
        };

        if llm.gemini_key.is_none() && llm.openai_key.is_none() && llm.groq_key.is_none() {
            tracing::warn!("no LLM provider key configured; AI commands will report exhaustion");
        }

        Ok(Self {
            discord_token,
            data_dir,
            port,
            llm,
            guild: GuildConfig::default(),
        })
    }

    /// Path of the opt-in set store.
    pub fn optin_path(&self) -> std::path::PathBuf {
        self.data_dir.join("dm_optin.json")
    }

    /// Path of the reaction-role map store.
    pub fn reaction_roles_path(&self) -> std::path::PathBuf {
        self.data_dir.join("reaction_roles.json")
    }
}
