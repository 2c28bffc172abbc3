//! Command dispatch table.
//!
//! Pure string/regex matching into a closed [`Command`] enum. Handlers live
//! in `discord::handler`; this module only decides *what* was asked and
//! produces usage strings for recognized-but-malformed invocations.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static DM_TO_USER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^!dmtouser\s+<@!?(\d+)>\s+(.+)$").unwrap());
static POST_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^!post_in\s+#?([\w\-]+)\s*\|\s*(.+)$").unwrap());
static REMIND_ME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^!remindme\s+(\d+)([mh])\s+(.+)$").unwrap());

/// Everything a chat message can ask the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    OptIn,
    OptOut,
    DmToUser { user_id: u64, message: String },
    DmAll { message: String },
    SetupPrivateRole {
        role: String,
        category: String,
        channel: String,
        description: String,
        emoji: String,
    },
    SetupCourse,
    MakeRole {
        name: String,
        color: Option<String>,
        hoist: bool,
    },
    PostIn { channel: String, message: String },
    Yt { query: String },
    Ask { question: String },
    Flashcard { topic: String },
    Challenge,
    Earn,
    Dev,
    Review { code: String },
    Resource { topic: String },
    StudyGroup,
    Announce { title: String, body: String },
    RemindMe { delay: Duration, text: String },
    Poll { question: String, options: Vec<String> },
    Help,
}

/// Result of matching a message against the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A well-formed command.
    Command(Command),
    /// A recognized prefix with malformed arguments; reply with usage.
    Usage(&'static str),
    /// Not a command at all.
    None,
}

impl Command {
    /// Match message text against the fixed table.
    pub fn parse(content: &str) -> Dispatch {
        let content = content.trim();
        let lower = content.to_lowercase();

        match lower.as_str() {
            "!optin" => return Dispatch::Command(Command::OptIn),
            "!optout" => return Dispatch::Command(Command::OptOut),
            "!setup_py101" => return Dispatch::Command(Command::SetupCourse),
            "!challenge" => return Dispatch::Command(Command::Challenge),
            "!earn" => return Dispatch::Command(Command::Earn),
            "!dev" => return Dispatch::Command(Command::Dev),
            "!studygroup" => return Dispatch::Command(Command::StudyGroup),
            "!help" => return Dispatch::Command(Command::Help),
            _ => {}
        }

        if lower.starts_with("!dmtouser") {
            return match DM_TO_USER.captures(content) {
                Some(captures) => match captures[1].parse() {
                    Ok(user_id) => Dispatch::Command(Command::DmToUser {
                        user_id,
                        message: captures[2].trim().to_string(),
                    }),
                    Err(_) => Dispatch::Usage("Format: !dmtouser @user message_here"),
                },
                None => Dispatch::Usage("Format: !dmtouser @user message_here"),
            };
        }

        if let Some(rest) = strip_prefix_ci(content, "!dmall") {
            let message = rest.trim();
            if message.is_empty() {
                return Dispatch::Usage("Format: !dmall message_here");
            }
            return Dispatch::Command(Command::DmAll {
                message: message.to_string(),
            });
        }

        if let Some(rest) = strip_prefix_ci(content, "!setup_private_role") {
            let parts: Vec<&str> = rest.split('|').map(str::trim).collect();
            if parts.len() < 5 || parts.iter().take(5).any(|part| part.is_empty()) {
                return Dispatch::Usage(
                    "Usage: !setup_private_role RoleName | Category | channel-name | description | emoji",
                );
            }
            return Dispatch::Command(Command::SetupPrivateRole {
                role: parts[0].to_string(),
                category: parts[1].to_string(),
                channel: parts[2].to_string(),
                description: parts[3].to_string(),
                emoji: parts[4].to_string(),
            });
        }

        if let Some(rest) = strip_prefix_ci(content, "!make_role") {
            let parts: Vec<&str> = rest.split('|').map(str::trim).collect();
            let name = parts.first().copied().unwrap_or_default();
            if name.is_empty() {
                return Dispatch::Usage("Format: !make_role Name | #color | hoist");
            }
            let color = parts
                .get(1)
                .filter(|part| !part.is_empty())
                .map(|part| part.to_string());
            let hoist = parts
                .get(2)
                .map(|part| matches!(part.to_lowercase().as_str(), "true" | "1" | "yes" | "y"))
                .unwrap_or(false);
            return Dispatch::Command(Command::MakeRole {
                name: name.to_string(),
                color,
                hoist,
            });
        }

        if lower.starts_with("!post_in") {
            return match POST_IN.captures(content) {
                Some(captures) => Dispatch::Command(Command::PostIn {
                    channel: captures[1].to_string(),
                    message: captures[2].trim().to_string(),
                }),
                None => Dispatch::Usage("Format: `!post_in #channel | Your message here`"),
            };
        }

        if let Some(rest) = strip_prefix_ci(content, "!yt") {
            let query = rest.trim();
            if query.is_empty() {
                return Dispatch::Usage("⚠️ Please provide a topic! Example: `!yt python tutorial`");
            }
            return Dispatch::Command(Command::Yt {
                query: query.to_string(),
            });
        }

        if let Some(rest) = strip_prefix_ci(content, "!ask") {
            let question = rest.trim();
            if question.is_empty() {
                return Dispatch::Usage("❓ Please enter a question after `!ask`.");
            }
            return Dispatch::Command(Command::Ask {
                question: question.to_string(),
            });
        }

        if let Some(rest) = strip_prefix_ci(content, "!flashcard") {
            let topic = rest.trim();
            return Dispatch::Command(Command::Flashcard {
                topic: if topic.is_empty() {
                    "python".to_string()
                } else {
                    topic.to_string()
                },
            });
        }

        if let Some(rest) = strip_prefix_ci(content, "!review") {
            let code = rest.trim();
            if code.is_empty() {
                return Dispatch::Usage("Paste your code after `!review` for feedback.");
            }
            return Dispatch::Command(Command::Review {
                code: code.to_string(),
            });
        }

        if let Some(rest) = strip_prefix_ci(content, "!resource") {
            let topic = rest.trim();
            if topic.is_empty() {
                return Dispatch::Usage("Type a topic after `!resource`.");
            }
            return Dispatch::Command(Command::Resource {
                topic: topic.to_string(),
            });
        }

        if let Some(rest) = strip_prefix_ci(content, "!announce") {
            return match rest.split_once('|') {
                Some((title, body)) if !title.trim().is_empty() && !body.trim().is_empty() => {
                    Dispatch::Command(Command::Announce {
                        title: title.trim().to_string(),
                        body: body.trim().to_string(),
                    })
                }
                _ => Dispatch::Usage("Use: !announce Event Title | Event details here"),
            };
        }

        if lower.starts_with("!remindme") {
            return match REMIND_ME.captures(content) {
                Some(captures) => {
                    let amount: u64 = match captures[1].parse() {
                        Ok(amount) => amount,
                        Err(_) => return Dispatch::Usage("Format: !remindme 5m Take a break"),
                    };
                    let unit_secs = if &captures[2] == "m" { 60 } else { 3600 };
                    Dispatch::Command(Command::RemindMe {
                        delay: Duration::from_secs(amount * unit_secs),
                        text: captures[3].trim().to_string(),
                    })
                }
                None => Dispatch::Usage("Format: !remindme 5m Take a break"),
            };
        }

        if let Some(rest) = strip_prefix_ci(content, "!poll") {
            let mut parts = rest.split('|').map(str::trim);
            let question = parts.next().unwrap_or_default().to_string();
            let options: Vec<String> = parts
                .filter(|option| !option.is_empty())
                .map(str::to_string)
                .collect();
            if question.is_empty() || options.len() < 2 || options.len() > 5 {
                return Dispatch::Usage("Format: !poll Question | Option1 | Option2 ... (2-5 options)");
            }
            return Dispatch::Command(Command::Poll { question, options });
        }

        Dispatch::None
    }

    /// Whether this command is gated on the administrator privilege check.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::DmToUser { .. }
                | Command::DmAll { .. }
                | Command::SetupPrivateRole { .. }
                | Command::SetupCourse
                | Command::MakeRole { .. }
                | Command::PostIn { .. }
                | Command::Announce { .. }
        )
    }
}

/// Case-insensitive prefix strip that requires either end-of-string or a
/// space after the prefix, so `!asking` does not match `!ask`.
fn strip_prefix_ci<'a>(content: &'a str, prefix: &str) -> Option<&'a str> {
    if content.len() < prefix.len() {
        return None;
    }
    let (head, rest) = content.split_at(prefix.len());
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    if rest.is_empty() || rest.starts_with(' ') {
        Some(rest)
    } else {
        None
    }
}

/// User-facing help text; admin commands are appended for privileged users.
pub fn help_text(is_admin: bool) -> String {
    let mut text = String::from(
        "**🤖 Maestro Bot Help**\n\n\
         `!help` — Show this message\n\
         `!ask <question>` — Ask Maestro any coding or learning question\n\
         `!flashcard <topic>` — Practice a flashcard (DM)\n\
         `!challenge` — Get a daily quick coding challenge\n\
         `!resource <topic>` — Get learning resource links\n\
         `!review <your code>` — Get feedback on your code\n\
         `!poll Question | Option1 | Option2 ...` — Create a quick poll\n\
         `!remindme 5m Do something` — DM reminder\n\
         `!studygroup` — Start a private study group\n\
         `!yt <topic>` — Find a useful YouTube video\n\
         `!earn` — Get a learning badge\n\
         `!optin` / `!optout` — DM announcement preferences\n\
         `!dev` — About the developer",
    );
    if is_admin {
        text.push_str(
            "\n\n**🛡️ Admin/Mod Commands:**\n\
             `!setup_py101` — Full course environment setup\n\
             `!announce Title | Description` — Post an announcement\n\
             `!make_role Name | #color | hoist` — Create a new role\n\
             `!post_in #channel | message` — Bot posts in any channel\n\
             `!dmtouser @user message` — DM a specific user\n\
             `!dmall message` — DM all opted-in users\n\
             `!setup_private_role Role | Category | channel | description | emoji`",
        );
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Command {
        match Command::parse(content) {
            Dispatch::Command(command) => command,
            other => panic!("expected command for {content:?}, got {other:?}"),
        }
    }

    #[test]
    fn exact_commands() {
        assert_eq!(parse("!optin"), Command::OptIn);
        assert_eq!(parse("!OPTOUT"), Command::OptOut);
        assert_eq!(parse("  !challenge  "), Command::Challenge);
        assert_eq!(parse("!help"), Command::Help);
    }

    #[test]
    fn non_commands_pass_through() {
        assert_eq!(Command::parse("hello there"), Dispatch::None);
        assert_eq!(Command::parse("!asking for a friend"), Dispatch::None);
        assert_eq!(Command::parse(""), Dispatch::None);
    }

    #[test]
    fn ask_requires_a_question() {
        assert_eq!(
            parse("!ask why is 19/2 a float?"),
            Command::Ask {
                question: "why is 19/2 a float?".into()
            }
        );
        assert!(matches!(Command::parse("!ask"), Dispatch::Usage(_)));
        assert!(matches!(Command::parse("!ask   "), Dispatch::Usage(_)));
    }

    #[test]
    fn flashcard_defaults_topic() {
        assert_eq!(
            parse("!flashcard"),
            Command::Flashcard {
                topic: "python".into()
            }
        );
        assert_eq!(
            parse("!flashcard modulo"),
            Command::Flashcard {
                topic: "modulo".into()
            }
        );
    }

    #[test]
    fn dm_to_user_parses_mention() {
        assert_eq!(
            parse("!dmtouser <@123456> your build is failing"),
            Command::DmToUser {
                user_id: 123456,
                message: "your build is failing".into()
            }
        );
        assert_eq!(
            parse("!dmtouser <@!99> hi"),
            Command::DmToUser {
                user_id: 99,
                message: "hi".into()
            }
        );
        assert!(matches!(
            Command::parse("!dmtouser nobody hi"),
            Dispatch::Usage(_)
        ));
    }

    #[test]
    fn make_role_optional_parts() {
        assert_eq!(
            parse("!make_role Mentor | orange | true"),
            Command::MakeRole {
                name: "Mentor".into(),
                color: Some("orange".into()),
                hoist: true,
            }
        );
        assert_eq!(
            parse("!make_role Mentor"),
            Command::MakeRole {
                name: "Mentor".into(),
                color: None,
                hoist: false,
            }
        );
        assert!(matches!(Command::parse("!make_role"), Dispatch::Usage(_)));
    }

    #[test]
    fn post_in_accepts_hash_prefix() {
        assert_eq!(
            parse("!post_in #general | Welcome everyone"),
            Command::PostIn {
                channel: "general".into(),
                message: "Welcome everyone".into()
            }
        );
        assert!(matches!(
            Command::parse("!post_in general no pipe"),
            Dispatch::Usage(_)
        ));
    }

    #[test]
    fn remindme_minutes_and_hours() {
        assert_eq!(
            parse("!remindme 5m Take a break"),
            Command::RemindMe {
                delay: Duration::from_secs(300),
                text: "Take a break".into()
            }
        );
        assert_eq!(
            parse("!remindme 2h submit homework"),
            Command::RemindMe {
                delay: Duration::from_secs(7200),
                text: "submit homework".into()
            }
        );
        assert!(matches!(
            Command::parse("!remindme tomorrow dentist"),
            Dispatch::Usage(_)
        ));
    }

    #[test]
    fn poll_option_bounds() {
        assert_eq!(
            parse("!poll Lang? | Rust | Python"),
            Command::Poll {
                question: "Lang?".into(),
                options: vec!["Rust".into(), "Python".into()]
            }
        );
        assert!(matches!(
            Command::parse("!poll Lang? | Rust"),
            Dispatch::Usage(_)
        ));
        assert!(matches!(
            Command::parse("!poll Q | a | b | c | d | e | f"),
            Dispatch::Usage(_)
        ));
    }

    #[test]
    fn setup_private_role_needs_five_fields() {
        assert_eq!(
            parse("!setup_private_role Night Owls | Lounges | night-owls | Late crew | 🦉"),
            Command::SetupPrivateRole {
                role: "Night Owls".into(),
                category: "Lounges".into(),
                channel: "night-owls".into(),
                description: "Late crew".into(),
                emoji: "🦉".into(),
            }
        );
        assert!(matches!(
            Command::parse("!setup_private_role Role | Cat"),
            Dispatch::Usage(_)
        ));
    }

    #[test]
    fn announce_splits_title_and_body() {
        assert_eq!(
            parse("!announce Demo Day | Friday at noon"),
            Command::Announce {
                title: "Demo Day".into(),
                body: "Friday at noon".into()
            }
        );
        assert!(matches!(
            Command::parse("!announce no pipe here"),
            Dispatch::Usage(_)
        ));
    }

    #[test]
    fn admin_gating() {
        assert!(parse("!dmall big news").requires_admin());
        assert!(parse("!setup_py101").requires_admin());
        assert!(parse("!announce A | B").requires_admin());
        assert!(!parse("!ask hi").requires_admin());
        assert!(!parse("!optin").requires_admin());
        assert!(!parse("!studygroup").requires_admin());
    }
}
