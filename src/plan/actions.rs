//! Action-plan shape and parse boundary.
//!
//! Plans arrive as a fenced ```json block inside free-form AI text. The
//! envelope must parse as a whole; each action element is decoded
//! individually into a closed tagged enum so one unknown or malformed
//! action skips only itself, never the rest of the plan.

use crate::error::PlanError;
use serde::Deserialize;
use std::collections::HashMap;

/// Sentinel key for the platform's implicit default role.
pub const EVERYONE: &str = "@everyone";

/// Locate the contents of the first fenced ```json block.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let (_, after_open) = text.split_once("```json")?;
    let (block, _) = after_open.split_once("```")?;
    Some(block.trim())
}

/// Transient AI-generated instruction set. Parsed from one response,
/// executed once, discarded.
#[derive(Debug, Deserialize)]
pub struct ActionPlan {
    pub plan_name: String,
    /// Raw elements; decoded one at a time by the executor.
    pub actions: Vec<serde_json::Value>,
}

impl ActionPlan {
    /// Parse a plan out of raw AI response text.
    pub fn parse(response: &str) -> Result<Self, PlanError> {
        let block = extract_json_block(response).ok_or(PlanError::NoJsonBlock)?;
        Ok(serde_json::from_str(block)?)
    }

    /// Whether a response text carries a plan at all.
    pub fn present_in(response: &str) -> bool {
        response.contains("```json")
    }
}

/// Per-role boolean capability flags, applied verbatim as permission
/// overwrites. `None` leaves the capability untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionFlags {
    pub view_channel: Option<bool>,
    pub send_messages: Option<bool>,
    pub read_messages: Option<bool>,
}

/// Closed set of server mutations the bot will perform for a plan.
/// Unknown `type` tags and unknown fields fail the decode of that element.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Action {
    CreateRole {
        name: String,
        color: Option<String>,
        hoist: Option<bool>,
    },
    CreateCategory {
        name: String,
        permissions: Option<HashMap<String, PermissionFlags>>,
    },
    CreateText {
        name: String,
        category: Option<String>,
        permissions: Option<HashMap<String, PermissionFlags>>,
        description: Option<String>,
    },
    DeleteChannel {
        name: String,
    },
    Kick {
        user: String,
    },
    ReactionRoleMessage {
        channel: String,
        emoji: String,
        role: String,
        description: String,
    },
}

impl Action {
    /// Decode one raw plan element.
    pub fn decode(raw: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(raw.clone())
    }
}

/// Parse a role color: `#RRGGBB` hex or a small set of named colors the
/// model likes to emit. Unparseable strings fall back to no color.
pub fn parse_color(raw: &str) -> Option<u32> {
    if let Some(hex) = raw.strip_prefix('#') {
        return u32::from_str_radix(hex, 16).ok();
    }
    match raw.to_ascii_lowercase().as_str() {
        "red" => Some(0xE7_4C_3C),
        "orange" => Some(0xE6_7E_22),
        "gold" => Some(0xF1_C4_0F),
        "green" => Some(0x2E_CC_71),
        "blue" => Some(0x34_98_DB),
        "purple" => Some(0x9B_59_B6),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn extracts_fenced_block() {
        let text = "Sure, here you go:\n```json\n{\"a\": 1}\n```\nDone.";
        assert_eq!(extract_json_block(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn no_block_is_none() {
        assert_eq!(extract_json_block("plain prose"), None);
        assert!(matches!(
            ActionPlan::parse("plain prose"),
            Err(PlanError::NoJsonBlock)
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let text = "```json\n{broken\n```";
        assert!(matches!(
            ActionPlan::parse(text),
            Err(PlanError::InvalidJson(_))
        ));
    }

    #[test]
    fn parses_full_plan() {
        let text = indoc! {r##"
            Executing now.
            ```json
            {
              "plan_name": "Private mentors area",
              "actions": [
                {"type": "create_role", "name": "Mentor", "color": "#FF0000"},
                {"type": "create_category", "name": "Mentors",
                 "permissions": {"@everyone": {"view_channel": false},
                                 "Mentor": {"view_channel": true}}},
                {"type": "create_text", "name": "mentor-lounge", "category": "Mentors"}
              ]
            }
            ```
        "##};

        let plan = ActionPlan::parse(text).unwrap();
        assert_eq!(plan.plan_name, "Private mentors area");
        assert_eq!(plan.actions.len(), 3);

        let first = Action::decode(&plan.actions[0]).unwrap();
        assert_eq!(
            first,
            Action::CreateRole {
                name: "Mentor".into(),
                color: Some("#FF0000".into()),
                hoist: None,
            }
        );

        let second = Action::decode(&plan.actions[1]).unwrap();
        let Action::CreateCategory {
            permissions: Some(permissions),
            ..
        } = second
        else {
            panic!("expected create_category with permissions");
        };
        assert_eq!(
            permissions[EVERYONE],
            PermissionFlags {
                view_channel: Some(false),
                ..Default::default()
            }
        );
    }

    #[test]
    fn unknown_action_type_fails_only_that_element() {
        let plan = ActionPlan::parse(indoc! {r#"
            ```json
            {"plan_name": "p", "actions": [
              {"type": "launch_rocket", "name": "x"},
              {"type": "delete_channel", "name": "old-news"}
            ]}
            ```
        "#})
        .unwrap();

        assert!(Action::decode(&plan.actions[0]).is_err());
        assert_eq!(
            Action::decode(&plan.actions[1]).unwrap(),
            Action::DeleteChannel {
                name: "old-news".into()
            }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = serde_json::json!({"type": "kick", "user": "spammer", "reason": "spam"});
        assert!(Action::decode(&raw).is_err());
    }

    #[test]
    fn color_parsing() {
        assert_eq!(parse_color("#FF0000"), Some(0xFF0000));
        assert_eq!(parse_color("orange"), Some(0xE67E22));
        assert_eq!(parse_color("chartreuse-ish"), None);
    }
}
