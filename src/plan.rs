//! AI-generated action plans: parsing and best-effort execution.

pub mod actions;
pub mod executor;

pub use actions::{Action, ActionPlan, EVERYONE, PermissionFlags, extract_json_block};
pub use executor::{ActionReport, Executor, GuildOps, RoleTarget};
