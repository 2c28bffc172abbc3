//! Discord event glue: the serenity event handler and the guild
//! operations seam the plan executor runs against.

pub mod guild;
pub mod handler;

pub use guild::SerenityGuild;
pub use handler::Handler;
