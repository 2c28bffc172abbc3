//! AI completion gateway: three interchangeable providers behind one
//! `query` call with ordered fallback.

pub mod gateway;
pub mod providers;

pub use gateway::{CompletionProvider, EXHAUSTED_REPLY, Gateway};
