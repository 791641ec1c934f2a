//! veo-director library crate.
//!
//! Prompt composition, Veo job driving and the session and CLI layers built
//! on them. Exposed for integration testing and reuse.

pub mod cli;
pub mod config;
pub mod credential;
pub mod gemini;
pub mod presets;
pub mod session;
