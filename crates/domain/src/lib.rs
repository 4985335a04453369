//! `dbtchat-domain` — shared types for the dbtchat workspace.
//!
//! Holds the crate-spanning error type, the environment-driven
//! configuration, and the provider-agnostic message/tool types that the
//! agent and provider layers translate to and from wire formats.

pub mod config;
pub mod error;
pub mod tool;

pub use config::Config;
pub use error::{Error, Result};
