//! `dbtchat-cli` — the dbtchat binary.
//!
//! Wires the config, chat-history store, MCP client, and tool-agent into
//! a handful of commands: an interactive REPL, a one-shot ask, history
//! utilities, and a setup doctor.

pub mod bootstrap;
pub mod commands;
pub mod state;
pub mod turn;
