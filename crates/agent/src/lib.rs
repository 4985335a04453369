//! `dbtchat-agent` — the tool-agent that answers one question at a time.
//!
//! Wraps an OpenAI-compatible model provider and a set of MCP tool-server
//! connections behind a small contract: construct with a model, servers,
//! and an instruction string; open a scoped session that starts and stops
//! the server connections; run single text-in/text-out exchanges, during
//! which the model may call dbt-mcp tools. Tool invocations are observable
//! through an optional event sink.

pub mod agent;
pub mod provider;

pub use agent::{AgentEvent, AgentSession, TextExchange, ToolAgent, MAX_TOOL_CALL_ROUNDS};
pub use provider::{ChatOutcome, OpenAiClient, ProviderError};
