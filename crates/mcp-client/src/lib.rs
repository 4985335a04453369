//! `dbtchat-mcp` — MCP (Model Context Protocol) client for dbtchat.
//!
//! This crate provides:
//! - JSON-RPC 2.0 protocol types for talking to a dbt-mcp server.
//! - The process resolver that decides how to launch a local server
//!   (explicit binary, exe-adjacent binary, `PATH` lookup, or the Python
//!   module-entrypoint fallback), first match wins.
//! - A stdio transport that spawns the resolved command and a streamable
//!   HTTP transport for the hosted endpoint.
//! - A `ToolServer` that performs the MCP handshake, discovers tools, and
//!   dispatches `tools/call` requests.

pub mod protocol;
pub mod resolver;
pub mod server;
pub mod transport;

// Re-exports for convenience.
pub use protocol::McpToolDef;
pub use resolver::{resolve_server_command, FileCheck, ResolvedCommand, ResolverHints, SystemFiles};
pub use server::{McpError, ServerSpec, ToolServer};
