//! Tool-server connection: handshake, tool discovery, and dispatch.

use serde_json::Value;

use crate::protocol::{self, McpToolDef, ToolCallResult, ToolsListResult};
use crate::resolver::ResolvedCommand;
use crate::transport::{HttpTransport, McpTransport, StdioTransport, TransportError};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server spec
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How to reach one tool server.
#[derive(Debug, Clone)]
pub enum ServerSpec {
    /// Spawn the resolved command locally and talk over stdio.
    Stdio(ResolvedCommand),
    /// Talk to the hosted endpoint over streamable HTTP.
    StreamableHttp {
        url: String,
        token: String,
        environment_id: String,
        timeout: std::time::Duration,
    },
}

impl ServerSpec {
    /// Short human-readable label for logs and events.
    pub fn label(&self) -> String {
        match self {
            ServerSpec::Stdio(cmd) => format!("stdio:{}", cmd.command.display()),
            ServerSpec::StreamableHttp { url, .. } => format!("http:{url}"),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ToolServer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A connected MCP server: transport plus the tools it advertised.
pub struct ToolServer {
    label: String,
    tools: Vec<McpToolDef>,
    transport: Box<dyn McpTransport>,
}

impl ToolServer {
    /// Connect to a server: spawn the process (or build the HTTP client),
    /// perform the MCP handshake, and discover tools.
    pub async fn connect(spec: &ServerSpec) -> Result<Self, McpError> {
        let label = spec.label();
        let transport: Box<dyn McpTransport> = match spec {
            ServerSpec::Stdio(resolved) => Box::new(StdioTransport::spawn(resolved)?),
            ServerSpec::StreamableHttp {
                url,
                token,
                environment_id,
                timeout,
            } => Box::new(HttpTransport::new(url, token, environment_id, *timeout)?),
        };

        // Step 1: `initialize`.
        let init_params = protocol::initialize_params();
        let params_value = serde_json::to_value(&init_params)
            .map_err(|e| McpError::Protocol(format!("failed to serialize initialize params: {e}")))?;

        let resp = transport.send_request("initialize", Some(params_value)).await?;
        resp.into_result()
            .map_err(|e| McpError::Protocol(format!("initialize failed: {e}")))?;

        tracing::debug!(server = %label, "MCP initialize response received");

        // Step 2: `notifications/initialized`.
        transport.send_notification("notifications/initialized").await?;

        // Step 3: discover tools.
        let tools_resp = transport.send_request("tools/list", None).await?;
        let tools = match tools_resp.into_result() {
            Ok(value) => match serde_json::from_value::<ToolsListResult>(value) {
                Ok(r) => r.tools,
                Err(e) => {
                    tracing::warn!(server = %label, error = %e, "failed to parse tools/list result");
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!(server = %label, error = %e, "tools/list returned error, server will have no tools");
                Vec::new()
            }
        };

        tracing::info!(server = %label, tool_count = tools.len(), "MCP server connected");

        Ok(Self {
            label,
            tools,
            transport,
        })
    }

    /// The label this server was connected under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Tools advertised by this server at connect time.
    pub fn tools(&self) -> &[McpToolDef] {
        &self.tools
    }

    /// Whether this server advertised a tool named `name`.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    /// Check if the server's transport is still alive.
    pub fn is_alive(&self) -> bool {
        self.transport.is_alive()
    }

    /// Call a tool on this server.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<ToolCallResult, McpError> {
        if !self.transport.is_alive() {
            return Err(McpError::ServerDown(self.label.clone()));
        }

        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments
        });

        let resp = self.transport.send_request("tools/call", Some(params)).await?;
        let value = resp
            .into_result()
            .map_err(|e| McpError::Protocol(format!("tools/call failed: {e}")))?;

        serde_json::from_value::<ToolCallResult>(value)
            .map_err(|e| McpError::Protocol(format!("failed to parse tools/call result: {e}")))
    }

    /// Gracefully shut down the connection.
    pub async fn shutdown(&self) {
        tracing::info!(server = %self.label, "shutting down MCP server");
        self.transport.shutdown().await;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Errors specific to MCP operations.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("MCP transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("MCP server is down: {0}")]
    ServerDown(String),
}

impl From<McpError> for dbtchat_domain::Error {
    fn from(e: McpError) -> Self {
        match e {
            McpError::Transport(TransportError::Timeout) => {
                dbtchat_domain::Error::Timeout("MCP server did not respond in time".into())
            }
            other => dbtchat_domain::Error::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ResolvedCommand, ResolvedOrigin};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn spec_labels() {
        let stdio = ServerSpec::Stdio(ResolvedCommand {
            command: PathBuf::from("/venv/bin/dbt-mcp"),
            args: vec![],
            env: HashMap::new(),
            timeout: std::time::Duration::from_secs(30),
            origin: ResolvedOrigin::ExeAdjacent,
        });
        assert_eq!(stdio.label(), "stdio:/venv/bin/dbt-mcp");

        let http = ServerSpec::StreamableHttp {
            url: "https://cloud.getdbt.com/api/ai/v1/mcp/".into(),
            token: "t".into(),
            environment_id: "1".into(),
            timeout: std::time::Duration::from_secs(30),
        };
        assert_eq!(http.label(), "http:https://cloud.getdbt.com/api/ai/v1/mcp/");
    }

    #[test]
    fn timeout_maps_to_domain_timeout() {
        let err: dbtchat_domain::Error = McpError::Transport(TransportError::Timeout).into();
        assert!(matches!(err, dbtchat_domain::Error::Timeout(_)));
    }
}
