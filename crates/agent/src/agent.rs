//! The tool-agent: one question in, one answer out.
//!
//! A [`ToolAgent`] holds the provider client, the instruction string, and
//! the specs of the tool servers it may call. [`ToolAgent::connect`]
//! starts those connections and returns an [`AgentSession`]; each
//! [`AgentSession::ask`] runs a bounded tool-dispatch loop against the
//! model, with the whole exchange under one timeout. Front-ends either
//! hold a session for the life of a REPL or use [`ToolAgent::ask_once`]
//! for connect → exchange → disconnect per call.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use dbtchat_domain::tool::{ContentPart, Message, MessageContent, Role, ToolDefinition};
use dbtchat_domain::{Error, Result};
use dbtchat_mcp::protocol::McpToolDef;
use dbtchat_mcp::{ServerSpec, ToolServer};

use crate::provider::OpenAiClient;

/// Maximum tool-dispatch rounds per exchange before we force-stop.
pub const MAX_TOOL_CALL_ROUNDS: usize = 10;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Observable milestones inside one exchange.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// The model asked for a tool to be executed.
    ToolCall {
        server: String,
        name: String,
        arguments: Value,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Exchange seam
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Free text in, free text out. The session controller depends on this
/// seam rather than on a concrete agent so turns can be exercised with a
/// scripted stand-in.
#[async_trait]
pub trait TextExchange: Send {
    async fn ask(&mut self, text: &str) -> Result<String>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ToolAgent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An agent wired to a model and zero-or-more tool servers.
pub struct ToolAgent {
    provider: OpenAiClient,
    instructions: String,
    specs: Vec<ServerSpec>,
    call_timeout: std::time::Duration,
    events: Option<UnboundedSender<AgentEvent>>,
}

impl ToolAgent {
    pub fn new(
        provider: OpenAiClient,
        specs: Vec<ServerSpec>,
        instructions: impl Into<String>,
        call_timeout: std::time::Duration,
    ) -> Self {
        Self {
            provider,
            instructions: instructions.into(),
            specs,
            call_timeout,
            events: None,
        }
    }

    /// Attach a sink that receives [`AgentEvent`]s during exchanges.
    pub fn with_event_sink(mut self, events: UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Start every configured tool-server connection.
    ///
    /// The returned session keeps the connections alive until it is shut
    /// down; callers that want per-call teardown use [`Self::ask_once`].
    pub async fn connect(&self) -> Result<AgentSession<'_>> {
        let mut servers = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            servers.push(ToolServer::connect(spec).await?);
        }

        tracing::info!(
            servers = servers.len(),
            tools = servers.iter().map(|s| s.tools().len()).sum::<usize>(),
            "agent connected"
        );

        Ok(AgentSession { agent: self, servers })
    }

    /// Connect, run one exchange, and tear the connections down again.
    pub async fn ask_once(&self, text: &str) -> Result<String> {
        let mut session = self.connect().await?;
        let reply = session.ask(text).await;
        session.shutdown().await;
        reply
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AgentSession
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A scoped set of live tool-server connections.
pub struct AgentSession<'a> {
    agent: &'a ToolAgent,
    servers: Vec<ToolServer>,
}

impl AgentSession<'_> {
    /// Total number of tools advertised across connected servers.
    pub fn tool_count(&self) -> usize {
        self.servers.iter().map(|s| s.tools().len()).sum()
    }

    /// Run one exchange under the agent's call timeout.
    pub async fn ask(&mut self, text: &str) -> Result<String> {
        let timeout = self.agent.call_timeout;
        match tokio::time::timeout(timeout, self.exchange(text)).await {
            Ok(reply) => reply,
            Err(_) => Err(Error::Timeout(format!(
                "agent exchange exceeded {}s",
                timeout.as_secs()
            ))),
        }
    }

    /// Shut down every server connection.
    pub async fn shutdown(self) {
        let futs: Vec<_> = self.servers.iter().map(|s| s.shutdown()).collect();
        futures_util::future::join_all(futs).await;
    }

    async fn exchange(&mut self, text: &str) -> Result<String> {
        let tools = advertised_tools(&self.servers);
        let mut messages = vec![
            Message::system(self.agent.instructions.clone()),
            Message::user(text),
        ];

        for round in 0..MAX_TOOL_CALL_ROUNDS {
            let outcome = self.agent.provider.chat(&messages, &tools).await?;

            if outcome.tool_calls.is_empty() {
                tracing::debug!(round, "exchange complete");
                return Ok(outcome.content);
            }

            messages.push(assistant_tool_message(&outcome.content, &outcome.tool_calls));

            for call in &outcome.tool_calls {
                let server = self.servers.iter().find(|s| s.has_tool(&call.tool_name));

                self.agent.emit(AgentEvent::ToolCall {
                    server: server.map(|s| s.label().to_string()).unwrap_or_default(),
                    name: call.tool_name.clone(),
                    arguments: call.arguments.clone(),
                });

                // Tool failures go back to the model as error results so it
                // can recover or explain; only provider failures abort the
                // exchange.
                let (result_text, is_error) = match server {
                    Some(server) => match server.call_tool(&call.tool_name, call.arguments.clone()).await {
                        Ok(result) => {
                            let is_error = result.is_error;
                            (result.text(), is_error)
                        }
                        Err(e) => (format!("tool call failed: {e}"), true),
                    },
                    None => (format!("no connected server provides tool '{}'", call.tool_name), true),
                };

                tracing::debug!(tool = %call.tool_name, is_error, "tool call dispatched");
                messages.push(Message::tool_result(call.call_id.clone(), result_text, is_error));
            }
        }

        Err(Error::Other(format!(
            "tool loop limit reached ({MAX_TOOL_CALL_ROUNDS} rounds)"
        )))
    }
}

#[async_trait]
impl TextExchange for AgentSession<'_> {
    async fn ask(&mut self, text: &str) -> Result<String> {
        AgentSession::ask(self, text).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Map every server's MCP tool defs into provider tool definitions.
fn advertised_tools(servers: &[ToolServer]) -> Vec<ToolDefinition> {
    servers
        .iter()
        .flat_map(|s| s.tools().iter().map(tool_def))
        .collect()
}

fn tool_def(tool: &McpToolDef) -> ToolDefinition {
    ToolDefinition {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.input_schema.clone(),
    }
}

/// The assistant message that records emitted tool calls for the next
/// provider round.
fn assistant_tool_message(text: &str, calls: &[dbtchat_domain::tool::ToolCall]) -> Message {
    let mut parts = Vec::with_capacity(calls.len() + 1);
    if !text.is_empty() {
        parts.push(ContentPart::Text { text: text.to_string() });
    }
    for call in calls {
        parts.push(ContentPart::ToolUse {
            id: call.call_id.clone(),
            name: call.tool_name.clone(),
            input: call.arguments.clone(),
        });
    }
    Message {
        role: Role::Assistant,
        content: MessageContent::Parts(parts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbtchat_domain::tool::ToolCall;

    #[test]
    fn mcp_tool_defs_map_to_provider_defs() {
        let def = tool_def(&McpToolDef {
            name: "list_models".into(),
            description: "List dbt models".into(),
            input_schema: serde_json::json!({ "type": "object" }),
        });
        assert_eq!(def.name, "list_models");
        assert_eq!(def.parameters["type"], "object");
    }

    #[test]
    fn assistant_tool_message_keeps_text_and_calls() {
        let calls = vec![ToolCall {
            call_id: "c1".into(),
            tool_name: "list_models".into(),
            arguments: serde_json::json!({}),
        }];
        let msg = assistant_tool_message("checking the project", &calls);
        let MessageContent::Parts(parts) = &msg.content else {
            panic!("expected parts");
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], ContentPart::Text { text } if text == "checking the project"));
        assert!(matches!(&parts[1], ContentPart::ToolUse { id, .. } if id == "c1"));
    }

    #[test]
    fn assistant_tool_message_with_empty_text_has_only_calls() {
        let calls = vec![ToolCall {
            call_id: "c1".into(),
            tool_name: "t".into(),
            arguments: serde_json::json!({}),
        }];
        let msg = assistant_tool_message("", &calls);
        let MessageContent::Parts(parts) = &msg.content else {
            panic!("expected parts");
        };
        assert_eq!(parts.len(), 1);
    }
}
