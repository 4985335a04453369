//! Construction of the shared state and the tool-agent.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use dbtchat_agent::{OpenAiClient, ToolAgent};
use dbtchat_domain::Config;
use dbtchat_history::ChatStore;
use dbtchat_mcp::resolver::{self, SystemFiles};
use dbtchat_mcp::{ResolverHints, ServerSpec};

use crate::state::AppState;

/// System instructions handed to the agent at construction.
pub const INSTRUCTIONS: &str = "You are a helpful dbt assistant. \
    Provide clear, concise answers about the dbt project. \
    When listing items, be organized and easy to read.";

/// Open the chat-history store and assemble the shared state.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let history = ChatStore::open(&config.history.db_path)
        .with_context(|| format!("opening chat history at {}", config.history.db_path.display()))?;

    Ok(AppState {
        config,
        history: Arc::new(history),
    })
}

/// Build an agent wired to a local stdio dbt-mcp server.
///
/// The launch command is resolved here, once; the decision is not
/// revisited for the life of the process.
pub fn build_local_agent(config: &Config, call_timeout: Duration) -> anyhow::Result<ToolAgent> {
    let provider = OpenAiClient::from_config(&config.llm)?;

    let hints = ResolverHints::from_process(&config.local);
    let resolved = resolver::resolve_server_command(&hints, &SystemFiles, call_timeout);

    Ok(ToolAgent::new(
        provider,
        vec![ServerSpec::Stdio(resolved)],
        INSTRUCTIONS,
        call_timeout,
    ))
}

/// Build an agent wired to the hosted dbt platform MCP endpoint.
pub fn build_remote_agent(config: &Config, call_timeout: Duration) -> anyhow::Result<ToolAgent> {
    let provider = OpenAiClient::from_config(&config.llm)?;

    let remote = &config.remote;
    let token = remote
        .token
        .clone()
        .context("DBT_TOKEN is not set (required for --remote)")?;
    let environment_id = remote
        .prod_environment_id
        .clone()
        .context("DBT_PROD_ENV_ID is not set (required for --remote)")?;

    let spec = ServerSpec::StreamableHttp {
        url: remote.endpoint_url(),
        token,
        environment_id,
        timeout: call_timeout,
    };

    Ok(ToolAgent::new(provider, vec![spec], INSTRUCTIONS, call_timeout))
}
