//! `dbtchat ask` — one-shot execution.
//!
//! Starts a fresh chat, runs exactly one turn, prints the reply, and
//! tears the tool-server connection down again. The turn is persisted
//! like any other, so `chats show` can retrieve it later.

use std::sync::Arc;

use dbtchat_domain::Config;
use dbtchat_mcp::resolver::APP_CALL_TIMEOUT;

use crate::bootstrap;
use crate::turn::{run_turn, ChatSessionState};

pub async fn ask(config: Arc<Config>, message: String, remote: bool) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config.clone())?;

    let agent = if remote {
        bootstrap::build_remote_agent(&config, APP_CALL_TIMEOUT)?
    } else {
        bootstrap::build_local_agent(&config, APP_CALL_TIMEOUT)?
    };

    // Connect → one exchange → disconnect.
    let mut conn = agent.connect().await?;
    let mut session = ChatSessionState::new();
    let result = run_turn(&state.history, &mut session, &mut conn, &message).await;
    conn.shutdown().await;

    println!("{}", result?);
    Ok(())
}
