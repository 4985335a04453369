//! `dbtchat chat` — interactive REPL.
//!
//! Reads one line per turn and runs it through the session controller.
//! The tool-server connection is opened once and held for the whole
//! session; only process exit (or an exit token) tears it down.

use std::io::Write;
use std::sync::Arc;

use dbtchat_agent::AgentEvent;
use dbtchat_domain::Config;
use dbtchat_mcp::resolver::CLI_CALL_TIMEOUT;

use crate::bootstrap;
use crate::turn::{run_turn, ChatSessionState};

/// Tokens that end the session (case-insensitive).
fn is_exit_token(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q")
}

/// Run the interactive chat REPL.
pub async fn chat(config: Arc<Config>, remote: bool) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config.clone())?;

    println!();
    println!("{}", "=".repeat(70));
    println!("dbt assistant — interactive chat");
    println!("{}", "=".repeat(70));
    println!("Initializing...");

    // Build the agent and surface tool calls as dim stderr lines while
    // the reply is being produced.
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
    let agent = if remote {
        bootstrap::build_remote_agent(&config, CLI_CALL_TIMEOUT)?
    } else {
        bootstrap::build_local_agent(&config, CLI_CALL_TIMEOUT)?
    }
    .with_event_sink(events_tx);

    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let AgentEvent::ToolCall { name, .. } = event;
            eprintln!("\x1B[2m[tool: {name}]\x1B[0m");
        }
    });

    // Connection held for the whole session.
    let mut conn = agent.connect().await?;

    println!("✓ Ready! ({} tools available)\n", conn.tool_count());
    println!("Ask questions about your dbt project (type 'exit' to quit)");
    println!("Example: 'List all models in my project'\n");

    // Readline with persistent input history (separate from chat history).
    let input_history = dirs::home_dir()
        .unwrap_or_default()
        .join(".dbtchat")
        .join("repl_history.txt");
    if let Some(parent) = input_history.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&input_history);

    let mut session = ChatSessionState::new();

    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                if is_exit_token(query) {
                    println!("\nGoodbye!");
                    break;
                }
                rl.add_history_entry(&line).ok();

                print!("\nAssistant: ");
                std::io::stdout().flush().ok();

                match run_turn(&state.history, &mut session, &mut conn, query).await {
                    Ok(reply) => {
                        println!("{reply}");
                        println!();
                    }
                    Err(e) => {
                        // Store failure: report it and keep the loop alive.
                        eprintln!("\nerror: {e}\n");
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("\nGoodbye!");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        }
    }

    rl.save_history(&input_history).ok();
    conn.shutdown().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::is_exit_token;

    #[test]
    fn exit_tokens_are_case_insensitive() {
        for token in ["exit", "EXIT", "Quit", "q", "Q"] {
            assert!(is_exit_token(token), "{token} should exit");
        }
        for token in ["", "quit now", "exit()", "ask"] {
            assert!(!is_exit_token(token), "{token} should not exit");
        }
    }
}
