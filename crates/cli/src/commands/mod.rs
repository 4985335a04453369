pub mod ask;
pub mod chat;
pub mod chats;
pub mod doctor;

use clap::{Parser, Subcommand};

/// dbtchat — chat with your dbt project over MCP.
#[derive(Debug, Parser)]
#[command(name = "dbtchat", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive chat (default when no subcommand is given).
    Chat {
        /// Use the hosted dbt platform endpoint instead of a local server.
        #[arg(long)]
        remote: bool,
    },
    /// Send a single message and print the reply.
    Ask {
        /// The message to send.
        message: String,
        /// Use the hosted dbt platform endpoint instead of a local server.
        #[arg(long)]
        remote: bool,
    },
    /// Chat history utilities.
    #[command(subcommand)]
    Chats(ChatsCommand),
    /// Check the local setup and report the resolved server command.
    Doctor,
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ChatsCommand {
    /// List chats, most recent first.
    List,
    /// Print every message of a chat.
    Show { chat_id: i64 },
    /// Rename a chat.
    Rename { chat_id: i64, title: String },
}
