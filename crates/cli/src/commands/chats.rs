//! `dbtchat chats` — front-end over the chat-history store.

use std::sync::Arc;

use anyhow::bail;

use dbtchat_domain::Config;

use crate::bootstrap;
use crate::commands::ChatsCommand;

pub fn run(config: Arc<Config>, cmd: ChatsCommand) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config)?;

    match cmd {
        ChatsCommand::List => {
            let chats = state.history.list_chats()?;
            if chats.is_empty() {
                println!("No chats yet.");
                return Ok(());
            }
            for chat in chats {
                println!(
                    "#{:<5} {}  ({})",
                    chat.id,
                    chat.title,
                    chat.created_at.format("%Y-%m-%d %H:%M UTC")
                );
            }
        }

        ChatsCommand::Show { chat_id } => {
            let Some(title) = state.history.chat_title(chat_id)? else {
                bail!("no chat with id {chat_id}");
            };
            println!("#{chat_id} — {title}\n");
            for msg in state.history.get_messages(chat_id)? {
                println!("[{}] {}", msg.role.as_str(), msg.content);
                println!();
            }
        }

        ChatsCommand::Rename { chat_id, title } => {
            if state.history.chat_title(chat_id)?.is_none() {
                bail!("no chat with id {chat_id}");
            }
            state.history.rename_chat(chat_id, &title)?;
            println!("Chat #{chat_id} renamed to: {title}");
        }
    }

    Ok(())
}
