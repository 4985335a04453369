//! The session controller: one user input → one persisted reply.
//!
//! Holds the active-chat state explicitly (no globals) and guarantees
//! that an agent failure never breaks the turn loop: whatever the agent
//! raises becomes the assistant's reply, code-fenced, and the chat stays
//! usable for the next message. Store failures are the exception — they
//! propagate, since without the store there is no turn to record.

use dbtchat_agent::TextExchange;
use dbtchat_history::{ChatRole, ChatStore, StoreError};

/// Title given to a chat created implicitly by the first message.
pub const PLACEHOLDER_TITLE: &str = "New chat";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-session chat pointer: either no chat yet, or one active chat id.
///
/// The only transition out of an active chat is starting a new one.
#[derive(Debug, Default)]
pub struct ChatSessionState {
    active_chat: Option<i64>,
}

impl ChatSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_chat(&self) -> Option<i64> {
        self.active_chat
    }

    /// Create a fresh chat and make it active.
    pub fn start_new_chat(&mut self, history: &ChatStore) -> Result<i64, StoreError> {
        let id = history.create_chat(PLACEHOLDER_TITLE)?;
        self.active_chat = Some(id);
        Ok(id)
    }

    /// The active chat id, creating a chat if none is active yet.
    fn ensure_chat(&mut self, history: &ChatStore) -> Result<i64, StoreError> {
        match self.active_chat {
            Some(id) => Ok(id),
            None => self.start_new_chat(history),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn execution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The reply shown (and persisted) when the agent call fails.
pub fn error_reply(err: &dbtchat_domain::Error) -> String {
    format!("Sorry, I hit an error while calling dbt MCP:\n\n```\n{err}\n```")
}

/// Run one turn: persist the user message, run one agent exchange, and
/// persist whatever comes back — the reply on success, the error text on
/// failure. Returns the text that was persisted as the assistant message.
pub async fn run_turn<E: TextExchange>(
    history: &ChatStore,
    session: &mut ChatSessionState,
    exchange: &mut E,
    text: &str,
) -> Result<String, StoreError> {
    let chat_id = session.ensure_chat(history)?;

    history.add_message(chat_id, ChatRole::User, text)?;

    let reply = match exchange.ask(text).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(chat_id, error = %e, "agent exchange failed, persisting error reply");
            error_reply(&e)
        }
    };

    history.add_message(chat_id, ChatRole::Assistant, &reply)?;
    Ok(reply)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dbtchat_domain::{Error, Result};

    /// Scripted stand-in for the agent: pops one canned response per ask.
    struct Scripted {
        responses: Vec<Result<String>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<Result<String>>) -> Self {
            responses.reverse();
            Self { responses }
        }
    }

    #[async_trait]
    impl TextExchange for Scripted {
        async fn ask(&mut self, _text: &str) -> Result<String> {
            self.responses.pop().expect("script exhausted")
        }
    }

    fn store() -> (tempfile::TempDir, ChatStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ChatStore::open(&dir.path().join("history.db")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn first_message_creates_a_placeholder_chat() {
        let (_dir, history) = store();
        let mut session = ChatSessionState::new();
        let mut agent = Scripted::new(vec![Ok("hello".into())]);

        assert_eq!(session.active_chat(), None);
        run_turn(&history, &mut session, &mut agent, "hi").await.unwrap();

        let id = session.active_chat().expect("chat should be active");
        assert_eq!(history.chat_title(id).unwrap().as_deref(), Some(PLACEHOLDER_TITLE));
    }

    #[tokio::test]
    async fn turn_persists_both_sides_in_order() {
        let (_dir, history) = store();
        let mut session = ChatSessionState::new();
        let mut agent = Scripted::new(vec![Ok("Here are 3 models: ...".into())]);

        let reply = run_turn(&history, &mut session, &mut agent, "List all models")
            .await
            .unwrap();
        assert_eq!(reply, "Here are 3 models: ...");

        let msgs = history.get_messages(session.active_chat().unwrap()).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, ChatRole::User);
        assert_eq!(msgs[0].content, "List all models");
        assert_eq!(msgs[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn agent_failure_becomes_the_assistant_reply() {
        let (_dir, history) = store();
        let mut session = ChatSessionState::new();
        let mut agent = Scripted::new(vec![
            Err(Error::Timeout("agent exchange exceeded 30s".into())),
            Ok("recovered".into()),
        ]);

        let reply = run_turn(&history, &mut session, &mut agent, "slow question")
            .await
            .unwrap();
        assert!(reply.contains("Sorry, I hit an error while calling dbt MCP"));
        assert!(reply.contains("agent exchange exceeded 30s"));
        assert!(reply.contains("```"));

        // The chat stays usable for the next turn.
        let chat_id = session.active_chat().unwrap();
        run_turn(&history, &mut session, &mut agent, "try again")
            .await
            .unwrap();

        let msgs = history.get_messages(chat_id).unwrap();
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[1].role, ChatRole::Assistant);
        assert!(msgs[1].content.contains("agent exchange exceeded 30s"));
        assert_eq!(msgs[3].content, "recovered");
    }

    #[tokio::test]
    async fn new_chat_leaves_the_old_one_intact() {
        let (_dir, history) = store();
        let mut session = ChatSessionState::new();
        let mut agent = Scripted::new(vec![Ok("a".into()), Ok("b".into())]);

        run_turn(&history, &mut session, &mut agent, "first chat").await.unwrap();
        let first = session.active_chat().unwrap();

        let second = session.start_new_chat(&history).unwrap();
        assert_ne!(first, second);
        run_turn(&history, &mut session, &mut agent, "second chat").await.unwrap();

        assert_eq!(history.get_messages(first).unwrap().len(), 2);
        assert_eq!(history.get_messages(second).unwrap().len(), 2);

        // Newest chat listed first.
        let chats = history.list_chats().unwrap();
        assert_eq!(chats[0].id, second);
    }
}
