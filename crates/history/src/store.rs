//! SQLite-backed chat store.
//!
//! Schema: `chats(id, title, created_at)` and `messages(id, chat_id, role,
//! content, created_at)` with a declared cascade from chats to messages.
//! Ids are rowid-autoincrement, so retrieval ordered by id equals
//! insertion order. Timestamps are UTC.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, ToSql};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rows
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            "system" => Some(ChatRole::System),
            _ => None,
        }
    }
}

impl ToSql for ChatRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ChatRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        ChatRole::parse(s).ok_or_else(|| FromSqlError::Other(UnknownRole(s.to_string()).into()))
    }
}

/// A stored role tag the store does not recognize.
#[derive(Debug, thiserror::Error)]
#[error("unknown chat role: {0}")]
pub struct UnknownRole(pub String);

/// One row of `chats`, as returned by [`ChatStore::list_chats`].
#[derive(Debug, Clone)]
pub struct ChatSummary {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// One row of `messages`, as returned by [`ChatStore::get_messages`].
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Errors raised by the chat store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// The insert was rejected because its `chat_id` references no chat.
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

impl From<StoreError> for dbtchat_domain::Error {
    fn from(e: StoreError) -> Self {
        dbtchat_domain::Error::Store(e.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY(chat_id) REFERENCES chats(id) ON DELETE CASCADE
);
";

/// Chat history store backed by one SQLite connection.
///
/// The connection is shared for the whole process; callers hold this in
/// an `Arc` and the inner mutex serializes statements across whatever
/// thread a turn happens to run on.
pub struct ChatStore {
    conn: Mutex<Connection>,
}

impl ChatStore {
    /// Open (or create) the store at `path`.
    ///
    /// Creates both tables if absent; never migrates or drops. Safe to
    /// call on an existing database. Foreign keys are enforced for this
    /// connection so orphan messages are rejected at insert time.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!(path = %path.display(), "chat history store opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a new chat, returning its id.
    pub fn create_chat(&self, title: &str) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chats (title, created_at) VALUES (?1, ?2)",
            params![title, Utc::now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All chats, most recently created first.
    pub fn list_chats(&self) -> Result<Vec<ChatSummary>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, title, created_at FROM chats ORDER BY id DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok(ChatSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every message of `chat_id` in chronological (= id) order.
    ///
    /// An unknown chat yields an empty vec, not an error.
    pub fn get_messages(&self, chat_id: i64) -> Result<Vec<StoredMessage>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT role, content, created_at FROM messages WHERE chat_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([chat_id], |row| {
            Ok(StoredMessage {
                role: row.get(0)?,
                content: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Append one message to `chat_id`.
    ///
    /// Fails with a constraint violation when the chat does not exist.
    pub fn add_message(&self, chat_id: i64, role: ChatRole, content: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (chat_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![chat_id, role, content, Utc::now()],
        )?;
        Ok(())
    }

    /// Replace a chat's title.
    pub fn rename_chat(&self, chat_id: i64, title: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE chats SET title = ?1 WHERE id = ?2",
            params![title, chat_id],
        )?;
        Ok(())
    }

    /// The chat's current title, or `None` for an unknown id.
    pub fn chat_title(&self, chat_id: i64) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock();
        let title = conn
            .query_row("SELECT title FROM chats WHERE id = ?1", [chat_id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(title)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, ChatStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ChatStore::open(&dir.path().join("history.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn open_is_idempotent_and_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");

        let store = ChatStore::open(&path).unwrap();
        let id = store.create_chat("kept").unwrap();
        store.add_message(id, ChatRole::User, "hello").unwrap();
        drop(store);

        let reopened = ChatStore::open(&path).unwrap();
        let chats = reopened.list_chats().unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].title, "kept");
        assert_eq!(reopened.get_messages(id).unwrap().len(), 1);
    }

    #[test]
    fn list_chats_newest_first() {
        let (_dir, store) = open_temp();
        let first = store.create_chat("first").unwrap();
        let second = store.create_chat("second").unwrap();
        assert!(second > first);

        let chats = store.list_chats().unwrap();
        assert_eq!(chats[0].id, second);
        assert_eq!(chats[1].id, first);
        assert!(chats.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[test]
    fn messages_in_insertion_order_and_scoped_to_chat() {
        let (_dir, store) = open_temp();
        let a = store.create_chat("a").unwrap();
        let b = store.create_chat("b").unwrap();

        store.add_message(a, ChatRole::User, "one").unwrap();
        store.add_message(b, ChatRole::User, "other chat").unwrap();
        store.add_message(a, ChatRole::Assistant, "two").unwrap();
        store.add_message(a, ChatRole::User, "three").unwrap();

        let msgs = store.get_messages(a).unwrap();
        let contents: Vec<&str> = msgs.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "three"]);
        assert!(msgs.iter().all(|m| m.content != "other chat"));
    }

    #[test]
    fn demo_chat_roundtrip() {
        let (_dir, store) = open_temp();
        let id = store.create_chat("Demo").unwrap();
        store.add_message(id, ChatRole::User, "List all models").unwrap();
        store
            .add_message(id, ChatRole::Assistant, "Here are 3 models: ...")
            .unwrap();

        let msgs = store.get_messages(id).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, ChatRole::User);
        assert_eq!(msgs[0].content, "List all models");
        assert_eq!(msgs[1].role, ChatRole::Assistant);
        assert_eq!(msgs[1].content, "Here are 3 models: ...");
    }

    #[test]
    fn add_message_to_unknown_chat_is_rejected() {
        let (_dir, store) = open_temp();
        let err = store
            .add_message(999, ChatRole::User, "orphan")
            .unwrap_err();
        assert!(err.is_foreign_key_violation(), "got: {err}");
    }

    #[test]
    fn get_messages_for_unknown_chat_is_empty() {
        let (_dir, store) = open_temp();
        assert!(store.get_messages(42).unwrap().is_empty());
    }

    #[test]
    fn rename_chat_persists() {
        let (_dir, store) = open_temp();
        let id = store.create_chat("New chat").unwrap();
        store.rename_chat(id, "Model inventory").unwrap();
        assert_eq!(store.chat_title(id).unwrap().as_deref(), Some("Model inventory"));
        assert_eq!(store.chat_title(id + 1).unwrap(), None);
    }

    #[test]
    fn role_tags_roundtrip() {
        for role in [ChatRole::User, ChatRole::Assistant, ChatRole::System] {
            assert_eq!(ChatRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(ChatRole::parse("tool"), None);
    }
}
