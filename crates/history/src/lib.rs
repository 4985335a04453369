//! `dbtchat-history` — persistent chat history.
//!
//! A small SQLite store with two tables (`chats`, `messages`) behind a
//! single process-wide connection. Every mutating call is one
//! autocommitted statement, so a returned success means the row survives
//! a crash. The store is opened once at bootstrap and injected as an
//! `Arc<ChatStore>` wherever history access is needed.

pub mod store;

pub use store::{ChatRole, ChatStore, ChatSummary, StoreError, StoredMessage};
