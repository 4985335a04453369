use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::non_empty;

/// Settings for the chat-history store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// SQLite database path (`DBT_CHAT_DB`).
    pub db_path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("chat_history.db"),
        }
    }
}

impl HistoryConfig {
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        Self {
            db_path: non_empty(vars, "DBT_CHAT_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("chat_history.db")),
        }
    }
}
