use std::sync::Arc;

use dbtchat_domain::Config;
use dbtchat_history::ChatStore;

/// Shared application state for every command.
///
/// The store is the one process-wide resource: opened once here and
/// injected wherever history access is needed.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub history: Arc<ChatStore>,
}
