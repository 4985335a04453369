//! Environment-driven configuration.
//!
//! The deployment surface for this tool is a handful of environment
//! variables (usually loaded from a `.env` file by the binary). `Config::from_env` snapshots the process environment once;
//! `Config::from_vars` does the actual parsing from a plain map so the
//! whole layer is testable without mutating process state.

mod history;
mod llm;
mod server;

pub use history::*;
pub use llm::*;
pub use server::*;

use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Model-provider settings.
    pub llm: LlmConfig,
    /// Local stdio dbt-mcp settings.
    pub local: LocalServerConfig,
    /// Remote streamable-HTTP dbt-mcp settings.
    pub remote: RemoteServerConfig,
    /// Chat-history store settings.
    pub history: HistoryConfig,
}

impl Config {
    /// Build the config from the current process environment.
    pub fn from_env() -> Self {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build the config from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        Self {
            llm: LlmConfig::from_vars(vars),
            local: LocalServerConfig::from_vars(vars),
            remote: RemoteServerConfig::from_vars(vars),
            history: HistoryConfig::from_vars(vars),
        }
    }
}

/// Read a variable, treating empty strings as unset.
pub(crate) fn non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_from_empty_vars() {
        let cfg = Config::from_vars(&HashMap::new());
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.remote.host, "cloud.getdbt.com");
        assert_eq!(cfg.history.db_path.to_str().unwrap(), "chat_history.db");
        assert!(cfg.local.bin.is_none());
        assert!(cfg.local.forward_env.is_empty());
    }

    #[test]
    fn empty_values_treated_as_unset() {
        let cfg = Config::from_vars(&vars(&[("DBT_MCP_BIN", "  "), ("DBT_TOKEN", "")]));
        assert!(cfg.local.bin.is_none());
        assert!(cfg.remote.token.is_none());
    }

    #[test]
    fn forward_env_is_allow_listed() {
        let cfg = Config::from_vars(&vars(&[
            ("DBT_PROJECT_DIR", "/data/transforms"),
            ("DISABLE_SQL", "true"),
            ("OPENAI_API_KEY", "sk-secret"),
            ("HOME", "/home/u"),
        ]));
        assert_eq!(cfg.local.forward_env.len(), 2);
        assert_eq!(cfg.local.forward_env["DBT_PROJECT_DIR"], "/data/transforms");
        assert_eq!(cfg.local.forward_env["DISABLE_SQL"], "true");
        assert!(!cfg.local.forward_env.contains_key("OPENAI_API_KEY"));
        assert!(!cfg.local.forward_env.contains_key("HOME"));
    }

    #[test]
    fn remote_endpoint_url() {
        let cfg = Config::from_vars(&vars(&[
            ("DBT_TOKEN", "tok"),
            ("DBT_PROD_ENV_ID", "42"),
            ("DBT_HOST", "eu.getdbt.com"),
        ]));
        assert!(cfg.remote.is_configured());
        assert_eq!(cfg.remote.endpoint_url(), "https://eu.getdbt.com/api/ai/v1/mcp/");
    }
}
