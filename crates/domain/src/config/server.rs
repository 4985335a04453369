use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::non_empty;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local stdio server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Environment variables forwarded to the dbt-mcp subprocess.
///
/// Only this allow-list crosses the process boundary; everything else in
/// the parent environment (credentials included) stays behind.
pub const FORWARDED_ENV_KEYS: [&str; 7] = [
    "DBT_PROJECT_DIR",
    "DBT_PROFILES_DIR",
    "DBT_PATH",
    "DISABLE_SEMANTIC_LAYER",
    "DISABLE_DISCOVERY",
    "DISABLE_SQL",
    "DISABLE_ADMIN_API",
];

/// Settings for launching a local dbt-mcp server over stdio.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalServerConfig {
    /// Explicit path to the dbt-mcp binary (`DBT_MCP_BIN`), if set.
    pub bin: Option<PathBuf>,
    /// Python interpreter used for the module-entrypoint fallback
    /// (`DBT_CHAT_PYTHON`). dbt-mcp ships as a Python package, so the
    /// last-resort launch is `<interpreter> -m dbt_mcp.main`.
    pub interpreter: PathBuf,
    /// Allow-listed environment passed to the subprocess.
    pub forward_env: HashMap<String, String>,
}

impl LocalServerConfig {
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let forward_env = FORWARDED_ENV_KEYS
            .iter()
            .filter_map(|k| non_empty(vars, k).map(|v| (k.to_string(), v)))
            .collect();

        Self {
            bin: non_empty(vars, "DBT_MCP_BIN").map(PathBuf::from),
            interpreter: non_empty(vars, "DBT_CHAT_PYTHON")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("python3")),
            forward_env,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Remote streamable-HTTP server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings for the hosted dbt-mcp endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteServerConfig {
    /// Service token (`DBT_TOKEN`).
    pub token: Option<String>,
    /// Production environment identifier (`DBT_PROD_ENV_ID`), sent as the
    /// `x-dbt-prod-environment-id` header.
    pub prod_environment_id: Option<String>,
    /// Platform host name (`DBT_HOST`).
    pub host: String,
}

impl Default for RemoteServerConfig {
    fn default() -> Self {
        Self {
            token: None,
            prod_environment_id: None,
            host: d_host(),
        }
    }
}

impl RemoteServerConfig {
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        Self {
            token: non_empty(vars, "DBT_TOKEN"),
            prod_environment_id: non_empty(vars, "DBT_PROD_ENV_ID"),
            host: non_empty(vars, "DBT_HOST").unwrap_or_else(d_host),
        }
    }

    /// Both credentials are present.
    pub fn is_configured(&self) -> bool {
        self.token.is_some() && self.prod_environment_id.is_some()
    }

    /// The MCP endpoint URL for the configured host.
    pub fn endpoint_url(&self) -> String {
        format!("https://{}/api/ai/v1/mcp/", self.host)
    }
}

fn d_host() -> String {
    "cloud.getdbt.com".into()
}
