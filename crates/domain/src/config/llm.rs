use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::non_empty;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings for the OpenAI-compatible model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name sent in the request body (`OPENAI_MODEL`).
    pub model: String,
    /// Bearer key (`OPENAI_API_KEY`). Absence is reported at first use,
    /// not at startup, so history commands work without credentials.
    pub api_key: Option<String>,
    /// API root (`OPENAI_BASE_URL`), without a trailing slash.
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: d_model(),
            api_key: None,
            base_url: d_base_url(),
        }
    }
}

impl LlmConfig {
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        Self {
            model: non_empty(vars, "OPENAI_MODEL").unwrap_or_else(d_model),
            api_key: non_empty(vars, "OPENAI_API_KEY"),
            base_url: non_empty(vars, "OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(d_base_url),
        }
    }
}

fn d_model() -> String {
    "gpt-4o-mini".into()
}

fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}
