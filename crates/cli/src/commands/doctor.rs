//! `dbtchat doctor` — diagnostic checks for the local setup.
//!
//! Verifies the pieces a chat session will need: the dbt project paths,
//! provider credentials, and which server command resolution would pick.
//! Purely read-only; returns whether all required checks passed.

use std::path::{Path, PathBuf};

use dbtchat_domain::Config;
use dbtchat_mcp::resolver::{self, ResolvedOrigin, SystemFiles, CLI_CALL_TIMEOUT};
use dbtchat_mcp::ResolverHints;

pub fn run(config: &Config) -> anyhow::Result<bool> {
    println!("dbtchat doctor");
    println!("{}", "=".repeat(50));

    let mut passed = true;

    // ── dbt project ──────────────────────────────────────────────────
    match config.local.forward_env.get("DBT_PROJECT_DIR") {
        Some(dir) if Path::new(dir).is_dir() => {
            println!("✓ project directory: {dir}");
        }
        Some(dir) => {
            println!("✗ project directory not found: {dir}");
            passed = false;
        }
        None => {
            println!("✗ DBT_PROJECT_DIR is not set");
            passed = false;
        }
    }

    match profiles_file(config) {
        Some(path) if path.is_file() => {
            println!("✓ profiles.yml: {}", path.display());
        }
        Some(path) => {
            println!("✗ profiles.yml not found: {}", path.display());
            passed = false;
        }
        None => {
            println!("- profiles.yml: skipped (no project or profiles directory)");
        }
    }

    // ── model provider ───────────────────────────────────────────────
    if config.llm.api_key.is_some() {
        println!("✓ OPENAI_API_KEY is set (model: {})", config.llm.model);
    } else {
        println!("✗ OPENAI_API_KEY is not set");
        passed = false;
    }

    // ── server resolution ────────────────────────────────────────────
    let hints = ResolverHints::from_process(&config.local);
    let resolved = resolver::resolve_server_command(&hints, &SystemFiles, CLI_CALL_TIMEOUT);
    println!(
        "✓ server command ({}): {} {}",
        resolved.origin.as_str(),
        resolved.command.display(),
        resolved.args.join(" ")
    );
    if resolved.origin == ResolvedOrigin::ModuleFallback {
        println!("  note: no dbt-mcp binary found; will rely on `{} -m dbt_mcp.main`",
            resolved.command.display());
    }

    // ── remote endpoint (informational) ──────────────────────────────
    if config.remote.is_configured() {
        println!("✓ remote endpoint configured: {}", config.remote.endpoint_url());
    } else {
        println!("- remote endpoint: not configured (DBT_TOKEN / DBT_PROD_ENV_ID)");
    }

    println!("{}", "=".repeat(50));
    if passed {
        println!("All required checks passed.");
    } else {
        println!("Some checks failed — fix the items marked ✗ above.");
    }

    Ok(passed)
}

/// Where profiles.yml should be: an explicit profiles directory wins,
/// otherwise `<project>/profiles/`.
fn profiles_file(config: &Config) -> Option<PathBuf> {
    let env = &config.local.forward_env;
    if let Some(dir) = env.get("DBT_PROFILES_DIR") {
        return Some(Path::new(dir).join("profiles.yml"));
    }
    env.get("DBT_PROJECT_DIR")
        .map(|dir| Path::new(dir).join("profiles").join("profiles.yml"))
}
