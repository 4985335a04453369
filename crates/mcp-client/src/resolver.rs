//! Launch resolution for the local dbt-mcp server.
//!
//! Different deployments land the server binary in different places: an
//! operator-set absolute path, the venv-style directory next to our own
//! executable, somewhere on `PATH`, or nowhere at all (pip-installed
//! package only). Resolution tries a fixed ordered list of strategies
//! and takes the first match; the module-entrypoint fallback always
//! succeeds here, and a missing package only surfaces later when the
//! subprocess is spawned.
//!
//! Resolution runs once, at agent construction, and the choice is never
//! revisited for the life of the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Name of the server binary we look for.
#[cfg(not(windows))]
pub const SERVER_BIN: &str = "dbt-mcp";
#[cfg(windows)]
pub const SERVER_BIN: &str = "dbt-mcp.exe";

/// Arguments for the module-entrypoint fallback. The package installs no
/// `__main__`, so the entry module must be named explicitly.
pub const MODULE_ENTRYPOINT_ARGS: [&str; 2] = ["-m", "dbt_mcp.main"];

/// Per-call timeout used by the chat application path.
pub const APP_CALL_TIMEOUT: Duration = Duration::from_secs(90);

/// Per-call timeout used by the interactive CLI variants.
pub const CLI_CALL_TIMEOUT: Duration = Duration::from_secs(30);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Filesystem abstraction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Minimal filesystem view so each strategy can be exercised in tests
/// without touching the real disk.
pub trait FileCheck {
    fn is_file(&self, path: &Path) -> bool;
}

/// The real filesystem.
pub struct SystemFiles;

impl FileCheck for SystemFiles {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inputs and output
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything resolution may consult, captured up front.
#[derive(Debug, Clone)]
pub struct ResolverHints {
    /// Operator-supplied server path (`DBT_MCP_BIN`).
    pub explicit_bin: Option<PathBuf>,
    /// Directory of the currently running executable.
    pub exe_dir: Option<PathBuf>,
    /// Parsed `PATH` entries, in order.
    pub search_path: Vec<PathBuf>,
    /// Interpreter for the module-entrypoint fallback.
    pub interpreter: PathBuf,
    /// Allow-listed environment forwarded to the subprocess.
    pub env: HashMap<String, String>,
}

impl ResolverHints {
    /// Capture hints from the current process state and the local server
    /// config.
    pub fn from_process(local: &dbtchat_domain::config::LocalServerConfig) -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let search_path = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();

        Self {
            explicit_bin: local.bin.clone(),
            exe_dir,
            search_path,
            interpreter: local.interpreter.clone(),
            env: local.forward_env.clone(),
        }
    }
}

/// How the command was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedOrigin {
    /// Operator-supplied path existed.
    ExplicitBin,
    /// Binary next to the running executable.
    ExeAdjacent,
    /// First hit on the search path.
    SearchPath,
    /// `<interpreter> -m dbt_mcp.main`.
    ModuleFallback,
}

impl ResolvedOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolvedOrigin::ExplicitBin => "explicit path",
            ResolvedOrigin::ExeAdjacent => "exe-adjacent binary",
            ResolvedOrigin::SearchPath => "PATH",
            ResolvedOrigin::ModuleFallback => "module entrypoint",
        }
    }
}

/// The launch decision: command, args, filtered env, and per-call timeout.
#[derive(Debug, Clone)]
pub struct ResolvedCommand {
    pub command: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub timeout: Duration,
    pub origin: ResolvedOrigin,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Pick the command used to launch the local server. Never fails: the
/// module-entrypoint fallback is always available.
pub fn resolve_server_command(
    hints: &ResolverHints,
    fs: &dyn FileCheck,
    timeout: Duration,
) -> ResolvedCommand {
    let (command, args, origin) = explicit_bin(hints, fs)
        .or_else(|| exe_adjacent(hints, fs))
        .or_else(|| on_search_path(hints, fs))
        .unwrap_or_else(|| module_fallback(hints));

    tracing::info!(
        command = %command.display(),
        origin = origin.as_str(),
        "resolved dbt-mcp launch command"
    );

    ResolvedCommand {
        command,
        args,
        env: hints.env.clone(),
        timeout,
        origin,
    }
}

fn explicit_bin(
    hints: &ResolverHints,
    fs: &dyn FileCheck,
) -> Option<(PathBuf, Vec<String>, ResolvedOrigin)> {
    let bin = hints.explicit_bin.as_ref()?;
    fs.is_file(bin)
        .then(|| (bin.clone(), Vec::new(), ResolvedOrigin::ExplicitBin))
}

fn exe_adjacent(
    hints: &ResolverHints,
    fs: &dyn FileCheck,
) -> Option<(PathBuf, Vec<String>, ResolvedOrigin)> {
    let candidate = hints.exe_dir.as_ref()?.join(SERVER_BIN);
    fs.is_file(&candidate)
        .then(|| (candidate, Vec::new(), ResolvedOrigin::ExeAdjacent))
}

fn on_search_path(
    hints: &ResolverHints,
    fs: &dyn FileCheck,
) -> Option<(PathBuf, Vec<String>, ResolvedOrigin)> {
    hints
        .search_path
        .iter()
        .map(|dir| dir.join(SERVER_BIN))
        .find(|candidate| fs.is_file(candidate))
        .map(|candidate| (candidate, Vec::new(), ResolvedOrigin::SearchPath))
}

fn module_fallback(hints: &ResolverHints) -> (PathBuf, Vec<String>, ResolvedOrigin) {
    (
        hints.interpreter.clone(),
        MODULE_ENTRYPOINT_ARGS.iter().map(|s| s.to_string()).collect(),
        ResolvedOrigin::ModuleFallback,
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FakeFiles(HashSet<PathBuf>);

    impl FakeFiles {
        fn of(paths: &[&str]) -> Self {
            Self(paths.iter().map(PathBuf::from).collect())
        }
    }

    impl FileCheck for FakeFiles {
        fn is_file(&self, path: &Path) -> bool {
            self.0.contains(path)
        }
    }

    fn hints() -> ResolverHints {
        ResolverHints {
            explicit_bin: None,
            exe_dir: Some(PathBuf::from("/venv/bin")),
            search_path: vec![PathBuf::from("/usr/local/bin"), PathBuf::from("/usr/bin")],
            interpreter: PathBuf::from("/venv/bin/python3"),
            env: HashMap::from([("DBT_PROJECT_DIR".to_string(), "/data/transforms".to_string())]),
        }
    }

    #[test]
    fn explicit_path_wins_over_everything() {
        let mut h = hints();
        h.explicit_bin = Some(PathBuf::from("/opt/tools/dbt-mcp"));
        // Same-named binaries exist both next to the exe and on PATH.
        let fs = FakeFiles::of(&[
            "/opt/tools/dbt-mcp",
            "/venv/bin/dbt-mcp",
            "/usr/local/bin/dbt-mcp",
        ]);

        let cmd = resolve_server_command(&h, &fs, CLI_CALL_TIMEOUT);
        assert_eq!(cmd.origin, ResolvedOrigin::ExplicitBin);
        assert_eq!(cmd.command, PathBuf::from("/opt/tools/dbt-mcp"));
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn missing_explicit_path_is_skipped() {
        let mut h = hints();
        h.explicit_bin = Some(PathBuf::from("/opt/tools/dbt-mcp"));
        let fs = FakeFiles::of(&["/venv/bin/dbt-mcp"]);

        let cmd = resolve_server_command(&h, &fs, CLI_CALL_TIMEOUT);
        assert_eq!(cmd.origin, ResolvedOrigin::ExeAdjacent);
        assert_eq!(cmd.command, PathBuf::from("/venv/bin/dbt-mcp"));
    }

    #[test]
    fn search_path_is_scanned_in_order() {
        let fs = FakeFiles::of(&["/usr/local/bin/dbt-mcp", "/usr/bin/dbt-mcp"]);

        let cmd = resolve_server_command(&hints(), &fs, CLI_CALL_TIMEOUT);
        assert_eq!(cmd.origin, ResolvedOrigin::SearchPath);
        assert_eq!(cmd.command, PathBuf::from("/usr/local/bin/dbt-mcp"));
    }

    #[test]
    fn module_fallback_is_deterministic() {
        let fs = FakeFiles::of(&[]);

        let cmd = resolve_server_command(&hints(), &fs, APP_CALL_TIMEOUT);
        assert_eq!(cmd.origin, ResolvedOrigin::ModuleFallback);
        assert_eq!(cmd.command, PathBuf::from("/venv/bin/python3"));
        assert_eq!(cmd.args, vec!["-m".to_string(), "dbt_mcp.main".to_string()]);
        assert_eq!(cmd.timeout, Duration::from_secs(90));

        // Re-resolving yields the same decision.
        let again = resolve_server_command(&hints(), &fs, APP_CALL_TIMEOUT);
        assert_eq!(again.origin, ResolvedOrigin::ModuleFallback);
        assert_eq!(again.command, cmd.command);
        assert_eq!(again.args, cmd.args);
    }

    #[test]
    fn resolved_env_is_the_allow_listed_map() {
        let fs = FakeFiles::of(&["/venv/bin/dbt-mcp"]);
        let cmd = resolve_server_command(&hints(), &fs, CLI_CALL_TIMEOUT);
        assert_eq!(cmd.env.len(), 1);
        assert_eq!(cmd.env["DBT_PROJECT_DIR"], "/data/transforms");
    }

    #[test]
    fn no_exe_dir_falls_through_to_search_path() {
        let mut h = hints();
        h.exe_dir = None;
        let fs = FakeFiles::of(&["/usr/bin/dbt-mcp"]);

        let cmd = resolve_server_command(&h, &fs, CLI_CALL_TIMEOUT);
        assert_eq!(cmd.origin, ResolvedOrigin::SearchPath);
        assert_eq!(cmd.command, PathBuf::from("/usr/bin/dbt-mcp"));
    }
}
