use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dbtchat_cli::commands::{self, Cli, Command};
use dbtchat_domain::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a .env next to the working directory, if any.
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env());

    match cli.command {
        // Default to the interactive chat when no subcommand is given.
        None => commands::chat::chat(config, false).await,
        Some(Command::Chat { remote }) => commands::chat::chat(config, remote).await,
        Some(Command::Ask { message, remote }) => commands::ask::ask(config, message, remote).await,
        Some(Command::Chats(cmd)) => commands::chats::run(config, cmd),
        Some(Command::Doctor) => {
            let passed = commands::doctor::run(&config)?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Version) => {
            println!("dbtchat {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Compact stderr-only tracing so diagnostics never pollute stdout.
///
/// Defaults to `warn`; raise with `RUST_LOG` when debugging a session.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
