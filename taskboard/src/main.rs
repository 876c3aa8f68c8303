//! `taskboard` — collaborative task board in the terminal.
//!
//! Reads commands from stdin while applying other clients' changes as they
//! arrive. Configuration via CLI flags, environment variables, or config
//! file (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! # Against a local server
//! cargo run --bin taskboard
//!
//! # Elsewhere, opening a project right away
//! cargo run --bin taskboard -- --server-url http://board.lan:4000 --project 1f2e3d4c
//! ```

use std::io::Write as _;
use std::path::Path;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::channel::BroadcastChannel;
use taskboard::channel::ws::WsChannel;
use taskboard::config::{CliArgs, ClientConfig};
use taskboard::history::UndoLogStore;
use taskboard::history::file::FileUndoLogStore;
use taskboard::persistence::PersistenceService;
use taskboard::persistence::http::HttpPersistence;
use taskboard::shell::{self, Command, HELP};
use taskboard::sync::{Applied, SyncCoordinator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file, stdout belongs to the shell.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(
        server = %config.server_url,
        relay = %config.ws_url,
        client_id = %config.client_id,
        "taskboard starting"
    );

    let persistence = HttpPersistence::new(&config.server_url)?;
    let channel = WsChannel::connect(&config.ws_url, &config.ws_options()).await?;
    let undo_store = FileUndoLogStore::new(&config.undo_log_path);
    let mut board = SyncCoordinator::new(
        persistence,
        channel,
        undo_store,
        config.client_id.clone(),
        config.history_capacity,
    )
    .await;

    if let Some(project) = cli.project {
        let reply = shell::execute(&mut board, Command::Open(project)).await?;
        println!("{reply}");
    }

    run_shell(&mut board).await?;

    tracing::info!("taskboard exiting");
    Ok(())
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Interleaves stdin commands with inbound board events until `quit`, end
/// of input, or loss of the broadcast channel.
async fn run_shell<P, C, L>(board: &mut SyncCoordinator<P, C, L>) -> std::io::Result<()>
where
    P: PersistenceService,
    C: BroadcastChannel,
    L: UndoLogStore,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");
    prompt()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => match shell::execute(board, command).await {
                        Ok(reply) => println!("{reply}"),
                        Err(e) => println!("error: {e}"),
                    },
                    Err(e) => println!("error: {e}"),
                }
                prompt()?;
            }
            event = board.next_event() => match event {
                Ok(Applied::Foreign) => {
                    println!("\n(board changed by another client)");
                    for task in board.tasks() {
                        println!("{}", shell::format_task(task));
                    }
                    prompt()?;
                }
                Ok(Applied::Echo | Applied::Ignored) => {}
                Err(e) => {
                    tracing::error!(error = %e, "broadcast channel lost");
                    println!("\nconnection to the relay was lost: {e}");
                    break;
                }
            },
        }
    }
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(b"> ")?;
    stdout.flush()
}
