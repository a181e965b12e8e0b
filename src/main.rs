//! plugman - a launcher-style package manager for host plugins
//!
//! Reads queries line by line from stdin and writes replies, pushed updates
//! and notifications to stdout as JSON lines.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use plugman::commands::{ReplyItem, ReplyUpdate};
use plugman::config::Config;
use plugman::notification::{self, Notification};
use plugman::registry::RegistryClient;
use plugman::store::{LocalStore, MemoryStore, PackageStore};
use plugman::{logging, AppError, Dispatcher};

/// How long pending output may take to flush on exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// plugman - install and remove host plugins from a launcher prompt
#[derive(Parser)]
#[command(name = "plugman")]
#[command(version)]
#[command(about = "Launcher-style package manager for host plugins", long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the plugins directory
    #[arg(long)]
    plugins_dir: Option<PathBuf>,

    /// Keep installed packages in memory instead of on disk
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// A line read from stdin.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Quit,
    Exec { id: String, payload: String },
    Search(String),
}

/// Parse a stdin line. Blank lines yield `None`.
///
/// A leading `prefix` is stripped from search queries.
fn parse_input(line: &str, prefix: &str) -> Option<Input> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return None;
    }

    if line.trim() == ":quit" {
        return Some(Input::Quit);
    }

    let mut words = line.split_whitespace();
    if words.next() == Some(":exec") {
        let id = words.next()?.to_string();
        let payload = words.next().unwrap_or_default().to_string();
        return Some(Input::Exec { id, payload });
    }

    let query = line.strip_prefix(prefix).unwrap_or(line);
    Some(Input::Search(query.to_string()))
}

/// A JSON line written to stdout.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum Event<'a> {
    Reply { items: &'a [ReplyItem] },
    Update { update: &'a ReplyUpdate },
    Toast { toast: &'a Notification },
    Redirect { query: &'a str },
    Error { message: String, recoverable: bool },
}

impl Event<'_> {
    fn error(e: &AppError) -> Self {
        Event::Error {
            message: e.user_message(),
            recoverable: e.is_recoverable(),
        }
    }
}

fn emit(event: &Event<'_>) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to serialize output: {}", e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    if cli.verbose {
        if let Some(dir) = logging::log_directory() {
            eprintln!("Logging to {}", dir.display());
        }
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let mut settings = config.settings;
    if let Some(dir) = cli.plugins_dir {
        settings.plugins_dir = dir;
    }
    settings.validate()?;

    let store: Arc<dyn PackageStore> = if cli.dry_run {
        info!("Dry run, using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(LocalStore::from_settings(&settings))
    };
    let registry = Arc::new(RegistryClient::from_settings(&settings)?);

    let (notifier, mut toasts) = notification::channel();
    let (reply_tx, mut updates) = mpsc::unbounded_channel::<ReplyUpdate>();
    let dispatcher = Dispatcher::new(&settings, registry, store, notifier);

    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(update) = updates.recv() => emit(&Event::Update { update: &update }),
                Some(toast) = toasts.recv() => emit(&Event::Toast { toast: &toast }),
                else => break,
            }
        }
    });

    if let Err(e) = dispatcher.startup().await {
        warn!("Startup failed: {}", e);
        emit(&Event::error(&e));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line, &settings.prefix) {
            None => continue,
            Some(Input::Quit) => break,
            Some(Input::Exec { id, payload }) => match dispatcher.execute(&id, &payload) {
                Ok(Some(query)) => emit(&Event::Redirect { query: &query }),
                Ok(None) => {}
                Err(e) => emit(&Event::error(&e)),
            },
            Some(Input::Search(query)) => {
                let items = dispatcher.search(&query, &reply_tx).await;
                emit(&Event::Reply { items: &items });
            }
        }
    }

    dispatcher.shutdown();
    drop(reply_tx);
    drop(dispatcher);
    if tokio::time::timeout(SHUTDOWN_GRACE, printer).await.is_err() {
        warn!("Output task did not finish, exiting anyway");
    }
    logging::shutdown();
    Ok(())
}
