use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use pdfchat_core::{BackendClient, Config, ConsoleState, SelectedFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod files;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "pdfchat")]
#[command(version, about = "Ask questions across a set of PDF documents")]
struct Cli {
    /// Base URL of the indexing backend (overrides PDFCHAT_BACKEND_URL and the config file)
    #[arg(long)]
    backend_url: Option<String>,

    /// Write logs here instead of the cache directory
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// PDF files to pre-select
    files: Vec<PathBuf>,
}

fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("pdfchat").join("pdfchat.log"))
        .unwrap_or_else(|| PathBuf::from("pdfchat.log"))
}

/// Logs go to a file since the terminal belongs to the UI.
fn init_logging(path: PathBuf) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdfchat=info,pdfchat_core=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();

    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging(cli.log_file.unwrap_or_else(default_log_path))?;

    let config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(%err, "could not read config file, using defaults");
        Config::default()
    });
    let backend_url = config.resolve_backend_url(cli.backend_url.as_deref());
    tracing::info!(%backend_url, log = %log_path.display(), "starting pdfchat");

    let mut state = ConsoleState::new(config.initial_configuration());
    if !cli.files.is_empty() {
        state.select_files(cli.files.iter().map(SelectedFile::from_path).collect());
    }

    let mut app = App::new(state, BackendClient::new(&backend_url));
    app.persist_preferences = true;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if let Err(err) = &result {
        tracing::error!(%err, "exited with error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}
