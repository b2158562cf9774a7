#![deny(dead_code)] // DO NOT REMOVE THIS EVER
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

mod ui;
mod utils;

use crate::ui::{ChatUI, UiAction};
use chatwidget::backend::{BackendError, ChatBackend, HttpBackend};
use chatwidget::config::{self, WidgetConfig};
use chatwidget::connectivity::{self, ProbeTarget};
use chatwidget::session::{ChatSession, SendTicket};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Terminal chat widget for a remote assistant endpoint.",
    long_about = "Terminal chat widget for a remote assistant endpoint.\n\n\
    Settings are read from <config dir>/chatwidget/config.json, then the\n\
    CHATWIDGET_ENDPOINT environment variable, then these flags."
)]
struct Args {
    /// Base URL of the assistant (requests go to <endpoint>/chat)
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Where to write the log
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

type ReplyResult = (SendTicket, Result<Vec<String>, BackendError>);

/// Resolved settings plus the config file they were read from, if any
fn resolve_config(args: &Args) -> Result<(WidgetConfig, Option<PathBuf>)> {
    let path = args.config.clone().or_else(config::default_config_path);
    let file_config = match &path {
        Some(path) => WidgetConfig::load(path)?,
        None => None,
    };
    let loaded_from = file_config.as_ref().and(path);

    let mut config = file_config
        .unwrap_or_default()
        .apply_env(|key| std::env::var(key).ok());
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(log_file) = &args.log_file {
        config.log_file = Some(log_file.clone());
    }
    Ok((config, loaded_from))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Everything that can make startup fail is checked before the terminal is touched
    let (config, loaded_from) = resolve_config(&args)?;
    let endpoint = config.endpoint_url()?;
    if !io::stdout().is_terminal() {
        bail!("stdout is not an interactive terminal; the chat widget needs one to draw on");
    }

    let log_file = config.log_file();
    utils::setup_logging(&log_file, args.log_level)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;
    info!("Chat widget starting up");
    info!("System information: {} {}", std::env::consts::OS, std::env::consts::ARCH);
    match &loaded_from {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file, using defaults"),
    }
    info!("Assistant endpoint: {}", endpoint);

    let backend: Arc<dyn ChatBackend> = Arc::new(HttpBackend::new(&endpoint)?);
    let probe_target = ProbeTarget::from_url(&endpoint)
        .ok_or_else(|| anyhow!("Endpoint {} has no host/port to probe", endpoint))?;
    let probe_interval = Duration::from_secs(config.probe_interval_secs.max(1));

    let mut session = ChatSession::new();
    session.greet();
    let online = connectivity::is_reachable(&probe_target, probe_interval).await;
    session.on_connectivity(online);
    let mut connectivity_rx = connectivity::spawn_probe(probe_target, probe_interval);

    let mut terminal = ui::setup_terminal()?;
    let mut chat_ui = ChatUI::new(session);

    let result = run_main_loop(&mut chat_ui, &mut terminal, backend, &mut connectivity_rx).await;

    // Restore terminal
    ui::restore_terminal(terminal)?;
    if let Err(e) = &result {
        error!("Chat widget stopped with error: {:#}", e);
    }
    info!("Chat session ended");
    result
}

/// Run the main event loop
async fn run_main_loop(
    chat_ui: &mut ChatUI,
    terminal: &mut ui::Terminal<ui::CrosstermBackend<io::Stdout>>,
    backend: Arc<dyn ChatBackend>,
    connectivity_rx: &mut mpsc::Receiver<bool>,
) -> Result<()> {
    let (reply_tx, mut reply_rx) = mpsc::channel::<ReplyResult>(8);

    loop {
        chat_ui.set_terminal_width(terminal.size()?.width);
        terminal.draw(|f| chat_ui.draw(f))?;
        chat_ui.on_tick();
        chat_ui.clean_notices(4);

        match chat_ui.handle_input()? {
            Some(UiAction::Quit) => break,
            Some(UiAction::Send(ticket)) => {
                let backend = backend.clone();
                let reply_tx = reply_tx.clone();
                tokio::spawn(async move {
                    let result = backend.ask(&ticket.text).await;
                    if reply_tx.send((ticket, result)).await.is_err() {
                        error!("UI loop gone before the reply arrived");
                    }
                });
            }
            None => {}
        }

        // Replies from the backend
        if let Ok((ticket, result)) = reply_rx.try_recv() {
            chat_ui.session.complete_send(ticket, result);
        }

        // Platform connectivity notifications
        if let Ok(online) = connectivity_rx.try_recv() {
            chat_ui.session.on_connectivity(online);
        }

        tokio::task::yield_now().await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with_config(config: PathBuf) -> Args {
        Args {
            endpoint: None,
            config: Some(config),
            log_file: None,
            log_level: LevelFilter::Info,
        }
    }

    #[test]
    fn test_resolve_config_reports_loaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"log_file": "widget.log"}"#).unwrap();

        let (config, loaded_from) = resolve_config(&args_with_config(path.clone())).unwrap();
        assert_eq!(loaded_from, Some(path));
        assert_eq!(config.log_file(), PathBuf::from("widget.log"));
    }

    #[test]
    fn test_resolve_config_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args_with_config(dir.path().join("missing.json"));
        args.log_file = Some(PathBuf::from("cli.log"));

        let (config, loaded_from) = resolve_config(&args).unwrap();
        assert!(loaded_from.is_none());
        assert_eq!(config.log_file(), PathBuf::from("cli.log"));
    }
}
