//! Attract Player - Main entry point
//!
//! Runs the presence-triggered player headless: sensor frames and operator
//! commands arrive as JSON lines (stdin or a file), player events leave as
//! JSON lines on stdout, logs go to stderr and optionally a log file.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use attract_common::config::{resolve_config_path, LoggingConfig, CONFIG_ENV_VAR};
use attract_common::events::{EventBus, PlayerEvent};
use attract_player::config::{Config, ConfigOverrides};
use attract_player::playback::HeadlessMedia;
use attract_player::runtime;
use attract_player::Session;
use clap::Parser;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::signal;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for attract-player
#[derive(Parser, Debug)]
#[command(name = "attract-player")]
#[command(about = "Presence-triggered media player")]
#[command(version)]
struct Args {
    /// Config file (falls back to $ATTRACT_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Video to open at startup
    #[arg(short, long, env = "ATTRACT_MEDIA")]
    media: Option<PathBuf>,

    /// Debounce window length in frames
    #[arg(short, long)]
    buffer_len: Option<usize>,

    /// Start delay in seconds (0-5)
    #[arg(short = 'd', long)]
    play_delay: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ATTRACT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Read input lines from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let overrides = ConfigOverrides {
        media_path: args.media,
        buffer_len: args.buffer_len,
        play_delay_secs: args.play_delay,
        log_level: args.log_level,
        log_file: args.log_file,
    };
    let config = Config::load(config_path.as_deref(), overrides)
        .context("Failed to load configuration")?;

    init_tracing(&config.logging)?;

    info!("Starting attract-player v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file, using built-in defaults"),
    }
    info!(
        "Detection: range {:.2}m, bufLen={}, playDelay={}s, demo {}",
        config.session.range_threshold,
        config.session.buffer_len,
        config.session.play_delay_secs,
        if config.session.demo_on_start { "on" } else { "off" }
    );

    let events = EventBus::new(config.event_capacity);
    let printer = tokio::spawn(print_events(events.subscribe()));

    let mut session = Session::new(
        HeadlessMedia::new(),
        events,
        config.session.clone(),
        config.controller,
    );

    if let Some(path) = &config.media_path {
        session
            .open_media(path)
            .with_context(|| format!("Failed to open media {}", path.display()))?;
    } else {
        warn!("No media configured; playback commands are ignored until one is opened");
    }
    if let Some(path) = &config.image_path {
        session.set_image(path.clone());
    }

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let summary = runtime::run(&mut session, input, shutdown_signal())
        .await
        .context("Event loop failed")?;

    // Dropping the session closes the bus; the printer drains and exits
    drop(session);
    printer.await.context("Event printer panicked")?;

    info!(
        "Shutdown complete ({:?}, {} frames)",
        summary.exit, summary.frames
    );
    Ok(())
}

/// Console layer on stderr, plus a plain-text file layer when configured
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "attract_player={0},attract_common={0}",
            logging.level
        )
        .into()
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

/// Write every player event to stdout as one JSON line
async fn print_events(mut rx: broadcast::Receiver<PlayerEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => println!("{}", json),
                Err(e) => warn!("Failed to serialize event: {}", e),
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event output lagged, {} events dropped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
