//! EPUB Translator Web - HTTP API for chunk-by-chunk EPUB translation.

mod helpers;
mod routes;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use epub_translator_core::{AppConfig, BookTranslator};
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "epub-translator-web")]
#[command(author, version, about = "EPUB Translator Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// OpenAI-compatible API base URL of the model server
    #[arg(long, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// API key
    #[arg(long, env = "OPENAI_API_KEY")]
    api_key: Option<String>,

    /// Model name
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Clear translation cache on startup
    #[arg(long)]
    clear_cache: bool,
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .context(format!("Failed to open log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(())
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load().context("Failed to load configuration")?
    };

    if let Some(ref api_base) = args.api_base {
        config.translator.api_base.clone_from(api_base);
    }
    if args.api_key.is_some() {
        config.translator.api_key.clone_from(&args.api_key);
    }
    if let Some(ref model) = args.model {
        config.translator.model.clone_from(model);
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose, args.log_file.as_deref())?;

    let config = load_config(&args)?;

    info!(
        "Using model {} at {} ({:?} mode)",
        config.translator.model, config.translator.api_base, config.translator.mode
    );

    let translator =
        BookTranslator::new(config).context("Failed to initialize translator")?;

    // Clear cache if requested
    if args.clear_cache {
        match translator.clear_cache() {
            Ok(count) => info!("Cleared {} cached translation files", count),
            Err(e) => warn!("Failed to clear cache: {}", e),
        }
    }

    let state = Arc::new(AppState::new(translator));

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
