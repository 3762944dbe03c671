//! zap-server - command server for chat-client automation sessions.
//!
//! Listens on `<host> <port>` (default `0.0.0.0:8777`) and routes each
//! command line to the session owned by its token. `--mock` swaps the
//! browser-driven adapters for canned ones.

use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zap_server::{
    adapter::{AdapterKind, AdapterOptions},
    auth,
    config::{ConfigError, Settings},
    server::{self, ServerConfig},
    session::SessionManager,
};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8777;

/// zap-server
///
/// Accepts `token||Command||arg||...` lines over an authenticated TCP
/// connection and answers each with one result.
#[derive(Parser, Debug)]
#[command(name = "zap-server", version, about, long_about = None)]
struct Cli {
    /// Address to bind (requires PORT)
    #[arg(requires = "port")]
    host: Option<String>,

    /// Port to bind
    port: Option<u16>,

    /// Use the mock adapter family instead of the browser driver
    #[arg(long)]
    mock: bool,

    /// Show the browser window instead of running headless
    #[arg(long)]
    no_headless: bool,

    /// Shared secret clients must prove before sending commands (generated
    /// and printed on stderr when unset)
    #[arg(long, env = "ZAP_AUTH_KEY")]
    auth_key: Option<String>,

    /// Path to a TOML settings file
    #[arg(long, env = "ZAP_CONFIG")]
    config: Option<PathBuf>,

    /// Close sessions idle for this many seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    idle_timeout: Option<u64>,
}

impl Cli {
    /// Reject invocations with no address and no adapter flag.
    fn validate(&self) {
        if self.host.is_none() && !self.mock && !self.no_headless {
            Cli::command()
                .error(
                    clap::error::ErrorKind::MissingRequiredArgument,
                    "expected <HOST> <PORT>, --mock, or --no-headless",
                )
                .exit();
        }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let cli = Cli::parse();
    cli.validate();
    init_tracing();

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    run_server(cli, settings).await
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "zap_server=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run_server(cli: Cli, settings: Settings) -> Result<(), ServerError> {
    tracing::info!("zap server starting");

    let host = cli.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = cli.port.unwrap_or(DEFAULT_PORT);
    let listener = server::bind((host.as_str(), port)).await?;

    let auth_key = auth::resolve_auth_key(cli.auth_key.or(settings.auth_key.clone()));

    let kind = if cli.mock {
        AdapterKind::Mock
    } else {
        AdapterKind::Browser
    };
    let options = AdapterOptions {
        headless: !cli.no_headless,
        ..AdapterOptions::default()
    };
    let manager = Arc::new(SessionManager::new(kind.factory(), options));

    let idle_timeout = match cli.idle_timeout {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => settings.idle_timeout(),
    };
    let config = ServerConfig {
        max_frame_bytes: settings.max_frame_bytes(),
        idle_timeout,
        ..ServerConfig::new(auth_key)
    };

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl+C");
            shutdown.cancel();
        }
    });

    server::serve(listener, manager, config, cancel).await?;
    Ok(())
}
