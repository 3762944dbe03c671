//! zap-client - send command lines to a zap-server.
//!
//! Commands come from the arguments, or from stdin one per line when no
//! arguments are given. Each reply is printed on its own line.

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zap_server::client::Client;

#[derive(Parser, Debug)]
#[command(name = "zap-client", version, about, long_about = None)]
struct Cli {
    /// Server address
    #[arg(long, default_value = "127.0.0.1:8777")]
    addr: String,

    /// Shared secret printed or configured on the server
    #[arg(long, env = "ZAP_AUTH_KEY")]
    auth_key: String,

    /// Command lines (`token||Command||arg...`); read from stdin if omitted
    commands: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries replies only.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "zap_server=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut client = Client::connect(cli.addr.as_str(), &cli.auth_key)
        .await
        .with_context(|| format!("failed to connect to {}", cli.addr))?;
    tracing::debug!(server = %client.server().server, version = %client.server().version, "connected");

    if !cli.commands.is_empty() {
        for line in &cli.commands {
            let reply = client.send_command(line).await?;
            println!("{}", reply);
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let reply = client
            .send_command(line)
            .await
            .context("server closed the connection")?;
        println!("{}", reply);
    }
    Ok(())
}
