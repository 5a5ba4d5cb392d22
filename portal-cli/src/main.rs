use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Password;
use portal_client::{ClientConfig, Portal};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser)]
#[command(name = "portal", version, about = "Send commands to Hubs rooms")]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a room, send one event and leave
    Send {
        #[arg(long)]
        server: Url,

        #[arg(long)]
        room: String,

        #[arg(long)]
        event: String,

        /// JSON payload of the event
        #[arg(long, default_value = "{}")]
        payload: String,

        /// Display name of the participant
        #[arg(long, default_value = "portal-agent")]
        name: String,

        #[arg(long, env = "PORTAL_AUTH_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Open, join and leave timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Resolve the socket endpoint, open the socket and close it again
    Probe {
        #[arg(long)]
        server: Url,

        #[arg(long, env = "PORTAL_AUTH_TOKEN", hide_env_values = true, default_value = "")]
        token: String,

        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("portal_client={},warn", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Send {
            server,
            room,
            event,
            payload,
            name,
            token,
            timeout,
        } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("--payload is not valid JSON")?;
            let token = match token {
                Some(token) => token,
                None => Password::new()
                    .with_prompt("Auth token")
                    .interact()
                    .context("Failed to read auth token")?,
            };
            let config = client_config(timeout).with_display_name(name);

            println!(
                "{}",
                format!("📡 Sending {event} to room {room} on {server}...").cyan()
            );
            Portal::new(config)
                .send_message(&server, &token, &room, &event, payload)
                .await
                .with_context(|| format!("Failed to send {event} to room {room}"))?;
            println!("{}", "✨ Message sent".green().bold());
        }
        Commands::Probe {
            server,
            token,
            timeout,
        } => {
            println!("{}", format!("📡 Probing {server}...").cyan());
            let portal = Portal::new(client_config(timeout));
            let mut connection = portal
                .connect(&server, &token)
                .await
                .with_context(|| format!("Failed to connect to {server}"))?;

            let metadata = connection.metadata().clone();
            debug!("Socket state before close: {}", connection.state());
            connection.close();

            println!("{}", "✨ Socket opened and closed".green().bold());
            println!("   version:  {}", metadata.version);
            println!("   pool:     {}", metadata.pool);
            println!("   phx_host: {}", metadata.socket_host);
            println!(
                "   phx_port: {}",
                metadata.socket_port.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}

fn client_config(timeout: Option<u64>) -> ClientConfig {
    let config = ClientConfig::default();
    match timeout {
        Some(secs) => config.with_timeout(Duration::from_secs(secs)),
        None => config,
    }
}
