//! Experience Chat - Line-Oriented Chat Surface
//!
//! Reads user turns from stdin and prints the conversation to stdout.
//! Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Connect to the default backend
//! experience-chat
//!
//! # Another backend, faster retries
//! experience-chat --url wss://chat.example.com/ws/chat --reconnect-delay-ms 1000
//!
//! # Only check backend health
//! experience-chat --check
//!
//! # Verbose logging
//! RUST_LOG=debug experience-chat
//! ```
//!
//! Type `/clear` to forget the conversation and `/quit` to leave.

mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use experience_client_core::config::{
    default_config_path, load_config_from_path, ClientConfig, ConfigOverrides,
};
use experience_client_core::{
    ClientUpdate, EventEffect, HealthProbe, SendOutcome, SessionClient,
};

use render::Input;

/// Experience Chat - talk to the experience recommendation backend
#[derive(Parser, Debug)]
#[command(name = "experience-chat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket base URL; the session ID is appended
    #[arg(short = 'u', long, value_name = "URL")]
    url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "EXPERIENCE_CHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Delay between a disconnect and the next attempt
    #[arg(long, value_name = "MS")]
    reconnect_delay_ms: Option<u64>,

    /// Connect attempt timeout
    #[arg(long, value_name = "MS")]
    connect_timeout_ms: Option<u64>,

    /// Query the backend health endpoint and exit
    #[arg(long)]
    check: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "EXPERIENCE_CHAT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref url) = self.url {
            overrides = overrides.with_base_url(url.clone());
        }
        if let Some(ms) = self.reconnect_delay_ms {
            overrides = overrides.with_reconnect_delay_ms(ms);
        }
        if let Some(ms) = self.connect_timeout_ms {
            overrides = overrides.with_connect_timeout_ms(ms);
        }
        overrides
    }
}

/// Initialize logging to stderr with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "experience_chat={level},experience_client_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(args: &Args) -> Result<ClientConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;
    info!(source = %config.source(), url = %config.transport.base_url, "Configuration resolved");
    Ok(config)
}

async fn check_health(config: &ClientConfig) -> Result<()> {
    let probe = HealthProbe::new(&config.transport.base_url)?;
    let status = probe
        .check()
        .await
        .with_context(|| format!("Health check against {} failed", probe.url()))?;
    println!(
        "{}: {} ({} active sessions)",
        probe.url(),
        status.status,
        status.active_sessions
    );
    if !status.is_healthy() {
        anyhow::bail!("Backend reports status {:?}", status.status);
    }
    Ok(())
}

/// Print whatever an update changed
fn show(client: &SessionClient, update: &ClientUpdate) {
    match update {
        ClientUpdate::Connection(state) => println!("-- {}", state.description()),
        ClientUpdate::Applied(EventEffect::ToolStatusChanged) => {
            if let Some(activity) = client.session().tool_status() {
                println!("{}", render::tool(activity));
            }
        }
        ClientUpdate::Applied(EventEffect::ExperiencesReplaced(count)) => {
            println!("-- {count} experiencias");
            for experience in client.session().experiences() {
                println!("{}", render::experience(experience));
            }
        }
        ClientUpdate::Applied(EventEffect::MessageAppended(_)) => {
            if let Some(message) = client.session().history().last() {
                println!("{}", render::message(message));
            }
        }
        ClientUpdate::Applied(EventEffect::TurnFailed(e)) => println!("!! {e}"),
        ClientUpdate::Applied(EventEffect::TurnCompleted | EventEffect::Unchanged)
        | ClientUpdate::ProtocolError(_) => {}
    }
}

async fn chat(config: &ClientConfig) -> Result<()> {
    let mut client = SessionClient::start(config);
    println!("session {}", client.session_id());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match render::parse_input(&line) {
                    Input::Quit => break,
                    Input::Clear => {
                        client.clear();
                        println!("-- conversación borrada");
                    }
                    Input::Turn(text) => match client.send_user_turn(&text) {
                        SendOutcome::Sent(_) | SendOutcome::IgnoredBlank => {}
                        SendOutcome::IgnoredNotConnected => {
                            println!("-- sin conexión, mensaje no enviado");
                        }
                    },
                }
            }

            update = client.next_update() => {
                let Some(update) = update else {
                    warn!("Connection manager stopped");
                    break;
                };
                show(&client, &update);
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = resolve_config(&args)?;

    if args.check {
        return check_health(&config).await;
    }

    chat(&config).await
}
