#![deny(unsafe_code)]

//! Harbourmaster CLI: runs the proxy and talks to the engine directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use harbourmaster_config::AppConfig;
use harbourmaster_core::translate::TargetQuery;
use harbourmaster_core::{EngineMethod, Payload, Proxy, SocketEndpoint, Translator, UpstreamClient};

/// Harbourmaster: drive a local container engine's Unix-socket API over HTTP.
#[derive(Parser)]
#[command(name = "harbourmaster", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "harbourmaster.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP proxy until Ctrl-C.
    Serve {
        /// Address to listen on (overrides `server.listen_addr`).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides `server.listen_port`).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// Forward a single request to the engine and print the result.
    Call {
        /// GET, POST or DELETE.
        method: EngineMethod,

        /// Engine path and query, e.g. `/containers/json?all=1`.
        suffix: String,

        /// JSON body to send with POST.
        #[arg(long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, found) = load_config(&cli.config).await?;

    // Set up tracing subscriber; -v flags win over the configured level
    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    if !found {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(config, host, port).await?,
        Commands::Config { show } => cmd_config(&cli.config, &config, show)?,
        Commands::Call {
            method,
            suffix,
            body,
        } => cmd_call(&config, method, suffix, body).await?,
    }

    Ok(())
}

async fn cmd_serve(config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = apply_overrides(config, host, port)?;
    info!("Starting Harbourmaster proxy");

    let proxy = Proxy::new(config);
    proxy.run().await?;

    Ok(())
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to render config")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

async fn cmd_call(
    config: &AppConfig,
    method: EngineMethod,
    suffix: String,
    body: Option<String>,
) -> Result<()> {
    let translator = Translator::new(Arc::new(SocketEndpoint::new(&config.engine.socket_path)));
    let query = TargetQuery { url: Some(suffix) };
    let request = translator.translate(method, Some(query), body.unwrap_or_default().into())?;
    let address = translator.compose(&request);

    let payload = UpstreamClient::unix()
        .forward(request.method, &address, request.body)
        .await
        .with_context(|| format!("{method} {address}"))?;

    println!("{}", render(&payload)?);
    Ok(())
}

fn render(payload: &Payload) -> Result<String> {
    Ok(match payload {
        Payload::Content(value) => serde_json::to_string_pretty(value)?,
        Payload::NoContent => "(no content)".to_string(),
    })
}

fn apply_overrides(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<AppConfig> {
    if let Some(host) = host {
        config.server.listen_addr = host;
    }
    if let Some(port) = port {
        config.server.listen_port = port;
    }
    config.validate()?;
    Ok(config)
}

async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if path.exists() {
        let config = AppConfig::load(path)
            .await
            .with_context(|| format!("invalid config at {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}
