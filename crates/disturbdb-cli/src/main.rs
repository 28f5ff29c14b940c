//! disturbdb CLI
//!
//! Peer node for the disturbdb distributed data store

mod config;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use disturbdb_core::node::{DispatchContext, Identity, MessageHandler, Node, NodeError};
use disturbdb_core::{Error as CoreError, LogLevel, resolve_address};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use zeroize::Zeroizing;

use config::Config;

/// disturbdb - peer identity and connection management
#[derive(Parser)]
#[command(name = "disturbdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new identity keypair
    Keygen {
        /// Output file for the hex secret key
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a default config file carrying the new secret key
        #[arg(long)]
        write_config: Option<PathBuf>,
    },

    /// Show the peer record for a secret key
    Id {
        /// Hex-encoded secret key
        #[arg(long)]
        secret: String,

        /// Address to advertise in the record
        #[arg(long, default_value = "0.0.0.0:3000")]
        address: SocketAddr,
    },

    /// Run a node until Ctrl+C
    Run {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen address (overrides the config file)
        #[arg(short, long)]
        listen: Option<String>,

        /// Peers to dial on startup (`host:port`)
        #[arg(short, long)]
        dial: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen {
            output,
            write_config,
        } => {
            init_logging(LogLevel::Info);
            generate_keypair(output, write_config)?;
        }
        Commands::Id { secret, address } => {
            init_logging(LogLevel::Info);
            show_id(&secret, address)?;
        }
        Commands::Run {
            config,
            listen,
            dial,
        } => {
            run_node(config, listen, dial).await?;
        }
    }

    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` directives take precedence.
fn init_logging(level: LogLevel) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level.tracing_level()).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .init();
}

/// Logs every inbound message and echoes requests back to the sender
struct EchoHandler;

#[async_trait]
impl MessageHandler for EchoHandler {
    async fn handle(&self, ctx: DispatchContext) -> Result<(), NodeError> {
        ctx.logger().info(
            "message received",
            format_args!("from={} nonce={} len={}", ctx.id(), ctx.nonce(), ctx.data().len()),
        );
        if ctx.is_request() {
            ctx.respond(ctx.data().to_vec()).await?;
        }
        Ok(())
    }
}

/// Generate a new identity keypair
fn generate_keypair(output: Option<PathBuf>, write_config: Option<PathBuf>) -> anyhow::Result<()> {
    let identity: Identity = Identity::generate()?;
    let secret = identity.to_hex_secret();

    println!("Public key: {}", identity.public_key());

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, secret.as_bytes())?;
            println!("Secret key saved to: {}", path.display());
        }
        None => println!("Secret key: {}", secret.as_str()),
    }

    if let Some(path) = write_config {
        let mut config = Config::default();
        config.node.secret_key = Some(secret.to_string());
        config.save(&path)?;
        println!("Config written to: {}", path.display());
    }

    println!("\nKeep the secret key private. Set it as node.secret_key or DISTURBDB_SECRET_KEY.");
    Ok(())
}

/// Print the peer record derived from a secret key
fn show_id(secret: &str, address: SocketAddr) -> anyhow::Result<()> {
    let secret = Zeroizing::new(secret.trim().to_string());
    let identity: Identity = Identity::from_hex_secret(&secret)?;
    println!("{}", identity.peer_id(address).to_json()?);
    Ok(())
}

/// Resolve a dial target; loopback targets are dialed as given.
async fn resolve_dial_target(target: &str) -> anyhow::Result<SocketAddr> {
    match resolve_address(target).await {
        Ok(address) => Ok(address.parse()?),
        Err(CoreError::Unroutable(addr)) => Ok(addr),
        Err(e) => Err(e.into()),
    }
}

/// Run a node until interrupted
async fn run_node(
    config_path: Option<PathBuf>,
    listen: Option<String>,
    dial: Vec<String>,
) -> anyhow::Result<()> {
    let config_path = config_path.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&config_path)?;
    config.apply_env();
    if let Some(listen) = listen {
        config.network.listen_addr = listen;
    }

    let level = config.log_level();
    init_logging(level.clone().unwrap_or_default());
    if let Err(e) = level {
        tracing::warn!("{e}, falling back to {}", LogLevel::Info);
    }

    let node_config = config.to_node_config()?;
    let identity: Identity = match config.node.secret_key.as_deref() {
        Some(secret) => Identity::from_hex_secret(secret)?,
        None => {
            tracing::warn!("No secret key configured, using an ephemeral identity");
            Identity::generate()?
        }
    };

    let node = Node::new(identity, node_config, Arc::new(EchoHandler))?;
    node.start().await?;

    println!("disturbdb node");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Identity: {}", node.local_id().to_json()?);
    if let Some(addr) = node.local_addr() {
        println!("Listening on: {addr}");
    }

    let targets = config.network.bootstrap.iter().chain(dial.iter());
    for target in targets {
        let result = match resolve_dial_target(target).await {
            Ok(addr) => node.dial(addr).await.map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };
        match result {
            Ok(client) => tracing::info!("Connected to {}", client.id()),
            Err(e) => tracing::warn!("Failed to dial {target}: {e}"),
        }
    }

    println!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");

    node.stop().await?;
    Ok(())
}
