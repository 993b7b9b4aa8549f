//! polycache - command line front end
//!
//! Runs one cache command against the selected backend. With the file
//! backend, state persists between invocations.
//!
//! ```text
//! polycache [--backend <name>] [--config <json>] put <key> <value> [ttl-secs]
//! polycache get <key>
//! polycache mget <key>...
//! polycache del <key>
//! ```

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use polycache::{AppConfig, Cache, CacheError, CacheRegistry, Ttl};

#[derive(Debug, Parser)]
#[command(name = "polycache", version, about = "Pluggable key-value cache")]
struct Cli {
    /// Registered backend to use (memory, file)
    #[arg(long, global = true, env = "CACHE_BACKEND", default_value = "memory")]
    backend: String,

    /// JSON object handed to the backend, e.g. {"CachePath": "/var/cache/app"}
    #[arg(long, global = true, env = "CACHE_CONFIG", default_value = "{}")]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a value
    Put {
        key: String,
        value: String,
        /// Lifetime in seconds; the backend default when omitted
        ttl: Option<u64>,
    },
    /// Read one value
    Get { key: String },
    /// Read several values in order
    Mget {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Remove a value
    Del { key: String },
}

/// Main entry point for the polycache CLI.
///
/// # Startup Sequence
/// 1. Parse arguments
/// 2. Initialize tracing subscriber for logging
/// 3. Create and start the configured backend through the registry
/// 4. Run the requested command
/// 5. Stop the backend's background work
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polycache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::new(&cli.backend, &cli.config).context("loading configuration")?;
    info!("Configuration loaded: backend={}", config.backend);

    let registry = CacheRegistry::with_builtin();
    let cache = registry
        .create(&config.backend, &config.backend_config)
        .await
        .with_context(|| format!("starting cache backend {}", config.backend))?;

    let outcome = run(cache.as_ref(), cli.cmd).await;

    cache.stop().await;
    outcome
}

async fn run(cache: &dyn Cache, cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Put { key, value, ttl } => {
            let ttl = ttl.map_or(Ttl::Default, |secs| Duration::from_secs(secs).into());
            cache.put(&key, value.into_bytes(), ttl).await?;
            println!("OK");
        }
        Command::Get { key } => match cache.get(&key).await {
            Ok(value) => println!("{}", String::from_utf8_lossy(&value)),
            Err(e @ (CacheError::NotFound(_) | CacheError::Expired(_))) => {
                println!("(nil) {}", e)
            }
            Err(e) => return Err(e.into()),
        },
        Command::Mget { keys } => {
            let result = cache.get_multi(&keys).await;
            for (key, value) in keys.iter().zip(&result.values) {
                match value {
                    Some(value) => println!("{} = {}", key, String::from_utf8_lossy(value)),
                    None => println!("{} = (nil)", key),
                }
            }
            if let Some(e) = result.error {
                eprintln!("{}", e);
            }
        }
        Command::Del { key } => {
            cache.delete(&key).await?;
            println!("OK");
        }
    }
    Ok(())
}
