//! Command-line interface for pdv-sync
//!
//! # Usage Examples
//!
//! ## Configuration
//! ```bash
//! # Store MySQL connection settings and enable sync
//! pdv-sync configure --enabled true --driver mysql \
//!   --host db.example.com --database pdv --user sync --password secret
//!
//! # Check the stored settings, overriding the host for this run only
//! pdv-sync test-connection --host 10.0.0.5
//! ```
//!
//! ## Syncing
//! ```bash
//! # Single pass
//! pdv-sync run
//!
//! # Timer-driven passes until Ctrl-C (defaults to the stored interval)
//! RUST_LOG=info pdv-sync daemon --interval 10m
//! ```
//!
//! ## Maintenance
//! ```bash
//! # Queue status with the ten latest passes
//! pdv-sync status
//!
//! # Delete queue entries that already reached the remote server
//! pdv-sync purge
//! ```
//!
//! The remote database is a one-way mirror: every pass overwrites remote
//! rows with the local snapshot, so edits made directly on the remote side
//! are lost.

use anyhow::Context;
use change_queue::LocalStore;
use clap::{Parser, Subcommand};
use pdv_sync::config::{parse_interval, ConnectionOverrides};
use pdv_sync::{AutoSyncScheduler, SyncEngine};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use sync_core::{ColumnValue, RemoteSyncConfig, SyncOperation};

#[derive(Parser)]
#[command(name = "pdv-sync")]
#[command(about = "Replicate the local point-of-sale store to a remote MySQL or PostgreSQL database")]
#[command(long_about = None)]
struct Cli {
    /// Path to the local SQLite store
    #[arg(long, global = true, env = "PDV_SYNC_DB", default_value = "pdv.db")]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass now
    Run,

    /// Show pending entries, last sync time and recent passes
    Status {
        /// Number of recent passes to show
        #[arg(long, default_value_t = 10)]
        recent: usize,
    },

    /// Check that the remote server is reachable
    TestConnection {
        #[command(flatten)]
        overrides: ConnectionOverrides,
    },

    /// Create the mirrored tables on the remote server
    InitSchema {
        #[command(flatten)]
        overrides: ConnectionOverrides,
    },

    /// Update the stored replication settings
    Configure {
        /// Turn replication on or off
        #[arg(long)]
        enabled: Option<bool>,

        /// Minutes between automatic passes
        #[arg(long)]
        interval_minutes: Option<u64>,

        #[command(flatten)]
        overrides: ConnectionOverrides,
    },

    /// Capture a mutation by hand
    Enqueue {
        /// Local table name
        #[arg(long)]
        table: String,

        /// insert, update or delete
        #[arg(long)]
        operation: SyncOperation,

        /// Primary key of the affected row
        #[arg(long)]
        record_id: i64,

        /// Row snapshot as a JSON object
        #[arg(long, default_value = "{}")]
        payload: String,
    },

    /// Delete entries that have already been synced
    Purge,

    /// Run passes on a timer until interrupted
    Daemon {
        /// Time between passes, e.g. "300", "5m", "1h" (defaults to the stored interval)
        #[arg(long)]
        interval: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let store = LocalStore::open(&cli.db_path)
        .with_context(|| format!("Failed to open local store at {:?}", cli.db_path))?;
    let engine = Arc::new(SyncEngine::new(Arc::new(store)));

    match cli.command {
        Commands::Run => {
            let result = engine.run_sync().await;
            print_json(&result)?;
            if result.status.is_some() && !result.success {
                anyhow::bail!("Sync pass failed: {}", result.message);
            }
        }
        Commands::Status { recent } => {
            let status = engine.status(recent).context("Failed to read sync status")?;
            print_json(&status)?;
        }
        Commands::TestConnection { overrides } => {
            let config = effective_config(&engine, &overrides)?;
            let result = engine.test_connection(&config).await;
            print_json(&result)?;
            if !result.success {
                anyhow::bail!("Connection test failed: {}", result.message);
            }
        }
        Commands::InitSchema { overrides } => {
            let config = effective_config(&engine, &overrides)?;
            let result = engine.init_remote_schema(&config).await;
            print_json(&result)?;
            if !result.success {
                anyhow::bail!("Schema initialization failed: {}", result.message);
            }
        }
        Commands::Configure {
            enabled,
            interval_minutes,
            overrides,
        } => {
            let mut config = effective_config(&engine, &overrides)?;
            if let Some(enabled) = enabled {
                config.enabled = enabled;
            }
            if let Some(minutes) = interval_minutes {
                if minutes == 0 {
                    anyhow::bail!("--interval-minutes must be at least 1");
                }
                config.interval_minutes = minutes;
            }
            engine
                .store()
                .save_sync_config(&config)
                .context("Failed to save sync settings")?;
            tracing::info!("Saved sync settings for {}", config.driver);
            print_json(&config)?;
        }
        Commands::Enqueue {
            table,
            operation,
            record_id,
            payload,
        } => {
            let snapshot = ColumnValue::decode_snapshot(&payload)
                .context("Payload must be a JSON object of scalar values")?;
            let id = engine
                .store()
                .try_enqueue(&table, operation, record_id, &snapshot)
                .context("Failed to enqueue change")?;
            println!("{id}");
        }
        Commands::Purge => {
            let removed = engine.clear_synced().context("Failed to purge synced entries")?;
            println!("{removed}");
        }
        Commands::Daemon { interval } => {
            let period = match interval {
                Some(raw) => parse_interval(&raw)?,
                None => {
                    let minutes = stored_config(&engine)?.interval_minutes;
                    std::time::Duration::from_secs(minutes.saturating_mul(60))
                }
            };
            run_daemon(engine, period).await?;
        }
    }

    Ok(())
}

async fn run_daemon(engine: Arc<SyncEngine>, period: std::time::Duration) -> anyhow::Result<()> {
    let scheduler = AutoSyncScheduler::new(engine);
    scheduler.start(period)?;
    tracing::info!("Press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    scheduler.stop();
    Ok(())
}

fn stored_config(engine: &SyncEngine) -> anyhow::Result<RemoteSyncConfig> {
    let settings = engine
        .store()
        .sync_settings()
        .context("Failed to read sync settings")?;
    Ok(RemoteSyncConfig::from_settings(&settings)?)
}

fn effective_config(
    engine: &SyncEngine,
    overrides: &ConnectionOverrides,
) -> anyhow::Result<RemoteSyncConfig> {
    let settings = engine
        .store()
        .sync_settings()
        .context("Failed to read sync settings")?;
    overrides.resolve(&settings)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
