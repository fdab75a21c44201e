//! walkv CLI
//!
//! Drives a store in a local data directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkv::wal;
use walkv::{Config, Store, WalSyncStrategy};

/// walkv
#[derive(Parser, Debug)]
#[command(name = "walkv")]
#[command(about = "Durable key-value store backed by a write-ahead log")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./walkv_data")]
    data_dir: PathBuf,

    /// Force the WAL to disk every N appends (1 = every write)
    #[arg(short, long, default_value = "10")]
    sync_every: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the demo workload in a fresh data directory
    Demo,

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Delete {
        /// The key to delete
        key: String,
    },

    /// Print the number of live keys
    Size,

    /// Snapshot the table and truncate the WAL
    Checkpoint,

    /// Inspect the WAL without modifying it
    Verify,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,walkv=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> walkv::Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .wal_sync_strategy(sync_strategy(args.sync_every))
        .build();

    match args.command {
        Commands::Demo => demo(config),
        Commands::Get { key } => {
            let store = Store::open(config)?;
            match store.get(key.as_bytes()) {
                Some(value) => println!("{}", String::from_utf8_lossy(&value)),
                None => println!("(absent)"),
            }
            store.close()
        }
        Commands::Set { key, value } => {
            let store = Store::open(config)?;
            store.set(key.as_bytes(), value.as_bytes())?;
            store.close()
        }
        Commands::Delete { key } => {
            let store = Store::open(config)?;
            store.delete(key.as_bytes())?;
            store.close()
        }
        Commands::Size => {
            let store = Store::open(config)?;
            println!("{}", store.size());
            store.close()
        }
        Commands::Checkpoint => {
            let store = Store::open(config)?;
            let stats = store.checkpoint()?;
            println!(
                "checkpoint: {} entries, {} snapshot bytes, {} WAL bytes reclaimed",
                stats.entries, stats.snapshot_bytes, stats.wal_bytes_reclaimed
            );
            store.close()
        }
        Commands::Verify => verify(&config.wal_path()),
    }
}

/// `1` syncs every write; anything else (0 included) is passed through so
/// `Config::validate` rejects what the store cannot honor
fn sync_strategy(sync_every: usize) -> WalSyncStrategy {
    match sync_every {
        1 => WalSyncStrategy::EveryWrite,
        count => WalSyncStrategy::EveryNEntries { count },
    }
}

/// Fill a fresh store, checkpoint it, then reopen it from disk
fn demo(config: Config) -> walkv::Result<()> {
    clean_previous_files(&config)?;

    let store = Store::open(config.clone())?;
    for i in 1..=15 {
        let key = format!("key{}", i);
        let value = format!("value{}", i);
        store.set(key.as_bytes(), value.as_bytes())?;
    }
    store.delete(b"key1")?;
    println!("Size after delete: {}", store.size());

    println!("Creating checkpoint...");
    let stats = store.checkpoint()?;
    println!(
        "Checkpoint created: {} entries, WAL truncated ({} bytes reclaimed)",
        stats.entries, stats.wal_bytes_reclaimed
    );
    store.close()?;

    let reopened = Store::open(config)?;
    println!("Size after reopen: {}", reopened.size());
    reopened.close()
}

fn clean_previous_files(config: &Config) -> walkv::Result<()> {
    fs::create_dir_all(&config.data_dir)?;
    for path in [config.wal_path(), config.snapshot_path(), config.snapshot_tmp_path()] {
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn verify(wal_path: &Path) -> walkv::Result<()> {
    let report = wal::verify(wal_path)?;
    println!("frames:          {}", report.frames);
    println!("puts:            {}", report.puts);
    println!("deletes:         {}", report.deletes);
    println!("valid bytes:     {}", report.valid_bytes);
    println!("torn tail bytes: {}", report.torn_tail_bytes);
    Ok(())
}
