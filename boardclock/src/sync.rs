//! boardclock-sync - CLI tool to mirror Trello boards into the local cache
//!
//! Fetches boards, lists, cards and the team from the tracker and stores
//! them in the boardclock database, where reports select their tasks from.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/boardclock/data.db (~/.local/share/boardclock/data.db)
//! - Logs: $XDG_STATE_HOME/boardclock/boardclock-sync.log (~/.local/state/boardclock/boardclock-sync.log)
//! - Config: $XDG_CONFIG_HOME/boardclock/config.toml (~/.config/boardclock/config.toml)

mod process_lock;

use anyhow::{Context, Result};
use boardclock_core::sync::CacheSync;
use boardclock_core::tracker::BlockingTracker;
use boardclock_core::{Config, Database, SyncResult};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use process_lock::acquire_sync_guard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "boardclock-sync")]
#[command(about = "Sync Trello boards into the local cache")]
#[command(version)]
struct Args {
    /// Verbose output (-v lists every board)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Watch mode - continuously sync instead of one-shot
    #[arg(short, long)]
    watch: bool,

    /// Seconds between syncs (only with --watch; defaults to sync.interval_secs)
    #[arg(long)]
    interval: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let log_guard = boardclock_core::logging::init(&config.logging, "boardclock-sync")
        .context("failed to initialize logging")?;

    tracing::info!("boardclock-sync starting");

    config
        .tracker
        .validate()
        .context("tracker is not configured")?;

    // Resolve database path and enforce process-level exclusivity for it.
    let db_path = Config::database_path();
    let _sync_guard = acquire_sync_guard(&db_path).context("failed to acquire process lock")?;

    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    println!("Database: {}", db_path.display());
    println!("Log:      {}", log_guard.path().display());

    let tracker = BlockingTracker::new(&config.tracker).context("failed to create tracker client")?;
    let sync = CacheSync::new(&db, &tracker);

    if args.watch {
        let interval = args.interval.unwrap_or(config.sync.interval_secs).max(1);
        run_watch_mode(&sync, &args, Duration::from_secs(interval))
    } else {
        run_single_sync(&sync, &args)
    }
}

/// Run a single sync operation with progress bar
fn run_single_sync(sync: &CacheSync<'_>, args: &Args) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let result = sync
        .sync_all_with_progress(|current, total, board| {
            if current == 0 {
                pb.set_length(total as u64);
            }
            pb.set_position(current as u64);
            pb.set_message(board.name.clone());
        })
        .context("sync failed")?;

    pb.finish_and_clear();

    print_sync_result(&result, args.verbose);

    tracing::info!(
        boards_added = result.boards_added,
        boards_updated = result.boards_updated,
        "boardclock-sync complete"
    );

    Ok(())
}

/// Run continuous watch mode
fn run_watch_mode(sync: &CacheSync<'_>, args: &Args, interval: Duration) -> Result<()> {
    // Set up signal handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    println!(
        "Watch mode active (sync every {}s). Press Ctrl+C to stop.",
        interval.as_secs()
    );
    println!();

    let mut iteration = 0u64;

    while running.load(Ordering::SeqCst) {
        iteration += 1;

        // A failed round is reported and retried on the next tick
        match sync.sync_all() {
            Ok(result) => {
                let changed = result.boards_added + result.boards_updated + result.boards_removed;
                if changed > 0 || !result.errors.is_empty() {
                    let timestamp = chrono::Local::now().format("%H:%M:%S");
                    println!(
                        "[{}] Synced: {} added, {} updated, {} removed, {} errors",
                        timestamp,
                        result.boards_added,
                        result.boards_updated,
                        result.boards_removed,
                        result.errors.len()
                    );
                    if args.verbose >= 1 {
                        for (board, err) in &result.errors {
                            println!("  {}: {}", board, err);
                        }
                    }
                }

                tracing::info!(iteration, changed, "watch sync iteration");
            }
            Err(e) => {
                eprintln!("Sync failed: {}", e);
                tracing::warn!(iteration, error = %e, "watch sync iteration failed");
            }
        }

        // Sleep until next tick, waking early on Ctrl+C
        let deadline = Instant::now() + interval;
        while running.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(200));
        }
    }

    println!("Watch mode stopped.");
    tracing::info!("boardclock-sync watch mode stopped");

    Ok(())
}

/// Print sync result summary
fn print_sync_result(result: &SyncResult, verbose: u8) {
    println!("\nSync complete:");
    println!("  Boards added:   {}", result.boards_added);
    println!("  Boards updated: {}", result.boards_updated);
    println!("  Boards skipped: {}", result.boards_skipped);
    println!("  Boards removed: {}", result.boards_removed);
    println!("  Tasks stored:   {}", result.tasks_stored);
    println!("  People synced:  {}", result.persons_synced);

    if !result.errors.is_empty() {
        println!("\nErrors ({}):", result.errors.len());
        for (board, err) in &result.errors {
            println!("  {}: {}", board, err);
        }
    } else if verbose >= 1 {
        println!("\nNo errors.");
    }
}
