//! boardclock-report - business-time report for one board
//!
//! Selects cached tasks of the chosen people, fetches each task's moves from
//! the tracker and prints how much working time it spent in each stage.
//! The finished report replaces the board's stored report.
//!
//! Run `boardclock-sync` first; the board, its stages and its people come
//! from the local cache.

use anyhow::{Context, Result};
use boardclock_core::accounting::ReportDateRange;
use boardclock_core::format::{format_duration, parse_local_datetime};
use boardclock_core::report::ReportSink;
use boardclock_core::tracker::BlockingTracker;
use boardclock_core::{Board, Config, Database, Report, ReportBuilder, ReportRequest};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "boardclock-report")]
#[command(about = "Report business time spent per stage on a Trello board")]
#[command(version)]
struct Args {
    /// Board ID or name
    #[arg(short, long)]
    board: Option<String>,

    /// Stage (list) ID or name; repeat for several. Defaults to all stages
    #[arg(short, long)]
    stage: Vec<String>,

    /// Person ID, username or full name; repeat for several. Defaults to
    /// everyone assigned on the board
    #[arg(short, long)]
    person: Vec<String>,

    /// Window start, local time (YYYY-MM-DD [HH:MM[:SS]])
    #[arg(long, requires = "to")]
    from: Option<String>,

    /// Window end, local time (YYYY-MM-DD [HH:MM[:SS]])
    #[arg(long, requires = "from")]
    to: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// List cached boards, or the stages and people of --board
    #[arg(short, long)]
    list: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard = boardclock_core::logging::init(&config.logging, "boardclock-report")
        .context("failed to initialize logging")?;

    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let board = match &args.board {
        Some(key) => Some(
            db.find_board(key)
                .context("failed to look up board")?
                .with_context(|| format!("board not found in cache: {key} (run boardclock-sync)"))?,
        ),
        None => None,
    };

    if args.list {
        return match board {
            Some(board) => print_overview(&db, &board),
            None => print_boards(&db),
        };
    }

    let board = board.context("--board is required unless --list is given")?;
    let request = build_request(&db, &board, &args)?;

    let calendar = match db.load_calendar().context("failed to read calendar")? {
        Some(calendar) => calendar,
        None => config
            .calendar
            .to_calendar()
            .context("invalid [calendar] configuration")?,
    };
    let tz = config.calendar.timezone().context("invalid calendar timezone")?;

    config
        .tracker
        .validate()
        .context("tracker is not configured")?;
    let tracker = BlockingTracker::new(&config.tracker).context("failed to create tracker client")?;

    tracing::info!(
        board = %board.id,
        stages = request.stage_ids.len(),
        persons = request.person_ids.len(),
        "boardclock-report starting"
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let builder = ReportBuilder::new(Arc::new(calendar), tz, &db, &tracker);
    let report = builder
        .build_with_progress(&request, chrono::Utc::now(), |current, total, candidate| {
            if current == 0 {
                pb.set_length(total as u64);
            }
            pb.set_position(current as u64);
            pb.set_message(candidate.task_name.clone());
        })
        .context("failed to build report")?;
    pb.finish_and_clear();

    db.replace_report(&request, &report)
        .context("failed to store report")?;

    match args.format {
        OutputFormat::Text => print_report(&board, &report),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
            println!("{json}");
        }
    }

    tracing::info!(
        rows = report.rows.len(),
        skipped = report.skipped.len(),
        "boardclock-report complete"
    );

    Ok(())
}

/// Resolve stage and person arguments against the cache.
fn build_request(db: &Database, board: &Board, args: &Args) -> Result<ReportRequest> {
    let stages = db.list_stages(&board.id).context("failed to list stages")?;

    let stage_ids = if args.stage.is_empty() {
        stages.iter().map(|s| s.id.clone()).collect()
    } else {
        args.stage
            .iter()
            .map(|key| {
                stages
                    .iter()
                    .find(|s| s.id == *key || s.name == *key)
                    .map(|s| s.id.clone())
                    .with_context(|| format!("no stage {key:?} on board {}", board.name))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let person_ids = if args.person.is_empty() {
        db.board_overview(&board.id)
            .context("failed to list board people")?
            .people
            .into_iter()
            .map(|p| p.id)
            .collect()
    } else {
        args.person
            .iter()
            .map(|key| {
                db.find_person(key)
                    .context("failed to look up person")?
                    .map(|p| p.id)
                    .with_context(|| format!("person not found in cache: {key}"))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let range = match (&args.from, &args.to) {
        (Some(from), Some(to)) => {
            let start = parse_local_datetime(from).context("invalid --from")?;
            let end = parse_local_datetime(to).context("invalid --to")?;
            Some(ReportDateRange::new(start, end).context("invalid report window")?)
        }
        _ => None,
    };

    Ok(ReportRequest {
        board_id: board.id.clone(),
        stage_ids,
        person_ids,
        range,
    })
}

fn print_boards(db: &Database) -> Result<()> {
    let boards = db.list_boards().context("failed to list boards")?;
    if boards.is_empty() {
        println!("No boards cached. Run boardclock-sync first.");
        return Ok(());
    }

    println!("{:<26} NAME", "ID");
    for board in boards {
        println!("{:<26} {}", board.id, board.name);
    }
    Ok(())
}

fn print_overview(db: &Database, board: &Board) -> Result<()> {
    let overview = db
        .board_overview(&board.id)
        .context("failed to load board overview")?;

    println!("Board: {} ({})", board.name, board.id);

    println!("\nStages:");
    for (stage, open) in &overview.stages {
        println!("  {:<30} {:>4} open", stage.name, open);
    }

    println!("\nPeople:");
    for person in &overview.people {
        let status = person.status.as_deref().unwrap_or("-");
        println!("  {} (@{}) [{}]", person.full_name, person.username, status);
        for (stage, _) in &overview.stages {
            let active = db
                .active_task_count(&person.id, &stage.name)
                .context("failed to count active tasks")?;
            if active > 0 {
                println!("      {:<26} {:>4}", stage.name, active);
            }
        }
    }
    Ok(())
}

fn print_report(board: &Board, report: &Report) {
    println!("Board: {}", board.name);
    println!("Tasks examined: {}", report.tasks_examined);

    if report.rows.is_empty() {
        println!("\nNo time recorded.");
    } else {
        println!();
        println!("{:<24} {:<40} {:<20} {:>10}", "PERSON", "TASK", "STAGE", "TIME");
        for row in &report.rows {
            println!(
                "{:<24} {:<40} {:<20} {:>10}",
                truncate(&row.person_name, 24),
                truncate(&row.task_name, 40),
                truncate(&row.stage_name, 20),
                format_duration(row.duration)
            );
        }
        println!("\nTotal: {}", format_duration(report.total()));
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped ({}):", report.skipped.len());
        for skipped in &report.skipped {
            println!("  {}: {}", skipped.task_name, skipped.reason);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}
