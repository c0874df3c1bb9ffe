//! boardclock-calendar - show or change the working calendar
//!
//! Changes are validated before they are stored; a rejected change leaves
//! the stored calendar untouched.

use anyhow::{Context, Result};
use boardclock_core::format::{format_duration, format_time_of_day, parse_time_of_day};
use boardclock_core::{CalendarHandle, Config, Database, WorkCalendar};
use clap::Parser;

#[derive(Parser)]
#[command(name = "boardclock-calendar")]
#[command(about = "Show or change the working calendar used by reports")]
#[command(version)]
struct Args {
    /// Work day start and end (HH:MM[:SS])
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    work_hours: Option<Vec<String>>,

    /// Lunch break start and end (HH:MM[:SS])
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    lunch_hours: Option<Vec<String>>,

    /// Number of work days per week, counted from Monday (1-7)
    #[arg(long)]
    work_days: Option<u8>,
}

impl Args {
    fn has_changes(&self) -> bool {
        self.work_hours.is_some() || self.lunch_hours.is_some() || self.work_days.is_some()
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard = boardclock_core::logging::init(&config.logging, "boardclock-calendar")
        .context("failed to initialize logging")?;

    let db = Database::open(&Config::database_path()).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let seed = match db.load_calendar().context("failed to read calendar")? {
        Some(calendar) => calendar,
        None => config
            .calendar
            .to_calendar()
            .context("invalid [calendar] configuration")?,
    };
    let handle = CalendarHandle::new(seed);

    if args.has_changes() {
        let work_hours = args.work_hours.as_deref().map(time_pair).transpose()?;
        let lunch_hours = args.lunch_hours.as_deref().map(time_pair).transpose()?;

        let calendar = handle
            .update(|cal| {
                if let Some((start, end)) = work_hours {
                    cal.set_work_hours(start, end)?;
                }
                if let Some((start, end)) = lunch_hours {
                    cal.set_lunch_hours(start, end)?;
                }
                if let Some(days) = args.work_days {
                    cal.set_work_days_per_week(days)?;
                }
                Ok(())
            })
            .context("calendar change rejected")?;

        db.save_calendar(&calendar)
            .context("failed to store calendar")?;
        tracing::info!("calendar saved");
    }

    print_calendar(&handle.snapshot());
    Ok(())
}

fn time_pair(values: &[String]) -> Result<(chrono::NaiveTime, chrono::NaiveTime)> {
    match values {
        [start, end] => Ok((
            parse_time_of_day(start).context("invalid start time")?,
            parse_time_of_day(end).context("invalid end time")?,
        )),
        _ => anyhow::bail!("expected START and END"),
    }
}

fn print_calendar(calendar: &WorkCalendar) {
    println!(
        "Work day:       {} - {}",
        format_time_of_day(calendar.work_day_start()),
        format_time_of_day(calendar.work_day_end())
    );
    println!(
        "Lunch:          {} - {}",
        format_time_of_day(calendar.lunch_start()),
        format_time_of_day(calendar.lunch_end())
    );
    println!("Work days/week: {}", calendar.work_days_per_week());
    println!();
    println!("Lunch duration: {}", format_duration(calendar.lunch_duration()));
    println!(
        "Daily work:     {}",
        format_duration(calendar.daily_work_duration())
    );
    println!(
        "Weekly work:    {}",
        format_duration(calendar.weekly_work_duration())
    );
}
