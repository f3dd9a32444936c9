mod config;
mod error;
mod models;
mod report;
mod scheduler;
mod session;
mod stats;
mod storage;
mod timer;
mod tracker;
mod tui;
mod utils;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use fd_lock::RwLock;
use models::ScheduleStatus;
use report::{print_scheduled, Reporter};
use scheduler::Scheduler;
use session::{FocusSession, Outcome};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use storage::Storage;
use tracker::Tracker;

#[derive(Parser)]
#[command(name = "fokus")]
#[command(about = "A focus timer that keeps your history, streaks and planned sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a focus session
    Start {
        /// Session length (e.g. 25, 25m, 1h30m)
        #[arg(short, long)]
        duration: Option<String>,
        /// Print the countdown as plain lines instead of the full-screen view
        #[arg(long)]
        plain: bool,
    },
    /// List recorded sessions, most recent first
    History {
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// Only show the focus total for one day (YYYY-MM-DD)
        #[arg(long, conflicts_with = "json")]
        date: Option<String>,
    },
    /// Recompute and show the current streak
    Streak {
        /// Number of weeks to show in the calendar
        #[arg(short, long, default_value_t = 4)]
        weeks: u32,
        /// Forget all focus days before recomputing (sessions are kept)
        #[arg(long)]
        reset_markers: bool,
    },
    /// Summary of this week
    Report,
    /// Plan future sessions
    #[command(subcommand)]
    Schedule(ScheduleCommand),
}

#[derive(Subcommand)]
enum ScheduleCommand {
    /// Plan a session (YYYY-MM-DDTHH:MM, local time)
    Add {
        at: String,
        /// Session length (e.g. 25, 50m)
        #[arg(short, long)]
        duration: Option<String>,
        #[arg(short, long, default_value = "")]
        notes: String,
    },
    /// Pending sessions for a day (default: today)
    List {
        #[arg(long)]
        date: Option<String>,
    },
    /// All pending sessions from now on
    Upcoming,
    /// Delete a planned session
    Cancel { id: i64 },
    /// Change the status of a planned session
    Status {
        id: i64,
        #[arg(value_enum)]
        status: ScheduleStatus,
    },
    /// Show sessions starting soon and mark them as notified
    Remind,
    /// Mark pending sessions whose time has passed as missed
    Sweep,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the full-screen view clean unless RUST_LOG asks otherwise.
    let default_level = match &cli.command {
        Commands::Start { plain: false, .. } => log::LevelFilter::Warn,
        _ => log::LevelFilter::Info,
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let config = config::load_config()?;
    let storage = Storage::new()?;
    log::debug!("Using store at {}", storage.path().display());
    let tracker = Tracker::new(storage.clone(), config.min_session_secs)?;
    let scheduler = Scheduler::new(storage)?;

    match cli.command {
        Commands::Start { duration, plain } => {
            let planned = match duration {
                Some(raw) => utils::parse_span(&raw)?,
                None => utils::minutes_to_duration(config.default_duration_mins)?,
            };
            if planned.is_zero() {
                anyhow::bail!("duration must be greater than zero");
            }

            let base_dir = Storage::get_base_dir()?;
            let lock_file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(base_dir.join("fokus.lock"))?;

            let mut lock = RwLock::new(lock_file);
            let _guard = lock.try_write().map_err(|_| {
                anyhow::anyhow!("Another fokus session is already running. Stop it before starting a new one.")
            })?;

            let dashboard = if plain {
                None
            } else {
                let history = tracker.history_summary()?;
                Some(tui::Dashboard {
                    stats: stats::calculate_stats(&history.sessions, Local::now().date_naive()),
                    streak: tracker.streak_info()?,
                    upcoming: scheduler.upcoming_pending(Local::now().naive_local())?,
                })
            };

            let session = FocusSession::begin(planned)?;
            let (outcome, recorded) = session.run_then_finish(&tracker, |session| match &dashboard {
                Some(dashboard) => tui::run_tui(session, dashboard),
                None => run_plain(session),
            })?;
            match outcome {
                Outcome::Completed => println!("\nTime's up!"),
                Outcome::Stopped => println!("\nSession stopped."),
            }
            match recorded {
                Some(s) => println!(
                    "Recorded {} of focus.",
                    utils::format_minutes(s.duration_minutes)
                ),
                None => println!(
                    "Session shorter than {}s, not recorded.",
                    config.min_session_secs
                ),
            }
            tracker.refresh_streak()?;
            println!();
            Reporter::new(&tracker, &scheduler).report()?;
        }
        Commands::History { json, date } => {
            if let Some(raw) = date {
                Reporter::new(&tracker, &scheduler).day(utils::parse_date(&raw)?)?;
            } else if json {
                let history = tracker.history_summary()?;
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                Reporter::new(&tracker, &scheduler).history()?;
            }
        }
        Commands::Streak {
            weeks,
            reset_markers,
        } => {
            if reset_markers {
                tracker.storage.clear_focus_dates()?;
            }
            Reporter::new(&tracker, &scheduler).streak(weeks.max(1))?;
        }
        Commands::Report => {
            Reporter::new(&tracker, &scheduler).report()?;
        }
        Commands::Schedule(command) => run_schedule(command, &scheduler, &config)?,
    }

    Ok(())
}

fn run_plain(session: &mut FocusSession) -> Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    println!("Focus mode on. Press Ctrl-C to stop early.");
    let mut stdout = std::io::stdout();
    loop {
        if interrupted.load(Ordering::SeqCst) {
            session.stop();
        }
        if session.wait(StdDuration::from_millis(200)).is_some() {
            break;
        }
        write!(
            stdout,
            "\rTime left: {:02}:{:02}",
            session.minutes_left, session.seconds_left
        )?;
        stdout.flush()?;
    }
    Ok(())
}

fn run_schedule(command: ScheduleCommand, scheduler: &Scheduler, config: &config::Config) -> Result<()> {
    match command {
        ScheduleCommand::Add {
            at,
            duration,
            notes,
        } => {
            let at = utils::parse_local_datetime(&at)?;
            let minutes = match duration {
                Some(raw) => utils::parse_span(&raw)?.as_secs() / 60,
                None => config.default_duration_mins,
            };
            let minutes = u32::try_from(minutes).context("duration is too long")?;
            let id = scheduler.schedule(at, minutes, &notes)?;
            println!("Scheduled session #{} at {}", id, at.format("%Y-%m-%d %H:%M"));
        }
        ScheduleCommand::List { date } => {
            let date: NaiveDate = match date {
                Some(raw) => utils::parse_date(&raw)?,
                None => Local::now().date_naive(),
            };
            let planned = scheduler.for_date(date)?;
            if planned.is_empty() {
                println!("Nothing planned for {}.", date);
            } else {
                print_scheduled(&planned);
            }
        }
        ScheduleCommand::Upcoming => {
            let planned = scheduler.upcoming_pending(Local::now().naive_local())?;
            if planned.is_empty() {
                println!("Nothing planned.");
            } else {
                print_scheduled(&planned);
            }
        }
        ScheduleCommand::Cancel { id } => {
            if scheduler.cancel(id)? {
                println!("Cancelled session #{}.", id);
            } else {
                println!("No planned session #{}.", id);
            }
        }
        ScheduleCommand::Status { id, status } => {
            scheduler.set_status(id, status)?;
            print_scheduled([&scheduler.get(id)?]);
        }
        ScheduleCommand::Remind => {
            let lead = utils::minutes_to_delta(config.reminder_lead_mins)?;
            let due = scheduler.due_reminders(Local::now().naive_local(), lead)?;
            if due.is_empty() {
                println!("No sessions starting in the next {} minutes.", config.reminder_lead_mins);
            }
            for planned in &due {
                println!(
                    "Starting soon: #{} at {} ({} min) {}",
                    planned.id,
                    planned.scheduled_at.format("%H:%M"),
                    planned.duration_minutes,
                    planned.notes
                );
                scheduler.mark_notified(planned.id)?;
            }
        }
        ScheduleCommand::Sweep => {
            let swept = scheduler.sweep_missed(Local::now().naive_local())?;
            println!("Marked {} session(s) as missed.", swept);
        }
    }
    Ok(())
}
