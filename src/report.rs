use crate::models::ScheduledSession;
use crate::scheduler::Scheduler;
use crate::stats::{calculate_stats, focus_calendar, focus_on_date, DayStats};
use crate::tracker::Tracker;
use crate::utils::{format_duration, format_minutes};
use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};

pub struct Reporter<'a> {
    tracker: &'a Tracker,
    scheduler: &'a Scheduler,
}

impl<'a> Reporter<'a> {
    pub fn new(tracker: &'a Tracker, scheduler: &'a Scheduler) -> Self {
        Self { tracker, scheduler }
    }

    pub fn report(&self) -> Result<()> {
        let history = self.tracker.history_summary()?;
        let (current, longest) = self.tracker.streak_info()?;

        println!("Fokus Report");
        println!("============");
        println!("Streak:              {} day(s) (longest {})", current, longest);
        println!("Total Focus Time:    {}", format_minutes(history.total_minutes));

        if history.sessions.is_empty() {
            println!("\nNo sessions recorded yet.");
        } else {
            let stats = calculate_stats(&history.sessions, Local::now().date_naive());

            for (date, day) in stats.daily_stats.range(stats.week_start..) {
                let date_str = if *date == stats.today {
                    format!("{} (Today)", date)
                } else {
                    date.to_string()
                };

                println!("\nDate: {}", date_str);
                println!(
                    "  Focus Time:        {}",
                    format_duration(day.total_focus.num_seconds())
                );
                println!("  Sessions:          {}", day.sessions);
                if day.sessions > 0 {
                    let avg = day.total_focus / (day.sessions as i32);
                    println!("  Avg Session:       {}", format_duration(avg.num_seconds()));
                }
            }

            let week = &stats.week_summary;
            println!("\nWeekly Summary (Starting Monday {})", stats.week_start);
            println!("-------------------------------------------");
            println!(
                "Total Focus Time:    {}",
                format_duration(week.total_focus.num_seconds())
            );
            println!("Sessions:            {}", week.count);
            if week.count > 0 {
                println!(
                    "Avg Session:         {}",
                    format_duration(week.average().num_seconds())
                );
                println!(
                    "Longest Session:     {}",
                    format_duration(week.max_focus.unwrap_or_else(Duration::zero).num_seconds())
                );
                println!(
                    "Shortest Session:    {}",
                    format_duration(week.min_focus.unwrap_or_else(Duration::zero).num_seconds())
                );
            }
        }

        let upcoming = self.scheduler.upcoming_pending(Local::now().naive_local())?;
        if !upcoming.is_empty() {
            println!("\nUpcoming");
            println!("--------");
            print_scheduled(upcoming.iter().take(5));
        }

        Ok(())
    }

    pub fn history(&self) -> Result<()> {
        let history = self.tracker.history_summary()?;
        if history.sessions.is_empty() {
            println!("No sessions recorded yet.");
            return Ok(());
        }

        for session in &history.sessions {
            println!(
                "{}  {} - {}  {}",
                session.date(),
                session.start.format("%H:%M"),
                session.end.format("%H:%M"),
                format_minutes(session.duration_minutes)
            );
        }
        println!(
            "\n{} session(s), total focus time {}",
            history.sessions.len(),
            format_minutes(history.total_minutes)
        );
        Ok(())
    }

    pub fn day(&self, date: NaiveDate) -> Result<()> {
        let history = self.tracker.history_summary()?;
        println!("{}", day_summary(date, focus_on_date(&history.sessions, date).as_ref()));
        Ok(())
    }

    pub fn streak(&self, weeks: u32) -> Result<()> {
        let (current, longest) = self.tracker.refresh_streak()?;
        println!("Current streak: {} day(s)", current);
        println!("Longest streak: {} day(s)", longest);

        let dates = self.tracker.storage.focus_dates()?;
        let today = Local::now().date_naive();
        println!("\n  Mo Tu We Th Fr Sa Su");
        for week in focus_calendar(&dates, today, weeks) {
            let cells: Vec<&str> = week
                .iter()
                .map(|(day, focused)| match (*focused, *day > today) {
                    (_, true) => "  ",
                    (true, false) => "##",
                    (false, false) => "..",
                })
                .collect();
            println!("  {}", cells.join(" "));
        }
        Ok(())
    }
}

fn day_summary(date: NaiveDate, day: Option<&DayStats>) -> String {
    match day {
        Some(day) => format!(
            "Focus time on {}: {} minutes in {} session(s)",
            date,
            day.total_focus.num_minutes(),
            day.sessions
        ),
        None => format!("No focus sessions on {}", date),
    }
}

pub fn print_scheduled<'s>(planned: impl IntoIterator<Item = &'s ScheduledSession>) {
    for s in planned {
        let notes = if s.notes.is_empty() {
            String::new()
        } else {
            format!("  {}", s.notes)
        };
        println!(
            "#{:<4} {}  {:>3} min  {:<9}{}",
            s.id,
            s.scheduled_at.format("%Y-%m-%d %H:%M"),
            s.duration_minutes,
            s.status.as_str(),
            notes
        );
    }
}
