use crate::models::ScheduledSession;
use crate::session::{FocusSession, Outcome};
use crate::stats::Stats;
use crate::utils::format_duration;
use anyhow::Result;
use chrono::{Duration, Local};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::Duration as StdDuration;

/// Everything the countdown screen shows besides the timer itself. Loaded
/// once before the session starts.
pub struct Dashboard {
    pub stats: Stats,
    pub streak: (u32, u32),
    pub upcoming: Vec<ScheduledSession>,
}

pub fn run_tui(session: &mut FocusSession, dashboard: &Dashboard) -> Result<()> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_loop(&mut terminal, session, dashboard);

    // restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    res
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut FocusSession,
    dashboard: &Dashboard,
) -> Result<()> {
    loop {
        session.poll();
        terminal.draw(|f| draw(f, session, dashboard))?;

        if session.outcome().is_some() {
            return Ok(());
        }

        if event::poll(StdDuration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    session.stop();
                }
            }
        }
    }
}

pub fn draw(frame: &mut Frame, session: &FocusSession, dashboard: &Dashboard) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(5), // Countdown
            Constraint::Length(8), // Stats
            Constraint::Min(0),    // Chart
            Constraint::Length(3), // Footer
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], session);
    draw_countdown(frame, chunks[1], session);
    draw_stats(frame, chunks[2], dashboard);
    draw_chart(frame, chunks[3], &dashboard.stats);
    draw_footer(frame, chunks[4]);
}

fn draw_header(frame: &mut Frame, area: Rect, session: &FocusSession) {
    let status_text = match session.outcome() {
        None if !session.is_running() => Span::raw("FINISHING..."),
        None => Span::styled(
            "FOCUS MODE ON",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        Some(Outcome::Completed) => Span::styled(
            "TIME'S UP",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Some(Outcome::Stopped) => Span::styled(
            "STOPPED",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };

    let header = Line::from(vec![
        Span::styled(
            " Fokus ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        status_text,
        Span::raw(" | Started "),
        Span::raw(session.started_at.format("%H:%M").to_string()),
        Span::raw(" | "),
        Span::raw(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
    ]);

    frame.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn draw_countdown(frame: &mut Frame, area: Rect, session: &FocusSession) {
    let planned = session.planned.as_secs().max(1);
    let left = session.minutes_left * 60 + session.seconds_left;
    let ratio = (planned.saturating_sub(left) as f64 / planned as f64).clamp(0.0, 1.0);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(
                    " TIME LEFT ",
                    Style::default().add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL),
        )
        .gauge_style(Style::default().fg(Color::Magenta))
        .label(format!(
            "{:02}:{:02}",
            session.minutes_left, session.seconds_left
        ))
        .ratio(ratio);
    frame.render_widget(gauge, area);
}

fn draw_stats(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let today = &dashboard.stats.today_summary;
    let week = &dashboard.stats.week_summary;
    let (current, longest) = dashboard.streak;

    let lines = vec![
        Line::from(vec![
            Span::styled("  Streak: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                format!("{} day(s)", current),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" (longest {})", longest)),
        ]),
        Line::raw(""),
        Line::from(vec![
            Span::styled("  Today:", Style::default().fg(Color::Green)),
            Span::raw(format!(
                " {} in {} session(s)",
                format_duration(today.total_focus.num_seconds()),
                today.count
            )),
        ]),
        Line::from(vec![
            Span::styled("  Week: ", Style::default().fg(Color::Green)),
            Span::raw(format!(
                " {} (Avg: {})",
                format_duration(week.total_focus.num_seconds()),
                format_duration(week.average().num_seconds())
            )),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title(" PROGRESS ").borders(Borders::ALL)),
        chunks[0],
    );

    let mut upcoming: Vec<Line> = dashboard
        .upcoming
        .iter()
        .take(area.height.saturating_sub(2) as usize)
        .map(|s| {
            Line::raw(format!(
                "  {}  {} min {}",
                s.scheduled_at.format("%a %H:%M"),
                s.duration_minutes,
                s.notes
            ))
        })
        .collect();
    if upcoming.is_empty() {
        upcoming.push(Line::raw("  Nothing planned"));
    }
    frame.render_widget(
        Paragraph::new(upcoming).block(Block::default().title(" UP NEXT ").borders(Borders::ALL)),
        chunks[1],
    );
}

fn draw_chart(frame: &mut Frame, area: Rect, stats: &Stats) {
    let chart_block = Block::default()
        .title(" Focus - Current Week ")
        .borders(Borders::ALL);
    let inner_area = chart_block.inner(area);
    frame.render_widget(chart_block, area);

    if inner_area.height < 2 || inner_area.width < 14 {
        return;
    }

    let mut days_data = Vec::new();
    let mut max_secs = 1;
    for i in 0..7 {
        let date = stats.week_start + Duration::days(i);
        let focus_secs = stats
            .daily_stats
            .get(&date)
            .map(|d| d.total_focus.num_seconds())
            .unwrap_or(0);
        max_secs = max_secs.max(focus_secs);
        days_data.push((date.format("%a").to_string(), focus_secs));
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 7); 7])
        .split(inner_area);

    for (i, (label, focus)) in days_data.into_iter().enumerate() {
        let bar_label_split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(columns[i]);

        let bar_area = bar_label_split[0];
        let bar_width = 5.min(bar_area.width);
        let bar_x_offset = (bar_area.width - bar_width) / 2;
        let centered_bar_area = Rect::new(
            bar_area.x + bar_x_offset,
            bar_area.y,
            bar_width,
            bar_area.height,
        );

        frame.render_widget(
            Paragraph::new(label).alignment(Alignment::Center),
            bar_label_split[1],
        );

        if centered_bar_area.height > 0 {
            let focus_height =
                (focus * centered_bar_area.height as i64 / max_secs) as u16;
            let bar_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(centered_bar_area.height.saturating_sub(focus_height)),
                    Constraint::Length(focus_height),
                ])
                .split(centered_bar_area);

            if focus_height > 0 {
                frame.render_widget(Block::default().bg(Color::Green), bar_chunks[1]);
            }
        }
    }
}

fn draw_footer(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new("Press 'q' to stop the session early")
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(help, area);
}
