use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use crate::models::PomodoroSession;
use crate::pomodoro::{Phase, PomodoroTimer};
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::task_list::truncate;
use crate::utils::{format_minutes, format_timer};

pub fn render_pomodoro(
    f: &mut Frame,
    area: Rect,
    timer: &PomodoroTimer,
    todays_sessions: &[&PomodoroSession],
    palette: &Palette,
) {
    let [timer_area, gauge_area, log_area] =
        Layout::vertical([Constraint::Length(6), Constraint::Length(3), Constraint::Min(3)]).areas(area);

    let state = if timer.is_running() { "running" } else { "paused" };
    let focus = match (timer.phase(), timer.task()) {
        (Phase::Work, Some(task)) => format!("Focusing on: {}", task.description),
        (Phase::Work, None) => "Free focus session".to_string(),
        _ => "Step away from the screen".to_string(),
    };
    let lines = vec![
        Line::from(Span::styled(
            format!("{} ({})", timer.phase().label(), state),
            palette.accent().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format_timer(timer.remaining_secs()),
            palette.base().add_modifier(Modifier::BOLD),
        )),
        Line::from(truncate(&focus, area.width.saturating_sub(4) as usize)),
        Line::from(format!("Focus sessions this cycle: {}", timer.completed_work())),
    ];
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Pomodoro"))
        .style(palette.base())
        .alignment(Alignment::Center);
    f.render_widget(paragraph, timer_area);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .style(palette.base())
        .gauge_style(palette.accent())
        .ratio(timer.progress().clamp(0.0, 1.0));
    f.render_widget(gauge, gauge_area);

    let total: f64 = todays_sessions.iter().map(|s| s.duration as f64 / 60.0).sum();
    let items: Vec<ListItem> = todays_sessions
        .iter()
        .rev()
        .map(|s| {
            let time = s.completed_at.get(11..16).unwrap_or("");
            let task = s.task_description.as_deref().unwrap_or("Free focus");
            ListItem::new(format!("{}  {}  {}", time, format_minutes(s.duration as f64 / 60.0), task))
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Today ({} focused)", format_minutes(total))),
        )
        .style(palette.base());
    f.render_widget(list, log_area);
}
