use ratatui::widgets::{Block, Borders, Row, Table};
use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::Modifier;
use crate::leaderboard::{LeaderboardPeriod, LeaderboardRow};
use crate::tui::widgets::color::Palette;
use crate::utils::format_minutes;

pub fn render_leaderboard(
    f: &mut Frame,
    area: Rect,
    rows: &[LeaderboardRow],
    period: LeaderboardPeriod,
    username: &str,
    palette: &Palette,
) {
    let header = Row::new(["#", "User", "Focus", "Streak", "Tasks done"])
        .style(palette.accent().add_modifier(Modifier::BOLD));

    let body: Vec<Row> = rows
        .iter()
        .map(|row| {
            let cells = [
                row.rank.to_string(),
                row.username.clone(),
                format_minutes(row.focus_minutes),
                format!("{}d", row.login_streak),
                row.tasks_completed.to_string(),
            ];
            let style = if row.username == username { palette.highlight() } else { palette.base() };
            Row::new(cells).style(style)
        })
        .collect();

    let table = Table::new(
        body,
        [
            Constraint::Length(4),
            Constraint::Min(12),
            Constraint::Length(9),
            Constraint::Length(7),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Leaderboard: {} (p to switch)", period.label())),
    )
    .style(palette.base());

    f.render_widget(table, area);
}
