use ratatui::widgets::{Block, Borders, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use crate::models::{DiaryEntry, Scores};
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::task_list::{render_selectable_list, truncate};

pub fn render_diary(
    f: &mut Frame,
    area: Rect,
    entries: &[DiaryEntry],
    list_state: &mut ListState,
    palette: &Palette,
) {
    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).areas(area);

    let max_width = list_area.width.saturating_sub(5) as usize;
    let items: Vec<ListItem> = if entries.is_empty() {
        vec![ListItem::new("No entries. Press n to write today's.")]
    } else {
        entries
            .iter()
            .map(|e| ListItem::new(truncate(&format!("Day {}  {}", e.day_number, e.date), max_width)))
            .collect()
    };
    render_selectable_list(f, list_area, format!("Diary ({})", entries.len()), items, list_state, palette);

    let selected = list_state.selected().and_then(|i| entries.get(i));
    let lines = match selected {
        Some(entry) => entry_lines(entry, palette),
        None => vec![Line::from("Select an entry to read it")],
    };
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Entry"))
        .style(palette.base())
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, detail_area);
}

fn entry_lines(entry: &DiaryEntry, palette: &Palette) -> Vec<Line<'static>> {
    let heading = palette.accent().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(format!("Day {} ({})", entry.day_number, entry.date), heading)),
        Line::from(""),
        Line::from(Span::styled("A note to my younger self", heading)),
        Line::from(entry.younger_self.clone()),
        Line::from(""),
        Line::from(Span::styled("Today's lesson", heading)),
        Line::from(entry.lesson.clone()),
        Line::from(""),
        Line::from(Span::styled("Scores", heading)),
    ];
    for (i, label) in Scores::LABELS.iter().enumerate() {
        lines.push(Line::from(format!("  {:<16} {:>2}/{}", label, entry.scores.get(i), Scores::MAX)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Habits", heading)));
    for habit in &entry.habits {
        let mark = if habit.completed { "[x]" } else { "[ ]" };
        lines.push(Line::from(format!("  {} {}", mark, habit.habit_name)));
    }
    lines
}
