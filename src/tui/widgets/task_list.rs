use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use crate::models::Task;
use crate::tasks::TimeOverview;
use crate::tui::widgets::color::Palette;
use crate::utils::format_duration;

/// Cut `text` to `max_width` characters, marking the cut with "..."
pub fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() > max_width {
        text.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// Bordered list with a scrollbar once the items overflow
pub fn render_selectable_list(
    f: &mut Frame,
    area: Rect,
    title: String,
    items: Vec<ListItem<'static>>,
    list_state: &mut ListState,
    palette: &Palette,
) {
    let areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let (list_area, scrollbar_area) = (areas[0], areas[1]);

    let total_items = items.len();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(palette.base())
        .highlight_style(palette.highlight());
    StatefulWidget::render(list, list_area, f.buffer_mut(), list_state);

    let visible_items = list_area.height.saturating_sub(2) as usize;
    if total_items > visible_items && list_area.height > 2 {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            list_area.y + 1,
            scrollbar_area.width,
            list_area.height.saturating_sub(2),
        );
        let mut scrollbar_state = ScrollbarState::new(total_items)
            .viewport_content_length(visible_items)
            .position(list_state.offset());
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}

pub fn task_line(task: &Task, max_width: usize) -> String {
    let status_indicator = if task.completed { "✓" } else { "○" };
    truncate(
        &format!("{} {} ({})", status_indicator, task.description, format_duration(task.duration)),
        max_width,
    )
}

pub fn render_task_list(
    f: &mut Frame,
    area: Rect,
    tasks: &[Task],
    overview: TimeOverview,
    list_state: &mut ListState,
    palette: &Palette,
) {
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let label = format!(
        "{} done of {} planned, {} left",
        format_duration(overview.completed),
        format_duration(overview.total),
        format_duration(overview.remaining)
    );
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Time overview"))
        .style(palette.base())
        .gauge_style(palette.accent())
        .ratio(overview.ratio().clamp(0.0, 1.0))
        .label(label);
    f.render_widget(gauge, areas[0]);

    let max_width = areas[1].width.saturating_sub(5) as usize;
    let items: Vec<ListItem> = if tasks.is_empty() {
        vec![ListItem::new("No tasks yet. Press n to add one.")]
    } else {
        tasks.iter().map(|task| ListItem::new(task_line(task, max_width))).collect()
    };
    let done = tasks.iter().filter(|t| t.completed).count();
    let title = format!("Tasks ({} of {} done)", done, tasks.len());
    render_selectable_list(f, areas[1], title, items, list_state, palette);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_descriptions_are_cut() {
        let mut task = Task::new("ana".into(), "A rather long task description".into(), 90);
        assert_eq!(task_line(&task, 80), "○ A rather long task description (1h 30m)");

        task.completed = true;
        assert_eq!(task_line(&task, 12), "✓ A rathe...");
    }
}
