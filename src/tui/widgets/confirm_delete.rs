use ratatui::widgets::{Block, Borders, Paragraph, Clear, Wrap};
use ratatui::Frame;
use ratatui::layout::{Rect, Alignment};
use ratatui::text::{Line, Span};
use crate::tui::app::PendingDelete;
use crate::tui::layout::popup_area;
use crate::tui::widgets::color::Palette;

pub fn render_confirm_delete(f: &mut Frame, area: Rect, item: &PendingDelete, selection: usize, palette: &Palette) {
    let popup_area = popup_area(area, 50, 35);
    // Clear first so the list underneath doesn't show through
    f.render_widget(Clear, popup_area);

    let (item_type, item_name) = match item {
        PendingDelete::Task(task) => ("task", task.description.as_str()),
        PendingDelete::Post(post) => ("post", post.content.as_str()),
    };

    let mut lines = vec![
        Line::from(Span::styled(format!("Delete this {}?", item_type), palette.base())),
        Line::from(""),
        Line::from(Span::styled(item_name.to_string(), palette.accent())),
        Line::from(""),
    ];
    for (index, option) in ["Delete", "Cancel"].iter().enumerate() {
        let is_selected = index == selection;
        let prefix = if is_selected { "> " } else { "  " };
        let style = if is_selected { palette.highlight() } else { palette.base() };
        lines.push(Line::from(Span::styled(format!("{}{}", prefix, option), style)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Use ↑↓ to choose, Enter to confirm, Esc to cancel",
        palette.base(),
    )));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm Delete")
                .title_alignment(Alignment::Center)
                .style(palette.base()),
        )
        .style(palette.base())
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(paragraph, popup_area);
}
