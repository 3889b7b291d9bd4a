use ratatui::widgets::Tabs;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::Frame;
use ratatui::layout::Rect;
use crate::tui::app::Tab;
use crate::tui::widgets::color::{get_contrast_text_color, Palette};

pub fn render_tabs(f: &mut Frame, area: Rect, current_tab: Tab, palette: &Palette) {
    // Non-selected tabs read against tab_bg regardless of how the terminal renders gray
    let tab_fg = get_contrast_text_color(palette.tab_bg);
    let pad = Style::default().bg(palette.tab_bg);

    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            Line::from(vec![
                Span::styled(" ", pad),
                Span::styled(format!("{} {}", i + 1, tab.title()), Style::default().fg(tab_fg).bg(palette.tab_bg)),
                Span::styled(" ", pad),
            ])
        })
        .collect();

    let tabs = Tabs::new(titles)
        .select(current_tab.index())
        .style(palette.base())
        .highlight_style(
            Style::default()
                .fg(palette.highlight_fg)
                .bg(palette.highlight_bg)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" ")
        .padding("", "");

    f.render_widget(tabs, area);
}
