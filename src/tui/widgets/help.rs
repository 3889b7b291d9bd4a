use ratatui::widgets::{Block, Borders, Paragraph, Clear, Wrap};
use ratatui::Frame;
use ratatui::layout::{Rect, Alignment};
use crate::Config;
use crate::tui::layout::popup_area;
use crate::tui::widgets::color::Palette;
use crate::utils::format_key_binding_for_display as key;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config, palette: &Palette) {
    let popup_area = popup_area(area, 70, 80);
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Key Bindings")
                .title_alignment(Alignment::Center)
                .style(palette.base()),
        )
        .style(palette.base())
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, popup_area);
}

pub fn build_help_text(config: &Config) -> String {
    let k = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Navigation:\n");
    text.push_str(&format!("  {} / {}: Switch tabs\n", key(&k.tab_left), key(&k.tab_right)));
    text.push_str("  1-6: Jump to tab\n");
    text.push_str(&format!("  {} / {}: Move selection\n", key(&k.list_up), key(&k.list_down)));
    text.push('\n');

    text.push_str("Tasks:\n");
    text.push_str(&format!("  {}: New task\n", key(&k.new)));
    text.push_str(&format!("  {}: Toggle done\n", key(&k.toggle)));
    text.push_str(&format!("  {}: Focus on task with the timer\n", key(&k.start)));
    text.push_str(&format!("  {}: Delete task\n", key(&k.delete)));
    text.push('\n');

    text.push_str("Pomodoro:\n");
    text.push_str(&format!("  {} / {}: Start or pause\n", key(&k.toggle), key(&k.start)));
    text.push_str(&format!("  {}: Reset\n", key(&k.reset)));
    text.push_str(&format!("  {}: Detach task\n", key(&k.delete)));
    text.push('\n');

    text.push_str("Diary / Stats / Leaders / Community:\n");
    text.push_str(&format!("  {}: Today's diary entry, new post\n", key(&k.new)));
    text.push_str(&format!("  {}: Edit selected entry, wake and sleep times\n", key(&k.edit)));
    text.push_str(&format!("  {}: Switch period\n", key(&k.period)));
    text.push_str(&format!("  {}: Delete your post\n", key(&k.delete)));
    text.push('\n');

    text.push_str("Forms:\n");
    text.push_str(&format!("  {}: Save\n", key(&k.save)));
    text.push_str("  Tab / Shift+Tab / Enter: Next or previous field\n");
    text.push_str("  ←/→ or -/+: Adjust score, Space: Toggle habit\n");
    text.push_str("  Esc: Cancel\n");
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Quit\n", key(&k.quit)));
    text.push_str(&format!("  {}: Show/hide help\n", key(&k.help)));

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_follows_configured_keys() {
        let mut config = Config::default();
        config.key_bindings.quit = "x".into();
        let text = build_help_text(&config);
        assert!(text.contains("  x: Quit\n"));
        assert!(text.contains("Pomodoro:"));
    }
}
