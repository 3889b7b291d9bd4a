use ratatui::widgets::{ListItem, ListState};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use crate::models::CommunityPost;
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::task_list::{render_selectable_list, truncate};

pub fn render_community(
    f: &mut Frame,
    area: Rect,
    posts: &[CommunityPost],
    list_state: &mut ListState,
    palette: &Palette,
) {
    let max_width = area.width.saturating_sub(5) as usize;
    let items: Vec<ListItem> = if posts.is_empty() {
        vec![ListItem::new("Nothing here yet. Press n to say hello.")]
    } else {
        posts
            .iter()
            .map(|post| {
                ListItem::new(vec![
                    Line::from(Span::styled(
                        format!("{}  {}", post.username, post.created_at),
                        palette.accent(),
                    )),
                    Line::from(truncate(&format!("  {}", post.content), max_width)),
                ])
            })
            .collect()
    };
    render_selectable_list(f, area, format!("Community ({})", posts.len()), items, list_state, palette);
}
