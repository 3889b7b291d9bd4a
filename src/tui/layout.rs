use ratatui::layout::{Constraint, Direction, Flex, Layout as RatLayout, Rect};

pub struct Layout {
    pub inner_area: Rect, // Area inside the outer border
    pub tabs_area: Rect,
    pub header_area: Rect,
    pub main_area: Rect,
    pub status_area: Rect,
}

impl Layout {
    /// Minimum terminal dimensions required for the dashboard.
    /// Width fits the stats charts side by side; height fits tabs, header,
    /// the pomodoro gauge and the status bar.
    pub const MIN_WIDTH: u16 = 60;
    pub const MIN_HEIGHT: u16 = 20;

    pub fn calculate(size: Rect) -> Self {
        let width = size.width.max(Self::MIN_WIDTH + 2);
        let height = size.height.max(Self::MIN_HEIGHT + 2);
        let size = Rect::new(size.x, size.y, width, height);

        let inner_area = Rect::new(
            size.x + 1,
            size.y + 1,
            size.width.saturating_sub(2),
            size.height.saturating_sub(2),
        );

        let vertical = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Tabs
                Constraint::Length(1), // Greeting
                Constraint::Min(1),    // Content
                Constraint::Length(1), // Status
            ])
            .split(inner_area);

        Self {
            inner_area,
            tabs_area: vertical[0],
            header_area: vertical[1],
            main_area: vertical[2],
            status_area: vertical[3],
        }
    }
}

/// Centered rect taking `percent_x` by `percent_y` of `area`
pub fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = RatLayout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = RatLayout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_terminals_are_padded_to_the_minimum() {
        let layout = Layout::calculate(Rect::new(0, 0, 10, 5));
        assert_eq!(layout.inner_area.width, Layout::MIN_WIDTH);
        assert_eq!(layout.inner_area.height, Layout::MIN_HEIGHT);
        assert_eq!(layout.status_area.height, 1);
        assert_eq!(layout.main_area.height, Layout::MIN_HEIGHT - 3);
    }

    #[test]
    fn popup_is_centered() {
        let popup = popup_area(Rect::new(0, 0, 100, 40), 50, 50);
        assert_eq!(popup, Rect::new(25, 10, 50, 20));
    }
}
