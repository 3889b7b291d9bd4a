use ratatui::widgets::Paragraph;
use ratatui::Frame;
use ratatui::layout::Rect;
use crate::tui::widgets::color::Palette;

const SEPARATOR: &str = " • ";
const ELLIPSIS: &str = "...";

/// Join as many hints as fit in `max_width`, ending with "..." when some are dropped
pub fn fit_hints(key_hints: &[String], max_width: usize) -> String {
    let mut text = String::new();
    for (i, hint) in key_hints.iter().enumerate() {
        let current_len = text.chars().count();
        let would_be_len = if i == 0 {
            hint.chars().count()
        } else {
            current_len + SEPARATOR.chars().count() + hint.chars().count()
        };

        if would_be_len > max_width {
            let keep = if i == 0 { hint.as_str() } else { text.as_str() };
            let keep_len = keep.chars().count();
            let mut fitted: String = if keep_len + ELLIPSIS.len() <= max_width {
                keep.to_string()
            } else {
                keep.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect()
            };
            fitted.push_str(ELLIPSIS);
            return fitted;
        }

        if i > 0 {
            text.push_str(SEPARATOR);
        }
        text.push_str(hint);
    }
    text
}

pub fn render_status_bar(f: &mut Frame, area: Rect, message: Option<&String>, key_hints: &[String], palette: &Palette) {
    let max_width = area.width as usize;
    let (content, style) = match message {
        Some(msg) => {
            let content = if msg.chars().count() > max_width {
                msg.chars().take(max_width.saturating_sub(3)).collect::<String>() + ELLIPSIS
            } else {
                msg.clone()
            };
            (content, palette.highlight())
        }
        None => (fit_hints(key_hints, max_width), palette.base()),
    };

    f.render_widget(Paragraph::new(content).style(style), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> Vec<String> {
        vec!["q: Quit".into(), "n: New".into(), "F1: Help".into()]
    }

    #[test]
    fn all_hints_fit() {
        assert_eq!(fit_hints(&hints(), 80), "q: Quit • n: New • F1: Help");
    }

    #[test]
    fn overflow_ends_with_ellipsis() {
        assert_eq!(fit_hints(&hints(), 20), "q: Quit • n: New...");
        assert_eq!(fit_hints(&hints(), 5), "q:...");
    }
}
