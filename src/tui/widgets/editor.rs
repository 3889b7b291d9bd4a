use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};

/// Single-line text input with a character-indexed cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Editor {
    chars: Vec<char>,
    pub cursor: usize,
    /// First visible character when the text is wider than the field
    pub scroll_col: usize,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_string(content: &str) -> Self {
        let chars: Vec<char> = content.chars().filter(|c| *c != '\n').collect();
        let cursor = chars.len();
        Self { chars, cursor, scroll_col: 0 }
    }

    pub fn value(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.iter().all(|c| c.is_whitespace())
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' || ch == '\r' {
            return;
        }
        let col = self.cursor.min(self.chars.len());
        self.chars.insert(col, ch);
        self.cursor = col + 1;
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        if self.cursor > 0 && self.cursor <= self.chars.len() {
            self.chars.remove(self.cursor - 1);
            self.cursor -= 1;
        }
    }

    /// Delete key
    pub fn delete_char_forward(&mut self) {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.chars.len());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.chars.len();
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
        self.scroll_col = 0;
    }

    /// Keep the cursor inside a viewport `width` characters wide
    pub fn update_horizontal_scroll(&mut self, width: usize) {
        if width == 0 {
            return;
        }
        if self.cursor < self.scroll_col {
            self.scroll_col = self.cursor;
        } else if self.cursor >= self.scroll_col + width {
            self.scroll_col = self.cursor + 1 - width;
        }
    }

    /// The visible slice for a field of `width` characters
    pub fn visible_line(&self, width: usize, style: Style) -> Line<'static> {
        let text: String = self.chars.iter().skip(self.scroll_col).take(width).collect();
        Line::from(Span::styled(text, style))
    }

    /// Terminal cursor position inside a bordered field
    pub fn cursor_screen_pos(&self, area: Rect) -> Option<(u16, u16)> {
        if area.width < 3 || area.height < 3 {
            return None;
        }
        let col = self.cursor.saturating_sub(self.scroll_col) as u16;
        let x = (area.x + 1 + col).min(area.x + area.width - 2);
        Some((x, area.y + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_at_the_cursor() {
        let mut editor = Editor::from_string("helo");
        editor.move_cursor_left();
        editor.insert_char('l');
        assert_eq!(editor.value(), "hello");

        editor.move_cursor_home();
        editor.delete_char_forward();
        editor.move_cursor_end();
        editor.delete_char();
        assert_eq!(editor.value(), "ell");
        assert_eq!(editor.cursor, 3);
    }

    #[test]
    fn newlines_are_ignored() {
        let mut editor = Editor::from_string("a\nb");
        editor.insert_char('\n');
        assert_eq!(editor.value(), "ab");
    }

    #[test]
    fn scroll_follows_cursor() {
        let mut editor = Editor::from_string("abcdefghij");
        editor.update_horizontal_scroll(4);
        assert_eq!(editor.scroll_col, 7);

        editor.move_cursor_home();
        editor.update_horizontal_scroll(4);
        assert_eq!(editor.scroll_col, 0);
    }
}
