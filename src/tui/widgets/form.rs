use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::style::Modifier;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use crate::community::MAX_POST_CHARS;
use crate::models::Scores;
use crate::tui::app::{DiaryField, DiaryForm, PrefsField, PrefsForm, TaskField, TaskForm};
use crate::tui::layout::popup_area;
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::editor::Editor;

/// One bordered single-line input; the focused one gets the accent border and the cursor
fn render_input(f: &mut Frame, area: Rect, title: &str, editor: &Editor, focused: bool, palette: &Palette) {
    let border_style = if focused {
        palette.accent().add_modifier(Modifier::BOLD)
    } else {
        palette.base()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(border_style);
    let width = area.width.saturating_sub(2) as usize;
    f.render_widget(
        Paragraph::new(editor.visible_line(width, palette.base())).block(block).style(palette.base()),
        area,
    );
    if focused {
        if let Some(position) = editor.cursor_screen_pos(area) {
            f.set_cursor_position(position);
        }
    }
}

fn render_frame(f: &mut Frame, area: Rect, title: &str, palette: &Palette) -> Rect {
    f.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title(title.to_string()).style(palette.base());
    let inner = block.inner(area);
    f.render_widget(block, area);
    inner
}

fn render_footer(f: &mut Frame, area: Rect, text: &str, palette: &Palette) {
    f.render_widget(Paragraph::new(text.to_string()).style(palette.base()), area);
}

pub fn render_task_form(f: &mut Frame, area: Rect, form: &TaskForm, palette: &Palette) {
    let inner = render_frame(f, popup_area(area, 70, 60), "New task", palette);
    let [description, minutes, _, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(inner);

    render_input(f, description, "Description", &form.description, form.current_field == TaskField::Description, palette);
    render_input(f, minutes, "Minutes", &form.minutes, form.current_field == TaskField::Minutes, palette);
    render_footer(f, footer, "Tab: next field • Ctrl+s: save • Esc: cancel", palette);
}

pub fn render_prefs_form(f: &mut Frame, area: Rect, form: &PrefsForm, palette: &Palette) {
    let title = format!("Wake and sleep times for {}", form.date);
    let inner = render_frame(f, popup_area(area, 60, 60), &title, palette);
    let [wake, sleep, _, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(inner);

    render_input(f, wake, "Wake (HH:MM)", &form.wake, form.current_field == PrefsField::Wake, palette);
    render_input(f, sleep, "Sleep (HH:MM)", &form.sleep, form.current_field == PrefsField::Sleep, palette);
    render_footer(f, footer, "Tab: next field • Ctrl+s: save • Esc: cancel", palette);
}

pub fn render_compose(f: &mut Frame, area: Rect, editor: &Editor, palette: &Palette) {
    let inner = render_frame(f, popup_area(area, 80, 40), "New post", palette);
    let [input, counter, _, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(inner);

    render_input(f, input, "Message", editor, true, palette);
    let count = editor.len();
    let style = if count > MAX_POST_CHARS { palette.highlight() } else { palette.base() };
    f.render_widget(
        Paragraph::new(Span::styled(format!("{}/{}", count, MAX_POST_CHARS), style)),
        counter,
    );
    render_footer(f, footer, "Enter: post • Esc: cancel", palette);
}

pub fn render_diary_form(f: &mut Frame, area: Rect, form: &DiaryForm, palette: &Palette) {
    let verb = if form.is_new { "New entry" } else { "Edit entry" };
    let title = format!("{} for {}", verb, form.date);
    let inner = render_frame(f, popup_area(area, 90, 95), &title, palette);

    let [younger, lesson, choices, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    let field = form.field();
    render_input(f, younger, "A note to my younger self", &form.younger_self, field == DiaryField::YoungerSelf, palette);
    render_input(f, lesson, "Today's lesson", &form.lesson, field == DiaryField::Lesson, palette);

    let mut lines = Vec::new();
    for (i, label) in Scores::LABELS.iter().enumerate() {
        let value = form.draft.scores.get(i);
        let bar = "█".repeat(value as usize) + &"░".repeat((Scores::MAX - value) as usize);
        let style = if field == DiaryField::Score(i) { palette.highlight() } else { palette.base() };
        lines.push(Line::from(Span::styled(format!("{:<16} {} {:>2}", label, bar, value), style)));
    }
    lines.push(Line::from(""));
    for (i, habit) in form.draft.habits.iter().enumerate() {
        let mark = if habit.completed { "[x]" } else { "[ ]" };
        let style = if field == DiaryField::Habit(i) { palette.highlight() } else { palette.base() };
        lines.push(Line::from(Span::styled(format!("{} {}", mark, habit.habit_name), style)));
    }
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Scores and habits")),
        choices,
    );

    render_footer(
        f,
        footer,
        "Tab: next • ←/→: score • Space: habit • Ctrl+s: save • Esc: cancel",
        palette,
    );
}
