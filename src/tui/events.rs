use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::style::Print;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, size as terminal_size};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io;
use std::time::{Duration, Instant};

use crate::tui::app::{Mode, PrefsField, Tab, TaskField};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::tui::widgets::editor::Editor;
use crate::tui::App;
use crate::utils::{parse_key_binding, ParsedKeyBinding};

const TICK: Duration = Duration::from_secs(1);
const SNAPSHOT_POLL: Duration = Duration::from_secs(60);

/// Guard that ensures terminal state is restored even on panic
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Manually restore terminal state (called on normal exit)
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Ignore errors in drop - we're already in a cleanup path
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Check terminal size before entering alternate screen so the error is readable
    let (width, height) = terminal_size()?;
    let min_width = Layout::MIN_WIDTH + 2;
    let min_height = Layout::MIN_HEIGHT + 2;
    if width < min_width || height < min_height {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width, min_height
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    tracing::info!(username = %app.username, "dashboard started");

    loop {
        app.check_status_message_timeout();

        if app.pomodoro.last_tick.elapsed() >= TICK {
            app.pomodoro.last_tick = Instant::now();
            app.on_timer_tick();
        }
        if app.pomodoro.bell_pending {
            app.pomodoro.bell_pending = false;
            execute!(io::stdout(), Print("\x07"))?;
        }
        if app.snapshot.last_poll.is_none_or(|t| t.elapsed() >= SNAPSHOT_POLL) {
            app.on_snapshot_poll(chrono::Local::now().naive_local());
        }

        let size = terminal.size()?;
        let layout = Layout::calculate(Rect::new(0, 0, size.width, size.height));
        update_editor_scroll(&mut app, layout.main_area.width.saturating_sub(4) as usize);

        terminal.draw(|f| {
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        // Only process Press events to avoid duplicate processing on Windows
        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press && handle_key_event(&mut app, key_event)? {
                    break;
                }
            }
        }
    }

    guard.restore()?;
    tracing::info!("dashboard closed");
    Ok(())
}

fn update_editor_scroll(app: &mut App, width: usize) {
    if let Some(editor) = current_editor(app) {
        editor.update_horizontal_scroll(width);
    }
}

/// The text input that receives typed characters in the current mode
fn current_editor(app: &mut App) -> Option<&mut Editor> {
    match app.ui.mode {
        Mode::TaskForm => app.form.task_form.as_mut().map(|f| match f.current_field {
            TaskField::Description => &mut f.description,
            TaskField::Minutes => &mut f.minutes,
        }),
        Mode::DiaryForm => app.form.diary_form.as_mut().and_then(|f| f.current_editor()),
        Mode::PrefsForm => app.form.prefs_form.as_mut().map(|f| match f.current_field {
            PrefsField::Wake => &mut f.wake,
            PrefsField::Sleep => &mut f.sleep,
        }),
        Mode::Compose => app.form.compose.as_mut(),
        Mode::View | Mode::Help => None,
    }
}

fn binding(key: &str) -> Result<ParsedKeyBinding, TuiError> {
    parse_key_binding(key).map_err(TuiError::KeyBindingError)
}

fn matches_key_event(key_event: KeyEvent, binding: &ParsedKeyBinding) -> bool {
    // Primary modifier is Ctrl on Windows/Linux, Option/Alt on macOS
    let has_primary_mod = crate::utils::has_primary_modifier(key_event.modifiers);
    if binding.requires_ctrl != has_primary_mod {
        return false;
    }
    binding.key_code == key_event.code
}

fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if app.modals.delete_confirmation.is_some() {
        return handle_delete_confirmation_modal(app, key_event);
    }

    match app.ui.mode {
        Mode::Help => handle_help_mode(app, key_event),
        Mode::TaskForm | Mode::DiaryForm | Mode::PrefsForm | Mode::Compose => handle_form_mode(app, key_event),
        Mode::View => handle_view_mode(app, key_event),
    }
}

fn handle_delete_confirmation_modal(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    match key_event.code {
        KeyCode::Up | KeyCode::Down | KeyCode::Tab => {
            app.modals.delete_modal_selection = 1 - app.modals.delete_modal_selection.min(1);
        }
        KeyCode::Enter => app.confirm_delete(),
        KeyCode::Esc => {
            app.modals.delete_confirmation = None;
        }
        _ => {}
    }
    Ok(false)
}

fn handle_help_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Esc || matches_key_event(key_event, &binding(&app.config.key_bindings.help)?) {
        app.exit_help_mode();
    }
    Ok(false)
}

fn handle_form_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Esc {
        app.cancel_form();
        return Ok(false);
    }

    let save_binding = binding(&app.config.key_bindings.save)?;
    if matches_key_event(key_event, &save_binding) {
        save_current_form(app);
        return Ok(false);
    }

    let forward = key_event.code == KeyCode::Tab && !key_event.modifiers.contains(KeyModifiers::SHIFT);
    match key_event.code {
        KeyCode::Enter if app.ui.mode == Mode::Compose => {
            app.submit_post();
            return Ok(false);
        }
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Enter => {
            let forward = forward || key_event.code == KeyCode::Enter;
            navigate_form(app, forward);
            return Ok(false);
        }
        _ => {}
    }

    if app.ui.mode == Mode::DiaryForm && handle_diary_choice_field(app, key_event) {
        return Ok(false);
    }

    if let Some(editor) = current_editor(app) {
        match key_event.code {
            KeyCode::Char(c) if !crate::utils::has_primary_modifier(key_event.modifiers) => editor.insert_char(c),
            KeyCode::Backspace => editor.delete_char(),
            KeyCode::Delete => editor.delete_char_forward(),
            KeyCode::Left => editor.move_cursor_left(),
            KeyCode::Right => editor.move_cursor_right(),
            KeyCode::Home => editor.move_cursor_home(),
            KeyCode::End => editor.move_cursor_end(),
            _ => {}
        }
    }
    Ok(false)
}

/// Score and habit rows take arrow keys and Space instead of text
fn handle_diary_choice_field(app: &mut App, key_event: KeyEvent) -> bool {
    use crate::tui::app::DiaryField;

    let Some(form) = app.form.diary_form.as_mut() else {
        return false;
    };
    match (form.field(), key_event.code) {
        (DiaryField::Score(_), KeyCode::Left | KeyCode::Char('-')) => form.adjust_score(-1),
        (DiaryField::Score(_), KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=')) => form.adjust_score(1),
        (DiaryField::Habit(_), KeyCode::Char(' ')) => form.toggle_habit(),
        (DiaryField::Score(_) | DiaryField::Habit(_), _) => {}
        _ => return false,
    }
    true
}

fn navigate_form(app: &mut App, forward: bool) {
    match app.ui.mode {
        Mode::TaskForm => {
            if let Some(form) = app.form.task_form.as_mut() {
                form.current_field = match form.current_field {
                    TaskField::Description => TaskField::Minutes,
                    TaskField::Minutes => TaskField::Description,
                };
            }
        }
        Mode::DiaryForm => {
            if let Some(form) = app.form.diary_form.as_mut() {
                form.navigate(forward);
            }
        }
        Mode::PrefsForm => {
            if let Some(form) = app.form.prefs_form.as_mut() {
                form.current_field = match form.current_field {
                    PrefsField::Wake => PrefsField::Sleep,
                    PrefsField::Sleep => PrefsField::Wake,
                };
            }
        }
        _ => {}
    }
}

fn save_current_form(app: &mut App) {
    match app.ui.mode {
        Mode::TaskForm => app.save_task_form(),
        Mode::DiaryForm => app.save_diary_form(),
        Mode::PrefsForm => app.save_prefs_form(),
        Mode::Compose => app.submit_post(),
        Mode::View | Mode::Help => {}
    }
}

fn handle_view_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let keys = app.config.key_bindings.clone();

    if matches_key_event(key_event, &binding(&keys.quit)?) {
        return Ok(true);
    }
    if matches_key_event(key_event, &binding(&keys.help)?) {
        app.enter_help_mode();
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&keys.tab_left)?) {
        app.switch_tab(app.ui.current_tab.previous());
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&keys.tab_right)?) {
        app.switch_tab(app.ui.current_tab.next());
        return Ok(false);
    }
    if let KeyCode::Char(c @ '1'..='6') = key_event.code {
        let index = c as usize - '1' as usize;
        app.switch_tab(Tab::ALL[index]);
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&keys.list_up)?) || key_event.code == KeyCode::Up {
        app.move_selection_up();
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&keys.list_down)?) || key_event.code == KeyCode::Down {
        app.move_selection_down();
        return Ok(false);
    }

    let is = |key: &str| binding(key).map(|b| matches_key_event(key_event, &b));

    match app.ui.current_tab {
        Tab::Tasks => {
            if is(&keys.new)? {
                app.enter_task_form();
            } else if is(&keys.toggle)? {
                app.toggle_selected_task();
            } else if is(&keys.delete)? {
                app.request_delete();
            } else if is(&keys.start)? {
                app.start_selected_task();
            }
        }
        Tab::Pomodoro => {
            if is(&keys.toggle)? || is(&keys.start)? {
                app.toggle_timer();
            } else if is(&keys.reset)? {
                app.reset_timer();
            } else if is(&keys.delete)? {
                app.detach_timer_task();
            }
        }
        Tab::Diary => {
            if is(&keys.new)? {
                app.enter_diary_form(crate::utils::get_current_date_string());
            } else if is(&keys.edit)? || key_event.code == KeyCode::Enter {
                app.edit_selected_diary_entry();
            }
        }
        Tab::Stats => {
            if is(&keys.period)? {
                app.toggle_stats_period();
            } else if is(&keys.edit)? {
                app.enter_prefs_form();
            }
        }
        Tab::Leaders => {
            if is(&keys.period)? {
                app.cycle_leaderboard_period();
            }
        }
        Tab::Community => {
            if is(&keys.new)? {
                app.enter_compose_mode();
            } else if is(&keys.delete)? {
                app.request_delete();
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Database};

    fn app() -> App {
        App::new(Config::default(), Database::open_in_memory().unwrap(), "ana".into()).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn quit_only_from_view_mode() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.ui.mode, Mode::TaskForm);
        assert!(!press(&mut app, KeyCode::Char('q')));

        press(&mut app, KeyCode::Esc);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn typing_a_task_and_saving() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Read chapter");
        press(&mut app, KeyCode::Tab);
        for _ in 0..2 {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "20");
        handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)).unwrap();

        assert_eq!(app.ui.mode, Mode::View);
        assert_eq!(app.tasks[0].description, "Read chapter");
        assert_eq!(app.tasks[0].duration, 20);
    }

    #[test]
    fn number_keys_jump_between_tabs() {
        let mut app = app();
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.ui.current_tab, Tab::Stats);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.ui.current_tab, Tab::Diary);
    }

    #[test]
    fn composing_a_post_with_enter() {
        let mut app = app();
        press(&mut app, KeyCode::Char('6'));
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "q is just a letter here");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.ui.mode, Mode::View);
        assert_eq!(app.posts[0].content, "q is just a letter here");
    }

    #[test]
    fn delete_modal_escape_keeps_the_task() {
        let mut app = app();
        crate::tasks::add_task(&app.database, "ana", "Keep me", None).unwrap();
        app.load_tasks().unwrap();
        app.sync_list_states();

        press(&mut app, KeyCode::Char('d'));
        assert!(app.modals.delete_confirmation.is_some());
        press(&mut app, KeyCode::Esc);
        assert!(app.modals.delete_confirmation.is_none());
        assert_eq!(app.tasks.len(), 1);
    }
}
