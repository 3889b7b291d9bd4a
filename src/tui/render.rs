use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::Modifier;
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Paragraph};
use crate::tui::app::{Mode, Tab};
use crate::tui::{App, Layout};
use crate::tui::widgets::{
    color::Palette,
    community_view::render_community,
    confirm_delete::render_confirm_delete,
    diary_view::render_diary,
    form::{render_compose, render_diary_form, render_prefs_form, render_task_form},
    help::render_help,
    leaderboard_view::render_leaderboard,
    pomodoro_view::render_pomodoro,
    stats_view::render_stats,
    status_bar::render_status_bar,
    tabs::render_tabs,
    task_list::render_task_list,
};
use crate::utils::format_key_binding_for_display as key;

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let palette = Palette::from_config(&app.config);

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("habitup")
        .title_alignment(Alignment::Center)
        .style(palette.base());
    f.render_widget(outer_block, f.area());

    render_tabs(f, layout.tabs_area, app.ui.current_tab, &palette);

    let greeting = Paragraph::new(Span::styled(
        format!("Welcome back, {}!", app.username),
        palette.accent().add_modifier(Modifier::BOLD),
    ));
    f.render_widget(greeting, layout.header_area);

    let area = layout.main_area;
    match app.ui.current_tab {
        Tab::Tasks => {
            let overview = app.time_overview();
            render_task_list(f, area, &app.tasks, overview, &mut app.ui.task_list_state, &palette);
        }
        Tab::Pomodoro => {
            let sessions = app.todays_sessions();
            render_pomodoro(f, area, &app.pomodoro.timer, &sessions, &palette);
        }
        Tab::Diary => render_diary(f, area, &app.diary_entries, &mut app.ui.diary_list_state, &palette),
        Tab::Stats => render_stats(f, area, &app.stats, &palette),
        Tab::Leaders => render_leaderboard(
            f,
            area,
            &app.leaderboard,
            app.leaderboard_period,
            &app.username,
            &palette,
        ),
        Tab::Community => render_community(f, area, &app.posts, &mut app.ui.post_list_state, &palette),
    }

    // Overlays
    match app.ui.mode {
        Mode::Help => render_help(f, area, &app.config, &palette),
        Mode::TaskForm => {
            if let Some(form) = &app.form.task_form {
                render_task_form(f, area, form, &palette);
            }
        }
        Mode::DiaryForm => {
            if let Some(form) = &app.form.diary_form {
                render_diary_form(f, area, form, &palette);
            }
        }
        Mode::PrefsForm => {
            if let Some(form) = &app.form.prefs_form {
                render_prefs_form(f, area, form, &palette);
            }
        }
        Mode::Compose => {
            if let Some(editor) = &app.form.compose {
                render_compose(f, area, editor, &palette);
            }
        }
        Mode::View => {}
    }

    if let Some(pending) = &app.modals.delete_confirmation {
        render_confirm_delete(f, area, pending, app.modals.delete_modal_selection, &palette);
    }

    let hints = key_hints(app);
    render_status_bar(f, layout.status_area, app.status.message.as_ref(), &hints, &palette);
}

/// Hints for the current tab, most useful first
pub fn key_hints(app: &App) -> Vec<String> {
    let k = &app.config.key_bindings;
    let hint = |binding: &str, action: &str| format!("{}: {}", key(binding), action);

    if app.ui.mode != Mode::View {
        return vec!["Esc: Close".to_string(), hint(&k.save, "Save")];
    }

    let mut hints = match app.ui.current_tab {
        Tab::Tasks => vec![
            hint(&k.new, "New"),
            hint(&k.toggle, "Done"),
            hint(&k.start, "Focus"),
            hint(&k.delete, "Delete"),
        ],
        Tab::Pomodoro => vec![
            hint(&k.toggle, "Start/Pause"),
            hint(&k.reset, "Reset"),
            hint(&k.delete, "Detach task"),
        ],
        Tab::Diary => vec![hint(&k.new, "Today"), hint(&k.edit, "Edit")],
        Tab::Stats => vec![hint(&k.period, "Period"), hint(&k.edit, "Wake/Sleep")],
        Tab::Leaders => vec![hint(&k.period, "Period")],
        Tab::Community => vec![hint(&k.new, "Post"), hint(&k.delete, "Delete")],
    };
    hints.push(hint(&k.help, "Help"));
    hints.push(hint(&k.quit, "Quit"));
    hints
}
