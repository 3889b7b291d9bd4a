use chrono::{Duration, NaiveDateTime};
use ratatui::widgets::ListState;
use std::time::Instant;

use crate::database::DatabaseError;
use crate::diary::{self, DiaryDraft, DiaryError, SaveOutcome};
use crate::leaderboard::{self, LeaderboardPeriod, LeaderboardRow};
use crate::models::{CommunityPost, DailyProductivity, DiaryEntry, PomodoroSession, Scores, Task, UserPreferences};
use crate::pomodoro::{self, AttachedTask, PomodoroTimer, TimerEvent};
use crate::productivity::{self, DailySnapshot, ProductivityError, SnapshotGuard};
use crate::stats::{self, Period};
use crate::tasks::{self, TaskError, TimeOverview};
use crate::community::{self, CommunityError, DEFAULT_FEED_LIMIT};
use crate::tui::error::TuiError;
use crate::tui::widgets::editor::Editor;
use crate::{Config, Database, utils};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Tasks,
    Pomodoro,
    Diary,
    Stats,
    Leaders,
    Community,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Tasks,
        Tab::Pomodoro,
        Tab::Diary,
        Tab::Stats,
        Tab::Leaders,
        Tab::Community,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Tasks => "Tasks",
            Tab::Pomodoro => "Pomodoro",
            Tab::Diary => "Diary",
            Tab::Stats => "Stats",
            Tab::Leaders => "Leaders",
            Tab::Community => "Community",
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    /// Tab to the right; stays put at the last tab
    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1).min(Self::ALL.len() - 1)]
    }

    pub fn previous(&self) -> Self {
        Self::ALL[self.index().saturating_sub(1)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Help,
    TaskForm,
    DiaryForm,
    PrefsForm,
    Compose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Description,
    Minutes,
}

#[derive(Debug, Clone)]
pub struct TaskForm {
    pub current_field: TaskField,
    pub description: Editor,
    pub minutes: Editor,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            current_field: TaskField::Description,
            description: Editor::new(),
            minutes: Editor::from_string(&tasks::DEFAULT_TASK_MINUTES.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiaryField {
    YoungerSelf,
    Lesson,
    Score(usize),
    Habit(usize),
}

#[derive(Debug, Clone)]
pub struct DiaryForm {
    pub date: String,
    pub draft: DiaryDraft,
    pub younger_self: Editor,
    pub lesson: Editor,
    pub current_field: usize,
    pub is_new: bool,
}

impl DiaryForm {
    pub fn new(date: String, entries: &[DiaryEntry]) -> Self {
        let is_new = !entries.iter().any(|e| e.date == date);
        let draft = DiaryDraft::for_date(entries, &date);
        Self {
            younger_self: Editor::from_string(&draft.younger_self),
            lesson: Editor::from_string(&draft.lesson),
            date,
            draft,
            current_field: 0,
            is_new,
        }
    }

    pub fn field_count(&self) -> usize {
        2 + Scores::LABELS.len() + self.draft.habits.len()
    }

    pub fn field(&self) -> DiaryField {
        let scores = Scores::LABELS.len();
        match self.current_field {
            0 => DiaryField::YoungerSelf,
            1 => DiaryField::Lesson,
            i if i < 2 + scores => DiaryField::Score(i - 2),
            i => DiaryField::Habit(i - 2 - scores),
        }
    }

    pub fn navigate(&mut self, forward: bool) {
        let count = self.field_count();
        self.current_field = if forward {
            (self.current_field + 1) % count
        } else {
            (self.current_field + count - 1) % count
        };
    }

    pub fn current_editor(&mut self) -> Option<&mut Editor> {
        match self.field() {
            DiaryField::YoungerSelf => Some(&mut self.younger_self),
            DiaryField::Lesson => Some(&mut self.lesson),
            _ => None,
        }
    }

    /// Step the focused score by `delta`, staying within the score range
    pub fn adjust_score(&mut self, delta: i64) {
        if let DiaryField::Score(i) = self.field() {
            let value = self.draft.scores.get(i) + delta;
            self.draft.scores.set(i, value);
        }
    }

    pub fn toggle_habit(&mut self) {
        if let DiaryField::Habit(i) = self.field() {
            self.draft.toggle_habit(i);
        }
    }

    fn to_draft(&self) -> DiaryDraft {
        let mut draft = self.draft.clone();
        draft.younger_self = self.younger_self.value();
        draft.lesson = self.lesson.value();
        draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefsField {
    Wake,
    Sleep,
}

#[derive(Debug, Clone)]
pub struct PrefsForm {
    pub date: String,
    pub current_field: PrefsField,
    pub wake: Editor,
    pub sleep: Editor,
}

#[derive(Debug, Clone)]
pub enum PendingDelete {
    Task(Task),
    Post(CommunityPost),
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub current_tab: Tab,
    pub mode: Mode,
    pub task_list_state: ListState,
    pub diary_list_state: ListState,
    pub post_list_state: ListState,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            current_tab: Tab::Tasks,
            mode: Mode::View,
            task_list_state: ListState::default(),
            diary_list_state: ListState::default(),
            post_list_state: ListState::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct ModalState {
    pub delete_confirmation: Option<PendingDelete>,
    pub delete_modal_selection: usize, // 0 = Delete, 1 = Cancel
}

#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub task_form: Option<TaskForm>,
    pub diary_form: Option<DiaryForm>,
    pub prefs_form: Option<PrefsForm>,
    pub compose: Option<Editor>,
}

#[derive(Debug, Clone)]
pub struct StatsState {
    pub period: Period,
    pub week_sessions: Vec<PomodoroSession>,
    pub productivity_rows: Vec<DailyProductivity>,
    pub today: Option<DailySnapshot>,
    pub today_error: Option<String>,
    pub preferences: Option<UserPreferences>,
    pub login_streak: u32,
}

impl Default for StatsState {
    fn default() -> Self {
        Self {
            period: Period::Weekly,
            week_sessions: Vec::new(),
            productivity_rows: Vec::new(),
            today: None,
            today_error: None,
            preferences: None,
            login_streak: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimerState {
    pub timer: PomodoroTimer,
    pub last_tick: Instant,
    /// Set when a phase ends; the event loop rings the terminal bell and clears it
    pub bell_pending: bool,
}

#[derive(Debug, Clone)]
pub struct SnapshotState {
    pub guard: SnapshotGuard,
    pub last_poll: Option<Instant>,
}

pub struct App {
    // Core infrastructure
    pub config: Config,
    pub database: Database,
    pub username: String,

    // Data collections
    pub tasks: Vec<Task>,
    pub diary_entries: Vec<DiaryEntry>,
    pub posts: Vec<CommunityPost>,
    pub leaderboard: Vec<LeaderboardRow>,
    pub leaderboard_period: LeaderboardPeriod,

    // Grouped state
    pub ui: UiState,
    pub status: StatusState,
    pub modals: ModalState,
    pub form: FormState,
    pub stats: StatsState,
    pub pomodoro: TimerState,
    pub snapshot: SnapshotState,
}

impl App {
    pub fn new(config: Config, database: Database, username: String) -> Result<Self, TuiError> {
        let guard = SnapshotGuard::from_schedule(&config.schedule)?;
        let timer = PomodoroTimer::new(config.pomodoro.clone());
        crate::auth::record_login(&database, &username);

        let mut app = Self {
            config,
            database,
            username,
            tasks: Vec::new(),
            diary_entries: Vec::new(),
            posts: Vec::new(),
            leaderboard: Vec::new(),
            leaderboard_period: LeaderboardPeriod::Weekly,
            ui: UiState::default(),
            status: StatusState::default(),
            modals: ModalState::default(),
            form: FormState::default(),
            stats: StatsState::default(),
            pomodoro: TimerState {
                timer,
                last_tick: Instant::now(),
                bell_pending: false,
            },
            snapshot: SnapshotState { guard, last_poll: None },
        };

        app.load_data()?;
        app.sync_list_states();
        Ok(app)
    }

    pub fn load_data(&mut self) -> Result<(), TuiError> {
        self.load_tasks()?;
        self.diary_entries = self.database.get_diary_entries(&self.username)?;
        self.posts = self.database.get_recent_posts(DEFAULT_FEED_LIMIT)?;
        self.load_sessions()?;
        self.load_leaderboard()?;
        self.load_stats()?;
        Ok(())
    }

    pub fn load_tasks(&mut self) -> Result<(), DatabaseError> {
        self.tasks = self.database.get_tasks_for_user(&self.username)?;
        Ok(())
    }

    pub fn load_sessions(&mut self) -> Result<(), DatabaseError> {
        let start = utils::week_start(utils::today()).format("%Y-%m-%d").to_string();
        self.stats.week_sessions = self.database.get_sessions_since(&self.username, &start)?;
        Ok(())
    }

    pub fn load_leaderboard(&mut self) -> Result<(), DatabaseError> {
        self.leaderboard = leaderboard::ranking(&self.database, self.leaderboard_period, utils::today())?;
        Ok(())
    }

    pub fn load_stats(&mut self) -> Result<(), TuiError> {
        let today = utils::today();
        let since = (today - Duration::days(Period::Monthly.days() - 1)).format("%Y-%m-%d").to_string();
        self.stats.productivity_rows = self.database.get_productivity_since(&self.username, &since)?;
        self.stats.login_streak = stats::login_streak(&self.database.get_login_dates(&self.username)?, today);
        self.stats.preferences = Some(productivity::effective_preferences(
            &self.database,
            &self.username,
            today,
            &self.config.schedule,
        )?);

        match productivity::compute_for_day(&self.database, &self.username, today, &self.config.schedule) {
            Ok(snapshot) => {
                self.stats.today = Some(snapshot);
                self.stats.today_error = None;
            }
            Err(ProductivityError::DatabaseError(e)) => return Err(e.into()),
            Err(e) => {
                self.stats.today = None;
                self.stats.today_error = Some(e.to_string());
            }
        }
        Ok(())
    }

    fn reload(&mut self, what: &str, result: Result<(), impl Into<TuiError>>) {
        if let Err(e) = result {
            let e: TuiError = e.into();
            tracing::error!(error = %e, "failed to reload {}", what);
            self.set_status_message(format!("Failed to reload {}", what));
        }
    }

    /// Log the underlying error and show a short message in the status bar
    fn report_failure(&mut self, message: &str, err: impl std::fmt::Display) {
        tracing::error!(error = %err, "{}", message);
        self.set_status_message(message.to_string());
    }

    pub fn sync_list_states(&mut self) {
        clamp_selection(&mut self.ui.task_list_state, self.tasks.len());
        clamp_selection(&mut self.ui.diary_list_state, self.diary_entries.len());
        clamp_selection(&mut self.ui.post_list_state, self.posts.len());
    }

    fn current_list(&mut self) -> Option<(&mut ListState, usize)> {
        match self.ui.current_tab {
            Tab::Tasks => Some((&mut self.ui.task_list_state, self.tasks.len())),
            Tab::Diary => Some((&mut self.ui.diary_list_state, self.diary_entries.len())),
            Tab::Community => Some((&mut self.ui.post_list_state, self.posts.len())),
            _ => None,
        }
    }

    pub fn move_selection_up(&mut self) {
        if let Some((state, len)) = self.current_list() {
            if len > 0 {
                let index = state.selected().unwrap_or(0).saturating_sub(1);
                state.select(Some(index));
            }
        }
    }

    pub fn move_selection_down(&mut self) {
        if let Some((state, len)) = self.current_list() {
            if len > 0 {
                let index = state.selected().map(|i| (i + 1).min(len - 1)).unwrap_or(0);
                state.select(Some(index));
            }
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.ui.task_list_state.selected().and_then(|i| self.tasks.get(i))
    }

    pub fn selected_diary_entry(&self) -> Option<&DiaryEntry> {
        self.ui.diary_list_state.selected().and_then(|i| self.diary_entries.get(i))
    }

    pub fn selected_post(&self) -> Option<&CommunityPost> {
        self.ui.post_list_state.selected().and_then(|i| self.posts.get(i))
    }

    pub fn switch_tab(&mut self, new_tab: Tab) {
        if self.ui.current_tab != new_tab {
            self.ui.current_tab = new_tab;
            self.ui.mode = Mode::View;
        }
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Check if status message should be auto-cleared (after 3 seconds)
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }

    pub fn enter_help_mode(&mut self) {
        self.ui.mode = Mode::Help;
    }

    pub fn exit_help_mode(&mut self) {
        self.ui.mode = Mode::View;
    }

    /// Leave any form without saving
    pub fn cancel_form(&mut self) {
        self.form = FormState::default();
        self.ui.mode = Mode::View;
    }

    pub fn time_overview(&self) -> TimeOverview {
        TimeOverview::from_tasks(&self.tasks)
    }

    // ---- tasks ----

    pub fn enter_task_form(&mut self) {
        self.form.task_form = Some(TaskForm::default());
        self.ui.mode = Mode::TaskForm;
    }

    pub fn save_task_form(&mut self) {
        let Some((description, minutes)) = self
            .form
            .task_form
            .as_ref()
            .map(|f| (f.description.value(), f.minutes.value()))
        else {
            return;
        };
        let duration = match minutes.trim() {
            "" => None,
            value => match value.parse::<i64>() {
                Ok(m) => Some(m),
                Err(_) => {
                    self.set_status_message(TaskError::InvalidDuration.to_string());
                    return;
                }
            },
        };

        match tasks::add_task(&self.database, &self.username, &description, duration) {
            Ok(task) => {
                self.cancel_form();
                let result = self.load_tasks();
                self.reload("tasks", result);
                if let Some(index) = self.tasks.iter().position(|t| t.id == task.id) {
                    self.ui.task_list_state.select(Some(index));
                }
                self.set_status_message(format!("Task added: {}", task.description));
            }
            Err(TaskError::DatabaseError(e)) => self.report_failure("Failed to add task", e),
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    pub fn toggle_selected_task(&mut self) {
        let Some(id) = self.selected_task().and_then(|t| t.id) else {
            return;
        };
        match tasks::toggle_task(&self.database, &self.username, id) {
            Ok(task) => {
                let result = self.load_tasks();
                self.reload("tasks", result);
                let result = self.load_stats();
                self.reload("stats", result);
                let state = if task.completed { "completed" } else { "reopened" };
                self.set_status_message(format!("Task {}", state));
            }
            Err(e) => self.report_failure("Failed to update task", e),
        }
    }

    /// Hand the selected task to the timer and switch to the Pomodoro tab
    pub fn start_selected_task(&mut self) {
        let Some(task) = self.selected_task().cloned() else {
            return;
        };
        let Some(id) = task.id else {
            return;
        };
        self.pomodoro.timer.attach_task(AttachedTask {
            id,
            description: task.description.clone(),
            minutes: task.duration,
        });
        self.pomodoro.timer.start();
        self.pomodoro.last_tick = Instant::now();
        self.switch_tab(Tab::Pomodoro);
        self.set_status_message(format!("Focusing on: {}", task.description));
    }

    // ---- delete confirmation ----

    pub fn request_delete(&mut self) {
        let pending = match self.ui.current_tab {
            Tab::Tasks => self.selected_task().cloned().map(PendingDelete::Task),
            Tab::Community => match self.selected_post().cloned() {
                Some(post) if post.username == self.username => Some(PendingDelete::Post(post)),
                Some(_) => {
                    self.set_status_message("You can only delete your own posts".to_string());
                    None
                }
                None => None,
            },
            _ => None,
        };
        if pending.is_some() {
            self.modals.delete_confirmation = pending;
            self.modals.delete_modal_selection = 0;
        }
    }

    pub fn confirm_delete(&mut self) {
        let Some(pending) = self.modals.delete_confirmation.take() else {
            return;
        };
        if self.modals.delete_modal_selection != 0 {
            return;
        }
        match pending {
            PendingDelete::Task(task) => {
                let Some(id) = task.id else { return };
                match tasks::delete_task(&self.database, &self.username, id) {
                    Ok(()) => {
                        let result = self.load_tasks();
                        self.reload("tasks", result);
                        self.sync_list_states();
                        self.set_status_message("Task deleted".to_string());
                    }
                    Err(e) => self.report_failure("Failed to delete task", e),
                }
            }
            PendingDelete::Post(post) => {
                let Some(id) = post.id else { return };
                match community::delete_post(&self.database, &self.username, id) {
                    Ok(()) => {
                        self.reload_posts();
                        self.set_status_message("Post deleted".to_string());
                    }
                    Err(e) => self.report_failure("Failed to delete post", e),
                }
            }
        }
    }

    // ---- pomodoro ----

    pub fn toggle_timer(&mut self) {
        self.pomodoro.timer.toggle();
        self.pomodoro.last_tick = Instant::now();
    }

    pub fn reset_timer(&mut self) {
        self.pomodoro.timer.reset();
        self.set_status_message("Timer reset".to_string());
    }

    pub fn detach_timer_task(&mut self) {
        if self.pomodoro.timer.task().is_some() {
            self.pomodoro.timer.detach_task();
            self.set_status_message("Task detached from timer".to_string());
        }
    }

    /// Advance the countdown by one second and react to a finished phase
    pub fn on_timer_tick(&mut self) {
        let Some(event) = self.pomodoro.timer.tick() else {
            return;
        };
        match event {
            TimerEvent::WorkCompleted { duration_secs, task } => {
                let description = task.as_ref().map(|t| t.description.as_str());
                match pomodoro::log_session(&self.database, &self.username, duration_secs, description) {
                    Ok(_) => {
                        let result = self.load_sessions();
                        self.reload("sessions", result);
                        let result = self.load_leaderboard();
                        self.reload("leaderboard", result);
                        self.set_status_message("Focus session complete, time for a break".to_string());
                    }
                    Err(e) => self.report_failure("Failed to save session", e),
                }
            }
            TimerEvent::BreakCompleted => {
                self.set_status_message("Break over, ready to focus".to_string());
            }
        }
        if self.config.pomodoro.bell_on_complete {
            self.pomodoro.bell_pending = true;
        }
    }

    pub fn todays_sessions(&self) -> Vec<&PomodoroSession> {
        stats::sessions_on(&self.stats.week_sessions, utils::today())
    }

    // ---- end of day snapshot ----

    pub fn on_snapshot_poll(&mut self, now: NaiveDateTime) {
        self.snapshot.last_poll = Some(Instant::now());
        let Some(date) = self.snapshot.guard.poll(now) else {
            return;
        };
        match productivity::record_snapshot(&self.database, &self.username, date, &self.config.schedule) {
            Ok(snapshot) => {
                let result = self.load_stats();
                self.reload("stats", result);
                self.set_status_message(format!("Today's productivity saved: {:.1}%", snapshot.productivity));
            }
            Err(e) => self.report_failure("Failed to save today's productivity", e),
        }
    }

    // ---- diary ----

    pub fn enter_diary_form(&mut self, date: String) {
        self.form.diary_form = Some(DiaryForm::new(date, &self.diary_entries));
        self.ui.mode = Mode::DiaryForm;
    }

    pub fn edit_selected_diary_entry(&mut self) {
        let date = self
            .selected_diary_entry()
            .map(|e| e.date.clone())
            .unwrap_or_else(utils::get_current_date_string);
        self.enter_diary_form(date);
    }

    pub fn save_diary_form(&mut self) {
        let Some(form) = self.form.diary_form.as_ref() else {
            return;
        };
        let date = form.date.clone();
        let draft = form.to_draft();
        match diary::save_entry(&self.database, &self.username, &date, &draft) {
            Ok(outcome) => {
                self.cancel_form();
                match self.database.get_diary_entries(&self.username) {
                    Ok(entries) => self.diary_entries = entries,
                    Err(e) => self.report_failure("Failed to reload diary", e),
                }
                if let Some(index) = self.diary_entries.iter().position(|e| e.date == date) {
                    self.ui.diary_list_state.select(Some(index));
                }
                let verb = match outcome {
                    SaveOutcome::Created => "saved",
                    SaveOutcome::Updated => "updated",
                };
                self.set_status_message(format!("Diary entry {}", verb));
            }
            Err(DiaryError::DatabaseError(e)) => self.report_failure("Failed to save diary entry", e),
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    // ---- stats & preferences ----

    pub fn toggle_stats_period(&mut self) {
        self.stats.period = self.stats.period.toggled();
    }

    pub fn enter_prefs_form(&mut self) {
        let (wake, sleep) = match &self.stats.preferences {
            Some(p) => (p.wake_time.clone(), p.sleep_time.clone()),
            None => (
                self.config.schedule.default_wake_time.clone(),
                self.config.schedule.default_sleep_time.clone(),
            ),
        };
        self.form.prefs_form = Some(PrefsForm {
            date: utils::get_current_date_string(),
            current_field: PrefsField::Wake,
            wake: Editor::from_string(&wake),
            sleep: Editor::from_string(&sleep),
        });
        self.ui.mode = Mode::PrefsForm;
    }

    pub fn save_prefs_form(&mut self) {
        let Some((date, wake, sleep)) = self
            .form
            .prefs_form
            .as_ref()
            .map(|f| (f.date.clone(), f.wake.value(), f.sleep.value()))
        else {
            return;
        };
        let (Ok(wake_time), Ok(sleep_time)) = (utils::parse_clock_time(&wake), utils::parse_clock_time(&sleep)) else {
            self.set_status_message("Times must be HH:MM".to_string());
            return;
        };
        let prefs = UserPreferences {
            username: self.username.clone(),
            date,
            wake_time: wake_time.format("%H:%M").to_string(),
            sleep_time: sleep_time.format("%H:%M").to_string(),
        };
        match self.database.upsert_preferences(&prefs) {
            Ok(()) => {
                self.cancel_form();
                let result = self.load_stats();
                self.reload("stats", result);
                self.set_status_message("Preferences saved".to_string());
            }
            Err(e) => self.report_failure("Failed to save preferences", e),
        }
    }

    // ---- leaderboard ----

    pub fn cycle_leaderboard_period(&mut self) {
        self.leaderboard_period = self.leaderboard_period.next();
        let result = self.load_leaderboard();
        self.reload("leaderboard", result);
    }

    // ---- community ----

    pub fn enter_compose_mode(&mut self) {
        self.form.compose = Some(Editor::new());
        self.ui.mode = Mode::Compose;
    }

    fn reload_posts(&mut self) {
        match self.database.get_recent_posts(DEFAULT_FEED_LIMIT) {
            Ok(posts) => self.posts = posts,
            Err(e) => self.report_failure("Failed to reload posts", e),
        }
        self.sync_list_states();
    }

    pub fn submit_post(&mut self) {
        let Some(content) = self.form.compose.as_ref().map(Editor::value) else {
            return;
        };
        match community::post_message(&self.database, &self.username, &content) {
            Ok(_) => {
                self.cancel_form();
                self.reload_posts();
                self.ui.post_list_state.select(Some(0));
                self.set_status_message("Posted".to_string());
            }
            Err(CommunityError::DatabaseError(e)) => self.report_failure("Failed to post", e),
            Err(e) => self.set_status_message(e.to_string()),
        }
    }
}

fn clamp_selection(state: &mut ListState, len: usize) {
    if len == 0 {
        state.select(None);
    } else {
        let index = state.selected().unwrap_or(0).min(len - 1);
        state.select(Some(index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PomodoroSettings;

    fn app() -> App {
        let mut config = Config::default();
        config.pomodoro = PomodoroSettings {
            work_minutes: 1,
            short_break_minutes: 1,
            long_break_minutes: 1,
            long_break_interval: 4,
            bell_on_complete: true,
        };
        App::new(config, Database::open_in_memory().unwrap(), "ana".into()).unwrap()
    }

    fn type_into(editor: &mut Editor, text: &str) {
        editor.clear();
        for ch in text.chars() {
            editor.insert_char(ch);
        }
    }

    #[test]
    fn startup_records_todays_login() {
        let app = app();
        assert_eq!(
            app.database.get_login_dates("ana").unwrap(),
            vec![utils::get_current_date_string()]
        );
        assert_eq!(app.stats.login_streak, 1);
    }

    #[test]
    fn tabs_stop_at_the_ends() {
        assert_eq!(Tab::Tasks.previous(), Tab::Tasks);
        assert_eq!(Tab::Community.next(), Tab::Community);
        assert_eq!(Tab::Diary.next(), Tab::Stats);
    }

    #[test]
    fn task_form_adds_and_selects() {
        let mut app = app();
        app.enter_task_form();
        let form = app.form.task_form.as_mut().unwrap();
        type_into(&mut form.description, "Write report");
        type_into(&mut form.minutes, "45");
        app.save_task_form();

        assert_eq!(app.ui.mode, Mode::View);
        assert_eq!(app.tasks.len(), 1);
        assert_eq!(app.selected_task().unwrap().duration, 45);
    }

    #[test]
    fn invalid_task_keeps_the_form_open() {
        let mut app = app();
        app.enter_task_form();
        app.save_task_form();

        assert_eq!(app.ui.mode, Mode::TaskForm);
        assert_eq!(app.status.message.as_deref(), Some("Task description cannot be empty"));
        assert!(app.tasks.is_empty());
    }

    #[test]
    fn completed_focus_phase_is_logged_with_its_task() {
        let mut app = app();
        tasks::add_task(&app.database, "ana", "Study graphs", Some(1)).unwrap();
        app.load_tasks().unwrap();
        app.sync_list_states();

        app.start_selected_task();
        assert_eq!(app.ui.current_tab, Tab::Pomodoro);
        for _ in 0..60 {
            app.on_timer_tick();
        }

        assert_eq!(app.todays_sessions().len(), 1);
        assert_eq!(app.todays_sessions()[0].task_description.as_deref(), Some("Study graphs"));
        assert!(app.pomodoro.bell_pending);
    }

    #[test]
    fn delete_needs_confirmation() {
        let mut app = app();
        tasks::add_task(&app.database, "ana", "Throwaway", None).unwrap();
        app.load_tasks().unwrap();
        app.sync_list_states();

        app.request_delete();
        app.modals.delete_modal_selection = 1;
        app.confirm_delete();
        assert_eq!(app.tasks.len(), 1);

        app.request_delete();
        app.confirm_delete();
        assert!(app.tasks.is_empty());
    }

    #[test]
    fn diary_form_scores_stay_in_range() {
        let mut app = app();
        app.enter_diary_form("2024-05-01".into());
        let form = app.form.diary_form.as_mut().unwrap();
        form.current_field = 2;
        for _ in 0..20 {
            form.adjust_score(1);
        }
        assert_eq!(form.draft.scores.task_completion, 10);
        form.current_field = 6;
        form.toggle_habit();
        app.save_diary_form();

        assert_eq!(app.diary_entries.len(), 1);
        assert_eq!(app.diary_entries[0].scores.task_completion, 10);
        assert!(app.diary_entries[0].habits[0].completed);
    }

    #[test]
    fn others_posts_cannot_be_deleted() {
        let mut app = app();
        community::post_message(&app.database, "bob", "hello").unwrap();
        app.reload_posts();
        app.switch_tab(Tab::Community);

        app.request_delete();
        assert!(app.modals.delete_confirmation.is_none());
        assert_eq!(app.status.message.as_deref(), Some("You can only delete your own posts"));
    }
}
