use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use thiserror::Error;

use crate::auth::{self, AuthError};
use crate::community::{self, CommunityError, DEFAULT_FEED_LIMIT};
use crate::config::{Config, MAX_PHASE_MINUTES};
use crate::database::{Database, DatabaseError};
use crate::diary::{self, DiaryDraft, DiaryError, SaveOutcome};
use crate::leaderboard::{self, LeaderboardPeriod};
use crate::mail::{self, MailError, MailResponse, SendGridMailer};
use crate::pomodoro::{self, AttachedTask, PomodoroTimer, TimerEvent};
use crate::productivity::{self, ProductivityError};
use crate::session::{Session, SessionError};
use crate::stats::{self, Period};
use crate::tasks::{self, TaskError};
use crate::utils::{self, Profile, format_duration, format_minutes, format_timer, parse_clock_time, parse_date};

#[derive(Parser)]
#[command(name = "habitup")]
#[command(about = "HabitUp - tasks, pomodoro, diary and habit tracking in the terminal")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive dashboard (default if no subcommand)
    Tui,
    /// Create an account
    Register {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and remember the session
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the current session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Mail the username registered to an address
    ForgotUsername {
        #[arg(long)]
        email: String,
    },
    /// Request or confirm a password reset
    ResetPassword {
        #[command(subcommand)]
        action: ResetAction,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Focus sessions
    Pomodoro {
        #[command(subcommand)]
        action: PomodoroAction,
    },
    /// Daily diary entries
    Diary {
        #[command(subcommand)]
        action: DiaryAction,
    },
    /// Wake and sleep times
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Focus and productivity statistics
    Stats {
        #[command(subcommand)]
        action: StatsAction,
    },
    /// Daily productivity records
    Productivity {
        #[command(subcommand)]
        action: ProductivityAction,
    },
    /// Rank users by focus time
    Leaderboard {
        /// weekly, monthly or all
        #[arg(long, default_value = "weekly")]
        period: LeaderboardPeriod,
    },
    /// Community board
    Community {
        #[command(subcommand)]
        action: CommunityAction,
    },
    /// Answer a username email request read as JSON from stdin
    MailHook,
}

#[derive(Subcommand)]
pub enum ResetAction {
    /// Verify username and email, then mail a reset code
    Request {
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Set a new password using a mailed code
    Confirm {
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
pub enum TaskAction {
    Add {
        description: String,
        /// Planned minutes
        #[arg(long)]
        duration: Option<i64>,
    },
    List,
    Done { id: i64 },
    Undo { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum PomodoroAction {
    /// Record a finished session
    Log {
        minutes: i64,
        #[arg(long)]
        task: Option<String>,
    },
    /// Run a work phase in the foreground
    Start {
        #[arg(long)]
        task_id: Option<i64>,
        #[arg(long)]
        minutes: Option<u64>,
    },
    /// Sessions of the current week
    List,
}

#[derive(Subcommand)]
pub enum DiaryAction {
    Show {
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    List,
    Save {
        #[arg(long)]
        date: Option<String>,
        /// Advice to your younger self
        #[arg(long)]
        younger_self: Option<String>,
        /// Lesson of the day
        #[arg(long)]
        lesson: Option<String>,
        #[arg(long)]
        task_completion: Option<i64>,
        #[arg(long)]
        focus: Option<i64>,
        #[arg(long)]
        time_management: Option<i64>,
        #[arg(long)]
        energy: Option<i64>,
        /// Completed habit; repeat for several
        #[arg(long = "habit")]
        habits: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum PrefsAction {
    Show {
        #[arg(long)]
        date: Option<String>,
    },
    Set {
        #[arg(long)]
        date: Option<String>,
        /// HH:MM
        #[arg(long)]
        wake: Option<String>,
        /// HH:MM
        #[arg(long)]
        sleep: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum StatsAction {
    /// Focus minutes per day of the current week
    Week,
    /// Productivity over the last 7 or 30 days
    Productivity {
        #[arg(long, default_value = "weekly")]
        period: Period,
    },
    /// Today's worked time against available hours
    Today,
}

#[derive(Subcommand)]
pub enum ProductivityAction {
    /// Compute and store the productivity row for a day
    Snapshot {
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CommunityAction {
    Post { text: String },
    List {
        #[arg(long, default_value_t = DEFAULT_FEED_LIMIT)]
        limit: usize,
    },
    Delete { id: i64 },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("{0}")]
    AuthError(#[from] AuthError),
    #[error("{0}")]
    SessionError(#[from] SessionError),
    #[error("{0}")]
    TaskError(#[from] TaskError),
    #[error("{0}")]
    DiaryError(#[from] DiaryError),
    #[error("{0}")]
    CommunityError(#[from] CommunityError),
    #[error("{0}")]
    ProductivityError(#[from] ProductivityError),
    #[error("{0}")]
    MailError(#[from] MailError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Invalid time '{0}', expected HH:MM")]
    TimeParseError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Everything a command handler needs
pub struct CliContext {
    pub db: Database,
    pub config: Config,
    pub profile: Profile,
}

impl CliContext {
    fn username(&self) -> Result<String, CliError> {
        Ok(Session::require(self.profile)?.username)
    }

    fn mailer(&self) -> Result<SendGridMailer, CliError> {
        Ok(SendGridMailer::from_settings(&self.config.mail)?)
    }
}

fn date_or_today(date: Option<String>) -> Result<chrono::NaiveDate, CliError> {
    match date {
        Some(d) => parse_date(&d).map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", d, e))),
        None => Ok(utils::today()),
    }
}

fn checked_time(value: String) -> Result<String, CliError> {
    parse_clock_time(&value)
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| CliError::TimeParseError(value))
}

impl Commands {
    /// Account and mail plumbing commands work without a logged-in user
    pub fn requires_session(&self) -> bool {
        !matches!(
            self,
            Commands::Register { .. }
                | Commands::Login { .. }
                | Commands::Logout
                | Commands::ForgotUsername { .. }
                | Commands::ResetPassword { .. }
                | Commands::MailHook
        )
    }
}

/// Dispatch every command except `tui`, which the binary runs itself
pub fn run(command: Commands, ctx: &CliContext) -> Result<(), CliError> {
    if command.requires_session() {
        Session::require(ctx.profile)?;
    }
    match command {
        Commands::Tui => Ok(()),
        Commands::Register { username, email, password } => handle_register(ctx, &username, &email, &password),
        Commands::Login { username, password } => handle_login(ctx, &username, &password),
        Commands::Logout => {
            if Session::clear_with_profile(ctx.profile)? {
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
            Ok(())
        }
        Commands::Whoami => {
            let session = Session::require(ctx.profile)?;
            println!("{} (since {})", session.username, session.logged_in_at);
            Ok(())
        }
        Commands::ForgotUsername { email } => {
            auth::request_username_reminder(&ctx.db, &ctx.mailer()?, &email)?;
            println!("If your email is registered, you will receive your username shortly.");
            Ok(())
        }
        Commands::ResetPassword { action } => handle_reset(ctx, action),
        Commands::Task { action } => handle_task(ctx, action),
        Commands::Pomodoro { action } => handle_pomodoro(ctx, action),
        Commands::Diary { action } => handle_diary(ctx, action),
        Commands::Prefs { action } => handle_prefs(ctx, action),
        Commands::Stats { action } => handle_stats(ctx, action),
        Commands::Productivity { action } => handle_productivity(ctx, action),
        Commands::Leaderboard { period } => handle_leaderboard(ctx, period),
        Commands::Community { action } => handle_community(ctx, action),
        Commands::MailHook => handle_mail_hook(ctx),
    }
}

fn handle_register(ctx: &CliContext, username: &str, email: &str, password: &str) -> Result<(), CliError> {
    let user = auth::register_user(&ctx.db, username, email, password)?;
    println!("Account created for {}. Log in with `habitup login {}`.", user.username, user.username);
    Ok(())
}

fn handle_login(ctx: &CliContext, username: &str, password: &str) -> Result<(), CliError> {
    let user = auth::login_user(&ctx.db, username, password)?;
    Session::new(&user.username).save_with_profile(ctx.profile)?;
    println!("Welcome back, {}!", user.username);
    Ok(())
}

fn handle_reset(ctx: &CliContext, action: ResetAction) -> Result<(), CliError> {
    match action {
        ResetAction::Request { username, email } => {
            auth::request_password_reset(&ctx.db, &ctx.mailer()?, &username, &email)?;
            println!(
                "A reset code was sent to {}. It is valid for {} minutes.",
                email.trim(),
                auth::RESET_TOKEN_TTL_MINUTES
            );
        }
        ResetAction::Confirm { token, password } => {
            auth::reset_password(&ctx.db, &token, &password)?;
            println!("Password updated. You can log in now.");
        }
    }
    Ok(())
}

fn handle_task(ctx: &CliContext, action: TaskAction) -> Result<(), CliError> {
    let username = ctx.username()?;
    match action {
        TaskAction::Add { description, duration } => {
            let task = tasks::add_task(&ctx.db, &username, &description, duration)?;
            println!(
                "Task created successfully (ID: {}, {})",
                task.id.unwrap_or_default(),
                format_duration(task.duration)
            );
        }
        TaskAction::List => {
            let list = ctx.db.get_tasks_for_user(&username)?;
            if list.is_empty() {
                println!("No tasks yet");
                return Ok(());
            }
            for task in &list {
                println!(
                    "{:>4}  [{}]  {:<40}  {}",
                    task.id.unwrap_or_default(),
                    if task.completed { "x" } else { " " },
                    task.description,
                    format_duration(task.duration)
                );
            }
            let overview = tasks::TimeOverview::from_tasks(&list);
            println!(
                "\nTotal {}  Completed {}  Remaining {}",
                format_duration(overview.total),
                format_duration(overview.completed),
                format_duration(overview.remaining)
            );
        }
        TaskAction::Done { id } => {
            let task = tasks::set_completed(&ctx.db, &username, id, true)?;
            println!("Completed: {}", task.description);
        }
        TaskAction::Undo { id } => {
            let task = tasks::set_completed(&ctx.db, &username, id, false)?;
            println!("Reopened: {}", task.description);
        }
        TaskAction::Delete { id } => {
            tasks::delete_task(&ctx.db, &username, id)?;
            println!("Task {} deleted", id);
        }
    }
    Ok(())
}

fn handle_pomodoro(ctx: &CliContext, action: PomodoroAction) -> Result<(), CliError> {
    let username = ctx.username()?;
    match action {
        PomodoroAction::Log { minutes, task } => {
            let minutes = tasks::validate_minutes(minutes)?;
            pomodoro::log_session(&ctx.db, &username, (minutes as u64).saturating_mul(60), task.as_deref())?;
            println!("Logged {} of focus", format_duration(minutes));
        }
        PomodoroAction::Start { task_id, minutes } => {
            let mut settings = ctx.config.pomodoro.clone();
            if let Some(minutes) = minutes {
                settings.work_minutes = minutes.clamp(1, MAX_PHASE_MINUTES);
            }
            let mut timer = PomodoroTimer::new(settings);
            if let Some(id) = task_id {
                let task = ctx.db.get_task(id, &username)?.ok_or(TaskError::NotFound(id))?;
                timer.attach_task(AttachedTask {
                    id,
                    description: task.description,
                    minutes: task.duration,
                });
            }
            run_foreground_timer(ctx, &username, timer)?;
        }
        PomodoroAction::List => {
            let week_start = utils::week_start(utils::today());
            let sessions = ctx.db.get_sessions_since(&username, &week_start.format("%Y-%m-%d").to_string())?;
            if sessions.is_empty() {
                println!("No sessions this week");
            }
            for session in &sessions {
                println!(
                    "{}  {:>7}  {}",
                    session.completed_at,
                    format_minutes(session.duration as f64 / 60.0),
                    session.task_description.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

/// Count down one work phase on stdout, then log it
fn run_foreground_timer(ctx: &CliContext, username: &str, mut timer: PomodoroTimer) -> Result<(), CliError> {
    let label = timer.task().map(|t| t.description.clone()).unwrap_or_else(|| "Focus".to_string());
    let mut stdout = std::io::stdout();
    timer.start();
    loop {
        print!("\r{}  {}   ", label, format_timer(timer.remaining_secs()));
        stdout.flush()?;
        std::thread::sleep(std::time::Duration::from_secs(1));

        if let Some(TimerEvent::WorkCompleted { duration_secs, task }) = timer.tick() {
            let description = task.map(|t| t.description);
            pomodoro::log_session(&ctx.db, username, duration_secs, description.as_deref())?;
            if ctx.config.pomodoro.bell_on_complete {
                print!("\x07");
            }
            println!("\rSession complete: {} of focus logged", format_minutes(duration_secs as f64 / 60.0));
            return Ok(());
        }
    }
}

fn print_entry(entry: &crate::models::DiaryEntry) {
    println!("Day {} - {}", entry.day_number, entry.date);
    println!("Younger self: {}", entry.younger_self);
    println!("Lesson:       {}", entry.lesson);
    for (i, label) in crate::models::Scores::LABELS.iter().enumerate() {
        println!("{:<16} {}/10", label, entry.scores.get(i));
    }
    for habit in &entry.habits {
        println!("[{}] {}", if habit.completed { "x" } else { " " }, habit.habit_name);
    }
}

fn handle_diary(ctx: &CliContext, action: DiaryAction) -> Result<(), CliError> {
    let username = ctx.username()?;
    match action {
        DiaryAction::Show { date } => {
            let date = date_or_today(date)?.format("%Y-%m-%d").to_string();
            match ctx.db.get_diary_entry(&username, &date)? {
                Some(entry) => print_entry(&entry),
                None => println!("No entry for {}", date),
            }
        }
        DiaryAction::List => {
            for entry in diary::fetch_entries(&ctx.db, &username)? {
                let done = entry.habits.iter().filter(|h| h.completed).count();
                println!(
                    "{}  Day {:<4} habits {}/{}  {}",
                    entry.date,
                    entry.day_number,
                    done,
                    entry.habits.len(),
                    entry.lesson
                );
            }
        }
        DiaryAction::Save {
            date,
            younger_self,
            lesson,
            task_completion,
            focus,
            time_management,
            energy,
            habits,
        } => {
            let date = date_or_today(date)?.format("%Y-%m-%d").to_string();
            let entries = diary::fetch_entries(&ctx.db, &username)?;
            let mut draft = DiaryDraft::for_date(&entries, &date);
            if let Some(text) = younger_self {
                draft.younger_self = text;
            }
            if let Some(text) = lesson {
                draft.lesson = text;
            }
            let scores = [task_completion, focus, time_management, energy];
            for (i, score) in scores.into_iter().enumerate() {
                if let Some(value) = score {
                    match i {
                        0 => draft.scores.task_completion = value,
                        1 => draft.scores.focus_level = value,
                        2 => draft.scores.time_management = value,
                        _ => draft.scores.energy_level = value,
                    }
                }
            }
            if !habits.is_empty() {
                draft.set_completed_habits(&habits);
            }
            match diary::save_entry(&ctx.db, &username, &date, &draft)? {
                SaveOutcome::Created => println!("Diary entry for {} created", date),
                SaveOutcome::Updated => println!("Diary entry for {} updated", date),
            }
        }
    }
    Ok(())
}

fn handle_prefs(ctx: &CliContext, action: PrefsAction) -> Result<(), CliError> {
    let username = ctx.username()?;
    match action {
        PrefsAction::Show { date } => {
            let date = date_or_today(date)?;
            let prefs = productivity::effective_preferences(&ctx.db, &username, date, &ctx.config.schedule)?;
            println!("Wake {}  Sleep {}  (set {})", prefs.wake_time, prefs.sleep_time, prefs.date);
        }
        PrefsAction::Set { date, wake, sleep } => {
            let date = date_or_today(date)?;
            let mut prefs = productivity::effective_preferences(&ctx.db, &username, date, &ctx.config.schedule)?;
            prefs.date = date.format("%Y-%m-%d").to_string();
            if let Some(wake) = wake {
                prefs.wake_time = checked_time(wake)?;
            }
            if let Some(sleep) = sleep {
                prefs.sleep_time = checked_time(sleep)?;
            }
            ctx.db.upsert_preferences(&prefs)?;
            println!("Saved: wake {}  sleep {} from {}", prefs.wake_time, prefs.sleep_time, prefs.date);
        }
    }
    Ok(())
}

fn handle_stats(ctx: &CliContext, action: StatsAction) -> Result<(), CliError> {
    let username = ctx.username()?;
    let today = utils::today();
    match action {
        StatsAction::Week => {
            let start = utils::week_start(today);
            let sessions = ctx.db.get_sessions_since(&username, &start.format("%Y-%m-%d").to_string())?;
            let rows = ctx.db.get_productivity_since(&username, &start.format("%Y-%m-%d").to_string())?;
            let buckets = stats::weekly_overview(&sessions, start);
            println!("Day     Focus  Worked");
            for (bucket, (_, hours)) in buckets.iter().zip(stats::weekly_work_hours(&rows, start)) {
                println!("{}  {:>8}  {:>5.1}h", bucket.label, format_minutes(bucket.minutes), hours);
            }
            let totals = stats::WeekTotals::from_buckets(&buckets);
            println!(
                "\nTotal {}  Daily average {}",
                format_minutes(totals.total),
                format_minutes(totals.daily_average)
            );
            for (category, minutes) in stats::focus_distribution(&sessions) {
                println!("  {:<20} {}", category, format_minutes(minutes));
            }
        }
        StatsAction::Productivity { period } => {
            let since = today - chrono::Duration::days(period.days() - 1);
            let rows = ctx.db.get_productivity_since(&username, &since.format("%Y-%m-%d").to_string())?;
            for point in stats::productivity_overview(&rows, period, today) {
                println!("{}  {:>5.1}%", point.date.format("%a %m-%d"), point.productivity);
            }
        }
        StatsAction::Today => {
            let snapshot = productivity::compute_for_day(&ctx.db, &username, today, &ctx.config.schedule)?;
            println!(
                "Worked {} of {:.1}h available ({} to {}): {:.1}%",
                format_duration(snapshot.worked_minutes),
                snapshot.available_hours,
                snapshot.wake_time.format("%H:%M"),
                snapshot.sleep_time.format("%H:%M"),
                snapshot.productivity
            );
        }
    }
    Ok(())
}

fn handle_productivity(ctx: &CliContext, action: ProductivityAction) -> Result<(), CliError> {
    let username = ctx.username()?;
    match action {
        ProductivityAction::Snapshot { date } => {
            let date = date_or_today(date)?;
            let snapshot = productivity::record_snapshot(&ctx.db, &username, date, &ctx.config.schedule)?;
            println!("Recorded {:.1}% for {}", snapshot.productivity, date);
        }
    }
    Ok(())
}

fn handle_leaderboard(ctx: &CliContext, period: LeaderboardPeriod) -> Result<(), CliError> {
    let rows = leaderboard::ranking(&ctx.db, period, utils::today())?;
    println!("{}", period.label());
    println!("{:>4}  {:<20} {:>10} {:>7} {:>6}", "#", "User", "Focus", "Streak", "Tasks");
    for row in rows {
        println!(
            "{:>4}  {:<20} {:>10} {:>7} {:>6}",
            row.rank,
            row.username,
            format_minutes(row.focus_minutes),
            row.login_streak,
            row.tasks_completed
        );
    }
    Ok(())
}

fn handle_community(ctx: &CliContext, action: CommunityAction) -> Result<(), CliError> {
    match action {
        CommunityAction::Post { text } => {
            let post = community::post_message(&ctx.db, &ctx.username()?, &text)?;
            println!("Posted (ID: {})", post.id.unwrap_or_default());
        }
        CommunityAction::List { limit } => {
            for post in community::recent_posts(&ctx.db, limit)? {
                println!(
                    "#{} {} @{}: {}",
                    post.id.unwrap_or_default(),
                    post.created_at,
                    post.username,
                    post.content
                );
            }
        }
        CommunityAction::Delete { id } => {
            community::delete_post(&ctx.db, &ctx.username()?, id)?;
            println!("Post {} deleted", id);
        }
    }
    Ok(())
}

fn handle_mail_hook(ctx: &CliContext) -> Result<(), CliError> {
    let mut body = String::new();
    std::io::stdin().read_to_string(&mut body)?;

    let response = match ctx.mailer() {
        Ok(mailer) => mail::handle_username_email(&body, &mailer),
        Err(e) => MailResponse {
            status: 500,
            body: serde_json::json!({ "error": "Failed to send username email", "details": e.to_string() }),
        },
    };
    println!("{}", serde_json::to_string(&response).unwrap_or_else(|_| response.body.to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Commands {
        let cli = Cli::try_parse_from(std::iter::once("habitup").chain(args.iter().copied())).unwrap();
        cli.command.unwrap_or(Commands::Tui)
    }

    #[rstest]
    #[case(&["leaderboard"], true)]
    #[case(&["community", "list"], true)]
    #[case(&["task", "list"], true)]
    #[case(&[], true)]
    #[case(&["register", "ana", "--email", "a@b.c", "--password", "pw"], false)]
    #[case(&["login", "ana", "--password", "pw"], false)]
    #[case(&["forgot-username", "--email", "a@b.c"], false)]
    #[case(&["mail-hook"], false)]
    fn session_gate_covers_user_commands(#[case] args: &[&str], #[case] needs_session: bool) {
        assert_eq!(parse(args).requires_session(), needs_session);
    }
}
