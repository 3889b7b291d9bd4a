use std::cell::RefCell;

use chrono::NaiveDate;
use habitup::auth::{self, AuthError};
use habitup::config::ScheduleSettings;
use habitup::diary::{self, DiaryDraft, SaveOutcome};
use habitup::mail::{EmailMessage, MailError, Mailer};
use habitup::models::UserPreferences;
use habitup::{Database, productivity, tasks};
use tempfile::TempDir;

#[derive(Default)]
struct OutboxMailer {
    sent: RefCell<Vec<EmailMessage>>,
}

impl Mailer for OutboxMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.sent.borrow_mut().push(message.clone());
        Ok(())
    }
}

fn open(dir: &TempDir) -> Database {
    let path = dir.path().join("habitup.db");
    Database::new(path.to_str().unwrap()).unwrap()
}

fn schedule() -> ScheduleSettings {
    ScheduleSettings {
        default_wake_time: "07:00".into(),
        default_sleep_time: "23:00".into(),
        snapshot_cutoff: "23:55".into(),
    }
}

#[test]
fn accounts_survive_reopening_the_database() {
    let dir = TempDir::new().unwrap();
    {
        let db = open(&dir);
        auth::register_user(&db, "ana", "ana@example.com", "s3cret").unwrap();
        assert!(matches!(
            auth::register_user(&db, "ana", "other@example.com", "pw"),
            Err(AuthError::UsernameTaken)
        ));
        assert!(matches!(
            auth::register_user(&db, "bo", "ana@example.com", "pw"),
            Err(AuthError::EmailTaken)
        ));
    }

    let db = open(&dir);
    assert_eq!(auth::login_user(&db, "ana", "s3cret").unwrap().email, "ana@example.com");
    assert!(matches!(
        auth::login_user(&db, "ana", "wrong"),
        Err(AuthError::InvalidCredentials)
    ));
}

#[test]
fn saving_the_same_day_twice_updates_one_entry() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);

    let mut draft = DiaryDraft {
        younger_self: "Sleep more".into(),
        ..DiaryDraft::default()
    };
    assert_eq!(diary::save_entry(&db, "ana", "2024-05-01", &draft).unwrap(), SaveOutcome::Created);
    draft.lesson = "Start early".into();
    assert_eq!(diary::save_entry(&db, "ana", "2024-05-01", &draft).unwrap(), SaveOutcome::Updated);
    assert_eq!(diary::save_entry(&db, "ana", "2024-05-02", &draft).unwrap(), SaveOutcome::Created);

    let entries = db.get_diary_entries("ana").unwrap();
    assert_eq!(entries.len(), 2);
    let first = entries.iter().find(|e| e.date == "2024-05-01").unwrap();
    assert_eq!(first.day_number, 1);
    assert_eq!(first.lesson, "Start early");
    assert_eq!(first.habits.len(), 4);
    assert_eq!(entries.iter().find(|e| e.date == "2024-05-02").unwrap().day_number, 2);
}

#[test]
fn username_reminder_does_not_reveal_accounts() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    auth::register_user(&db, "ana", "ana@example.com", "s3cret").unwrap();
    let mailer = OutboxMailer::default();

    auth::request_username_reminder(&db, &mailer, "nobody@example.com").unwrap();
    assert!(mailer.sent.borrow().is_empty());

    auth::request_username_reminder(&db, &mailer, "ana@example.com").unwrap();
    let sent = mailer.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ana@example.com");
    assert!(sent[0].text.contains("ana"));
}

#[test]
fn productivity_counts_tasks_completed_today() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    let today = habitup::utils::today();

    let task = tasks::add_task(&db, "ana", "Deep work", Some(96)).unwrap();
    tasks::add_task(&db, "ana", "Not done", Some(60)).unwrap();
    tasks::set_completed(&db, "ana", task.id.unwrap(), true).unwrap();

    // 07:00 to 23:00 is 16 hours; 96 minutes is 10% of that
    let snapshot = productivity::record_snapshot(&db, "ana", today, &schedule()).unwrap();
    assert_eq!(snapshot.worked_minutes, 96);
    assert!((snapshot.productivity - 10.0).abs() < 1e-9);

    let since = today.format("%Y-%m-%d").to_string();
    let rows = db.get_productivity_since("ana", &since).unwrap();
    assert_eq!(rows.len(), 1);

    // Recording again replaces the row
    productivity::record_snapshot(&db, "ana", today, &schedule()).unwrap();
    assert_eq!(db.get_productivity_since("ana", &since).unwrap().len(), 1);
}

#[test]
fn equal_wake_and_sleep_times_are_rejected() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    db.upsert_preferences(&UserPreferences {
        username: "ana".into(),
        date: "2024-05-01".into(),
        wake_time: "08:00".into(),
        sleep_time: "08:00".into(),
    })
    .unwrap();

    assert!(matches!(
        productivity::compute_for_day(&db, "ana", date, &schedule()),
        Err(productivity::ProductivityError::NoAvailableHours)
    ));
}
