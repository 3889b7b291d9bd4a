//! Pomodoro countdown driven by one-second ticks.

use crate::config::PomodoroSettings;
use crate::database::{Database, DatabaseError};
use crate::models::PomodoroSession;
use crate::utils::now_local_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Focus",
            Phase::ShortBreak => "Short break",
            Phase::LongBreak => "Long break",
        }
    }
}

/// Task handed over from the task list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedTask {
    pub id: i64,
    pub description: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    WorkCompleted {
        duration_secs: u64,
        task: Option<AttachedTask>,
    },
    BreakCompleted,
}

#[derive(Debug, Clone)]
pub struct PomodoroTimer {
    settings: PomodoroSettings,
    phase: Phase,
    remaining: u64,
    running: bool,
    completed_work: u32,
    task: Option<AttachedTask>,
}

impl PomodoroTimer {
    pub fn new(settings: PomodoroSettings) -> Self {
        let remaining = settings.work_minutes.saturating_mul(60);
        Self {
            settings,
            phase: Phase::Work,
            remaining,
            running: false,
            completed_work: 0,
            task: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_work(&self) -> u32 {
        self.completed_work
    }

    pub fn task(&self) -> Option<&AttachedTask> {
        self.task.as_ref()
    }

    pub fn phase_length(&self) -> u64 {
        match self.phase {
            Phase::Work => match &self.task {
                Some(task) => (task.minutes.max(1) as u64).saturating_mul(60),
                None => self.settings.work_minutes.saturating_mul(60),
            },
            Phase::ShortBreak => self.settings.short_break_minutes.saturating_mul(60),
            Phase::LongBreak => self.settings.long_break_minutes.saturating_mul(60),
        }
    }

    /// Elapsed share of the current phase in [0, 1]
    pub fn progress(&self) -> f64 {
        let length = self.phase_length();
        if length == 0 {
            return 1.0;
        }
        1.0 - self.remaining as f64 / length as f64
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) {
        self.running = !self.running;
    }

    /// Stop and rewind to the start of a work phase; the attached task stays
    pub fn reset(&mut self) {
        self.running = false;
        self.phase = Phase::Work;
        self.remaining = self.phase_length();
    }

    /// Attach a task and rewind so its duration becomes the work length
    pub fn attach_task(&mut self, task: AttachedTask) {
        self.task = Some(task);
        self.reset();
    }

    pub fn detach_task(&mut self) {
        self.task = None;
        if self.phase == Phase::Work && !self.running {
            self.remaining = self.phase_length();
        }
    }

    /// Advance one second. Finishing a phase stops the timer and switches to the next one.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.running {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return None;
        }

        self.running = false;
        let event = match self.phase {
            Phase::Work => {
                let duration_secs = self.phase_length();
                self.completed_work += 1;
                let interval = self.settings.long_break_interval.max(1);
                self.phase = if self.completed_work % interval == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                };
                TimerEvent::WorkCompleted {
                    duration_secs,
                    task: self.task.take(),
                }
            }
            Phase::ShortBreak | Phase::LongBreak => {
                self.phase = Phase::Work;
                TimerEvent::BreakCompleted
            }
        };
        self.remaining = self.phase_length();
        Some(event)
    }
}

/// Persist a finished work phase
pub fn log_session(
    db: &Database,
    username: &str,
    duration_secs: u64,
    task_description: Option<&str>,
) -> Result<PomodoroSession, DatabaseError> {
    let mut session = PomodoroSession {
        id: None,
        username: username.to_string(),
        task_description: task_description.map(str::to_string),
        duration: duration_secs as i64,
        completed_at: now_local_timestamp(),
    };
    session.id = Some(db.insert_pomodoro_session(&session)?);
    tracing::info!(username = %username, seconds = duration_secs, "pomodoro session logged");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> PomodoroSettings {
        PomodoroSettings {
            work_minutes: 1,
            short_break_minutes: 1,
            long_break_minutes: 2,
            long_break_interval: 2,
            bell_on_complete: false,
        }
    }

    fn run_phase(timer: &mut PomodoroTimer) -> TimerEvent {
        timer.start();
        loop {
            if let Some(event) = timer.tick() {
                return event;
            }
        }
    }

    #[test]
    fn paused_timer_does_not_move() {
        let mut timer = PomodoroTimer::new(quick());
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.remaining_secs(), 60);

        timer.start();
        timer.tick();
        timer.pause();
        timer.tick();
        assert_eq!(timer.remaining_secs(), 59);
    }

    #[test]
    fn every_nth_break_is_long() {
        let mut timer = PomodoroTimer::new(quick());

        assert!(matches!(run_phase(&mut timer), TimerEvent::WorkCompleted { duration_secs: 60, .. }));
        assert_eq!(timer.phase(), Phase::ShortBreak);
        assert_eq!(run_phase(&mut timer), TimerEvent::BreakCompleted);

        run_phase(&mut timer);
        assert_eq!(timer.phase(), Phase::LongBreak);
        assert_eq!(timer.remaining_secs(), 120);
        assert!(!timer.is_running());
    }

    #[test]
    fn attached_task_sets_length_and_is_reported_once() {
        let mut timer = PomodoroTimer::new(quick());
        let task = AttachedTask { id: 7, description: "Write".into(), minutes: 2 };
        timer.attach_task(task.clone());
        assert_eq!(timer.remaining_secs(), 120);

        let event = run_phase(&mut timer);
        assert_eq!(event, TimerEvent::WorkCompleted { duration_secs: 120, task: Some(task) });
        assert!(timer.task().is_none());
    }

    #[test]
    fn oversized_lengths_saturate() {
        let mut timer = PomodoroTimer::new(PomodoroSettings { work_minutes: u64::MAX / 2, ..quick() });
        assert_eq!(timer.remaining_secs(), u64::MAX);

        timer.attach_task(AttachedTask { id: 1, description: "Huge".into(), minutes: i64::MAX / 2 });
        assert_eq!(timer.phase_length(), u64::MAX);
    }

    #[test]
    fn reset_rewinds_to_work() {
        let mut timer = PomodoroTimer::new(quick());
        run_phase(&mut timer);
        timer.start();
        timer.tick();
        timer.reset();

        assert_eq!(timer.phase(), Phase::Work);
        assert_eq!(timer.remaining_secs(), 60);
        assert_eq!(timer.progress(), 0.0);
    }

    #[test]
    fn sessions_are_logged() {
        let db = Database::open_in_memory().unwrap();
        log_session(&db, "ana", 1500, Some("Write essay")).unwrap();

        let sessions = db.get_sessions_since("ana", "2000-01-01").unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration, 1500);
        assert_eq!(sessions[0].task_description.as_deref(), Some("Write essay"));
    }
}
