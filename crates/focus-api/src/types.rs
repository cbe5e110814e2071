//! Shared types for the focusd API

use chrono::{DateTime, Local, NaiveDate};
use focus_util::{PresetId, RecordId, SkillId, TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One countdown segment of the pomodoro cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Work, Phase::ShortBreak, Phase::LongBreak];

    /// Human-readable label used in titles and notifications
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Focus",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, Phase::Work)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether the countdown is advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl RunState {
    pub fn is_active(&self) -> bool {
        matches!(self, RunState::Running | RunState::Paused)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Stopped => "stopped",
            RunState::Running => "running",
            RunState::Paused => "paused",
        })
    }
}

/// Id of the built-in 25/5/15 preset
pub const CLASSIC_PRESET_ID: &str = "classic";

/// Id of the built-in 15/3/10 preset
pub const SHORT_PRESET_ID: &str = "short";

/// Named bundle of phase lengths (seconds) and the long-break cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    pub work_length: u32,
    pub short_break_length: u32,
    pub long_break_length: u32,
    pub sessions_until_long_break: u32,
    /// Start breaks automatically when a work phase completes
    #[serde(default)]
    pub auto_start_breaks: bool,
    /// Start the next work phase automatically when a break completes
    #[serde(default)]
    pub auto_start_work: bool,
}

impl Preset {
    /// The classic 25/5/15 preset with a long break every 4 sessions
    pub fn classic() -> Self {
        Self {
            id: PresetId::new(CLASSIC_PRESET_ID),
            name: "Classic Pomodoro".into(),
            work_length: 25 * 60,
            short_break_length: 5 * 60,
            long_break_length: 15 * 60,
            sessions_until_long_break: 4,
            auto_start_breaks: false,
            auto_start_work: false,
        }
    }

    /// The short 15/3/10 preset with a long break every 4 sessions
    pub fn short() -> Self {
        Self {
            id: PresetId::new(SHORT_PRESET_ID),
            name: "Short Sessions".into(),
            work_length: 15 * 60,
            short_break_length: 3 * 60,
            long_break_length: 10 * 60,
            sessions_until_long_break: 4,
            auto_start_breaks: false,
            auto_start_work: false,
        }
    }

    /// Built-in presets, in display order
    pub fn builtins() -> Vec<Preset> {
        vec![Self::classic(), Self::short()]
    }

    /// Built-in presets can be neither edited nor deleted
    pub fn is_reserved_id(id: &PresetId) -> bool {
        matches!(id.as_str(), CLASSIC_PRESET_ID | SHORT_PRESET_ID)
    }

    pub fn is_reserved(&self) -> bool {
        Self::is_reserved_id(&self.id)
    }

    /// First field that violates the positive-length invariants, if any
    pub fn invalid_field(&self) -> Option<&'static str> {
        if self.work_length == 0 {
            Some("work_length")
        } else if self.short_break_length == 0 {
            Some("short_break_length")
        } else if self.long_break_length == 0 {
            Some("long_break_length")
        } else if self.sessions_until_long_break == 0 {
            Some("sessions_until_long_break")
        } else {
            None
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::classic()
    }
}

/// Skill tag attached to tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Local>,
}

/// A unit of work that focus sessions can be attributed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub skill_ids: Vec<SkillId>,
    pub completed: bool,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl Task {
    /// The slice of this task the timer reads when building a record
    pub fn selection(&self) -> SelectedTask {
        SelectedTask {
            id: self.id.clone(),
            skill_ids: self.skill_ids.clone(),
        }
    }
}

/// Fields accepted when creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub skill_ids: Vec<SkillId>,
}

/// Partial update of a task; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub skill_ids: Option<Vec<SkillId>>,
    pub completed: Option<bool>,
}

/// The currently selected task as seen by the timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedTask {
    pub id: TaskId,
    #[serde(default)]
    pub skill_ids: Vec<SkillId>,
}

/// Immutable log entry produced when a work phase completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: RecordId,
    pub phase: Phase,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    /// Configured phase length rounded to whole minutes
    pub duration_minutes: u32,
    /// Work sessions already completed in the cycle when this one began
    pub cycle_index: u32,
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub skill_ids: Vec<SkillId>,
}

/// Point-in-time view of the timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub run_state: RunState,
    pub phase: Phase,
    pub remaining_seconds: u32,
    pub phase_seconds: u32,
    pub cycle_count: u32,
    pub sessions_until_long_break: u32,
    pub preset_id: PresetId,
    pub started_at: Option<DateTime<Local>>,
    pub selected_task: Option<SelectedTask>,
}

/// Owner of the timer data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum User {
    /// Signed-in account
    Authenticated { id: UserId, email: String },
    /// Anonymous user whose data stays on this device
    Local { id: UserId },
}

impl User {
    pub fn local() -> Self {
        User::Local {
            id: UserId::new("local"),
        }
    }

    pub fn id(&self) -> &UserId {
        match self {
            User::Authenticated { id, .. } | User::Local { id } => id,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, User::Local { .. })
    }
}

impl Default for User {
    fn default() -> Self {
        Self::local()
    }
}

/// Focus minutes for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFocus {
    pub date: NaiveDate,
    pub minutes: u64,
    pub sessions: u32,
}

/// Focus minutes attributed to one skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillFocus {
    pub skill_id: SkillId,
    pub minutes: u64,
    pub sessions: u32,
}

/// Focus minutes attributed to one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFocus {
    pub task_id: TaskId,
    pub minutes: u64,
    pub sessions: u32,
}

/// Longest date range, in days, accepted for record listings and statistics
pub const MAX_RANGE_DAYS: u32 = 3660;

/// Aggregated focus statistics over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusStats {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_minutes: u64,
    pub total_sessions: u32,
    pub average_daily_minutes: f64,
    pub daily: Vec<DailyFocus>,
    pub by_skill: Vec<SkillFocus>,
    pub by_task: Vec<TaskFocus>,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// The timer's owner - can drive the timer and edit presets/tasks
    Owner,
    /// Read-only observer (status bars, other users)
    Observer,
}

impl ClientRole {
    pub fn can_control(&self) -> bool {
        matches!(self, ClientRole::Owner)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_presets_are_reserved() {
        for preset in Preset::builtins() {
            assert!(preset.is_reserved());
            assert!(preset.invalid_field().is_none());
        }
        assert!(!Preset::is_reserved_id(&PresetId::new("deep-work")));
    }

    #[test]
    fn builtin_preset_lengths() {
        let classic = Preset::classic();
        assert_eq!(
            (classic.work_length, classic.short_break_length, classic.long_break_length),
            (1500, 300, 900)
        );

        let short = Preset::short();
        assert_eq!(
            (short.work_length, short.short_break_length, short.long_break_length),
            (900, 180, 600)
        );
        assert_eq!(short.sessions_until_long_break, 4);
    }

    #[test]
    fn invalid_field_reports_first_zero() {
        let mut preset = Preset::classic();
        preset.short_break_length = 0;
        preset.sessions_until_long_break = 0;
        assert_eq!(preset.invalid_field(), Some("short_break_length"));
    }

    #[test]
    fn user_is_tagged() {
        let user = User::Authenticated {
            id: UserId::new("u-1"),
            email: "me@example.com".into(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"kind\":\"authenticated\""));

        let local: User = serde_json::from_str(r#"{"kind":"local","id":"device"}"#).unwrap();
        assert!(local.is_local());
        assert_eq!(local.id().as_str(), "device");
    }

    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&Phase::ShortBreak).unwrap();
        assert_eq!(json, "\"short_break\"");
    }
}
