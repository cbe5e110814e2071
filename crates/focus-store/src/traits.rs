//! Store trait definitions

use chrono::{DateTime, Local, NaiveDate};
use focus_api::{NewTask, Phase, Preset, SessionRecord, Skill, Task, TaskUpdate};
use focus_util::{PresetId, SkillId, TaskId};

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Session records

    /// Append a completed session record; a record id can only be stored once
    fn append_record(&self, record: &SessionRecord) -> StoreResult<()>;

    /// Records whose start day falls within `from..=to`, oldest first
    fn list_records(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<SessionRecord>>;

    // Presets

    /// Built-in presets followed by stored custom presets
    fn list_presets(&self) -> StoreResult<Vec<Preset>>;

    fn get_preset(&self, id: &PresetId) -> StoreResult<Option<Preset>>;

    /// Insert or update a custom preset
    fn save_preset(&self, preset: &Preset) -> StoreResult<()>;

    fn delete_preset(&self, id: &PresetId) -> StoreResult<()>;

    // Tasks

    fn list_tasks(&self) -> StoreResult<Vec<Task>>;

    fn get_task(&self, id: &TaskId) -> StoreResult<Option<Task>>;

    fn create_task(&self, task: NewTask) -> StoreResult<Task>;

    fn update_task(&self, id: &TaskId, update: TaskUpdate) -> StoreResult<Task>;

    fn delete_task(&self, id: &TaskId) -> StoreResult<()>;

    // Skills

    fn list_skills(&self) -> StoreResult<Vec<Skill>>;

    fn create_skill(&self, name: &str, color: &str) -> StoreResult<Skill>;

    fn delete_skill(&self, id: &SkillId) -> StoreResult<()>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // State snapshot

    /// Load last saved snapshot
    fn load_snapshot(&self) -> StoreResult<Option<StateSnapshot>>;

    /// Save state snapshot
    fn save_snapshot(&self, snapshot: &StateSnapshot) -> StoreResult<()>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Timer state kept across restarts. The timer always comes back stopped.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StateSnapshot {
    /// Timestamp of snapshot
    pub timestamp: DateTime<Local>,
    pub preset_id: PresetId,
    pub phase: Phase,
    pub cycle_count: u32,
    pub selected_task_id: Option<TaskId>,
}
