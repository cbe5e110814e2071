//! Audit event types

use chrono::{DateTime, Local};
use focus_api::Phase;
use focus_util::{PresetId, RecordId, TaskId, UserId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted { user_id: UserId },

    /// Service stopped
    ServiceStopped,

    /// Configuration loaded
    ConfigLoaded { preset_count: usize },

    /// Timer restored from the restart snapshot
    SnapshotRestored { preset_id: PresetId, phase: Phase },

    TimerStarted { phase: Phase, remaining_seconds: u32 },

    TimerPaused { phase: Phase, remaining_seconds: u32 },

    TimerReset { phase: Phase },

    /// A phase counted down to zero
    PhaseCompleted {
        phase: Phase,
        record_id: Option<RecordId>,
    },

    /// Manual phase change
    PhaseChanged { phase: Phase },

    PresetSwitched { preset_id: PresetId },

    PresetSaved { preset_id: PresetId },

    PresetDeleted { preset_id: PresetId },

    TaskSelected { task_id: Option<TaskId> },

    /// A session record could not be written
    RecordSaveFailed { record_id: RecordId, message: String },

    /// Client connected
    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    /// Client disconnected
    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: focus_util::now(),
            event,
        }
    }
}
