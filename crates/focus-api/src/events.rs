//! Event types for focusd -> client streaming

use chrono::{DateTime, Local};
use focus_util::{PresetId, RecordId};
use serde::{Deserialize, Serialize};

use crate::{Phase, RunState, SessionRecord, TimerSnapshot, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: focus_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Full snapshot (sent on subscribe and on start/pause/reset)
    StateChanged(TimerSnapshot),

    /// One second elapsed on a running timer
    Tick {
        remaining_seconds: u32,
        phase: Phase,
    },

    /// Active phase changed
    PhaseChanged { phase: Phase, cycle_index: u32 },

    /// A phase counted down to zero; work phases carry their record
    PhaseCompleted {
        phase: Phase,
        record: Option<SessionRecord>,
    },

    /// A completed session could not be persisted
    RecordSaveFailed { record_id: RecordId, message: String },

    /// Run state transition
    RunStateChanged { run_state: RunState },

    /// A different preset was loaded
    PresetSwitched { preset_id: PresetId },

    /// Service is shutting down
    Shutdown,
}
