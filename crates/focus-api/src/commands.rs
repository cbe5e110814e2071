//! Command types for the focusd protocol

use chrono::NaiveDate;
use focus_util::{ClientId, PresetId, SkillId, TaskId};
use serde::{Deserialize, Serialize};

use crate::{
    ClientRole, FocusStats, HealthStatus, NewTask, Phase, Preset, SessionRecord, Skill, Task,
    TaskUpdate, TimerSnapshot, API_VERSION,
};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.result, ResponseResult::Ok(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidTransition,
    NotFound,
    ReservedPreset,
    PermissionDenied,
    StoreError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get the current timer snapshot
    GetState,

    // Timer control
    Start,
    Pause,
    Reset,
    /// Jump to a phase; only accepted while stopped
    ChangePhase { phase: Phase },
    /// Load another preset; only accepted while stopped
    SwitchPreset { preset_id: PresetId },
    /// Select the task future work sessions are attributed to (`None` clears)
    SelectTask { task_id: Option<TaskId> },

    // Presets
    ListPresets,
    SavePreset { preset: Preset },
    DeletePreset { preset_id: PresetId },

    // Tasks
    ListTasks,
    CreateTask { task: NewTask },
    UpdateTask { task_id: TaskId, update: TaskUpdate },
    DeleteTask { task_id: TaskId },

    // Skills
    ListSkills,
    CreateSkill { name: String, color: String },
    DeleteSkill { skill_id: SkillId },

    // History
    ListRecords { from: NaiveDate, to: NaiveDate },
    GetStats { from: NaiveDate, to: NaiveDate },

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

impl Command {
    /// Whether the command changes timer or store state
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Command::GetState
                | Command::ListPresets
                | Command::ListTasks
                | Command::ListSkills
                | Command::ListRecords { .. }
                | Command::GetStats { .. }
                | Command::SubscribeEvents
                | Command::UnsubscribeEvents
                | Command::GetHealth
                | Command::Ping
        )
    }
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    State(TimerSnapshot),
    Presets(Vec<Preset>),
    PresetSaved(Preset),
    Tasks(Vec<Task>),
    Task(Task),
    Skills(Vec<Skill>),
    Skill(Skill),
    Records(Vec<SessionRecord>),
    Stats(FocusStats),
    Deleted,
    Subscribed { client_id: ClientId },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(role: ClientRole) -> Self {
        Self {
            client_id: ClientId::new(),
            role,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}
