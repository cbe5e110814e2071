//! Error types for focusd

use thiserror::Error;

use crate::{PresetId, SkillId, TaskId};

/// Core error type for focusd operations
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("Preset not found: {0}")]
    PresetNotFound(PresetId),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Skill not found: {0}")]
    SkillNotFound(SkillId),

    #[error("Preset '{0}' is built-in and cannot be modified")]
    ReservedPreset(PresetId),

    #[error("Cannot {action} while the timer is {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FocusError {
    pub fn invalid_transition(action: &'static str, state: impl std::fmt::Display) -> Self {
        Self::InvalidTransition {
            action,
            state: state.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn ipc(msg: impl Into<String>) -> Self {
        Self::IpcError(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for routine rejections (stale button clicks and the like)
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}

pub type Result<T> = std::result::Result<T, FocusError>;
