//! Persistence layer for focusd
//!
//! Provides:
//! - Session records (append-only)
//! - Custom presets, tasks and skills (soft delete)
//! - Audit log (append-only)
//! - Timer snapshot for restart recovery

mod audit;
mod sqlite;
mod traits;

pub use audit::*;
pub use sqlite::*;
pub use traits::*;

use focus_api::User;
use focus_util::PresetId;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Preset '{0}' is built-in and cannot be modified")]
    ReservedPreset(PresetId),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Invalid data: {0}")]
    Invalid(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Database file for a user: `local.db` for the device user,
/// `users/<id>.db` for signed-in accounts.
pub fn database_path(data_dir: &Path, user: &User) -> PathBuf {
    match user {
        User::Local { .. } => data_dir.join("local.db"),
        User::Authenticated { id, .. } => {
            let safe: String = id
                .as_str()
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();
            data_dir.join("users").join(format!("{}.db", safe))
        }
    }
}
