//! Shared utilities for focusd
//!
//! This crate provides:
//! - ID types (PresetId, TaskId, SkillId, RecordId, UserId, ClientId)
//! - Time utilities (mock-able wall clock, countdown formatting)
//! - Error types
//! - Default paths for socket, config, data, and log directories

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
