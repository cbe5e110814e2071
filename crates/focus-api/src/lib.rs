//! Protocol types for focusd IPC
//!
//! This crate defines the stable API between focusd and clients:
//! - Timer, preset, task and record types
//! - Commands (requests from clients)
//! - Responses
//! - Events (service -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
