//! Pomodoro timer engine for focusd
//!
//! This crate is the heart of focusd, containing:
//! - Preset resolution (phase lengths, long-break cadence)
//! - Phase sequencing (Work -> ShortBreak/LongBreak -> Work)
//! - The countdown state machine (Stopped <-> Running <-> Paused)
//! - Session records for completed work phases
//! - An async ticker service that drives the engine once per second
//! - A record sink backed by the SQLite store
//! - Focus statistics over stored records

mod countdown;
mod engine;
mod events;
mod preset;
mod recorder;
mod sequencer;
mod service;
mod sink;
mod stats;

pub use countdown::*;
pub use engine::*;
pub use events::*;
pub use preset::*;
pub use recorder::*;
pub use sequencer::*;
pub use service::*;
pub use sink::*;
pub use stats::*;
