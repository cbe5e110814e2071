//! Unix-socket transport between focusd and its clients
//!
//! Each line on the socket is one JSON document. A client writes a
//! [`focus_api::Request`] carrying its own `request_id` and reads back the
//! [`focus_api::Response`] with the same id. Timer commands (start, pause,
//! reset, phase and preset changes) and edits to presets, tasks and skills
//! need the `Owner` role. The server assigns it from the peer uid: the
//! daemon's own user and root own the timer, and everyone else observes.
//!
//! After `SubscribeEvents` the same connection also carries
//! [`focus_api::Event`] lines (ticks, phase changes, completions, state
//! snapshots) until `UnsubscribeEvents` or disconnect. A subscriber that
//! falls behind the broadcast buffer loses the oldest events and is told
//! nothing; the next `StateChanged` brings it back in sync.

mod client;
mod server;

pub use client::*;
pub use server::*;

use thiserror::Error;

/// Transport and protocol failures seen by either side
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The daemon answered with an error response
    #[error("focusd rejected the request: {0}")]
    ServerError(String),
}

pub type IpcResult<T> = Result<T, IpcError>;
