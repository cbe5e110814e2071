//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Owner of the timer data; local user when absent
    #[serde(default)]
    pub user: Option<RawUser>,

    /// Custom presets, in addition to the built-ins
    #[serde(default)]
    pub presets: Vec<RawPreset>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/focusd/focusd.sock)
    pub socket_path: Option<PathBuf>,

    /// Log directory
    pub log_dir: Option<PathBuf>,

    /// Data directory for the database
    pub data_dir: Option<PathBuf>,

    /// Preset loaded at startup when no snapshot exists
    pub default_preset: Option<String>,
}

/// Raw user definition
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawUser {
    Authenticated { id: String, email: String },
    Local { id: Option<String> },
}

/// Raw preset definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPreset {
    /// Unique stable ID
    pub id: String,

    /// Display name (defaults to the id)
    pub name: Option<String>,

    pub work_seconds: u32,
    pub short_break_seconds: u32,
    pub long_break_seconds: u32,

    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,

    #[serde(default)]
    pub auto_start_breaks: bool,

    #[serde(default)]
    pub auto_start_work: bool,
}

fn default_sessions_until_long_break() -> u32 {
    4
}
