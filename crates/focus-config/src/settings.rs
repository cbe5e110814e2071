//! Validated settings structures

use crate::schema::{RawConfig, RawPreset, RawServiceConfig, RawUser};
use focus_api::{Preset, User, CLASSIC_PRESET_ID};
use focus_util::{PresetId, UserId};
use std::path::PathBuf;

/// Validated settings ready for use by the service
#[derive(Debug, Clone)]
pub struct Settings {
    /// Service configuration
    pub service: ServiceConfig,

    /// Owner of the timer data
    pub user: User,

    /// Built-in presets followed by custom ones
    pub presets: Vec<Preset>,

    /// Preset loaded when nothing else is selected
    pub default_preset: PresetId,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let default_preset = raw
            .service
            .default_preset
            .clone()
            .map(PresetId::new)
            .unwrap_or_else(|| PresetId::new(CLASSIC_PRESET_ID));

        let mut presets = Preset::builtins();
        presets.extend(raw.presets.into_iter().map(convert_preset));

        Self {
            service: ServiceConfig::from_raw(raw.service),
            user: raw.user.map(convert_user).unwrap_or_default(),
            presets,
            default_preset,
        }
    }

    /// Get preset by ID
    pub fn get_preset(&self, id: &PresetId) -> Option<&Preset> {
        self.presets.iter().find(|p| &p.id == id)
    }

    /// The preset named by `default_preset`, falling back to classic
    pub fn initial_preset(&self) -> Preset {
        self.get_preset(&self.default_preset)
            .cloned()
            .unwrap_or_else(Preset::classic)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            user: User::default(),
            presets: Preset::builtins(),
            default_preset: PresetId::new(CLASSIC_PRESET_ID),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub log_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        // Env overrides are applied by the binaries, not here
        Self {
            socket_path: raw
                .socket_path
                .unwrap_or_else(focus_util::socket_path_without_env),
            log_dir: raw.log_dir.unwrap_or_else(focus_util::default_log_dir),
            data_dir: raw
                .data_dir
                .unwrap_or_else(focus_util::data_dir_without_env),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

fn convert_preset(raw: RawPreset) -> Preset {
    Preset {
        name: raw.name.unwrap_or_else(|| raw.id.clone()),
        id: PresetId::new(raw.id),
        work_length: raw.work_seconds,
        short_break_length: raw.short_break_seconds,
        long_break_length: raw.long_break_seconds,
        sessions_until_long_break: raw.sessions_until_long_break,
        auto_start_breaks: raw.auto_start_breaks,
        auto_start_work: raw.auto_start_work,
    }
}

fn convert_user(raw: RawUser) -> User {
    match raw {
        RawUser::Authenticated { id, email } => User::Authenticated {
            id: UserId::new(id),
            email,
        },
        RawUser::Local { id } => User::Local {
            id: UserId::new(id.unwrap_or_else(|| "local".into())),
        },
    }
}
