//! Configuration validation

use crate::schema::{RawConfig, RawPreset, RawUser};
use focus_api::Preset;
use focus_util::PresetId;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Preset '{preset_id}': {message}")]
    PresetError { preset_id: String, message: String },

    #[error("Duplicate preset ID: {0}")]
    DuplicatePresetId(String),

    #[error("Preset ID '{0}' is reserved for a built-in preset")]
    ReservedPresetId(String),

    #[error("Unknown default preset: {0}")]
    UnknownDefaultPreset(String),

    #[error("User config error: {0}")]
    UserError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut seen_ids = HashSet::new();
    for preset in &config.presets {
        if Preset::is_reserved_id(&PresetId::new(preset.id.as_str())) {
            errors.push(ValidationError::ReservedPresetId(preset.id.clone()));
        } else if !seen_ids.insert(preset.id.as_str()) {
            errors.push(ValidationError::DuplicatePresetId(preset.id.clone()));
        }
    }

    for preset in &config.presets {
        errors.extend(validate_preset(preset));
    }

    if let Some(default) = &config.service.default_preset {
        let known = Preset::is_reserved_id(&PresetId::new(default.as_str()))
            || seen_ids.contains(default.as_str());
        if !known {
            errors.push(ValidationError::UnknownDefaultPreset(default.clone()));
        }
    }

    if let Some(user) = &config.user {
        errors.extend(validate_user(user));
    }

    errors
}

fn validate_preset(preset: &RawPreset) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut fail = |message: &str| {
        errors.push(ValidationError::PresetError {
            preset_id: preset.id.clone(),
            message: message.into(),
        })
    };

    if preset.id.trim().is_empty() {
        fail("id cannot be empty");
    }
    if preset.work_seconds == 0 {
        fail("work_seconds must be positive");
    }
    if preset.short_break_seconds == 0 {
        fail("short_break_seconds must be positive");
    }
    if preset.long_break_seconds == 0 {
        fail("long_break_seconds must be positive");
    }
    if preset.sessions_until_long_break == 0 {
        fail("sessions_until_long_break must be at least 1");
    }

    errors
}

fn validate_user(user: &RawUser) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    match user {
        RawUser::Authenticated { id, email } => {
            if id.trim().is_empty() {
                errors.push(ValidationError::UserError("id cannot be empty".into()));
            }
            if !email.contains('@') {
                errors.push(ValidationError::UserError(format!(
                    "invalid email address '{}'",
                    email
                )));
            }
        }
        RawUser::Local { id: Some(id) } if id.trim().is_empty() => {
            errors.push(ValidationError::UserError("id cannot be empty".into()));
        }
        RawUser::Local { .. } => {}
    }
    errors
}
