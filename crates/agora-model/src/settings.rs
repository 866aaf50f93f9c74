//! Site settings
//!
//! Remotely the settings live as key-value rows, each key independently
//! upsertable. Locally they deserialize through a typed mapping: every
//! known key lands in a strongly-typed field, and an unrecognized key is an
//! error the boundary logs — never a silent drop.

use crate::registration::RegistrationStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One row of the remote `site_settings` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingRow {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Unknown settings key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for settings key {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Typed view of the settings collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteSettings {
    pub hero_title: String,
    pub hero_subtitle: String,
    pub hero_cta_label: String,
    pub hero_cta_href: String,
    pub instagram_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub discord_url: Option<String>,
    /// Whether the landing page shows the running registration total.
    pub show_registration_total: bool,
    pub registrations_open: bool,
    /// Status assigned to newly created registrations.
    pub registration_default_status: RegistrationStatus,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            hero_title: String::new(),
            hero_subtitle: String::new(),
            hero_cta_label: String::new(),
            hero_cta_href: String::new(),
            instagram_url: None,
            linkedin_url: None,
            discord_url: None,
            show_registration_total: true,
            registrations_open: true,
            registration_default_status: RegistrationStatus::Pending,
        }
    }
}

impl SiteSettings {
    /// Build typed settings from raw key-value rows. Rows that fail to map
    /// are returned as errors alongside the (otherwise populated) result so
    /// the caller can log them; known keys always win over defaults.
    pub fn from_rows(rows: &[Value]) -> (Self, Vec<SettingsError>) {
        let mut settings = Self::default();
        let mut errors = Vec::new();

        for row in rows {
            let parsed: SettingRow = match serde_json::from_value(row.clone()) {
                Ok(r) => r,
                Err(e) => {
                    errors.push(SettingsError::InvalidValue {
                        key: "<row>".to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if let Err(e) = settings.apply(&parsed.key, &parsed.value) {
                errors.push(e);
            }
        }

        (settings, errors)
    }

    /// Apply a single key-value pair to the typed mapping.
    pub fn apply(&mut self, key: &str, value: &Value) -> Result<(), SettingsError> {
        match key {
            "hero_title" => self.hero_title = require_string(key, value)?,
            "hero_subtitle" => self.hero_subtitle = require_string(key, value)?,
            "hero_cta_label" => self.hero_cta_label = require_string(key, value)?,
            "hero_cta_href" => self.hero_cta_href = require_string(key, value)?,
            "instagram_url" => self.instagram_url = optional_string(value),
            "linkedin_url" => self.linkedin_url = optional_string(value),
            "discord_url" => self.discord_url = optional_string(value),
            "show_registration_total" => {
                self.show_registration_total = require_bool(key, value)?
            }
            "registrations_open" => self.registrations_open = require_bool(key, value)?,
            "registration_default_status" => {
                let s = require_string(key, value)?;
                self.registration_default_status =
                    s.parse().map_err(|reason| SettingsError::InvalidValue {
                        key: key.to_string(),
                        reason,
                    })?;
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

fn require_string(key: &str, value: &Value) -> Result<String, SettingsError> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| SettingsError::InvalidValue {
            key: key.to_string(),
            reason: format!("expected string, got {value}"),
        })
}

fn optional_string(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(|s| s.to_string())
}

fn require_bool(key: &str, value: &Value) -> Result<bool, SettingsError> {
    value.as_bool().ok_or_else(|| SettingsError::InvalidValue {
        key: key.to_string(),
        reason: format!("expected boolean, got {value}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_rows_typed_mapping() {
        let rows = vec![
            json!({"key": "hero_title", "value": "Build together"}),
            json!({"key": "registrations_open", "value": false}),
            json!({"key": "registration_default_status", "value": "approved"}),
        ];
        let (settings, errors) = SiteSettings::from_rows(&rows);
        assert!(errors.is_empty());
        assert_eq!(settings.hero_title, "Build together");
        assert!(!settings.registrations_open);
        assert_eq!(
            settings.registration_default_status,
            RegistrationStatus::Approved
        );
    }

    #[test]
    fn test_unknown_key_is_reported_not_dropped() {
        let rows = vec![json!({"key": "hero_color", "value": "#fff"})];
        let (_, errors) = SiteSettings::from_rows(&rows);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SettingsError::UnknownKey(_)));
    }

    #[test]
    fn test_invalid_value_type() {
        let rows = vec![json!({"key": "registrations_open", "value": "yes"})];
        let (settings, errors) = SiteSettings::from_rows(&rows);
        // Default survives when the row is bad.
        assert!(settings.registrations_open);
        assert_eq!(errors.len(), 1);
    }
}
