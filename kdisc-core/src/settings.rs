//! Typed configuration options
//!
//! A [`Setting`] names one key of the [`Settings`] bundle together with its
//! declared type, its default and whether a backend needs it before it can
//! activate. Hosts list options through [`SettingDescriptor`] to validate or
//! display them.

use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use crate::config::Settings;
use crate::error::{Error, Result};

/// Declared value type of an option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    String,
    Duration,
    Integer,
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Duration => "duration",
            Self::Integer => "integer",
        };
        f.pad(name)
    }
}

/// Type-erased view of a [`Setting`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingDescriptor {
    pub key: &'static str,
    pub kind: SettingKind,
    pub default: Option<&'static str>,
    pub required: bool,
}

/// Value types an option can be declared with
pub trait SettingValue: Sized {
    const KIND: SettingKind;

    /// Parse the raw text of `key`
    fn parse_setting(key: &str, raw: &str) -> Result<Self>;
}

impl SettingValue for String {
    const KIND: SettingKind = SettingKind::String;

    fn parse_setting(_key: &str, raw: &str) -> Result<Self> {
        Ok(raw.to_string())
    }
}

impl SettingValue for Duration {
    const KIND: SettingKind = SettingKind::Duration;

    fn parse_setting(key: &str, raw: &str) -> Result<Self> {
        humantime::parse_duration(raw.trim()).map_err(|e| Error::InvalidSetting {
            key: key.to_string(),
            reason: format!("'{raw}' is not a duration: {e}"),
        })
    }
}

impl SettingValue for u32 {
    const KIND: SettingKind = SettingKind::Integer;

    fn parse_setting(key: &str, raw: &str) -> Result<Self> {
        raw.trim().parse::<u32>().map_err(|e| Error::InvalidSetting {
            key: key.to_string(),
            reason: format!("'{raw}' is not a non-negative integer: {e}"),
        })
    }
}

/// A named, typed configuration option
pub struct Setting<T> {
    key: &'static str,
    default: Option<&'static str>,
    required: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Setting<T> {
    /// Option without a default that must carry text before a backend activates
    #[must_use]
    pub const fn required(key: &'static str) -> Self {
        Self {
            key,
            default: None,
            required: true,
            _marker: PhantomData,
        }
    }

    /// Optional option falling back to `default`
    #[must_use]
    pub const fn with_default(key: &'static str, default: &'static str) -> Self {
        Self {
            key,
            default: Some(default),
            required: false,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Whether the bundle carries an explicit value for this key
    pub fn exists(&self, settings: &Settings) -> Result<bool> {
        Ok(settings.get_raw(self.key)?.is_some())
    }

    /// Whether the bundle carries an explicit, non-blank value for this key
    pub fn has_text(&self, settings: &Settings) -> Result<bool> {
        Ok(settings
            .get_raw(self.key)?
            .is_some_and(|value| !value.trim().is_empty()))
    }
}

impl<T: SettingValue> Setting<T> {
    /// Effective value: the explicit one if present, the default otherwise
    pub fn get(&self, settings: &Settings) -> Result<T> {
        match (settings.get_raw(self.key)?, self.default) {
            (Some(raw), _) => T::parse_setting(self.key, &raw),
            (None, Some(default)) => T::parse_setting(self.key, default),
            (None, None) => Err(Error::MissingSetting(self.key.to_string())),
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> SettingDescriptor {
        SettingDescriptor {
            key: self.key,
            kind: T::KIND,
            default: self.default,
            required: self.required,
        }
    }
}

impl<T> fmt::Debug for Setting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setting")
            .field("key", &self.key)
            .field("default", &self.default)
            .field("required", &self.required)
            .finish()
    }
}
