//! Application preferences the dialog engine reads and writes.
//!
//! The engine never owns persistence. It talks to an injected
//! [`SettingsService`], a plain string key-value accessor, and interprets the
//! two keys it cares about through the typed helpers below.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SettingsError;

pub const THEME_KEY: &str = "theme";
pub const SCREEN_KEY: &str = "keep_screen_on";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThemeChoice {
    #[default]
    SystemDefault,
    Light,
    Dark,
}

impl ThemeChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeChoice::SystemDefault => "SYSTEM_DEFAULT",
            ThemeChoice::Light => "LIGHT",
            ThemeChoice::Dark => "DARK",
        }
    }
}

impl FromStr for ThemeChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SYSTEM_DEFAULT" => Ok(ThemeChoice::SystemDefault),
            "LIGHT" => Ok(ThemeChoice::Light),
            "DARK" => Ok(ThemeChoice::Dark),
            other => Err(format!("unknown theme choice: {other}")),
        }
    }
}

impl fmt::Display for ThemeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the screen stays on or dims after a while.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreenSetting {
    KeepOn,
    #[default]
    Dim,
}

impl ScreenSetting {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenSetting::KeepOn => "KEEP_ON",
            ScreenSetting::Dim => "DIM",
        }
    }
}

impl FromStr for ScreenSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "KEEP_ON" => Ok(ScreenSetting::KeepOn),
            "DIM" => Ok(ScreenSetting::Dim),
            other => Err(format!("unknown screen setting: {other}")),
        }
    }
}

impl fmt::Display for ScreenSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait SettingsService: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

pub fn read_theme(settings: &dyn SettingsService) -> ThemeChoice {
    read_or_default(settings, THEME_KEY)
}

pub fn read_screen(settings: &dyn SettingsService) -> ScreenSetting {
    read_or_default(settings, SCREEN_KEY)
}

pub fn write_theme(settings: &dyn SettingsService, choice: ThemeChoice) -> Result<(), SettingsError> {
    settings.set(THEME_KEY, choice.as_str())
}

pub fn write_screen(settings: &dyn SettingsService, choice: ScreenSetting) -> Result<(), SettingsError> {
    settings.set(SCREEN_KEY, choice.as_str())
}

fn read_or_default<T>(settings: &dyn SettingsService, key: &str) -> T
where
    T: FromStr<Err = String> + Default,
{
    match settings.get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Ignoring stored value for {}: {}", key, e);
            T::default()
        }),
        None => T::default(),
    }
}

#[derive(Debug, Default)]
pub struct InMemorySettings {
    values: RwLock<BTreeMap<String, String>>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsService for InMemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.write().map_err(|_| SettingsError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted as a flat JSON object. Every write rewrites the file.
///
/// Writes are synchronous `std::fs` calls made from inside `Reactor::step`,
/// so they block the dialog task for the duration of the write. Hosts that back
/// settings with slow storage should implement [`SettingsService`] over their
/// own write-behind store instead.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFileSettings {
    /// Opens the store at `path`. A missing file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsService for JsonFileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.write().map_err(|_| SettingsError::Poisoned)?;
        // Memory only changes once the file holds the new value.
        let mut next = values.clone();
        next.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&next)?)?;
        *values = next;
        Ok(())
    }
}
