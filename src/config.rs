//! Engine configuration.
//!
//! Sources (highest priority first):
//! 1. Environment variables (`VOX_*`)
//! 2. Defaults
//!
//! Phrasebook and settings file paths point at JSON documents.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::kernel::reactor::ReactorConfig;
use crate::phrases::Phrasebook;
use crate::settings::{InMemorySettings, JsonFileSettings, SettingsService};

pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 8_000;
pub const DEFAULT_EVENT_CAPACITY: usize = 100;
pub const MAX_EVENT_CAPACITY: usize = 65_536;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Localized phrase tables. English built-ins when unset.
    pub phrasebook: Option<PathBuf>,
    /// Persistent settings. In-memory when unset.
    pub settings_file: Option<PathBuf>,
    /// Capture sessions with no report after this long resolve as no-match.
    /// `None` disables the guard.
    pub capture_timeout: Option<Duration>,
    pub narration_enabled: bool,
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            phrasebook: None,
            settings_file: None,
            capture_timeout: Some(Duration::from_millis(DEFAULT_CAPTURE_TIMEOUT_MS)),
            narration_enabled: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("VOX_PHRASEBOOK") {
            config.phrasebook = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("VOX_SETTINGS_FILE") {
            config.settings_file = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup("VOX_CAPTURE_TIMEOUT_MS") {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("VOX_CAPTURE_TIMEOUT_MS is not a number: {raw:?}"))?;
            config.capture_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(raw) = lookup("VOX_NARRATION") {
            config.narration_enabled = parse_flag(&raw)
                .with_context(|| format!("VOX_NARRATION is not a boolean: {raw:?}"))?;
        }
        if let Some(raw) = lookup("VOX_EVENT_CAPACITY") {
            let capacity: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("VOX_EVENT_CAPACITY is not a number: {raw:?}"))?;
            anyhow::ensure!(
                (1..=MAX_EVENT_CAPACITY).contains(&capacity),
                "VOX_EVENT_CAPACITY must be between 1 and {MAX_EVENT_CAPACITY}, got {capacity}"
            );
            config.event_capacity = capacity;
        }

        Ok(config)
    }

    pub fn reactor(&self) -> ReactorConfig {
        ReactorConfig {
            narration_enabled: self.narration_enabled,
        }
    }

    pub fn load_phrasebook(&self) -> Result<Phrasebook> {
        match &self.phrasebook {
            Some(path) => {
                let book = Phrasebook::load(path)
                    .with_context(|| format!("Failed to load phrasebook {}", path.display()))?;
                info!("Loaded phrasebook {} ({})", path.display(), book.locale);
                Ok(book)
            }
            None => Ok(Phrasebook::english()),
        }
    }

    pub fn open_settings(&self) -> Result<Arc<dyn SettingsService>> {
        match &self.settings_file {
            Some(path) => {
                let store = JsonFileSettings::open(path)
                    .with_context(|| format!("Failed to open settings {}", path.display()))?;
                Ok(Arc::new(store))
            }
            None => Ok(Arc::new(InMemorySettings::new())),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
