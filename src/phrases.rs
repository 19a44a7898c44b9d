//! Localized phrase tables consumed by the decoder and the speech planner.
//!
//! Switching locale means loading a different [`Phrasebook`]; no engine logic
//! depends on the actual words.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PhrasebookError;
use crate::kernel::intent::types::{Intent, Screen};
use crate::settings::{ScreenSetting, ThemeChoice};

/// Trim and case-fold. Every phrase comparison goes through this.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseEntry<T> {
    pub phrase: String,
    pub value: T,
}

/// Fixed phrase → value table. Lookups are exact matches on normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhraseTable<T> {
    entries: Vec<PhraseEntry<T>>,
}

impl<T: Copy + PartialEq> PhraseTable<T> {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, T)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(phrase, value)| PhraseEntry {
                    phrase: normalize(phrase),
                    value,
                })
                .collect(),
        }
    }

    pub fn lookup(&self, normalized: &str) -> Option<T> {
        self.entries
            .iter()
            .find(|e| e.phrase == normalized)
            .map(|e| e.value)
    }

    /// First phrase bound to `value`, used when narrating it back.
    pub fn phrase_for(&self, value: T) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.value == value)
            .map(|e| e.phrase.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, T)> + '_ {
        self.entries.iter().map(|e| (e.phrase.as_str(), e.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn normalize_in_place(&mut self) {
        for entry in &mut self.entries {
            entry.phrase = normalize(&entry.phrase);
        }
    }

    fn check_unique(&self, table: &'static str) -> Result<(), PhrasebookError> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.phrase.as_str()) {
                return Err(PhrasebookError::DuplicatePhrase {
                    table,
                    phrase: entry.phrase.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Narrated messages. `{}` marks where a value is substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    pub invalid_command: String,
    pub recognition_failed: String,
    pub theme_question: String,
    pub screen_question: String,
    pub options_intro: String,
    pub new_theme_setting: String,
    pub new_screen_setting: String,
    pub current_theme_setting: String,
    pub current_screen_setting: String,
    pub or_word: String,
    pub and_word: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrasebook {
    pub locale: String,
    pub navigation_prefix: String,
    pub commands: PhraseTable<Intent>,
    pub targets: PhraseTable<Screen>,
    pub themes: PhraseTable<ThemeChoice>,
    pub screen_settings: PhraseTable<ScreenSetting>,
    pub messages: Messages,
}

impl Phrasebook {
    pub fn english() -> Self {
        Self {
            locale: "en-US".to_string(),
            navigation_prefix: "go to".to_string(),
            commands: PhraseTable::new([
                ("change theme", Intent::ChangeTheme),
                ("change screen settings", Intent::ChangeScreenSetting),
                ("tell me my options", Intent::ListOptions),
                ("read theme settings", Intent::ReadThemeSetting),
                ("read screen settings", Intent::ReadScreenSetting),
                ("list current settings", Intent::ListCurrentSettings),
            ]),
            targets: PhraseTable::new([
                ("main menu", Screen::MainMenu),
                ("grocery list", Screen::GroceryList),
                ("place details", Screen::PlaceDetails),
                ("settings", Screen::Settings),
            ]),
            themes: PhraseTable::new([
                ("light theme", ThemeChoice::Light),
                ("dark theme", ThemeChoice::Dark),
                ("default theme", ThemeChoice::SystemDefault),
            ]),
            screen_settings: PhraseTable::new([
                ("keep screen always on", ScreenSetting::KeepOn),
                ("dim screen after a while", ScreenSetting::Dim),
            ]),
            messages: Messages {
                invalid_command: "invalid command".to_string(),
                recognition_failed: "sorry, speech recognition is not available".to_string(),
                theme_question: "{}?".to_string(),
                screen_question: "{}?".to_string(),
                options_intro: "your options are".to_string(),
                new_theme_setting: "new theme setting: {}".to_string(),
                new_screen_setting: "new screen setting: {}".to_string(),
                current_theme_setting: "current theme setting: {}".to_string(),
                current_screen_setting: "current screen setting: {}".to_string(),
                or_word: "or".to_string(),
                and_word: "and".to_string(),
            },
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, PhrasebookError> {
        let mut book: Phrasebook = serde_json::from_str(raw)?;
        book.navigation_prefix = normalize(&book.navigation_prefix);
        book.commands.normalize_in_place();
        book.targets.normalize_in_place();
        book.themes.normalize_in_place();
        book.screen_settings.normalize_in_place();
        book.validate()?;
        Ok(book)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PhrasebookError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), PhrasebookError> {
        if self.navigation_prefix.is_empty() {
            return Err(PhrasebookError::EmptyNavigationPrefix);
        }
        for (_, intent) in self.commands.iter() {
            if matches!(intent, Intent::Navigate | Intent::Unknown) {
                return Err(PhrasebookError::UnbindableIntent(format!("{intent:?}")));
            }
        }
        self.commands.check_unique("commands")?;
        self.targets.check_unique("targets")?;
        self.themes.check_unique("themes")?;
        self.screen_settings.check_unique("screen_settings")?;
        Ok(())
    }

    /// "a, b or c"
    pub fn join_alternatives<'a>(&self, items: impl IntoIterator<Item = &'a str>) -> String {
        join_with(items, &self.messages.or_word)
    }

    /// "a, b and c"
    pub fn join_all<'a>(&self, items: impl IntoIterator<Item = &'a str>) -> String {
        join_with(items, &self.messages.and_word)
    }
}

impl Default for Phrasebook {
    fn default() -> Self {
        Self::english()
    }
}

/// Substitutes `value` into the first `{}` of `template`.
pub fn fill(template: &str, value: &str) -> String {
    template.replacen("{}", value, 1)
}

fn join_with<'a>(items: impl IntoIterator<Item = &'a str>, last_word: &str) -> String {
    let items: Vec<&str> = items.into_iter().collect();
    match items.split_last() {
        None => String::new(),
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{} {} {}", rest.join(", "), last_word, last),
    }
}
