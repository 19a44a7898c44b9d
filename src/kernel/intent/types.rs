use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::settings::{ScreenSetting, ThemeChoice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Navigate,
    ChangeTheme,
    ChangeScreenSetting,
    ListOptions,
    ReadThemeSetting,
    ReadScreenSetting,
    ListCurrentSettings,
    Unknown,
}

impl Intent {
    /// Intents that need a second, answer turn before they can be executed.
    pub fn needs_follow_up(&self) -> bool {
        matches!(self, Intent::ChangeTheme | Intent::ChangeScreenSetting)
    }
}

/// Screens a navigation command can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Screen {
    MainMenu,
    GroceryList,
    PlaceDetails,
    Settings,
}

impl Screen {
    pub fn as_str(&self) -> &'static str {
        match self {
            Screen::MainMenu => "MAIN_MENU",
            Screen::GroceryList => "GROCERY_LIST",
            Screen::PlaceDetails => "PLACE_DETAILS",
            Screen::Settings => "SETTINGS",
        }
    }
}

impl FromStr for Screen {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MAIN_MENU" => Ok(Screen::MainMenu),
            "GROCERY_LIST" => Ok(Screen::GroceryList),
            "PLACE_DETAILS" => Ok(Screen::PlaceDetails),
            "SETTINGS" => Ok(Screen::Settings),
            other => Err(format!("unknown screen: {other}")),
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded utterance. Immutable once built by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub intent: Intent,
    /// Screen identifier for `Navigate`, empty for everything else.
    pub argument: Option<String>,
}

impl Command {
    pub fn navigate(screen: Screen) -> Self {
        Self {
            intent: Intent::Navigate,
            argument: Some(screen.as_str().to_string()),
        }
    }

    pub fn bare(intent: Intent) -> Self {
        Self { intent, argument: None }
    }

    pub fn unknown() -> Self {
        Self::bare(Intent::Unknown)
    }

    pub fn screen(&self) -> Option<Screen> {
        match self.intent {
            Intent::Navigate => self.argument.as_deref()?.parse().ok(),
            _ => None,
        }
    }
}

/// Action handed to the application's navigation/settings collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "target", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolvedCommand {
    Navigate(Screen),
    SetTheme(ThemeChoice),
    SetScreen(ScreenSetting),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DialogueAct {
    /// Ask the follow-up question bound to this intent.
    Ask(Intent),
    /// Hand the command to the application without narration.
    Execute(ResolvedCommand),
    /// Narrate that an answer was applied.
    Confirm(ResolvedCommand),
    ListOptions,
    ReadTheme(ThemeChoice),
    ReadScreen(ScreenSetting),
    ListSettings { theme: ThemeChoice, screen: ScreenSetting },
    /// "invalid command"
    Reject,
    ReportFailure,
}
