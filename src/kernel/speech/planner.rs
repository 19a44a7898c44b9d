use std::sync::Arc;

use crate::kernel::intent::types::{DialogueAct, Intent, ResolvedCommand};
use crate::phrases::{fill, Phrasebook};
use crate::settings::{ScreenSetting, ThemeChoice};

/// Turns dialogue acts into narration lines. The first line is spoken with
/// FLUSH, the rest are enqueued behind it.
pub struct SpeechPlanner {
    phrasebook: Arc<Phrasebook>,
}

impl SpeechPlanner {
    pub fn new(phrasebook: Arc<Phrasebook>) -> Self {
        Self { phrasebook }
    }

    pub fn plan(&self, act: &DialogueAct) -> Vec<String> {
        let book = &*self.phrasebook;
        let msg = &book.messages;

        match act {
            DialogueAct::Ask(Intent::ChangeTheme) => {
                let choices = book.join_alternatives(book.themes.iter().map(|(p, _)| p));
                vec![fill(&msg.theme_question, &choices)]
            }
            DialogueAct::Ask(Intent::ChangeScreenSetting) => {
                let choices = book.join_alternatives(book.screen_settings.iter().map(|(p, _)| p));
                vec![fill(&msg.screen_question, &choices)]
            }
            DialogueAct::Ask(_) => Vec::new(),
            DialogueAct::Execute(_) => Vec::new(),
            DialogueAct::Confirm(ResolvedCommand::SetTheme(theme)) => {
                vec![fill(&msg.new_theme_setting, self.theme_name(*theme))]
            }
            DialogueAct::Confirm(ResolvedCommand::SetScreen(screen)) => {
                vec![fill(&msg.new_screen_setting, self.screen_name(*screen))]
            }
            DialogueAct::Confirm(ResolvedCommand::Navigate(_)) => Vec::new(),
            DialogueAct::ListOptions => vec![self.options()],
            DialogueAct::ReadTheme(theme) => {
                vec![fill(&msg.current_theme_setting, self.theme_name(*theme))]
            }
            DialogueAct::ReadScreen(screen) => {
                vec![fill(&msg.current_screen_setting, self.screen_name(*screen))]
            }
            DialogueAct::ListSettings { theme, screen } => vec![
                fill(&msg.current_theme_setting, self.theme_name(*theme)),
                fill(&msg.current_screen_setting, self.screen_name(*screen)),
            ],
            DialogueAct::Reject => vec![msg.invalid_command.clone()],
            DialogueAct::ReportFailure => vec![msg.recognition_failed.clone()],
        }
    }

    fn options(&self) -> String {
        let book = &*self.phrasebook;
        let mut options: Vec<String> = book
            .commands
            .iter()
            .filter(|(_, intent)| *intent != Intent::ListOptions)
            .map(|(phrase, _)| phrase.to_string())
            .collect();
        options.extend(
            book.targets
                .iter()
                .map(|(phrase, _)| format!("{} {}", book.navigation_prefix, phrase)),
        );

        format!(
            "{} {}",
            book.messages.options_intro,
            book.join_all(options.iter().map(String::as_str))
        )
    }

    fn theme_name(&self, theme: ThemeChoice) -> &str {
        self.phrasebook.themes.phrase_for(theme).unwrap_or(theme.as_str())
    }

    fn screen_name(&self, screen: ScreenSetting) -> &str {
        self.phrasebook
            .screen_settings
            .phrase_for(screen)
            .unwrap_or(screen.as_str())
    }
}
