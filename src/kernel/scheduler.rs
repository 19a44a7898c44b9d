use super::event::{SessionId, Utterance};
use super::intent::types::{Command, DialogueAct, Intent, ResolvedCommand};
use crate::settings::{self, SettingsService};

/// Work the reactor hands to its driver. The reactor never performs I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Start playing this utterance now.
    Speak(Utterance),
    /// Stop whatever is playing.
    StopSpeech,
    BeginCapture(SessionId),
    CancelCapture(SessionId),
    Dispatch(ResolvedCommand),
}

pub struct Scheduler;

impl Scheduler {
    /// Pure projection: top-level command + current settings -> dialogue act.
    pub fn schedule(&self, command: &Command, settings: &dyn SettingsService) -> DialogueAct {
        match command.intent {
            Intent::Navigate => match command.screen() {
                Some(screen) => DialogueAct::Execute(ResolvedCommand::Navigate(screen)),
                None => DialogueAct::Reject,
            },
            Intent::ChangeTheme | Intent::ChangeScreenSetting => DialogueAct::Ask(command.intent),
            Intent::ListOptions => DialogueAct::ListOptions,
            Intent::ReadThemeSetting => DialogueAct::ReadTheme(settings::read_theme(settings)),
            Intent::ReadScreenSetting => DialogueAct::ReadScreen(settings::read_screen(settings)),
            Intent::ListCurrentSettings => DialogueAct::ListSettings {
                theme: settings::read_theme(settings),
                screen: settings::read_screen(settings),
            },
            Intent::Unknown => DialogueAct::Reject,
        }
    }
}
