use std::sync::Arc;

use vox::kernel::event::{Event, RecognizerReport, SessionId, Utterance};
use vox::kernel::intent::types::{Intent, ResolvedCommand, Screen};
use vox::kernel::phase::DialogPhase;
use vox::kernel::reactor::{Reactor, ReactorConfig};
use vox::kernel::scheduler::SideEffect;
use vox::phrases::Phrasebook;
use vox::error::SettingsError;
use vox::settings::{self, InMemorySettings, ScreenSetting, SettingsService, ThemeChoice};

fn reactor_with(config: ReactorConfig) -> (Reactor, Arc<InMemorySettings>) {
    let settings = Arc::new(InMemorySettings::new());
    let reactor = Reactor::new(Arc::new(Phrasebook::english()), settings.clone(), config);
    (reactor, settings)
}

fn reactor() -> (Reactor, Arc<InMemorySettings>) {
    reactor_with(ReactorConfig::default())
}

fn step(reactor: &mut Reactor, event: Event) -> Vec<SideEffect> {
    let effects = reactor.step(event);
    assert!(reactor.state.is_consistent(), "state: {:?}", reactor.state);
    effects
}

fn heard(reactor: &mut Reactor, session: SessionId, text: &str) -> Vec<SideEffect> {
    step(
        reactor,
        Event::Recognition {
            session,
            report: RecognizerReport::Results(vec![text.to_string()]),
        },
    )
}

fn began(effects: &[SideEffect]) -> SessionId {
    effects
        .iter()
        .find_map(|e| match e {
            SideEffect::BeginCapture(s) => Some(*s),
            _ => None,
        })
        .unwrap_or_else(|| panic!("expected BeginCapture in {:?}", effects))
}

fn spoken(effects: &[SideEffect]) -> Vec<Utterance> {
    effects
        .iter()
        .filter_map(|e| match e {
            SideEffect::Speak(u) => Some(u.clone()),
            _ => None,
        })
        .collect()
}

fn dispatched(effects: &[SideEffect]) -> Vec<ResolvedCommand> {
    effects
        .iter()
        .filter_map(|e| match e {
            SideEffect::Dispatch(c) => Some(*c),
            _ => None,
        })
        .collect()
}

#[test]
fn test_theme_change_two_turn_exchange() {
    let (mut reactor, settings) = reactor();

    // 1. Trigger -> listening for a command
    let effects = step(&mut reactor, Event::Activate);
    let session = began(&effects);
    assert_eq!(reactor.phase(), DialogPhase::ListeningCommand);
    assert!(reactor.capture.is_listening());

    // 2. "change theme" -> question, no capture yet
    let effects = heard(&mut reactor, session, "change theme");
    let question = spoken(&effects);
    assert_eq!(question.len(), 1);
    assert_eq!(question[0].text, "light theme, dark theme or default theme?");
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::BeginCapture(_))));
    assert_eq!(reactor.phase(), DialogPhase::SpeakingQuestion);
    assert_eq!(reactor.state.context.map(|c| c.pending_intent), Some(Intent::ChangeTheme));
    assert!(!reactor.capture.is_listening());

    // 3. Question finishes -> listening for the answer
    let effects = step(&mut reactor, Event::PlaybackFinished(question[0].id));
    let answer_session = began(&effects);
    assert_ne!(answer_session, session);
    assert_eq!(reactor.phase(), DialogPhase::ListeningAnswer);
    assert!(reactor.state.context.unwrap().awaiting_response);

    // 4. "dark theme" -> SET_THEME(DARK), confirmation, idle
    let effects = heard(&mut reactor, answer_session, "dark theme");
    assert_eq!(dispatched(&effects), vec![ResolvedCommand::SetTheme(ThemeChoice::Dark)]);
    assert_eq!(spoken(&effects)[0].text, "new theme setting: dark theme");
    assert_eq!(reactor.phase(), DialogPhase::Idle);
    assert!(reactor.state.context.is_none());
    assert_eq!(settings::read_theme(settings.as_ref()), ThemeChoice::Dark);
}

#[test]
fn test_screen_setting_two_turn_exchange() {
    let (mut reactor, settings) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = heard(&mut reactor, session, "Change Screen Settings");
    let question = spoken(&effects).remove(0);
    assert_eq!(question.text, "keep screen always on or dim screen after a while?");

    let answer = began(&step(&mut reactor, Event::PlaybackFinished(question.id)));
    let effects = heard(&mut reactor, answer, "keep screen always on");

    assert_eq!(dispatched(&effects), vec![ResolvedCommand::SetScreen(ScreenSetting::KeepOn)]);
    assert_eq!(spoken(&effects)[0].text, "new screen setting: keep screen always on");
    assert_eq!(settings::read_screen(settings.as_ref()), ScreenSetting::KeepOn);
    assert_eq!(reactor.phase(), DialogPhase::Idle);
}

#[test]
fn test_navigation_dispatches_immediately() {
    let (mut reactor, _) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = heard(&mut reactor, session, "go to settings");

    assert_eq!(dispatched(&effects), vec![ResolvedCommand::Navigate(Screen::Settings)]);
    assert!(spoken(&effects).is_empty(), "navigation has no follow-up question");
    assert_eq!(reactor.phase(), DialogPhase::Idle);
    assert!(reactor.state.context.is_none());
}

#[test]
fn test_unknown_command_is_narrated_as_invalid() {
    let (mut reactor, _) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = heard(&mut reactor, session, "asdf");

    assert!(dispatched(&effects).is_empty());
    let said = spoken(&effects);
    assert_eq!(said.len(), 1);
    assert_eq!(said[0].text, "invalid command");
    assert_eq!(reactor.phase(), DialogPhase::Idle);
}

#[test]
fn test_retrigger_while_listening_cancels() {
    let (mut reactor, _) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = step(&mut reactor, Event::Activate);

    assert_eq!(effects, vec![SideEffect::CancelCapture(session)]);
    assert_eq!(reactor.phase(), DialogPhase::Idle);
    assert!(!reactor.capture.is_listening());

    // The engine's in-flight result for the cancelled session is dropped.
    let effects = heard(&mut reactor, session, "go to settings");
    assert!(effects.is_empty());
    assert_eq!(reactor.phase(), DialogPhase::Idle);
}

#[test]
fn test_retrigger_while_listening_for_answer_clears_context() {
    let (mut reactor, _) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let question = spoken(&heard(&mut reactor, session, "change theme")).remove(0);
    let answer = began(&step(&mut reactor, Event::PlaybackFinished(question.id)));

    let effects = step(&mut reactor, Event::Activate);
    assert_eq!(effects, vec![SideEffect::CancelCapture(answer)]);
    assert_eq!(reactor.phase(), DialogPhase::Idle);
    assert!(reactor.state.context.is_none());
}

#[test]
fn test_retrigger_while_asking_starts_fresh_command() {
    let (mut reactor, _) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let question = spoken(&heard(&mut reactor, session, "change theme")).remove(0);
    assert_eq!(reactor.phase(), DialogPhase::SpeakingQuestion);

    let fresh = began(&step(&mut reactor, Event::Activate));
    assert_eq!(reactor.phase(), DialogPhase::ListeningCommand);
    assert!(reactor.state.context.is_none(), "stale context discarded");

    // The old question finishing must not open an answer turn.
    let effects = step(&mut reactor, Event::PlaybackFinished(question.id));
    assert!(effects.is_empty());
    assert_eq!(reactor.phase(), DialogPhase::ListeningCommand);

    let effects = heard(&mut reactor, fresh, "go to grocery list");
    assert_eq!(dispatched(&effects), vec![ResolvedCommand::Navigate(Screen::GroceryList)]);
}

#[test]
fn test_navigation_during_answer_is_invalid() {
    let (mut reactor, settings) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let question = spoken(&heard(&mut reactor, session, "change theme")).remove(0);
    let answer = began(&step(&mut reactor, Event::PlaybackFinished(question.id)));

    let effects = heard(&mut reactor, answer, "go to settings");
    assert!(dispatched(&effects).is_empty());
    assert_eq!(spoken(&effects)[0].text, "invalid command");
    assert_eq!(reactor.phase(), DialogPhase::Idle);
    assert!(reactor.state.context.is_none());
    assert!(settings.get(settings::THEME_KEY).is_none());
}

#[test]
fn test_no_match_is_silent() {
    let (mut reactor, _) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = step(
        &mut reactor,
        Event::Recognition {
            session,
            report: RecognizerReport::Results(vec![]),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(reactor.phase(), DialogPhase::Idle);
}

#[test]
fn test_no_match_during_answer_clears_context_silently() {
    let (mut reactor, _) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let question = spoken(&heard(&mut reactor, session, "change theme")).remove(0);
    let answer = began(&step(&mut reactor, Event::PlaybackFinished(question.id)));

    let effects = step(
        &mut reactor,
        Event::Recognition {
            session: answer,
            report: RecognizerReport::NoMatch,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(reactor.phase(), DialogPhase::Idle);
    assert!(reactor.state.context.is_none());
}

#[test]
fn test_recognition_error_is_narrated_and_recovers() {
    let (mut reactor, _) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = step(
        &mut reactor,
        Event::Recognition {
            session,
            report: RecognizerReport::Failed("recognizer not installed".into()),
        },
    );

    assert_eq!(spoken(&effects)[0].text, "sorry, speech recognition is not available");
    assert_eq!(reactor.phase(), DialogPhase::Idle);

    // Still usable afterwards.
    let session = began(&step(&mut reactor, Event::Activate));
    let effects = heard(&mut reactor, session, "go to main menu");
    assert_eq!(dispatched(&effects), vec![ResolvedCommand::Navigate(Screen::MainMenu)]);
}

#[test]
fn test_capture_timeout_returns_to_idle() {
    let (mut reactor, _) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = step(&mut reactor, Event::CaptureExpired(session));

    assert_eq!(effects, vec![SideEffect::CancelCapture(session)]);
    assert_eq!(reactor.phase(), DialogPhase::Idle);

    // A late report after expiry changes nothing.
    assert!(heard(&mut reactor, session, "go to settings").is_empty());
}

#[test]
fn test_question_skipped_when_narration_unavailable() {
    let (mut reactor, _) = reactor_with(ReactorConfig {
        narration_enabled: false,
    });

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = heard(&mut reactor, session, "change theme");

    // No audio, and the flow is not blocked waiting for it.
    assert!(spoken(&effects).is_empty());
    let answer = began(&effects);
    assert_eq!(reactor.phase(), DialogPhase::ListeningAnswer);

    let effects = heard(&mut reactor, answer, "light theme");
    assert_eq!(dispatched(&effects), vec![ResolvedCommand::SetTheme(ThemeChoice::Light)]);
    assert_eq!(reactor.phase(), DialogPhase::Idle);
}

#[test]
fn test_narration_lost_mid_question_moves_on_to_answer() {
    let (mut reactor, _) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    heard(&mut reactor, session, "change theme");
    assert_eq!(reactor.phase(), DialogPhase::SpeakingQuestion);

    let effects = step(&mut reactor, Event::NarrationReady(false));
    assert!(effects.contains(&SideEffect::StopSpeech));
    began(&effects);
    assert_eq!(reactor.phase(), DialogPhase::ListeningAnswer);
}

#[test]
fn test_list_options_narrates_available_commands() {
    let (mut reactor, _) = reactor();

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = heard(&mut reactor, session, "tell me my options");

    assert!(dispatched(&effects).is_empty());
    let text = &spoken(&effects)[0].text;
    assert!(text.starts_with("your options are change theme"), "{}", text);
    assert!(text.contains("go to grocery list"));
    assert!(text.ends_with("and go to settings"));
    assert_eq!(reactor.phase(), DialogPhase::Idle);
}

#[test]
fn test_reading_settings_uses_settings_service() {
    let (mut reactor, settings) = reactor();
    settings::write_theme(settings.as_ref(), ThemeChoice::Light).unwrap();

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = heard(&mut reactor, session, "read theme settings");
    assert_eq!(spoken(&effects)[0].text, "current theme setting: light theme");

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = heard(&mut reactor, session, "read screen settings");
    assert_eq!(spoken(&effects)[0].text, "current screen setting: dim screen after a while");
}

#[test]
fn test_list_current_settings_enqueues_second_line() {
    let (mut reactor, settings) = reactor();
    settings::write_screen(settings.as_ref(), ScreenSetting::KeepOn).unwrap();

    let session = began(&step(&mut reactor, Event::Activate));
    let effects = heard(&mut reactor, session, "list current settings");

    let first = spoken(&effects);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].text, "current theme setting: default theme");
    assert_eq!(reactor.output.pending_len(), 1);

    let effects = step(&mut reactor, Event::PlaybackFinished(first[0].id));
    assert_eq!(spoken(&effects)[0].text, "current screen setting: keep screen always on");
}

/// Store that never accepts a write.
struct ReadOnlySettings;

impl SettingsService for ReadOnlySettings {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), SettingsError> {
        Err(SettingsError::Poisoned)
    }
}

#[test]
fn test_failed_settings_write_still_dispatches_and_confirms() {
    let mut reactor = Reactor::new(
        Arc::new(Phrasebook::english()),
        Arc::new(ReadOnlySettings),
        ReactorConfig::default(),
    );

    let session = began(&step(&mut reactor, Event::Activate));
    let question = spoken(&heard(&mut reactor, session, "change theme")).remove(0);
    let answer = began(&step(&mut reactor, Event::PlaybackFinished(question.id)));
    let effects = heard(&mut reactor, answer, "dark theme");

    assert_eq!(dispatched(&effects), vec![ResolvedCommand::SetTheme(ThemeChoice::Dark)]);
    assert_eq!(spoken(&effects)[0].text, "new theme setting: dark theme");
    assert_eq!(reactor.phase(), DialogPhase::Idle);
    assert!(reactor.state.context.is_none());
}

#[test]
fn test_retrigger_resolves_capture_as_cancelled() {
    let (mut reactor, _) = reactor();

    began(&step(&mut reactor, Event::Activate));
    step(&mut reactor, Event::Activate);

    let snap = reactor.telemetry.snapshot();
    assert_eq!(snap.capture_stats.cancelled, 1);
    assert_eq!(snap.capture_stats.no_matches, 0);
    assert_eq!(snap.failure_stats.no_match, 0, "cancellation is not a recognition miss");
}
