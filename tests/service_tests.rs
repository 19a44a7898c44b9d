use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use vox::config::EngineConfig;
use vox::kernel::event::{CompletionStatus, QueueMode, RecognizerReport};
use vox::kernel::intent::types::{ResolvedCommand, Screen};
use vox::kernel::phase::DialogPhase;
use vox::kernel::reactor::{Reactor, ReactorConfig};
use vox::kernel::scheduler::SideEffect;
use vox::phrases::Phrasebook;
use vox::settings::{self, InMemorySettings, SettingsService, ThemeChoice};
use vox::{DialogChannels, DialogService};

const WAIT: Duration = Duration::from_secs(2);

fn service(config: EngineConfig, settings: Arc<dyn SettingsService>) -> (DialogService, DialogChannels) {
    let reactor = Reactor::new(Arc::new(Phrasebook::english()), settings, config.reactor());
    DialogService::new(reactor, &config)
}

async fn next_effect(channels: &mut DialogChannels) -> SideEffect {
    timeout(WAIT, channels.effects.recv())
        .await
        .expect("timed out waiting for effect")
        .expect("effects channel closed")
}

#[tokio::test]
async fn test_theme_change_through_service() {
    let settings = Arc::new(InMemorySettings::new());
    let (service, mut channels) = service(EngineConfig::default(), settings.clone());
    let task = tokio::spawn(service.run());
    let handle = channels.handle.clone();

    handle.activate().await;
    let SideEffect::BeginCapture(session) = next_effect(&mut channels).await else {
        panic!("expected capture to start");
    };

    handle
        .recognition(session, RecognizerReport::Results(vec!["change theme".into()]))
        .await;
    let SideEffect::Speak(question) = next_effect(&mut channels).await else {
        panic!("expected the follow-up question");
    };
    assert_eq!(question.mode, QueueMode::Flush);

    handle.playback_finished(question.id).await;
    let SideEffect::BeginCapture(answer) = next_effect(&mut channels).await else {
        panic!("expected answer capture to start");
    };

    handle
        .recognition(answer, RecognizerReport::Results(vec!["Dark Theme".into()]))
        .await;
    let command = timeout(WAIT, channels.commands.recv()).await.unwrap();
    assert_eq!(command, Some(ResolvedCommand::SetTheme(ThemeChoice::Dark)));
    let SideEffect::Speak(confirmation) = next_effect(&mut channels).await else {
        panic!("expected a confirmation");
    };
    assert_eq!(confirmation.text, "new theme setting: dark theme");

    handle.shutdown();
    let reactor = timeout(WAIT, task).await.unwrap().unwrap();
    assert_eq!(reactor.phase(), DialogPhase::Idle);
    assert_eq!(settings::read_theme(settings.as_ref()), ThemeChoice::Dark);
}

#[tokio::test]
async fn test_navigation_reaches_command_consumer() {
    let (service, mut channels) = service(EngineConfig::default(), Arc::new(InMemorySettings::new()));
    let task = tokio::spawn(service.run());
    let handle = channels.handle.clone();

    handle.activate().await;
    let SideEffect::BeginCapture(session) = next_effect(&mut channels).await else {
        panic!("expected capture to start");
    };
    handle
        .recognition(session, RecognizerReport::Results(vec!["go to place details".into()]))
        .await;

    let command = timeout(WAIT, channels.commands.recv()).await.unwrap();
    assert_eq!(command, Some(ResolvedCommand::Navigate(Screen::PlaceDetails)));

    handle.shutdown();
    timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_capture_timeout_resolves_as_no_match() {
    let config = EngineConfig {
        capture_timeout: Some(Duration::from_millis(50)),
        ..EngineConfig::default()
    };
    let (service, mut channels) = service(config, Arc::new(InMemorySettings::new()));
    let task = tokio::spawn(service.run());
    let handle = channels.handle.clone();

    handle.activate().await;
    let SideEffect::BeginCapture(session) = next_effect(&mut channels).await else {
        panic!("expected capture to start");
    };
    assert!(*channels.listening.borrow());

    // Engine never reports; the guard fires.
    assert_eq!(next_effect(&mut channels).await, SideEffect::CancelCapture(session));
    assert!(!*channels.listening.borrow());

    handle.shutdown();
    let reactor = timeout(WAIT, task).await.unwrap().unwrap();
    assert_eq!(reactor.phase(), DialogPhase::Idle);
    assert_eq!(reactor.telemetry.snapshot().capture_stats.expired, 1);
}

#[tokio::test]
async fn test_say_and_await_skipped_without_narration() {
    let config = EngineConfig {
        narration_enabled: false,
        ..EngineConfig::default()
    };
    let (service, channels) = service(config, Arc::new(InMemorySettings::new()));
    let task = tokio::spawn(service.run());

    let completion = timeout(WAIT, channels.handle.say_and_await("hello")).await.unwrap();
    assert_eq!(completion.map(|c| c.status), Some(CompletionStatus::Skipped));

    channels.handle.shutdown();
    timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_say_and_await_resolves_after_playback() {
    let (service, channels) = service(EngineConfig::default(), Arc::new(InMemorySettings::new()));
    let task = tokio::spawn(service.run());
    let DialogChannels {
        handle, mut effects, ..
    } = channels;

    // Fake narration engine: finishes whatever it is asked to play.
    let engine_handle = handle.clone();
    let engine = tokio::spawn(async move {
        while let Some(effect) = effects.recv().await {
            if let SideEffect::Speak(utterance) = effect {
                engine_handle.playback_finished(utterance.id).await;
            }
        }
    });

    let completion = timeout(WAIT, handle.say_and_await("one moment")).await.unwrap();
    assert_eq!(completion.map(|c| c.status), Some(CompletionStatus::Finished));

    handle.shutdown();
    timeout(WAIT, task).await.unwrap().unwrap();
    engine.abort();
}

#[tokio::test]
async fn test_dropping_every_handle_stops_service() {
    let (service, channels) = service(EngineConfig::default(), Arc::new(InMemorySettings::new()));
    let task = tokio::spawn(service.run());

    let DialogChannels { handle, .. } = channels;
    handle.say("bye", QueueMode::Enqueue).await;
    drop(handle);

    let reactor = timeout(WAIT, task).await.unwrap().unwrap();
    assert_eq!(reactor.phase(), DialogPhase::Idle);
}

#[tokio::test]
async fn test_handle_outlives_service() {
    let (service, channels) = service(EngineConfig::default(), Arc::new(InMemorySettings::new()));
    let task = tokio::spawn(service.run());

    channels.handle.shutdown();
    timeout(WAIT, task).await.unwrap().unwrap();

    // Posting to a stopped service is a quiet no-op.
    channels.handle.activate().await;
    assert_eq!(channels.handle.say_and_await("anyone?").await, None);
}

#[tokio::test]
async fn test_from_config_uses_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let config = EngineConfig {
        settings_file: Some(path.clone()),
        ..EngineConfig::default()
    };

    let (service, mut channels) = DialogService::from_config(&config).unwrap();
    let task = tokio::spawn(service.run());
    let handle = channels.handle.clone();

    handle.activate().await;
    let SideEffect::BeginCapture(session) = next_effect(&mut channels).await else {
        panic!("expected capture to start");
    };
    handle
        .recognition(session, RecognizerReport::Results(vec!["change screen settings".into()]))
        .await;
    let SideEffect::Speak(question) = next_effect(&mut channels).await else {
        panic!("expected the follow-up question");
    };
    handle.playback_finished(question.id).await;
    let SideEffect::BeginCapture(answer) = next_effect(&mut channels).await else {
        panic!("expected answer capture to start");
    };
    handle
        .recognition(answer, RecognizerReport::Results(vec!["keep screen always on".into()]))
        .await;
    timeout(WAIT, channels.commands.recv()).await.unwrap();

    handle.shutdown();
    timeout(WAIT, task).await.unwrap().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("KEEP_ON"), "{}", raw);
}

#[tokio::test]
async fn test_oversized_event_capacity_is_clamped() {
    let config = EngineConfig {
        event_capacity: usize::MAX,
        ..EngineConfig::default()
    };
    let (service, channels) = service(config, Arc::new(InMemorySettings::new()));
    let task = tokio::spawn(service.run());

    channels.handle.shutdown();
    timeout(WAIT, task).await.unwrap().unwrap();
}

#[test]
fn test_reactor_config_follows_engine_config() {
    let config = EngineConfig {
        narration_enabled: false,
        ..EngineConfig::default()
    };
    assert!(!config.reactor().narration_enabled);
    assert!(ReactorConfig::default().narration_enabled);
}
