//! Async driver around the dialog reactor.
//!
//! The service task is the single logical dialog thread: it owns the
//! [`Reactor`] and feeds it one event at a time. Engine callbacks, UI
//! triggers and timers all arrive as [`Event`]s on one channel, so reactor
//! transitions can never interleave.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, MAX_EVENT_CAPACITY};
use crate::kernel::event::{Event, QueueMode, RecognizerReport, SessionId, UtteranceCompletion, UtteranceId};
use crate::kernel::intent::types::ResolvedCommand;
use crate::kernel::reactor::Reactor;
use crate::kernel::scheduler::SideEffect;

/// Cloneable entry point for UI triggers and engine callbacks.
#[derive(Debug, Clone)]
pub struct DialogHandle {
    tx: mpsc::Sender<Event>,
    shutdown: CancellationToken,
}

impl DialogHandle {
    /// Activation control pressed. Fire-and-forget.
    pub async fn activate(&self) {
        self.post(Event::Activate).await;
    }

    pub async fn say(&self, text: impl Into<String>, mode: QueueMode) {
        self.post(Event::Say {
            text: text.into(),
            mode,
        })
        .await;
    }

    /// FLUSH `text` and wait until it has finished, been interrupted or been
    /// skipped. `None` if the service has stopped.
    pub async fn say_and_await(&self, text: impl Into<String>) -> Option<UtteranceCompletion> {
        let (reply, rx) = oneshot::channel();
        self.post(Event::SayAndAwait {
            text: text.into(),
            reply,
        })
        .await;
        rx.await.ok()
    }

    /// Narration engine callback: `id` finished playing.
    pub async fn playback_finished(&self, id: UtteranceId) {
        self.post(Event::PlaybackFinished(id)).await;
    }

    /// Recognition engine callback: terminal report for `session`.
    pub async fn recognition(&self, session: SessionId, report: RecognizerReport) {
        self.post(Event::Recognition { session, report }).await;
    }

    /// Narration engine (re)initialized.
    pub async fn narration_ready(&self, available: bool) {
        self.post(Event::NarrationReady(available)).await;
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn post(&self, event: Event) {
        if let Err(e) = self.tx.send(event).await {
            debug!("Dialog service stopped, dropping {:?}", e.0);
        }
    }
}

/// Everything a host needs to wire the engine to its collaborators.
pub struct DialogChannels {
    pub handle: DialogHandle,
    /// Narration and capture requests for the speech engines.
    pub effects: mpsc::UnboundedReceiver<SideEffect>,
    /// Resolved commands for navigation/settings collaborators.
    pub commands: mpsc::UnboundedReceiver<ResolvedCommand>,
    /// True exactly while a capture session is listening.
    pub listening: watch::Receiver<bool>,
}

pub struct DialogService {
    reactor: Reactor,
    events: mpsc::Receiver<Event>,
    // Weak so that dropping every handle still ends the loop.
    timer_tx: mpsc::WeakSender<Event>,
    effects: mpsc::UnboundedSender<SideEffect>,
    commands: mpsc::UnboundedSender<ResolvedCommand>,
    capture_timeout: Option<Duration>,
    timer: Option<(SessionId, JoinHandle<()>)>,
    shutdown: CancellationToken,
}

impl DialogService {
    /// `config.event_capacity` is clamped to `1..=MAX_EVENT_CAPACITY`.
    pub fn new(reactor: Reactor, config: &EngineConfig) -> (Self, DialogChannels) {
        let (tx, events) = mpsc::channel(config.event_capacity.clamp(1, MAX_EVENT_CAPACITY));
        let (effects_tx, effects_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let listening = reactor.capture.subscribe();

        let service = Self {
            reactor,
            events,
            timer_tx: tx.downgrade(),
            effects: effects_tx,
            commands: commands_tx,
            capture_timeout: config.capture_timeout,
            timer: None,
            shutdown: shutdown.clone(),
        };
        let channels = DialogChannels {
            handle: DialogHandle { tx, shutdown },
            effects: effects_rx,
            commands: commands_rx,
            listening,
        };
        (service, channels)
    }

    /// Build phrasebook, settings and reactor from `config`.
    pub fn from_config(config: &EngineConfig) -> Result<(Self, DialogChannels)> {
        let phrasebook = Arc::new(config.load_phrasebook()?);
        let settings = config.open_settings()?;
        let reactor = Reactor::new(phrasebook, settings, config.reactor());
        Ok(Self::new(reactor, config))
    }

    /// Run until shutdown or until every handle is dropped. Hands the reactor
    /// back so callers can inspect final state and telemetry.
    pub async fn run(mut self) -> Reactor {
        info!("Dialog service started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Dialog service shutting down");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => {
                        debug!("Event: {:?}", event);
                        let effects = self.reactor.step(event);
                        self.route(effects);
                    }
                    None => {
                        info!("All dialog handles dropped");
                        break;
                    }
                }
            }
        }

        self.disarm_timer(None);
        self.reactor
    }

    fn route(&mut self, effects: Vec<SideEffect>) {
        for effect in effects {
            match effect {
                SideEffect::Dispatch(command) => {
                    info!("Dispatching {:?}", command);
                    if self.commands.send(command).is_err() {
                        warn!("No command consumer, dropped {:?}", command);
                    }
                }
                SideEffect::BeginCapture(session) => {
                    self.arm_timer(session);
                    self.emit(effect);
                }
                SideEffect::CancelCapture(session) => {
                    self.disarm_timer(Some(session));
                    self.emit(effect);
                }
                other => self.emit(other),
            }
        }
    }

    fn emit(&self, effect: SideEffect) {
        if let Err(e) = self.effects.send(effect) {
            debug!("No engine driver attached, dropped {:?}", e.0);
        }
    }

    fn arm_timer(&mut self, session: SessionId) {
        self.disarm_timer(None);
        let Some(timeout) = self.capture_timeout else {
            return;
        };

        let tx = self.timer_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Event::CaptureExpired(session)).await;
            }
        });
        self.timer = Some((session, task));
    }

    /// Abort the capture timer, only if it belongs to `session` when given.
    fn disarm_timer(&mut self, session: Option<SessionId>) {
        let matches = match (&self.timer, session) {
            (Some((armed, _)), Some(session)) => *armed == session,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if matches {
            if let Some((_, task)) = self.timer.take() {
                task.abort();
            }
        }
    }
}
