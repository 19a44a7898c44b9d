use std::sync::Arc;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use super::capture::{CaptureOutcome, CaptureSession, SpeechCaptureController};
use super::event::{CompletionStatus, Event, QueueMode, SessionId, UtteranceCompletion, UtteranceId};
use super::intent::decoder::CommandDecoder;
use super::intent::types::{DialogueAct, Intent, ResolvedCommand};
use super::phase::{DialogPhase, PhaseGraph, PhaseRequest};
use super::scheduler::{Scheduler, SideEffect};
use super::speech::planner::SpeechPlanner;
use super::speech::queue::SpeechOutputQueue;
use super::state::{DialogState, StateDelta};
use super::telemetry::event::{CaptureEventKind, DialogueActKind, TelemetryEvent};
use super::telemetry::recorder::TelemetryRecorder;
use super::time::Tick;
use crate::error::DialogFailure;
use crate::phrases::Phrasebook;
use crate::settings::{self, SettingsService};

#[derive(Debug, Clone, Copy)]
pub struct ReactorConfig {
    /// Whether the narration engine is usable at start-up.
    pub narration_enabled: bool,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            narration_enabled: true,
        }
    }
}

/// The dialog state machine. Owns the capture controller, the output queue
/// and all dialog state; nothing else mutates them.
pub struct Reactor {
    pub state: DialogState,
    pub output: SpeechOutputQueue,
    pub capture: SpeechCaptureController,
    pub telemetry: TelemetryRecorder,
    pub tick: Tick,
    decoder: CommandDecoder,
    planner: SpeechPlanner,
    scheduler: Scheduler,
    settings: Arc<dyn SettingsService>,
    // Completion of the follow-up question currently being narrated.
    question: Option<(UtteranceId, oneshot::Receiver<UtteranceCompletion>)>,
}

impl Reactor {
    pub fn new(phrasebook: Arc<Phrasebook>, settings: Arc<dyn SettingsService>, config: ReactorConfig) -> Self {
        Self {
            state: DialogState::new(),
            output: SpeechOutputQueue::new(config.narration_enabled),
            capture: SpeechCaptureController::new(),
            telemetry: TelemetryRecorder::new(),
            tick: Tick::new(),
            decoder: CommandDecoder::new(phrasebook.clone()),
            planner: SpeechPlanner::new(phrasebook),
            scheduler: Scheduler,
            settings,
            question: None,
        }
    }

    pub fn phase(&self) -> DialogPhase {
        self.state.phase
    }

    /// Pure step: one event in, side effects out.
    /// MUST NOT await. Every transition happens inside exactly one step.
    pub fn step(&mut self, event: Event) -> Vec<SideEffect> {
        self.tick = self.tick.next();
        self.state.reduce(StateDelta::Tick(self.tick));
        let mut effects = Vec::new();

        match event {
            Event::Activate => self.on_activate(&mut effects),
            Event::Recognition { session, report } => {
                if let Some((session, outcome)) = self.capture.resolve(session, report) {
                    self.on_capture_outcome(session, outcome, false, &mut effects);
                }
            }
            Event::CaptureExpired(session) => {
                if let Some((session, outcome, effect)) = self.capture.expire(session) {
                    effects.push(effect);
                    self.on_capture_outcome(session, outcome, true, &mut effects);
                }
            }
            Event::PlaybackFinished(id) => effects.extend(self.output.playback_finished(id)),
            Event::NarrationReady(available) => effects.extend(self.output.set_available(available)),
            Event::Say { text, mode } => {
                let (_, speech) = self.output.say(text, mode);
                effects.extend(speech);
            }
            Event::SayAndAwait { text, reply } => {
                let (_, speech) = self.output.say_with_reply(text, reply);
                effects.extend(speech);
            }
        }

        self.settle(&mut effects);
        debug_assert!(self.state.is_consistent(), "inconsistent dialog state: {:?}", self.state);
        effects
    }

    // === ACTIVATION ===

    fn on_activate(&mut self, effects: &mut Vec<SideEffect>) {
        match self.state.phase {
            DialogPhase::ListeningCommand | DialogPhase::ListeningAnswer => {
                // Re-press while listening: cancel, decode nothing.
                match self.capture.cancel() {
                    Some((session, outcome, effect)) => {
                        effects.push(effect);
                        self.on_capture_outcome(session, outcome, false, effects);
                    }
                    None => {
                        self.clear_context();
                        self.enter(PhaseRequest::Activate);
                    }
                }
            }
            DialogPhase::Idle | DialogPhase::SpeakingQuestion => {
                // Fresh top-level listen. Any stale context is discarded.
                self.clear_context();
                match self.capture.begin(self.tick) {
                    Ok((session, effect)) => {
                        effects.push(effect);
                        self.record_capture_start(session);
                        self.enter(PhaseRequest::Activate);
                    }
                    Err(e) => {
                        warn!("Could not start listening: {}", e);
                        self.enter(PhaseRequest::TurnEnded);
                        self.narrate(&DialogueAct::ReportFailure, effects);
                    }
                }
            }
        }
    }

    // === CAPTURE RESULTS ===

    fn on_capture_outcome(
        &mut self,
        session: CaptureSession,
        outcome: CaptureOutcome,
        expired: bool,
        effects: &mut Vec<SideEffect>,
    ) {
        let phase = self.state.phase;
        let kind = match (&outcome, expired) {
            (_, true) => CaptureEventKind::Expired,
            (CaptureOutcome::Transcript(_), _) => CaptureEventKind::Transcript,
            (CaptureOutcome::NoMatch, _) => CaptureEventKind::NoMatch,
            (CaptureOutcome::Cancelled, _) => CaptureEventKind::Cancelled,
            (CaptureOutcome::Error(_), _) => CaptureEventKind::Error,
        };
        self.record_capture_end(&session, kind);

        if !phase.is_listening() {
            debug!("Capture outcome in {:?} ignored", phase);
            return;
        }

        match outcome {
            CaptureOutcome::Transcript(text) => match phase {
                DialogPhase::ListeningCommand => self.handle_command(&text, effects),
                _ => self.handle_answer(&text, effects),
            },
            CaptureOutcome::NoMatch => {
                // Expected and frequent. Silent return to idle.
                self.telemetry.record(TelemetryEvent::Failure(DialogFailure::NoMatch));
                self.clear_context();
                self.enter(PhaseRequest::TurnEnded);
            }
            CaptureOutcome::Cancelled => {
                debug!("Capture {:?} cancelled in {:?}", session.id, phase);
                self.clear_context();
                self.enter(PhaseRequest::TurnEnded);
            }
            CaptureOutcome::Error(e) => {
                warn!("Capture failed: {}", e);
                self.telemetry
                    .record(TelemetryEvent::Failure(DialogFailure::RecognitionUnavailable));
                self.clear_context();
                self.enter(PhaseRequest::TurnEnded);
                self.narrate(&DialogueAct::ReportFailure, effects);
            }
        }
    }

    fn handle_command(&mut self, text: &str, effects: &mut Vec<SideEffect>) {
        let command = self.decoder.decode(text);
        info!("Decoded command: {:?}", command);
        self.telemetry.record(TelemetryEvent::Decoded { intent: command.intent });

        let act = self.scheduler.schedule(&command, self.settings.as_ref());
        self.record_act(&act);

        match act {
            DialogueAct::Ask(intent) => {
                self.state.reduce(StateDelta::ContextOpened(intent));
                self.enter(PhaseRequest::FollowUpRequired);

                let question = self.planner.plan(&act).join(" ");
                let (id, rx, speech) = self.output.say_and_await(question);
                effects.extend(speech);
                self.question = Some((id, rx));
            }
            DialogueAct::Execute(resolved) => {
                self.enter(PhaseRequest::TurnEnded);
                effects.push(SideEffect::Dispatch(resolved));
            }
            DialogueAct::Reject => {
                self.telemetry.record(TelemetryEvent::Failure(DialogFailure::DecodeUnknown));
                self.enter(PhaseRequest::TurnEnded);
                self.narrate(&act, effects);
            }
            other => {
                self.enter(PhaseRequest::TurnEnded);
                self.narrate(&other, effects);
            }
        }
    }

    fn handle_answer(&mut self, text: &str, effects: &mut Vec<SideEffect>) {
        let pending = self.state.context.map(|ctx| ctx.pending_intent);
        self.clear_context();
        self.enter(PhaseRequest::TurnEnded);

        let book = self.decoder.phrasebook();
        let resolved = match pending {
            Some(Intent::ChangeTheme) => self
                .decoder
                .decode_answer(text, &book.themes)
                .map(ResolvedCommand::SetTheme),
            Some(Intent::ChangeScreenSetting) => self
                .decoder
                .decode_answer(text, &book.screen_settings)
                .map(ResolvedCommand::SetScreen),
            other => {
                warn!("Answer heard with no follow-up pending: {:?}", other);
                None
            }
        };
        self.telemetry.record(TelemetryEvent::AnswerResolved {
            matched: resolved.is_some(),
        });

        match resolved {
            Some(command) => {
                info!("Resolved answer: {:?}", command);
                self.apply_setting(command);
                effects.push(SideEffect::Dispatch(command));
                let act = DialogueAct::Confirm(command);
                self.record_act(&act);
                self.narrate(&act, effects);
            }
            None => {
                self.telemetry.record(TelemetryEvent::Failure(DialogFailure::DecodeUnknown));
                self.record_act(&DialogueAct::Reject);
                self.narrate(&DialogueAct::Reject, effects);
            }
        }
    }

    // === NARRATION ===

    /// Drain output completions and advance past the follow-up question once
    /// it has been spoken (or skipped).
    fn settle(&mut self, effects: &mut Vec<SideEffect>) {
        loop {
            for completion in self.output.take_completed() {
                if completion.status == CompletionStatus::Skipped {
                    self.telemetry
                        .record(TelemetryEvent::Failure(DialogFailure::NarrationUnavailable));
                }
                self.telemetry.record(TelemetryEvent::NarrationLifecycle {
                    utterance: completion.id,
                    status: completion.status,
                });
            }

            if !self.poll_question(effects) {
                break;
            }
        }
    }

    /// Returns true if the question completed and the phase advanced.
    fn poll_question(&mut self, effects: &mut Vec<SideEffect>) -> bool {
        let Some((id, rx)) = self.question.as_mut() else {
            return false;
        };
        let completion = match rx.try_recv() {
            Ok(completion) => completion,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Closed) => UtteranceCompletion {
                id: *id,
                status: CompletionStatus::Interrupted,
            },
        };
        self.question = None;

        if self.state.phase != DialogPhase::SpeakingQuestion {
            return false;
        }
        debug!("Question {:?} done: {:?}", completion.id, completion.status);

        self.enter(PhaseRequest::QuestionSpoken);
        match self.capture.begin(self.tick) {
            Ok((session, effect)) => {
                self.state.reduce(StateDelta::AwaitingResponse);
                effects.push(effect);
                self.record_capture_start(session);
            }
            Err(e) => {
                warn!("Could not listen for answer: {}", e);
                self.clear_context();
                self.enter(PhaseRequest::TurnEnded);
                self.narrate(&DialogueAct::ReportFailure, effects);
            }
        }
        true
    }

    fn narrate(&mut self, act: &DialogueAct, effects: &mut Vec<SideEffect>) {
        for (i, line) in self.planner.plan(act).into_iter().enumerate() {
            let mode = if i == 0 { QueueMode::Flush } else { QueueMode::Enqueue };
            let (_, speech) = self.output.say(line, mode);
            effects.extend(speech);
        }
    }

    // === HELPERS ===

    fn apply_setting(&self, command: ResolvedCommand) {
        let result = match command {
            ResolvedCommand::SetTheme(theme) => settings::write_theme(self.settings.as_ref(), theme),
            ResolvedCommand::SetScreen(screen) => settings::write_screen(self.settings.as_ref(), screen),
            ResolvedCommand::Navigate(_) => Ok(()),
        };
        if let Err(e) = result {
            warn!("Failed to persist {:?}: {}", command, e);
        }
    }

    fn clear_context(&mut self) {
        self.question = None;
        if self.state.context.is_some() {
            self.state.reduce(StateDelta::ContextCleared);
        }
    }

    fn enter(&mut self, request: PhaseRequest) {
        let from = self.state.phase;
        match PhaseGraph::transition(from, request) {
            Some(to) => {
                self.state.reduce(StateDelta::PhaseChanged(to));
                self.telemetry.record(TelemetryEvent::PhaseTransition {
                    from,
                    to,
                    tick: self.tick,
                });
                debug!("Phase {:?} -> {:?} on {:?}", from, to, request);
            }
            None => debug!("Ignored {:?} in {:?}", request, from),
        }
    }

    fn record_capture_start(&mut self, session: SessionId) {
        self.telemetry.record(TelemetryEvent::CaptureLifecycle {
            session,
            event: CaptureEventKind::Started,
            duration_ticks: 0,
        });
    }

    fn record_capture_end(&mut self, session: &CaptureSession, kind: CaptureEventKind) {
        self.telemetry.record(TelemetryEvent::CaptureLifecycle {
            session: session.id,
            event: kind,
            duration_ticks: self.tick.since(session.started_at),
        });
    }

    fn record_act(&mut self, act: &DialogueAct) {
        self.telemetry.record(TelemetryEvent::DialogueAct {
            act: DialogueActKind::from(act),
        });
    }
}
