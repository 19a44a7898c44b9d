use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::event::{RecognizerReport, SessionId};
use super::scheduler::SideEffect;
use super::time::Tick;
use crate::error::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    Idle,
    Listening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSession {
    pub id: SessionId,
    pub state: CaptureState,
    pub started_at: Tick,
}

/// The single outcome a capture session resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Transcript(String),
    NoMatch,
    Cancelled,
    Error(CaptureError),
}

/// Owns the microphone: at most one session listens at a time, and each
/// session resolves to exactly one outcome. Late reports for a session that
/// was already resolved or cancelled are dropped.
#[derive(Debug)]
pub struct SpeechCaptureController {
    active: Option<CaptureSession>,
    next_id: u64,
    listening: watch::Sender<bool>,
}

impl Default for SpeechCaptureController {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechCaptureController {
    pub fn new() -> Self {
        let (listening, _) = watch::channel(false);
        Self {
            active: None,
            next_id: 0,
            listening,
        }
    }

    /// Read-only listening flag for UI collaborators.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.listening.subscribe()
    }

    pub fn is_listening(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&CaptureSession> {
        self.active.as_ref()
    }

    /// Start a session. Rejected while another one is listening; the active
    /// session is left untouched.
    pub fn begin(&mut self, now: Tick) -> Result<(SessionId, SideEffect), CaptureError> {
        if let Some(active) = &self.active {
            return Err(CaptureError::AlreadyListening(active.id));
        }

        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.active = Some(CaptureSession {
            id,
            state: CaptureState::Listening,
            started_at: now,
        });
        self.listening.send_replace(true);
        info!("Capture session {:?} started", id);

        Ok((id, SideEffect::BeginCapture(id)))
    }

    /// Terminate the active session, which resolves as `Cancelled`.
    /// Idempotent when nothing is listening.
    pub fn cancel(&mut self) -> Option<(CaptureSession, CaptureOutcome, SideEffect)> {
        let session = self.finish()?;
        info!("Capture session {:?} cancelled", session.id);
        Some((session, CaptureOutcome::Cancelled, SideEffect::CancelCapture(session.id)))
    }

    /// Map the engine's report for `session` onto its single outcome.
    /// Returns `None` if that session is no longer active.
    pub fn resolve(&mut self, session: SessionId, report: RecognizerReport) -> Option<(CaptureSession, CaptureOutcome)> {
        if !self.owns(session) {
            debug!("Dropping late report for capture session {:?}", session);
            return None;
        }
        let finished = self.finish()?;

        let outcome = match report {
            // Highest-confidence candidate first; zero candidates is a no-match.
            RecognizerReport::Results(candidates) => match candidates.into_iter().next() {
                Some(text) => CaptureOutcome::Transcript(text),
                None => CaptureOutcome::NoMatch,
            },
            RecognizerReport::NoMatch | RecognizerReport::Timeout => CaptureOutcome::NoMatch,
            RecognizerReport::Failed(reason) => {
                warn!("Recognizer failed: {}", reason);
                CaptureOutcome::Error(CaptureError::RecognitionUnavailable(reason))
            }
        };
        Some((finished, outcome))
    }

    /// Capture timeout for `session`. Resolves as `NoMatch` and asks the
    /// engine to stop.
    pub fn expire(&mut self, session: SessionId) -> Option<(CaptureSession, CaptureOutcome, SideEffect)> {
        if !self.owns(session) {
            return None;
        }
        let finished = self.finish()?;
        info!("Capture session {:?} timed out", session);
        Some((finished, CaptureOutcome::NoMatch, SideEffect::CancelCapture(session)))
    }

    fn owns(&self, session: SessionId) -> bool {
        self.active.map(|a| a.id == session).unwrap_or(false)
    }

    fn finish(&mut self) -> Option<CaptureSession> {
        let mut session = self.active.take()?;
        session.state = CaptureState::Idle;
        self.listening.send_replace(false);
        Some(session)
    }
}
