use super::intent::types::Intent;
use super::phase::DialogPhase;
use super::time::Tick;

/// Working memory for a pending two-turn exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogContext {
    pub pending_intent: Intent,
    pub awaiting_response: bool,
}

/// Strict state delta. This is the ONLY way dialog state mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateDelta {
    Tick(Tick),
    PhaseChanged(DialogPhase),
    ContextOpened(Intent),
    AwaitingResponse,
    ContextCleared,
}

#[derive(Debug, Clone, Default)]
pub struct DialogState {
    pub phase: DialogPhase,
    pub context: Option<DialogContext>,
    pub last_tick: Tick,
    /// Monotonic, bumped on every delta.
    pub version: u64,
}

impl DialogState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reduce(&mut self, delta: StateDelta) {
        self.version += 1;

        match delta {
            StateDelta::Tick(t) => self.last_tick = t,
            StateDelta::PhaseChanged(phase) => self.phase = phase,
            // Last command wins: opening a context replaces any stale one.
            StateDelta::ContextOpened(intent) => {
                self.context = Some(DialogContext {
                    pending_intent: intent,
                    awaiting_response: false,
                })
            }
            StateDelta::AwaitingResponse => {
                if let Some(ctx) = self.context.as_mut() {
                    ctx.awaiting_response = true;
                }
            }
            StateDelta::ContextCleared => self.context = None,
        }
    }

    /// A context awaiting a response exists only while listening for the answer.
    pub fn is_consistent(&self) -> bool {
        match self.context {
            Some(ctx) if ctx.awaiting_response => self.phase == DialogPhase::ListeningAnswer,
            Some(_) => self.phase == DialogPhase::SpeakingQuestion,
            None => !matches!(self.phase, DialogPhase::SpeakingQuestion | DialogPhase::ListeningAnswer),
        }
    }
}
