use serde::{Deserialize, Serialize};

/// The dialog engine is in exactly one of these at any instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogPhase {
    #[default]
    Idle,
    /// Microphone open for a top-level command.
    ListeningCommand,
    /// Follow-up question is being narrated.
    SpeakingQuestion,
    /// Microphone open for the answer to the follow-up question.
    ListeningAnswer,
}

impl DialogPhase {
    pub fn is_listening(&self) -> bool {
        matches!(self, DialogPhase::ListeningCommand | DialogPhase::ListeningAnswer)
    }
}

/// Requests a phase transition. These are requests; the graph validates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseRequest {
    /// Activation control pressed.
    Activate,
    /// Command decoded and it needs a follow-up answer.
    FollowUpRequired,
    /// Follow-up question finished narrating.
    QuestionSpoken,
    /// Capture ended by any path and the turn is over.
    TurnEnded,
}

pub struct PhaseGraph;

impl PhaseGraph {
    /// Pure function: (current phase, request) -> next phase.
    /// `None` means the request is invalid in this phase and is ignored.
    pub fn transition(current: DialogPhase, request: PhaseRequest) -> Option<DialogPhase> {
        use DialogPhase::*;
        use PhaseRequest::*;

        match (current, request) {
            // Pressing the control while idle or mid-question starts a fresh listen.
            (Idle, Activate) => Some(ListeningCommand),
            (SpeakingQuestion, Activate) => Some(ListeningCommand),

            // Pressing it while listening cancels.
            (ListeningCommand, Activate) => Some(Idle),
            (ListeningAnswer, Activate) => Some(Idle),

            (ListeningCommand, FollowUpRequired) => Some(SpeakingQuestion),
            (SpeakingQuestion, QuestionSpoken) => Some(ListeningAnswer),

            (ListeningCommand, TurnEnded) => Some(Idle),
            (ListeningAnswer, TurnEnded) => Some(Idle),
            (SpeakingQuestion, TurnEnded) => Some(Idle),

            _ => None,
        }
    }
}
