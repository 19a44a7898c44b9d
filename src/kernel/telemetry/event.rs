use serde::{Deserialize, Serialize};

use crate::error::DialogFailure;
use crate::kernel::event::{CompletionStatus, SessionId, UtteranceId};
use crate::kernel::intent::types::{DialogueAct, Intent};
use crate::kernel::phase::DialogPhase;
use crate::kernel::time::Tick;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    PhaseTransition {
        from: DialogPhase,
        to: DialogPhase,
        tick: Tick,
    },

    CaptureLifecycle {
        session: SessionId,
        event: CaptureEventKind,
        duration_ticks: u64,
    },

    /// Decoded intent only; the transcript is stripped.
    Decoded {
        intent: Intent,
    },

    AnswerResolved {
        matched: bool,
    },

    NarrationLifecycle {
        utterance: UtteranceId,
        status: CompletionStatus,
    },

    DialogueAct {
        act: DialogueActKind,
    },

    Failure(DialogFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureEventKind {
    Started,
    Transcript,
    NoMatch,
    Cancelled,
    Expired,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueActKind {
    Ask,
    Execute,
    Confirm,
    ListOptions,
    ReadSetting,
    Reject,
    ReportFailure,
}

impl From<&DialogueAct> for DialogueActKind {
    fn from(act: &DialogueAct) -> Self {
        match act {
            DialogueAct::Ask(_) => DialogueActKind::Ask,
            DialogueAct::Execute(_) => DialogueActKind::Execute,
            DialogueAct::Confirm(_) => DialogueActKind::Confirm,
            DialogueAct::ListOptions => DialogueActKind::ListOptions,
            DialogueAct::ReadTheme(_)
            | DialogueAct::ReadScreen(_)
            | DialogueAct::ListSettings { .. } => DialogueActKind::ReadSetting,
            DialogueAct::Reject => DialogueActKind::Reject,
            DialogueAct::ReportFailure => DialogueActKind::ReportFailure,
        }
    }
}
