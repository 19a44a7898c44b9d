use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueMode {
    /// Stop what is playing, drop the queue, play this now.
    Flush,
    /// Play after everything already committed.
    Enqueue,
}

/// One unit of narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub mode: QueueMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionStatus {
    /// Played to the end.
    Finished,
    /// Stopped or discarded by a later FLUSH.
    Interrupted,
    /// Never played because narration is unavailable.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtteranceCompletion {
    pub id: UtteranceId,
    pub status: CompletionStatus,
}

/// Terminal report from the recognition engine for one capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerReport {
    /// Candidates in decreasing order of confidence. May be empty.
    Results(Vec<String>),
    NoMatch,
    Timeout,
    Failed(String),
}

/// Everything that can wake the dialog reactor.
#[derive(Debug)]
pub enum Event {
    /// The activation control was pressed.
    Activate,
    Recognition {
        session: SessionId,
        report: RecognizerReport,
    },
    /// Capture timeout elapsed without a report.
    CaptureExpired(SessionId),
    /// The narration engine finished playing an utterance.
    PlaybackFinished(UtteranceId),
    /// Narration engine (re)initialized; `false` means unusable.
    NarrationReady(bool),
    Say {
        text: String,
        mode: QueueMode,
    },
    SayAndAwait {
        text: String,
        reply: oneshot::Sender<UtteranceCompletion>,
    },
}
