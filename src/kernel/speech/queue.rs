use std::collections::{HashMap, VecDeque};

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::kernel::event::{CompletionStatus, QueueMode, Utterance, UtteranceCompletion, UtteranceId};
use crate::kernel::scheduler::SideEffect;

/// Serializes narration: one utterance plays at a time, ENQUEUE is FIFO,
/// FLUSH pre-empts everything committed before it.
///
/// Completions are reported exactly once per utterance, in commit order, both
/// to `say_and_await` callers and through [`SpeechOutputQueue::take_completed`].
#[derive(Debug)]
pub struct SpeechOutputQueue {
    available: bool,
    playing: Option<Utterance>,
    pending: VecDeque<Utterance>,
    next_id: u64,
    awaiting: HashMap<UtteranceId, oneshot::Sender<UtteranceCompletion>>,
    completed: Vec<UtteranceCompletion>,
}

impl SpeechOutputQueue {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            playing: None,
            pending: VecDeque::new(),
            next_id: 0,
            awaiting: HashMap::new(),
            completed: Vec::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn is_speaking(&self) -> bool {
        self.playing.is_some()
    }

    pub fn playing(&self) -> Option<&Utterance> {
        self.playing.as_ref()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn say(&mut self, text: impl Into<String>, mode: QueueMode) -> (UtteranceId, Vec<SideEffect>) {
        self.commit(text.into(), mode, None)
    }

    /// FLUSH `text` and get a receiver that resolves once it has finished,
    /// been interrupted, or been skipped.
    pub fn say_and_await(
        &mut self,
        text: impl Into<String>,
    ) -> (UtteranceId, oneshot::Receiver<UtteranceCompletion>, Vec<SideEffect>) {
        let (tx, rx) = oneshot::channel();
        let (id, effects) = self.commit(text.into(), QueueMode::Flush, Some(tx));
        (id, rx, effects)
    }

    /// Like `say_and_await`, for callers that already own the reply channel.
    pub fn say_with_reply(
        &mut self,
        text: impl Into<String>,
        reply: oneshot::Sender<UtteranceCompletion>,
    ) -> (UtteranceId, Vec<SideEffect>) {
        self.commit(text.into(), QueueMode::Flush, Some(reply))
    }

    /// The engine finished playing `id`. Reports for anything other than the
    /// current utterance are stale and ignored.
    pub fn playback_finished(&mut self, id: UtteranceId) -> Vec<SideEffect> {
        match &self.playing {
            Some(current) if current.id == id => {
                self.playing = None;
                self.complete(id, CompletionStatus::Finished);
                self.start_next().into_iter().collect()
            }
            _ => {
                debug!("Ignoring stale playback report for {:?}", id);
                Vec::new()
            }
        }
    }

    /// Engine availability changed. Losing the engine interrupts everything
    /// in flight so no caller waits on audio that will never play.
    pub fn set_available(&mut self, available: bool) -> Vec<SideEffect> {
        if self.available == available {
            return Vec::new();
        }
        self.available = available;
        info!("Narration available: {}", available);

        if available {
            return Vec::new();
        }
        let mut effects = Vec::new();
        if let Some(current) = self.playing.take() {
            effects.push(SideEffect::StopSpeech);
            self.complete(current.id, CompletionStatus::Interrupted);
        }
        self.drop_pending();
        effects
    }

    /// Completions since the last call, in commit order.
    pub fn take_completed(&mut self) -> Vec<UtteranceCompletion> {
        std::mem::take(&mut self.completed)
    }

    fn commit(
        &mut self,
        text: String,
        mode: QueueMode,
        reply: Option<oneshot::Sender<UtteranceCompletion>>,
    ) -> (UtteranceId, Vec<SideEffect>) {
        let id = UtteranceId(self.next_id);
        self.next_id += 1;

        if let Some(reply) = reply {
            self.awaiting.insert(id, reply);
        }

        if !self.available {
            debug!("Narration unavailable, skipping {:?}", id);
            self.complete(id, CompletionStatus::Skipped);
            return (id, Vec::new());
        }

        let utterance = Utterance { id, text, mode };
        let mut effects = Vec::new();

        match mode {
            QueueMode::Flush => {
                if let Some(current) = self.playing.take() {
                    effects.push(SideEffect::StopSpeech);
                    self.complete(current.id, CompletionStatus::Interrupted);
                }
                self.drop_pending();
                self.playing = Some(utterance.clone());
                effects.push(SideEffect::Speak(utterance));
            }
            QueueMode::Enqueue => {
                if self.playing.is_none() {
                    self.playing = Some(utterance.clone());
                    effects.push(SideEffect::Speak(utterance));
                } else {
                    self.pending.push_back(utterance);
                }
            }
        }

        (id, effects)
    }

    fn start_next(&mut self) -> Option<SideEffect> {
        let next = self.pending.pop_front()?;
        self.playing = Some(next.clone());
        Some(SideEffect::Speak(next))
    }

    fn drop_pending(&mut self) {
        let dropped: Vec<UtteranceId> = self.pending.drain(..).map(|u| u.id).collect();
        for id in dropped {
            self.complete(id, CompletionStatus::Interrupted);
        }
    }

    fn complete(&mut self, id: UtteranceId, status: CompletionStatus) {
        let completion = UtteranceCompletion { id, status };
        if let Some(reply) = self.awaiting.remove(&id) {
            // Receiver may have been dropped; completion is still recorded.
            let _ = reply.send(completion);
        }
        self.completed.push(completion);
    }
}
