use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use crate::kernel::event::{RecognizerReport, SessionId, Utterance};
use crate::kernel::scheduler::SideEffect;
use crate::service::DialogHandle;

pub const DEFAULT_MS_PER_CHAR: u64 = 45;

/// Terminal stand-ins for both speech engines. Narration is printed and
/// "plays" for a time proportional to its length; typed lines are delivered
/// as recognition results for the open capture session.
pub struct ConsoleEngines {
    handle: DialogHandle,
    ms_per_char: u64,
    playing: Option<oneshot::Sender<()>>,
    listening: Option<SessionId>,
}

impl ConsoleEngines {
    pub fn new(handle: DialogHandle, ms_per_char: u64) -> Self {
        Self {
            handle,
            ms_per_char,
            playing: None,
            listening: None,
        }
    }

    pub fn apply(&mut self, effect: SideEffect) {
        match effect {
            SideEffect::Speak(utterance) => self.speak(utterance),
            SideEffect::StopSpeech => self.stop(),
            SideEffect::BeginCapture(session) => self.listening = Some(session),
            SideEffect::CancelCapture(session) => {
                if self.listening == Some(session) {
                    self.listening = None;
                }
            }
            SideEffect::Dispatch(command) => debug!("Console ignores dispatch {:?}", command),
        }
    }

    /// A typed line. Blank lines are recognized speech with zero candidates.
    pub async fn line(&mut self, line: &str) {
        let Some(session) = self.listening.take() else {
            println!("(not listening, type ! to activate)");
            return;
        };
        let candidates = match line.trim() {
            "" => Vec::new(),
            text => vec![text.to_string()],
        };
        self.handle
            .recognition(session, RecognizerReport::Results(candidates))
            .await;
    }

    fn speak(&mut self, utterance: Utterance) {
        self.stop();
        println!("[SAY-{}] {}", utterance.id.0, utterance.text);

        let duration = Duration::from_millis(self.ms_per_char * utterance.text.len() as u64);
        let handle = self.handle.clone();
        let (stop_tx, stop_rx) = oneshot::channel();
        self.playing = Some(stop_tx);

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => handle.playback_finished(utterance.id).await,
                _ = stop_rx => {}
            }
        });
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.playing.take() {
            let _ = stop_tx.send(());
        }
    }
}
