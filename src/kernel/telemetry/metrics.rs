use std::collections::VecDeque;

use super::event::{CaptureEventKind, DialogueActKind, TelemetryEvent};
use crate::error::DialogFailure;
use crate::kernel::event::CompletionStatus;
use crate::kernel::intent::types::Intent;

#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub transitions: u64,
    pub capture_stats: CaptureStats,
    pub decode_stats: DecodeStats,
    pub narration_stats: NarrationStats,
    pub dialogue_stats: DialogueStats,
    pub failure_stats: FailureStats,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureStats {
    pub started: u64,
    pub transcripts: u64,
    pub no_matches: u64,
    pub cancelled: u64,
    pub expired: u64,
    pub errors: u64,
    pub avg_session_ticks: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DecodeStats {
    pub navigations: u64,
    pub follow_ups: u64,
    pub immediate: u64,
    pub unknown: u64,
    pub answers_matched: u64,
    pub answers_rejected: u64,
}

#[derive(Debug, Clone, Default)]
pub struct NarrationStats {
    pub finished: u64,
    pub interrupted: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DialogueStats {
    pub questions: u64,
    pub executions: u64,
    pub confirmations: u64,
    pub readouts: u64,
    pub rejections: u64,
    pub failure_reports: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FailureStats {
    pub recognition_unavailable: u64,
    pub no_match: u64,
    pub decode_unknown: u64,
    pub narration_unavailable: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    let mut ended_sessions = 0u64;
    let mut session_ticks = 0u64;

    for event in events {
        match event {
            TelemetryEvent::PhaseTransition { .. } => snap.transitions += 1,
            TelemetryEvent::CaptureLifecycle { event, duration_ticks, .. } => {
                if *event != CaptureEventKind::Started {
                    ended_sessions += 1;
                    session_ticks += duration_ticks;
                }
                let c = &mut snap.capture_stats;
                match event {
                    CaptureEventKind::Started => c.started += 1,
                    CaptureEventKind::Transcript => c.transcripts += 1,
                    CaptureEventKind::NoMatch => c.no_matches += 1,
                    CaptureEventKind::Cancelled => c.cancelled += 1,
                    CaptureEventKind::Expired => c.expired += 1,
                    CaptureEventKind::Error => c.errors += 1,
                }
            }
            TelemetryEvent::Decoded { intent } => match intent {
                Intent::Navigate => snap.decode_stats.navigations += 1,
                Intent::Unknown => snap.decode_stats.unknown += 1,
                i if i.needs_follow_up() => snap.decode_stats.follow_ups += 1,
                _ => snap.decode_stats.immediate += 1,
            },
            TelemetryEvent::AnswerResolved { matched } => {
                if *matched {
                    snap.decode_stats.answers_matched += 1;
                } else {
                    snap.decode_stats.answers_rejected += 1;
                }
            }
            TelemetryEvent::NarrationLifecycle { status, .. } => match status {
                CompletionStatus::Finished => snap.narration_stats.finished += 1,
                CompletionStatus::Interrupted => snap.narration_stats.interrupted += 1,
                CompletionStatus::Skipped => snap.narration_stats.skipped += 1,
            },
            TelemetryEvent::DialogueAct { act } => match act {
                DialogueActKind::Ask => snap.dialogue_stats.questions += 1,
                DialogueActKind::Execute => snap.dialogue_stats.executions += 1,
                DialogueActKind::Confirm => snap.dialogue_stats.confirmations += 1,
                DialogueActKind::ListOptions | DialogueActKind::ReadSetting => {
                    snap.dialogue_stats.readouts += 1
                }
                DialogueActKind::Reject => snap.dialogue_stats.rejections += 1,
                DialogueActKind::ReportFailure => snap.dialogue_stats.failure_reports += 1,
            },
            TelemetryEvent::Failure(failure) => match failure {
                DialogFailure::RecognitionUnavailable => snap.failure_stats.recognition_unavailable += 1,
                DialogFailure::NoMatch => snap.failure_stats.no_match += 1,
                DialogFailure::DecodeUnknown => snap.failure_stats.decode_unknown += 1,
                DialogFailure::NarrationUnavailable => snap.failure_stats.narration_unavailable += 1,
            },
        }
    }

    if ended_sessions > 0 {
        snap.capture_stats.avg_session_ticks = session_ticks as f64 / ended_sessions as f64;
    }

    snap
}
