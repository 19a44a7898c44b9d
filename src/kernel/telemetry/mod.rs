//! Dialog telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer. It is never read by the
//! reactor's decision logic.
//!
//! # PRIVACY INVARIANT
//! Events never contain user content (transcripts, narration text).
//! Only ids, phases, intents, outcome kinds and tick counts.

pub mod event;
pub mod metrics;
pub mod recorder;
