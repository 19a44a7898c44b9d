//! The dialog kernel: pure, synchronous state machine plus the leaf
//! components it orchestrates. Nothing in here performs I/O or awaits.

pub mod capture;
pub mod event;
pub mod intent;
pub mod phase;
pub mod reactor;
pub mod scheduler;
pub mod speech;
pub mod state;
pub mod telemetry;
pub mod time;
