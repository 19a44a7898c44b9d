pub mod config;
pub mod error;
pub mod kernel;
pub mod outputs;
pub mod phrases;
pub mod service;
pub mod settings;

pub use kernel::reactor::Reactor;
pub use service::{DialogChannels, DialogHandle, DialogService};
