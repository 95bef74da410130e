//! Subsystem modules for the assistant.

pub mod assistant;
pub mod comms;
pub mod history;
pub mod host;
pub mod runtime;
pub mod timer;
