//! Notification adapter: turns a queue-delivered storage notification into one
//! workflow execution.

pub mod envelope;
pub mod handler;
pub mod orchestrator;
