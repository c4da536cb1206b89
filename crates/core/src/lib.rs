//! Core logic of the travel agent: the tool-calling loop and tool execution.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
mod conversation;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, Error, Reply, TranscriptSource};
