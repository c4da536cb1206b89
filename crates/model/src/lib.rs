//! Provider-neutral protocol between the travel agent and an LLM.
//!
//! The agent loop only ever speaks in terms of the types defined here, so
//! that a hosted model, a local OpenAI-compatible server or a scripted fake
//! can be swapped without touching the loop itself.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
