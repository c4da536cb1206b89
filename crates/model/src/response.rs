use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OpaqueMessage;
use crate::provider::ModelProviderError;

/// A streamed answer from the model.
///
/// Events arrive in a fixed order: text deltas first, then the complete
/// tool calls, then exactly one [`ModelResponseEvent::Completed`].
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls for the next event.
    ///
    /// Resolves to `Ok(Some(event))` while the stream has events,
    /// `Ok(None)` once it is exhausted (and on every later call), or
    /// `Err(_)` when the stream broke. `Poll::Pending` registers the
    /// waker of `cx` like any other future.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;

    /// Wraps the whole answer as a provider-native message, so that it can
    /// be sent back verbatim in the next request.
    ///
    /// Only meaningful after the stream is exhausted. Calling it again
    /// must return an equal message.
    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        None
    }
}

/// Why the model stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model wants the requested tools to be called.
    ToolCalls,
    /// The answer is complete.
    Stop,
    /// The answer was cut off by the token limit.
    Length,
}

/// A tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifies the call, the result must carry the same id.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments to pass to the function, usually a JSON object.
    ///
    /// Providers that fail to parse the raw arguments should pass
    /// `Value::Null` and let the tool reject it.
    pub arguments: Value,
}

/// An event of a [`ModelResponse`] stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The stream is complete.
    Completed(ModelFinishReason),
    /// A piece of the answer text.
    MessageDelta(String),
    /// A fully assembled tool call.
    ToolCall(ToolCallRequest),
}
