use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// Errors a provider reports, classified by [`ErrorKind`].
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns how the agent should treat this error.
    fn kind(&self) -> ErrorKind;
}

/// Something that can sample a model.
///
/// One provider serves every travel query in flight, so it should hold
/// no per-conversation state. The returned future owns everything it
/// needs and outlives the `&self` borrow.
pub trait ModelProvider: Send + Sync {
    /// Errors of both the request and its response stream.
    type Error: ModelProviderError;

    /// The streamed answer.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts sampling `req`.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
