//! Tool call supports.

mod error;
mod executor;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub(crate) use executor::{Executor, ToolEntry};

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless. Shared resources such
/// as an HTTP client or an API key are immutable state of the tool, set at
/// construction and cloned into the future returned by [`Tool::execute`].
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    ///
    /// Arguments from the model are deserialized into this type before
    /// [`Tool::execute`] is called. On failure the model receives an
    /// [`ErrorKind::InvalidInput`] error instead.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description the model sees.
    fn description(&self) -> &str;

    /// Returns the JSON schema of [`Tool::Input`].
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}

/// Renders a tool result as the content of a tool message.
///
/// Errors are sent back to the model as text so that it can correct the
/// call or carry on without the tool.
pub fn render_result(result: &ToolResult) -> String {
    match result {
        Ok(output) => output.clone(),
        Err(err) => format!("Error: {}\n Please fix your mistakes.", err.reason()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_result() {
        assert_eq!(render_result(&Ok("42".to_owned())), "42");
        let err = Error::invalid_input().with_reason("missing field `b`");
        assert_eq!(
            render_result(&Err(err)),
            "Error: missing field `b`\n Please fix your mistakes."
        );
    }
}
