use std::collections::BTreeMap;
use std::pin::Pin;

use futures_util::future::join_all;
use serde_json::Value;
use tracing::Instrument;
use wayfarer_model::{ModelTool, ToolCallRequest, ToolCallResult};

use crate::tool::{Error, Tool, ToolResult, render_result};

type BoxedToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

trait ErasedTool: Send + Sync + 'static {
    fn definition(&self) -> ModelTool;

    fn call(&self, arguments: Value) -> BoxedToolFuture;
}

struct TypedTool<T: Tool>(T);

impl<T: Tool> ErasedTool for TypedTool<T> {
    fn definition(&self) -> ModelTool {
        ModelTool {
            name: self.0.name().to_owned(),
            description: self.0.description().trim().to_owned(),
            parameters: self.0.parameter_schema().clone(),
        }
    }

    fn call(&self, arguments: Value) -> BoxedToolFuture {
        // Some models send `null` for tools without parameters.
        let arguments = match arguments {
            Value::Null => Value::Object(Default::default()),
            arguments => arguments,
        };
        match serde_json::from_value::<T::Input>(arguments) {
            Ok(input) => Box::pin(self.0.execute(input)),
            Err(err) => Box::pin(std::future::ready(Err(
                Error::invalid_input().with_reason(err.to_string()),
            ))),
        }
    }
}

/// Type-erased tool registration, produced by the agent builder.
pub(crate) struct ToolEntry {
    name: String,
    tool: Box<dyn ErasedTool>,
}

impl ToolEntry {
    pub fn new<T: Tool>(tool: T) -> Self {
        Self {
            name: tool.name().to_owned(),
            tool: Box::new(TypedTool(tool)),
        }
    }
}

/// An executor that handles tool call requests from the model.
pub struct Executor {
    // Ordered so that tool definitions are stable across requests.
    tools: BTreeMap<String, Box<dyn ErasedTool>>,
}

impl Executor {
    pub fn with_tools(entries: Vec<ToolEntry>) -> Self {
        let mut tools = BTreeMap::new();
        for ToolEntry { name, tool } in entries {
            if tools.insert(name.clone(), tool).is_some() {
                warn!("tool `{name}` registered twice, keeping the last one");
            }
        }
        Self { tools }
    }

    #[inline]
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Runs all requested tool calls concurrently and answers each of them,
    /// in request order.
    pub async fn run_all(
        &self,
        requests: Vec<ToolCallRequest>,
    ) -> Vec<(ToolCallResult, ToolResult)> {
        let calls = requests.into_iter().map(|req| {
            let ToolCallRequest {
                id,
                name,
                arguments,
            } = req;
            let span = debug_span!("tool", %name, %id);
            let fut = match self.tools.get(&name) {
                Some(tool) => {
                    trace!("calling tool `{name}` ({id}) with {arguments}");
                    tool.call(arguments)
                }
                None => {
                    warn!("tool not found: {name}");
                    Box::pin(std::future::ready(Err(self.not_found(&name))))
                }
            };
            async move {
                let result = fut.await;
                if let Err(err) = &result {
                    debug!("tool failed: {err}");
                }
                let content = render_result(&result);
                (ToolCallResult { id, content }, result)
            }
            .instrument(span)
        });
        join_all(calls).await
    }

    fn not_found(&self, name: &str) -> Error {
        let known = self
            .tools
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        Error::not_found()
            .with_reason(format!("{name} is not a valid tool, try one of [{known}]."))
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;
    use std::time::Duration;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::tool::ErrorKind;

    static PAIR_SCHEMA: &Value = &Value::Null;

    #[derive(Deserialize)]
    struct Pair {
        a: i64,
        b: i64,
    }

    struct Add;

    impl Tool for Add {
        type Input = Pair;

        fn name(&self) -> &str {
            "addition"
        }

        fn description(&self) -> &str {
            "\n    Add two integers.\n"
        }

        fn parameter_schema(&self) -> &Value {
            PAIR_SCHEMA
        }

        fn execute(
            &self,
            input: Pair,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok((input.a + input.b).to_string()))
        }
    }

    // Slow on purpose, so that results finishing out of order are
    // still answered in request order.
    struct SlowEcho;

    impl Tool for SlowEcho {
        type Input = Value;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the input."
        }

        fn parameter_schema(&self) -> &Value {
            PAIR_SCHEMA
        }

        #[allow(clippy::manual_async_fn)]
        fn execute(
            &self,
            input: Value,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(input.to_string())
            }
        }
    }

    fn request(id: &str, name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    fn executor() -> Executor {
        Executor::with_tools(vec![ToolEntry::new(SlowEcho), ToolEntry::new(Add)])
    }

    #[test]
    fn test_definitions_are_sorted_and_trimmed() {
        let definitions = executor().definitions();
        let names = definitions.iter().map(|d| d.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["addition", "echo"]);
        assert_eq!(definitions[0].description, "Add two integers.");
    }

    #[tokio::test]
    async fn test_run_all_answers_in_request_order() {
        let results = executor()
            .run_all(vec![
                request("call_1", "echo", json!({ "city": "Goa" })),
                request("call_2", "addition", json!({ "a": 2, "b": 40 })),
            ])
            .await;

        let answers = results
            .iter()
            .map(|(answer, _)| (answer.id.as_str(), answer.content.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            answers,
            [("call_1", r#"{"city":"Goa"}"#), ("call_2", "42")]
        );
    }

    #[tokio::test]
    async fn test_invalid_input_and_unknown_tool() {
        let results = executor()
            .run_all(vec![
                request("call_1", "addition", json!({ "a": 2 })),
                request("call_2", "get_weather", json!({ "city": "Goa" })),
            ])
            .await;

        let (answer, result) = &results[0];
        assert_eq!(result.as_ref().unwrap_err().kind(), ErrorKind::InvalidInput);
        assert!(answer.content.starts_with("Error: missing field `b`"));

        let (answer, result) = &results[1];
        assert_eq!(result.as_ref().unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(answer.id, "call_2");
        assert_eq!(
            answer.content,
            "Error: get_weather is not a valid tool, try one of [addition, echo].\n Please fix your mistakes."
        );
    }

    #[tokio::test]
    async fn test_null_arguments() {
        let results = executor()
            .run_all(vec![request("call_1", "echo", Value::Null)])
            .await;
        assert_eq!(results[0].0.content, "{}");
    }
}
