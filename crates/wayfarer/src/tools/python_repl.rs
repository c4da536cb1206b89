use std::io;
use std::time::Duration;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tokio::time::timeout;
use wayfarer_core::tool::{Error as ToolError, Tool, ToolResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Input of [`PythonReplTool`].
#[derive(Deserialize, JsonSchema)]
pub struct PythonReplParameters {
    /// A valid python command. Use `print(...)` to see a value.
    command: String,
}

/// A Python shell for calculations the arithmetic tools can't express.
pub struct PythonReplTool {
    interpreter: String,
    timeout: Duration,
    parameter_schema: Value,
}

impl PythonReplTool {
    /// Creates the tool running commands with `interpreter`, e.g. `python3`.
    #[inline]
    pub fn new<S: Into<String>>(interpreter: S) -> Self {
        PythonReplTool {
            interpreter: interpreter.into(),
            timeout: DEFAULT_TIMEOUT,
            parameter_schema: schema_for!(PythonReplParameters).to_value(),
        }
    }

    /// Sets how long a command may run before it is killed.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Tool for PythonReplTool {
    type Input = PythonReplParameters;

    fn name(&self) -> &str {
        "python_repl"
    }

    fn description(&self) -> &str {
        "A Python shell for complex calculations. Input should be a valid python command."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: PythonReplParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let interpreter = self.interpreter.clone();
        let limit = self.timeout;
        async move {
            let command = sanitize_input(&input.command);
            match timeout(limit, run_command(&interpreter, command)).await {
                Ok(result) => result.map_err(|err| {
                    ToolError::execution_error()
                        .with_reason(format!("{interpreter}: {err}"))
                }),
                Err(_) => Err(ToolError::execution_error().with_reason(format!(
                    "Command timed out after {} seconds.",
                    limit.as_secs_f32()
                ))),
            }
        }
    }
}

/// Strips the markdown fence and `python` tag models like to wrap code in.
fn sanitize_input(command: &str) -> &str {
    let command =
        command.trim_start_matches(|c: char| c.is_whitespace() || c == '`');
    let command = match command.get(..6) {
        Some(tag)
            if tag.eq_ignore_ascii_case("python")
                && command[6..]
                    .chars()
                    .next()
                    .is_none_or(char::is_whitespace) =>
        {
            &command[6..]
        }
        _ => command,
    };
    command
        .trim_end_matches(|c: char| c.is_whitespace() || c == '`' || c == ';')
        .trim_start()
}

async fn run_command(
    interpreter: &str,
    command: &str,
) -> Result<String, io::Error> {
    let output = Command::new(interpreter)
        .arg("-c")
        .arg(command)
        .kill_on_drop(true)
        .output()
        .await?;

    let mut result = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.stderr.is_empty() {
        result.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    Ok(result)
}
