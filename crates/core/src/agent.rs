mod builder;

use std::fmt::{self, Display};
use std::sync::Arc;

use tracing::Instrument;
use wayfarer_model::{
    ErrorKind, ModelFinishReason, ModelProviderError, ModelRequest,
};

use crate::conversation::Conversation;
use crate::model_client::{ModelClient, ModelClientResponse};
use crate::tool::Executor as ToolExecutor;
pub use builder::AgentBuilder;

type OnTranscript = Arc<dyn Fn(&str, TranscriptSource) + Send + Sync>;

/// Where a piece of transcript comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptSource {
    /// A text delta streamed by the model.
    Assistant,
    /// The rendered result of a tool call.
    Tool,
}

/// An error that stops an agent run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The model provider failed.
    Model {
        /// The kind reported by the provider.
        kind: ErrorKind,
        /// The provider's error message.
        message: String,
    },
    /// The model kept asking for tools after this many model calls.
    StepLimitExceeded(usize),
}

impl Error {
    fn from_provider(err: Box<dyn ModelProviderError>) -> Self {
        Self::Model {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Model { kind, message } => {
                write!(f, "model error ({kind}): {message}")
            }
            Error::StepLimitExceeded(steps) => {
                write!(f, "no final answer after {steps} model calls")
            }
        }
    }
}

impl std::error::Error for Error {}

/// The outcome of a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// The final text of the model.
    pub text: String,
    /// How many times the model was called.
    pub steps: usize,
    /// How many tool calls were executed.
    pub tool_calls: usize,
}

struct Inner {
    model_client: ModelClient,
    tool_executor: ToolExecutor,
    system_prompt: Option<String>,
    max_steps: usize,
    on_transcript: Option<OnTranscript>,
}

/// A tool-calling agent.
///
/// The agent itself holds no conversation state. Every call to
/// [`Agent::run`] starts a fresh conversation, so one agent can serve any
/// number of concurrent queries.
#[derive(Clone)]
pub struct Agent(Arc<Inner>);

impl Agent {
    /// Answers `input`, calling tools for as long as the model asks for
    /// them.
    pub async fn run(&self, input: &str) -> Result<Reply, Error> {
        self.run_conversation(input)
            .instrument(info_span!("agent run"))
            .await
    }

    async fn run_conversation(&self, input: &str) -> Result<Reply, Error> {
        let inner = &*self.0;
        let mut conversation = Conversation::default();
        if let Some(prompt) = &inner.system_prompt {
            conversation.push_system(prompt);
        }
        conversation.push_user(input);

        let tools = inner.tool_executor.definitions();
        let mut tool_calls = 0;
        for step in 1..=inner.max_steps {
            let req = ModelRequest {
                messages: conversation.messages(),
                tools: tools.clone(),
            };
            let on_transcript = inner.on_transcript.clone();
            let ModelClientResponse {
                transcript,
                opaque_msg,
                tool_calls: requests,
                finish_reason,
            } = inner
                .model_client
                .send_request(req, move |delta| {
                    if let Some(on_transcript) = &on_transcript {
                        on_transcript(delta, TranscriptSource::Assistant);
                    }
                })
                .await
                .map_err(Error::from_provider)?;
            conversation.push_assistant(transcript.clone(), opaque_msg);

            if requests.is_empty() {
                if finish_reason == Some(ModelFinishReason::Length) {
                    warn!(step, "the answer was cut off by the token limit");
                }
                info!(step, tool_calls, ?finish_reason, "got the final answer");
                return Ok(Reply {
                    text: transcript,
                    steps: step,
                    tool_calls,
                });
            }

            debug!(step, count = requests.len(), "running tools");
            tool_calls += requests.len();
            for (answer, _) in inner.tool_executor.run_all(requests).await {
                if let Some(on_transcript) = &inner.on_transcript {
                    on_transcript(&answer.content, TranscriptSource::Tool);
                }
                conversation.push_tool_result(answer);
            }
        }

        warn!(max_steps = inner.max_steps, "step limit exceeded");
        Err(Error::StepLimitExceeded(inner.max_steps))
    }
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            tools,
            system_prompt,
            max_steps,
            on_transcript,
        } = builder;

        Self(Arc::new(Inner {
            model_client,
            tool_executor: ToolExecutor::with_tools(tools),
            system_prompt,
            max_steps,
            on_transcript,
        }))
    }
}
