use std::sync::Arc;

use wayfarer_model::ModelProvider;

use super::{Agent, OnTranscript, TranscriptSource};
use crate::model_client::ModelClient;
use crate::tool::{Tool, ToolEntry};

/// Model calls allowed per run before giving up.
///
/// A recursion limit of 25 graph steps, where the model and the tool node
/// each take one step, leaves room for 13 model calls.
pub const DEFAULT_MAX_STEPS: usize = 13;

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) tools: Vec<ToolEntry>,
    pub(crate) system_prompt: Option<String>,
    pub(crate) max_steps: usize,
    pub(crate) on_transcript: Option<OnTranscript>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: vec![],
            system_prompt: None,
            max_steps: DEFAULT_MAX_STEPS,
            on_transcript: None,
        }
    }

    /// Sets the system prompt sent at the start of every run.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Registers a tool. A later tool replaces an earlier one with the
    /// same name.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(ToolEntry::new(tool));
        self
    }

    /// Limits the number of model calls per run.
    #[inline]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Attaches a callback receiving model text deltas and tool results
    /// as they are produced.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::from_builder(self)
    }
}
