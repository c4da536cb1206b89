use wayfarer_model::{ModelMessage, OpaqueMessage, ToolCallResult};

/// The messages exchanged while answering one travel query.
///
/// A conversation lives only for a single [`Agent::run`](crate::Agent::run)
/// call, nothing is carried over to the next query.
#[derive(Clone, Default, Debug)]
pub(crate) struct Conversation {
    messages: Vec<ModelMessage>,
}

impl Conversation {
    pub(crate) fn push_system(&mut self, prompt: &str) {
        self.messages.push(ModelMessage::System(prompt.to_owned()));
    }

    pub(crate) fn push_user(&mut self, input: &str) {
        self.messages.push(ModelMessage::User(input.to_owned()));
    }

    /// Appends a model turn, preferring the provider-native message so that
    /// its tool calls can be replayed.
    pub(crate) fn push_assistant(
        &mut self,
        transcript: String,
        opaque_msg: Option<OpaqueMessage>,
    ) {
        self.messages.push(match opaque_msg {
            Some(opaque_msg) => ModelMessage::Opaque(opaque_msg),
            None => ModelMessage::Assistant(transcript),
        });
    }

    pub(crate) fn push_tool_result(&mut self, result: ToolCallResult) {
        self.messages.push(ModelMessage::Tool(result));
    }

    pub(crate) fn messages(&self) -> Vec<ModelMessage> {
        self.messages.clone()
    }
}
