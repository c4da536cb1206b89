use serde_json::Value;

use crate::OpaqueMessage;

/// Everything the model sees in one turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The conversation so far, oldest first.
    pub messages: Vec<ModelMessage>,
    /// The tools the model may ask for. Empty means plain chat.
    pub tools: Vec<ModelTool>,
}

/// One entry of the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// Instructions that frame the whole conversation.
    System(String),
    /// What the traveller typed.
    User(String),
    /// Plain answer text, for providers that can't replay their own
    /// messages.
    Assistant(String),
    /// The output of a tool, paired with the request by id.
    Tool(ToolCallResult),
    /// A previous answer in the provider's own format, tool calls included.
    Opaque(OpaqueMessage),
}

impl ModelMessage {
    /// Returns `true` for messages the model itself produced.
    #[inline]
    pub fn is_from_model(&self) -> bool {
        matches!(self, ModelMessage::Assistant(_) | ModelMessage::Opaque(_))
    }
}

/// The answer to a [`ToolCallRequest`](crate::ToolCallRequest).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// The id of the request being answered.
    pub id: String,
    /// Text handed back to the model, errors included.
    pub content: String,
}

/// A tool as advertised to the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// The name the model uses to call the tool.
    pub name: String,
    /// Tells the model when the tool is useful.
    pub description: String,
    /// JSON schema of the input object.
    pub parameters: Value,
}
