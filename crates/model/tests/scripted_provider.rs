use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll};

use serde_json::json;
use wayfarer_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    ModelTool, ToolCallRequest,
};

#[derive(Debug)]
struct RefusedError(ErrorKind);

impl Display for RefusedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "request refused: {}", self.0)
    }
}

impl Error for RefusedError {}

impl ModelProviderError for RefusedError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

#[derive(Debug)]
struct QueuedResponse {
    events: VecDeque<ModelResponseEvent>,
}

impl ModelResponse for QueuedResponse {
    type Error = RefusedError;

    fn poll_next_event(
        mut self: Pin<&mut Self>,
        _cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        Poll::Ready(Ok(self.events.pop_front()))
    }
}

/// Asks for the weather tool whenever it is offered and the user mentions a
/// city it knows, otherwise answers in plain text.
struct WeatherMinded;

impl ModelProvider for WeatherMinded {
    type Error = RefusedError;
    type Response = QueuedResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let user_text = req.messages.iter().find_map(|msg| match msg {
            ModelMessage::User(text) => Some(text.clone()),
            _ => None,
        });
        let Some(user_text) = user_text else {
            return ready(Err(RefusedError(ErrorKind::Other)));
        };

        let can_check_weather =
            req.tools.iter().any(|tool| tool.name == "get_weather");
        let events = if can_check_weather && user_text.contains("Paris") {
            vec![
                ModelResponseEvent::MessageDelta("Let me check.".to_owned()),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_1".to_owned(),
                    name: "get_weather".to_owned(),
                    arguments: json!({ "city": "Paris" }),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        } else {
            vec![
                ModelResponseEvent::MessageDelta("Enjoy ".to_owned()),
                ModelResponseEvent::MessageDelta("your trip!".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        };
        ready(Ok(QueuedResponse {
            events: events.into(),
        }))
    }
}

async fn drain(
    mut resp: QueuedResponse,
) -> (String, Vec<ToolCallRequest>, Option<ModelFinishReason>) {
    let mut text = String::new();
    let mut tool_calls = vec![];
    let mut finish_reason = None;
    while let Some(event) =
        poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::ToolCall(req) => tool_calls.push(req),
            ModelResponseEvent::Completed(reason) => finish_reason = Some(reason),
        }
    }
    (text, tool_calls, finish_reason)
}

fn weather_tool() -> ModelTool {
    ModelTool {
        name: "get_weather".to_owned(),
        description: "Fetches the current weather of the city.".to_owned(),
        parameters: json!({
            "type": "object",
            "properties": { "city": { "type": "string" } },
            "required": ["city"]
        }),
    }
}

#[tokio::test]
async fn test_tool_call_round() {
    let req = ModelRequest {
        messages: vec![
            ModelMessage::System("You are a travel agent.".to_owned()),
            ModelMessage::User("3 days in Paris".to_owned()),
        ],
        tools: vec![weather_tool()],
    };
    let resp = WeatherMinded.send_request(&req).await.unwrap();
    let (text, tool_calls, finish_reason) = drain(resp).await;

    assert_eq!(text, "Let me check.");
    assert_eq!(finish_reason, Some(ModelFinishReason::ToolCalls));
    assert_eq!(tool_calls.len(), 1);
    assert_eq!(tool_calls[0].arguments["city"], "Paris");
    assert!(!req.messages[1].is_from_model());
}

#[tokio::test]
async fn test_plain_answer_without_tools() {
    let req = ModelRequest {
        messages: vec![ModelMessage::User("3 days in Paris".to_owned())],
        tools: vec![],
    };
    let resp = WeatherMinded.send_request(&req).await.unwrap();
    let (text, tool_calls, finish_reason) = drain(resp).await;

    assert_eq!(text, "Enjoy your trip!");
    assert!(tool_calls.is_empty());
    assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_error() {
    let req = ModelRequest {
        messages: vec![ModelMessage::Assistant("Hello".to_owned())],
        tools: vec![],
    };
    let err = WeatherMinded.send_request(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(ModelMessage::Assistant(String::new()).is_from_model());
}
