use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use serde_json::Value;
use wayfarer_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, Message, ToolCall};

struct PartialState {
    sse: Sse,
    id: Option<String>,
    content: String,
    reasoning_content: Option<String>,
    tool_calls: Vec<ToolCall>,
    // Indices into `tool_calls` that are complete but not yet emitted. Filled
    // when the finish reason arrives.
    pending_tool_call_idx: VecDeque<usize>,
    // This field will be cleared after the response returns the complete event.
    pending_finish_reason: Option<ModelFinishReason>,
    finish_emitted: bool,
    done: bool,
}

impl PartialState {
    #[inline]
    fn finish(self) -> Option<(String, Message)> {
        Some((
            self.id?,
            Message::Assistant {
                content: Some(self.content),
                tool_calls: if self.tool_calls.is_empty() {
                    None
                } else {
                    Some(self.tool_calls)
                },
                reasoning_content: self.reasoning_content,
            },
        ))
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streamed chat completion.
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
        full_msg: Option<(String, Message)>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            content: Default::default(),
            reasoning_content: Default::default(),
            tool_calls: Default::default(),
            pending_tool_call_idx: Default::default(),
            pending_finish_reason: Default::default(),
            finish_emitted: false,
            done: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
            full_msg: None,
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            // The stream has been exhausted, actually this should be an error.
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, partial_state)) => {
                    *this.next_event_fut = None;
                    *this.full_msg = partial_state.finish();
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        self.full_msg
            .as_ref()
            .map(|(id, msg)| OpaqueMessage::new(id, msg.clone()))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    let mut message_delta = None;

    // Streams that end without a finish reason still flush their tool
    // calls, see below.
    while partial_state.pending_finish_reason.is_none() && !partial_state.done
    {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                partial_state.done = true;
                break;
            }
            Err(err) => {
                return Err(Error::new(
                    format!("broken event stream: {err:?}"),
                    ErrorKind::Other,
                ));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            partial_state.done = true;
            break;
        }

        let mut chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if partial_state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        };

        // The trailing usage chunk has no choices.
        let Some(choice) = chunk.choices.pop() else {
            continue;
        };

        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                partial_state.content.push_str(&content);
                message_delta = Some(content);
            }
        }
        if let Some(reasoning_content) = &choice.delta.reasoning_content {
            partial_state
                .reasoning_content
                .get_or_insert_default()
                .push_str(reasoning_content);
        }
        if let Some(tool_calls) = choice.delta.tool_calls {
            for tool_call in tool_calls {
                merge_tool_call(&mut partial_state.tool_calls, tool_call);
            }
        }

        if let Some(finish_reason) = choice.finish_reason {
            partial_state.pending_finish_reason = Some(match finish_reason
                .as_str()
            {
                "tool_calls" => ModelFinishReason::ToolCalls,
                "length" => ModelFinishReason::Length,
                "content_filter" => {
                    return Err(Error::new(
                        "completion stopped by content filter",
                        ErrorKind::Moderated,
                    ));
                }
                _ => ModelFinishReason::Stop,
            });
            partial_state.pending_tool_call_idx =
                (0..partial_state.tool_calls.len()).collect();
        }

        if message_delta.is_some() {
            break;
        }
    }

    if partial_state.done
        && partial_state.pending_finish_reason.is_none()
        && !partial_state.finish_emitted
        && !partial_state.tool_calls.is_empty()
    {
        partial_state.pending_finish_reason = Some(ModelFinishReason::ToolCalls);
        partial_state.pending_tool_call_idx =
            (0..partial_state.tool_calls.len()).collect();
    }

    // The order of events are important. Always emit message delta first, then
    // emit the tool calls, and finally emit the finish reason.

    if let Some(message_delta) = message_delta {
        return Ok((
            Some(ModelResponseEvent::MessageDelta(message_delta)),
            partial_state,
        ));
    }

    // Arguments arrive in fragments, so a tool call is only complete once
    // the finish reason is known.
    if let Some(idx) = partial_state.pending_tool_call_idx.pop_front() {
        let request = to_tool_call_request(&partial_state.tool_calls[idx]);
        return Ok((Some(ModelResponseEvent::ToolCall(request)), partial_state));
    }

    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        partial_state.finish_emitted = true;
        // Keep reading so that `[DONE]` and the usage chunk are consumed
        // before the response reports completion.
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }

    Ok((None, partial_state))
}

fn merge_tool_call(
    partial_tool_calls: &mut Vec<ToolCall>,
    tool_call: ToolCall,
) {
    let Some(partial_tool_call) = partial_tool_calls
        .iter_mut()
        .find(|t| t.index == tool_call.index)
    else {
        partial_tool_calls.push(tool_call);
        return;
    };
    // Patch the partial tool call.
    if let Some(id) = tool_call.id {
        partial_tool_call.id.get_or_insert_default().push_str(&id);
    }
    if let Some(ty) = tool_call.r#type {
        // The type is repeated verbatim by some servers.
        partial_tool_call.r#type.get_or_insert(ty);
    }
    if let Some(function) = tool_call.function {
        match partial_tool_call.function {
            Some(ref mut partial_func) => {
                if let Some(name) = function.name {
                    partial_func.name.get_or_insert_default().push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    partial_func
                        .arguments
                        .get_or_insert_default()
                        .push_str(&arguments);
                }
            }
            None => partial_tool_call.function = Some(function),
        }
    }
}

fn to_tool_call_request(tool_call: &ToolCall) -> ToolCallRequest {
    let id = tool_call.id.clone().unwrap_or_default();
    let name = tool_call
        .function
        .as_ref()
        .and_then(|f| f.name.clone())
        .unwrap_or_default();
    let raw_arguments = tool_call
        .function
        .as_ref()
        .and_then(|f| f.arguments.as_deref())
        .unwrap_or_default();
    let arguments = if raw_arguments.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str::<Value>(raw_arguments).unwrap_or_else(|err| {
            warn!("malformed arguments for tool call {id}: {err}");
            Value::Null
        })
    };
    ToolCallRequest {
        id,
        name,
        arguments,
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use serde_json::json;
    use wayfarer_model::ModelProviderError;

    use super::*;
    use crate::Chunks;

    async fn collect(
        chunks: Vec<Bytes>,
    ) -> (Vec<ModelResponseEvent>, OpenAIResponse) {
        let sse = Sse::new(Chunks::from_vec_deque(chunks.into()));
        let mut resp = OpenAIResponse::from_sse(sse);
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
                .await
                .unwrap()
        {
            events.push(event);
        }
        (events, resp)
    }

    #[tokio::test]
    async fn test_tool_call_events() {
        let (events, resp) = collect(vec![Bytes::from_static(include_bytes!(
            "../fixtures/test_response.txt"
        ))])
        .await;

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Let me check ".to_owned()),
                ModelResponseEvent::MessageDelta("Dubai first.".to_owned()),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_weather".to_owned(),
                    name: "get_weather".to_owned(),
                    arguments: json!({ "city": "Dubai" }),
                }),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_search".to_owned(),
                    name: "search_google".to_owned(),
                    arguments: json!({ "query": "Dubai hotels price per night" }),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );

        let full_msg = resp.make_opaque_message().unwrap();
        assert_eq!(full_msg.id(), "chatcmpl-42");
        let Some(Message::Assistant {
            content,
            tool_calls: Some(tool_calls),
            ..
        }) = full_msg.to_raw::<Message>()
        else {
            panic!("expected an assistant message with tool calls");
        };
        assert_eq!(content.as_deref(), Some("Let me check Dubai first."));
        assert_eq!(tool_calls.len(), 2);
        assert_eq!(
            tool_calls[1].function.as_ref().unwrap().arguments.as_deref(),
            Some("{\"query\": \"Dubai hotels price per night\"}")
        );
    }

    #[tokio::test]
    async fn test_plain_text_split_across_chunks() {
        let (events, resp) = collect(vec![
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"},\"finish_reason\":null}]}\n\n",
            ),
            Bytes::from_static(b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"## Summary\"},"),
            Bytes::from_static(b"\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n"),
        ])
        .await;

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("## Summary".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
        let full_msg = resp.make_opaque_message().unwrap();
        assert!(matches!(
            full_msg.to_raw::<Message>(),
            Some(Message::Assistant { tool_calls: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_truncated_answer() {
        let (events, _) = collect(vec![Bytes::from_static(
            b"data: {\"id\":\"c2\",\"choices\":[{\"delta\":{\"content\":\"Day 1: \"},\"finish_reason\":\"length\"}]}\n\ndata: [DONE]\n\n",
        )])
        .await;

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Day 1: ".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Length),
            ]
        );
    }

    #[tokio::test]
    async fn test_content_filter_is_moderated() {
        let sse = Sse::new(Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{},\"finish_reason\":\"content_filter\"}]}\n\n",
            )]
            .into(),
        ));
        let mut resp = pin!(OpenAIResponse::from_sse(sse));
        let err = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);
    }
}
