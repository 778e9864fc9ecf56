//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] chunks to the
//! provider-agnostic [`StreamEvent`] enum from `parley-types`.

use futures_util::StreamExt;

use async_openai::types::chat::{ChatCompletionResponseStream, CreateChatCompletionStreamResponse};

use parley_core::llm::provider::EventStream;
use parley_types::llm::{LlmError, StreamEvent, Usage};

use super::stop_reason;

/// Map an async-openai [`ChatCompletionResponseStream`] to [`StreamEvent`]s.
///
/// Per chunk: `Usage` when the chunk carries usage (the final chunk, since
/// the request sets `include_usage`), then a `TextDelta` per non-empty
/// content delta, then `MessageDelta` when a finish reason appears. `Done`
/// closes the stream.
pub fn map_openai_stream(stream: ChatCompletionResponseStream) -> EventStream {
    Box::pin(async_stream::try_stream! {
        let mut stream = stream;
        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream(e.to_string()))?;
            for event in chunk_events(chunk) {
                yield event;
            }
        }
        yield StreamEvent::Done;
    })
}

fn chunk_events(chunk: CreateChatCompletionStreamResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }));
    }
    for choice in chunk.choices {
        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            events.push(StreamEvent::TextDelta { text });
        }
        if let Some(reason) = &choice.finish_reason {
            events.push(StreamEvent::MessageDelta {
                stop_reason: stop_reason(reason),
            });
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use parley_types::llm::StopReason;

    use super::*;

    fn chunk(value: serde_json::Value) -> CreateChatCompletionStreamResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_chunk() {
        let events = chunk_events(chunk(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "gpt-4",
            "choices": [{"index": 0, "delta": {"content": "Hello"}, "finish_reason": null}]
        })));
        assert_eq!(
            events,
            [StreamEvent::TextDelta {
                text: "Hello".to_string()
            }]
        );
    }

    #[test]
    fn test_finish_chunk_skips_empty_text() {
        let events = chunk_events(chunk(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "gpt-4",
            "choices": [{"index": 0, "delta": {"content": ""}, "finish_reason": "length"}]
        })));
        assert_eq!(
            events,
            [StreamEvent::MessageDelta {
                stop_reason: StopReason::MaxTokens
            }]
        );
    }

    #[test]
    fn test_usage_chunk() {
        let events = chunk_events(chunk(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "gpt-4",
            "choices": [],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
        })));
        assert_eq!(
            events,
            [StreamEvent::Usage(Usage {
                input_tokens: 12,
                output_tokens: 7
            })]
        );
    }
}
