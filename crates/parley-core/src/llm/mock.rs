//! Scripted provider for tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use parley_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent, Usage,
};

use super::provider::{EventStream, LlmProvider};

/// Replays a queue of canned replies and records every request it sees.
///
/// An exhausted script answers `"ok"`.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: impl IntoIterator<Item = Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())))
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn next(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
        let result = self.next(request);
        let model = request.model.clone();
        async move {
            let content = result?;
            Ok(CompletionResponse {
                id: "scripted-1".to_string(),
                content,
                model,
                stop_reason: StopReason::EndTurn,
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
            })
        }
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let result = self.next(&request);
        Box::pin(async_stream::stream! {
            match result {
                Ok(text) => {
                    for word in text.split_inclusive(' ') {
                        yield Ok(StreamEvent::TextDelta { text: word.to_string() });
                    }
                    yield Ok(StreamEvent::MessageDelta { stop_reason: StopReason::EndTurn });
                    yield Ok(StreamEvent::Usage(Usage { input_tokens: 10, output_tokens: 5 }));
                    yield Ok(StreamEvent::Done);
                }
                Err(err) => yield Err(err),
            }
        })
    }
}
