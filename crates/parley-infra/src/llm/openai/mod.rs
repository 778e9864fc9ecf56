//! OpenAI chat completions provider.
//!
//! Uses [`async_openai`] for request/response types and its built-in SSE
//! streaming. Any OpenAI-compatible endpoint works through `base_url`.

pub mod streaming;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionStreamOptions,
    CreateChatCompletionRequest, FinishReason,
};
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use parley_core::llm::provider::{EventStream, LlmProvider};
use parley_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, Role, StopReason, Usage,
};

use self::streaming::map_openai_stream;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider for the OpenAI chat completions API.
///
/// Does not derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a provider for `base_url`, or the public OpenAI API when `None`.
    pub fn new(api_key: &SecretString, base_url: Option<&str>) -> Self {
        let base_url = base_url.unwrap_or(OPENAI_BASE_URL).trim_end_matches('/');
        let config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(base_url);
        Self {
            client: Client::with_config(config),
            base_url: base_url.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, request: &CompletionRequest, stream: bool) -> CreateChatCompletionRequest {
        let mut req = CreateChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(to_openai_message).collect(),
            max_completion_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            presence_penalty: request.presence_penalty,
            frequency_penalty: request.frequency_penalty,
            ..Default::default()
        };

        if stream {
            req.stream = Some(true);
            req.stream_options = Some(ChatCompletionStreamOptions {
                include_usage: Some(true),
                include_obfuscation: None,
            });
        }
        req
    }
}

fn to_openai_message(msg: &Message) -> ChatCompletionRequestMessage {
    match msg.role {
        Role::System => ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
            name: None,
        }),
        Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
            name: None,
        }),
        Role::Assistant => {
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                    msg.content.clone(),
                )),
                refusal: None,
                name: None,
                audio: None,
                tool_calls: None,
                function_call: None,
            })
        }
    }
}

pub(crate) fn stop_reason(reason: &FinishReason) -> StopReason {
    match reason {
        FinishReason::Stop => StopReason::EndTurn,
        FinishReason::Length => StopReason::MaxTokens,
        FinishReason::ContentFilter => StopReason::ContentFilter,
        FinishReason::ToolCalls | FinishReason::FunctionCall => StopReason::EndTurn,
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request, false);
        tracing::debug!(
            model = %oai_request.model,
            messages = oai_request.messages.len(),
            "sending completion request"
        );

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        let choice = response.choices.first();
        let content = choice
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        let stop_reason = choice
            .and_then(|c| c.finish_reason.as_ref())
            .map(stop_reason)
            .unwrap_or(StopReason::EndTurn);
        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason,
            usage,
        })
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let oai_request = self.build_request(&request, true);
        let client = self.client.clone();

        Box::pin(async_stream::try_stream! {
            let oai_stream = client
                .chat()
                .create_stream(oai_request)
                .await
                .map_err(map_openai_error)?;

            let mut inner = map_openai_stream(oai_stream);
            while let Some(event) = inner.next().await {
                yield event?;
            }
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
pub(crate) fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "invalid_api_key"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else if code == "context_length_exceeded"
                || api_err.message.contains("maximum context length")
            {
                LlmError::ContextLengthExceeded
            } else if code == "server_error" || error_type == "server_error" {
                LlmError::Overloaded(api_err.message.clone())
            } else if error_type == "invalid_request_error" {
                LlmError::InvalidRequest(api_err.message.clone())
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401) => LlmError::AuthenticationFailed,
            Some(429) => LlmError::RateLimited {
                retry_after_ms: None,
            },
            Some(500..=599) => LlmError::Overloaded(err.to_string()),
            _ => LlmError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => LlmError::Stream(stream_err.to_string()),
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use async_openai::error::{ApiError, OpenAIError};

    use super::*;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(&SecretString::from("sk-test".to_string()), None)
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![
                Message::new(Role::System, "Be helpful"),
                Message::new(Role::User, "Hello"),
                Message::new(Role::Assistant, "Hi there!"),
                Message::new(Role::System, "System Reminder: be brief"),
            ],
            max_tokens: Some(1000),
            temperature: Some(0.7),
            top_p: None,
            presence_penalty: Some(0.5),
            frequency_penalty: None,
            stream: false,
        }
    }

    fn api_error(message: &str, error_type: Option<&str>, code: Option<&str>) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: error_type.map(str::to_string),
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn test_default_base_url() {
        assert_eq!(provider().base_url(), OPENAI_BASE_URL);
        let custom = OpenAiProvider::new(
            &SecretString::from("sk-test".to_string()),
            Some("http://localhost:8080/v1/"),
        );
        assert_eq!(custom.base_url(), "http://localhost:8080/v1");
        assert_eq!(custom.name(), "openai");
    }

    #[test]
    fn test_build_request_maps_fields() {
        let oai_req = provider().build_request(&request(), false);
        assert_eq!(oai_req.model, "gpt-4");
        assert_eq!(oai_req.messages.len(), 4);
        assert!(matches!(
            oai_req.messages[3],
            ChatCompletionRequestMessage::System(_)
        ));
        assert_eq!(oai_req.max_completion_tokens, Some(1000));
        assert_eq!(oai_req.temperature, Some(0.7));
        assert_eq!(oai_req.presence_penalty, Some(0.5));
        assert_eq!(oai_req.top_p, None);
        assert!(oai_req.stream.is_none());
        assert!(oai_req.stream_options.is_none());
    }

    #[test]
    fn test_build_request_streaming_includes_usage() {
        let oai_req = provider().build_request(&request(), true);
        assert_eq!(oai_req.stream, Some(true));
        let opts = oai_req.stream_options.unwrap();
        assert_eq!(opts.include_usage, Some(true));
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(stop_reason(&FinishReason::Stop), StopReason::EndTurn);
        assert_eq!(stop_reason(&FinishReason::Length), StopReason::MaxTokens);
        assert_eq!(
            stop_reason(&FinishReason::ContentFilter),
            StopReason::ContentFilter
        );
    }

    #[test]
    fn test_map_error_auth() {
        let err = map_openai_error(api_error(
            "Incorrect API key provided",
            Some("invalid_request_error"),
            Some("invalid_api_key"),
        ));
        assert_eq!(err, LlmError::AuthenticationFailed);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_map_error_rate_limit() {
        let err = map_openai_error(api_error(
            "Rate limit reached",
            Some("requests"),
            Some("rate_limit_exceeded"),
        ));
        assert!(matches!(err, LlmError::RateLimited { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_map_error_context_length() {
        let err = map_openai_error(api_error(
            "This model's maximum context length is 8192 tokens",
            Some("invalid_request_error"),
            Some("context_length_exceeded"),
        ));
        assert_eq!(err, LlmError::ContextLengthExceeded);
    }

    #[test]
    fn test_map_error_invalid_argument() {
        let err = map_openai_error(OpenAIError::InvalidArgument("bad arg".to_string()));
        assert_eq!(err, LlmError::InvalidRequest("bad arg".to_string()));
    }
}
