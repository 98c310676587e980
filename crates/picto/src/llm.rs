//! Hosted chat-completions client (OpenAI-compatible wire format).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Settings;
use crate::types::{PictoError, PictoResult};

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One part of a multimodal user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Message content: plain text or a list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user message carrying a text prompt and one inline image.
    pub fn user_with_image(text: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: data_url.into(),
                    },
                },
            ]),
        }
    }
}

/// A single chat-completions request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Anything that can turn a chat request into reply text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> PictoResult<String>;
}

/// HTTP client for an OpenAI-compatible API.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_base: &str, api_key: &str, timeout: Option<Duration>) -> PictoResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Build a client from settings; fails when no API key is configured.
    pub fn from_settings(settings: &Settings) -> PictoResult<Self> {
        let key = settings.require_api_key()?;
        Self::new(
            &settings.api_base,
            key,
            settings.request_timeout_secs.map(Duration::from_secs),
        )
    }

    /// POST a JSON body to `{api_base}/{path}` and decode the JSON reply.
    pub(crate) async fn post_json<B, R>(&self, path: &str, body: &B) -> PictoResult<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        tracing::debug!("POST {url}");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PictoError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> PictoResult<String> {
        let reply: ChatResponse = self.post_json("chat/completions", request).await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PictoError::Api {
                status: 200,
                message: "Response contained no message content".to_string(),
            })
    }
}

/// Build the shared reqwest client. No timeout unless one is given.
pub(crate) fn build_http_client(timeout: Option<Duration>) -> PictoResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("picto/", env!("CARGO_PKG_VERSION")));
    if let Some(t) = timeout {
        builder = builder.timeout(t);
    }
    Ok(builder.build()?)
}

/// Pull `error.message` out of an API error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_multimodal_message_wire_format() {
        let msg = ChatMessage::user_with_image("describe", "data:image/jpeg;base64,AAAA");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    { "type": "text", "text": "describe" },
                    { "type": "image_url", "image_url": { "url": "data:image/jpeg;base64,AAAA" } }
                ]
            })
        );
    }

    #[test]
    fn test_plain_message_wire_format() {
        let value = serde_json::to_value(ChatMessage::system("be kind")).unwrap();
        assert_eq!(value, json!({ "role": "system", "content": "be kind" }));
    }

    #[test]
    fn test_api_error_message_extraction() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
        assert_eq!(api_error_message(body), "Rate limit reached");
        assert_eq!(api_error_message("  gateway down "), "gateway down");
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-test".to_string(),
            messages: vec![ChatMessage::user("hello")],
            max_tokens: 10,
            temperature: 0.5,
        }
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-test", "max_tokens": 10 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "hi there" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&server.uri(), "sk-test", None).unwrap();
        let text = client.complete(&request()).await.unwrap();
        assert_eq!(text, "hi there");
    }

    #[tokio::test]
    async fn test_complete_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "message": "quota exceeded" }
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&server.uri(), "sk-test", None).unwrap();
        match client.complete(&request()).await {
            Err(PictoError::Api { status, message }) => {
                assert_eq!(status, 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }
}
