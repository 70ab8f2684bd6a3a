//! OpenAI-compatible HTTP backend.
//!
//! DeepSeek, Groq, Together, Ollama and OpenAI all accept the same chat
//! completion body, so one client type covers every descriptor; only the base
//! URL, the bearer token and the model ids differ.

use super::{Capability, Provider, ProviderDescriptor, ProviderRequest};
use crate::error::ProviderError;
use crate::utils::{take_chars, truncate_for_log};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

const IMAGE_PROMPT_PREFIX: &str = "Professional news illustration: ";
const IMAGE_PROMPT_MAX_CHARS: usize = 800;
const IMAGE_SIZE: &str = "512x512";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

/// One eligible descriptor bound to its resolved credential.
pub struct OpenAiCompatible {
    name: String,
    client: Client,
    base_url: Url,
    api_key: String,
    text_model: Option<String>,
    image_model: Option<String>,
    timeout: Duration,
}

impl OpenAiCompatible {
    pub fn new(
        descriptor: &ProviderDescriptor,
        api_key: String,
        client: Client,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        // A trailing slash keeps `join` from replacing the last path segment.
        let mut base = descriptor.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)
            .map_err(|e| ProviderError::Transport(format!("invalid base URL {base}: {e}")))?;

        Ok(Self {
            name: descriptor.name.clone(),
            client,
            base_url,
            api_key,
            text_model: descriptor.text_model.clone(),
            image_model: descriptor.image_model.clone(),
            timeout,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = self.endpoint(path)?;
        let send = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(body)
            .send();

        let resp = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) if e.is_timeout() => return Err(ProviderError::Timeout(self.timeout)),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(ProviderError::Timeout(self.timeout)),
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                code: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }
        Ok(resp)
    }

    /// Classify a failure while reading a response body. Only undecodable
    /// JSON is malformed; a stalled or reset body is a transport problem.
    fn read_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            e.into()
        }
    }

    async fn chat(&self, model: &str, request: &ProviderRequest<'_>) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: request.system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.user,
        });

        let body = ChatRequest {
            model,
            messages,
            max_tokens: request.max_output,
        };
        let resp = self.post("chat/completions", &body).await?;
        let parsed: ChatResponse = resp.json().await.map_err(|e| self.read_error(e))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedBody("response has no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        let content = content.trim();
        if content.is_empty() {
            return Err(ProviderError::EmptyContent);
        }
        Ok(content.to_string())
    }

    async fn image(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let prompt = format!(
            "{}{}",
            IMAGE_PROMPT_PREFIX,
            take_chars(prompt, IMAGE_PROMPT_MAX_CHARS)
        );
        let body = ImageRequest {
            model,
            prompt: &prompt,
            n: 1,
            size: IMAGE_SIZE,
        };
        let resp = self.post("images/generations", &body).await?;
        let parsed: ImageResponse = resp.json().await.map_err(|e| self.read_error(e))?;

        parsed
            .data
            .into_iter()
            .find_map(|d| d.url)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ProviderError::EmptyContent)
    }
}

impl fmt::Debug for OpenAiCompatible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatible")
            .field("name", &self.name)
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Provider for OpenAiCompatible {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Text => self.text_model.is_some(),
            Capability::Image => self.image_model.is_some(),
        }
    }

    #[instrument(level = "debug", skip_all, fields(provider = %self.name, capability = %request.capability))]
    async fn generate(&self, request: &ProviderRequest<'_>) -> Result<String, ProviderError> {
        let t0 = Instant::now();
        let unsupported = || ProviderError::Unsupported {
            provider: self.name.clone(),
            capability: request.capability,
        };

        let res = match request.capability {
            Capability::Text => {
                let model = self.text_model.as_deref().ok_or_else(unsupported)?;
                self.chat(model, request).await
            }
            Capability::Image => {
                let model = self.image_model.as_deref().ok_or_else(unsupported)?;
                self.image(model, request.user).await
            }
        };

        let elapsed_ms = t0.elapsed().as_millis() as u64;
        match &res {
            Ok(text) => debug!(elapsed_ms, chars = text.chars().count(), "Provider call succeeded"),
            Err(e) => warn!(elapsed_ms, error = %e, "Provider call failed"),
        }
        res
    }
}
