//! Text and image generation backends.
//!
//! Every backend implements [`Provider`]. The [`chain::ProviderChain`] is
//! itself a `Provider` that tries an ordered list of backends, and
//! [`crate::retry::Retrying`] decorates any `Provider` with an outer retry, so
//! callers only ever see one request/response contract:
//!
//! ```text
//! generate(capability, system_instruction, user_content, max_output) -> text
//! ```
//!
//! # Priority
//!
//! [`default_descriptors`] lists the supported backends cheapest first. A
//! descriptor only joins the chain when its [`Credential`] holds at startup;
//! credentials are not re-checked per call.

use crate::error::ProviderError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

pub mod chain;
pub mod http;

pub use chain::ProviderChain;
pub use http::OpenAiCompatible;

/// What a caller wants a backend to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Text,
    Image,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Text => f.write_str("text-generation"),
            Capability::Image => f.write_str("image-generation"),
        }
    }
}

/// One generation call.
///
/// For [`Capability::Image`] the `system` instruction is ignored and `user`
/// is the image prompt; the response is the image URL.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub capability: Capability,
    pub system: &'a str,
    pub user: &'a str,
    /// Upper bound on generated tokens.
    pub max_output: usize,
}

impl<'a> ProviderRequest<'a> {
    pub fn text(system: &'a str, user: &'a str, max_output: usize) -> Self {
        Self {
            capability: Capability::Text,
            system,
            user,
            max_output,
        }
    }

    pub fn image(prompt: &'a str) -> Self {
        Self {
            capability: Capability::Image,
            system: "",
            user: prompt,
            max_output: 0,
        }
    }
}

/// A text or image generation backend.
#[async_trait]
pub trait Provider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn supports(&self, capability: Capability) -> bool;

    /// Make exactly one attempt at the request.
    async fn generate(&self, request: &ProviderRequest<'_>) -> Result<String, ProviderError>;
}

/// How a descriptor proves it can be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// An API key read from this environment variable.
    EnvKey(String),
    /// A local service that needs no key but must answer a liveness probe.
    LocalProbe { url: String },
}

impl Credential {
    /// Resolve the credential into the bearer token sent with each call.
    ///
    /// Returns `None` when the key is missing or the local service does not
    /// answer within `probe_timeout`.
    #[instrument(level = "debug", skip(client))]
    pub async fn resolve(&self, client: &reqwest::Client, probe_timeout: Duration) -> Option<String> {
        match self {
            Credential::EnvKey(var) => std::env::var(var)
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            Credential::LocalProbe { url } => {
                match client.get(url).timeout(probe_timeout).send().await {
                    Ok(resp) if resp.status().is_success() => Some("local".to_string()),
                    Ok(resp) => {
                        debug!(%url, status = resp.status().as_u16(), "Liveness probe rejected");
                        None
                    }
                    Err(e) => {
                        debug!(%url, error = %e, "Liveness probe failed");
                        None
                    }
                }
            }
        }
    }
}

/// Static description of one backend in the priority list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub name: String,
    pub credential: Credential,
    /// OpenAI-compatible API root, e.g. `https://api.groq.com/openai/v1`.
    pub base_url: String,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
}

impl ProviderDescriptor {
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut caps = Vec::new();
        if self.text_model.is_some() {
            caps.push(Capability::Text);
        }
        if self.image_model.is_some() {
            caps.push(Capability::Image);
        }
        caps
    }
}

fn descriptor(
    name: &str,
    credential: Credential,
    base_url: &str,
    text_model: Option<&str>,
    image_model: Option<&str>,
) -> ProviderDescriptor {
    ProviderDescriptor {
        name: name.to_string(),
        credential,
        base_url: base_url.to_string(),
        text_model: text_model.map(str::to_string),
        image_model: image_model.map(str::to_string),
    }
}

/// The fixed priority list: free and cheap backends first, OpenAI last.
pub fn default_descriptors() -> Vec<ProviderDescriptor> {
    vec![
        descriptor(
            "deepseek",
            Credential::EnvKey("DEEPSEEK_API_KEY".into()),
            "https://api.deepseek.com",
            Some("deepseek-chat"),
            None,
        ),
        descriptor(
            "groq",
            Credential::EnvKey("GROQ_API_KEY".into()),
            "https://api.groq.com/openai/v1",
            Some("llama-3.1-8b-instant"),
            None,
        ),
        descriptor(
            "together",
            Credential::EnvKey("TOGETHER_API_KEY".into()),
            "https://api.together.xyz/v1",
            Some("meta-llama/Llama-3-8b-chat-hf"),
            None,
        ),
        descriptor(
            "ollama",
            Credential::LocalProbe {
                url: "http://localhost:11434/api/tags".into(),
            },
            "http://localhost:11434/v1",
            Some("llama3"),
            None,
        ),
        descriptor(
            "openai",
            Credential::EnvKey("OPENAI_API_KEY".into()),
            "https://api.openai.com/v1",
            Some("gpt-3.5-turbo"),
            Some("dall-e-2"),
        ),
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted providers and a one-shot HTTP server for tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    #[derive(Debug)]
    enum Otherwise {
        Fail,
        Reply(String),
        Echo,
    }

    /// Replays queued responses, then behaves per `otherwise`.
    #[derive(Debug)]
    pub struct Scripted {
        name: String,
        capabilities: Vec<Capability>,
        queue: Mutex<VecDeque<Result<String, ProviderError>>>,
        otherwise: Otherwise,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, String, usize)>>,
    }

    impl Scripted {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                capabilities: vec![Capability::Text],
                queue: Mutex::new(VecDeque::new()),
                otherwise: Otherwise::Fail,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        /// Always fails with a transport error.
        pub fn failing(name: &str) -> Self {
            Self::new(name)
        }

        /// Always answers `reply`.
        pub fn answering(name: &str, reply: &str) -> Self {
            let mut p = Self::new(name);
            p.otherwise = Otherwise::Reply(reply.to_string());
            p
        }

        /// Echoes the user content back, upper-cased.
        pub fn echoing(name: &str) -> Self {
            let mut p = Self::new(name);
            p.otherwise = Otherwise::Echo;
            p
        }

        pub fn with_capabilities(mut self, caps: &[Capability]) -> Self {
            self.capabilities = caps.to_vec();
            self
        }

        pub fn then(self, response: Result<&str, ProviderError>) -> Self {
            self.queue
                .lock()
                .unwrap()
                .push_back(response.map(str::to_string));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// `(system, user, max_output)` of every call, in order.
        pub fn seen(&self) -> Vec<(String, String, usize)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        fn supports(&self, capability: Capability) -> bool {
            self.capabilities.contains(&capability)
        }

        async fn generate(&self, request: &ProviderRequest<'_>) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((
                request.system.to_string(),
                request.user.to_string(),
                request.max_output,
            ));
            if let Some(next) = self.queue.lock().unwrap().pop_front() {
                return next;
            }
            match &self.otherwise {
                Otherwise::Echo => Ok(request.user.to_uppercase()),
                Otherwise::Reply(reply) => Ok(reply.clone()),
                Otherwise::Fail => Err(ProviderError::Transport(format!("{} is down", self.name))),
            }
        }
    }

    /// Captured request from [`serve_once`].
    #[derive(Debug)]
    pub struct CapturedRequest {
        pub head: String,
        pub body: String,
    }

    /// Serve exactly one HTTP response on a random local port.
    ///
    /// Returns the base URL (`http://127.0.0.1:PORT`) and a receiver for the
    /// request that was served.
    pub async fn serve_once(status: u16, body: &str) -> (String, oneshot::Receiver<CapturedRequest>) {
        let response = format!(
            "HTTP/1.1 {} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        serve_response(response, Duration::ZERO).await
    }

    /// Write `response` verbatim to the first connection, then keep the
    /// socket open for `hold` before closing it.
    pub async fn serve_response(
        response: String,
        hold: Duration,
    ) -> (String, oneshot::Receiver<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break buf.len();
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            while buf.len() < header_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let request_body = String::from_utf8_lossy(&buf[header_end..]).to_string();

            // The client may have given up already.
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = tx.send(CapturedRequest {
                head,
                body: request_body,
            });
            if !hold.is_zero() {
                tokio::time::sleep(hold).await;
            }
            socket.shutdown().await.ok();
        });

        (format!("http://{}", addr), rx)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::serve_once;
    use super::*;

    #[test]
    fn test_default_priority_order() {
        let names: Vec<String> = default_descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["deepseek", "groq", "together", "ollama", "openai"]);
    }

    #[test]
    fn test_only_openai_generates_images() {
        let image_capable: Vec<String> = default_descriptors()
            .into_iter()
            .filter(|d| d.capabilities().contains(&Capability::Image))
            .map(|d| d.name)
            .collect();
        assert_eq!(image_capable, vec!["openai"]);
    }

    #[tokio::test]
    async fn test_missing_env_key_does_not_resolve() {
        let client = reqwest::Client::new();
        let cred = Credential::EnvKey("NEWS_REWRITER_TEST_KEY_THAT_IS_NEVER_SET".into());
        assert_eq!(cred.resolve(&client, Duration::from_secs(1)).await, None);
    }

    #[tokio::test]
    async fn test_local_probe_resolves_when_service_answers() {
        let (base, _rx) = serve_once(200, "{\"models\":[]}").await;
        let client = reqwest::Client::new();
        let cred = Credential::LocalProbe {
            url: format!("{}/api/tags", base),
        };
        assert!(cred.resolve(&client, Duration::from_secs(2)).await.is_some());
    }

    #[tokio::test]
    async fn test_local_probe_fails_on_error_status() {
        let (base, _rx) = serve_once(500, "{}").await;
        let client = reqwest::Client::new();
        let cred = Credential::LocalProbe {
            url: format!("{}/api/tags", base),
        };
        assert_eq!(cred.resolve(&client, Duration::from_secs(2)).await, None);
    }
}
