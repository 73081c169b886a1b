//! Streaming client for OpenAI-compatible chat completion endpoints
//! (OpenRouter by default).

use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use reviewlens_shared::{ModelConfig, Result, ReviewLensError};

use crate::sse::{SseDecoder, SseEvent};
use crate::{ChatClient, ChatResponse};

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
    stream_options: StreamOptions,
}

#[derive(Debug, serde::Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, serde::Serialize)]
struct StreamOptions {
    include_usage: bool,
}

/// One `data:` payload of the completion stream.
#[derive(Debug, serde::Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, serde::Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, serde::Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, serde::Deserialize)]
struct ApiError {
    message: String,
}

// ---------------------------------------------------------------------------
// Client config
// ---------------------------------------------------------------------------

/// Everything fixed at client construction time.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Combine the `[model]` config section with a resolved model and key.
    pub fn from_model_config(config: &ModelConfig, model: String, api_key: String) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key,
            model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            timeout_secs: config.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Chat client that streams completions and collects every fragment.
pub struct OpenRouterClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl OpenRouterClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ReviewLens/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReviewLensError::Network(format!("client build: {e}")))?;

        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

impl ChatClient for OpenRouterClient {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %self.config.model, prompt_chars = prompt.len()))]
    async fn invoke(&self, prompt: &str) -> Result<ChatResponse> {
        let start = Instant::now();
        let url = self.endpoint();

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
        };

        let mut response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReviewLensError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewLensError::Model(format!(
                "HTTP {status}: {}",
                &body[..floor_char_boundary(&body, 500)]
            )));
        }

        let mut decoder = SseDecoder::default();
        let mut reply = ChatResponse::default();
        let mut done = false;

        while !done {
            let Some(bytes) = response
                .chunk()
                .await
                .map_err(|e| ReviewLensError::Network(format!("{url}: stream read: {e}")))?
            else {
                break;
            };
            for event in decoder.push(&bytes) {
                if apply_event(event, &mut reply)? {
                    done = true;
                    break;
                }
            }
        }

        if !done {
            if let Some(event) = decoder.finish() {
                apply_event(event, &mut reply)?;
            }
        }

        reply.latency_ms = start.elapsed().as_millis() as u64;
        debug!(
            fragments = reply.fragments.len(),
            tokens_in = reply.tokens_in,
            tokens_out = reply.tokens_out,
            latency_ms = reply.latency_ms,
            "completion received"
        );

        Ok(reply)
    }
}

/// Fold one stream event into `reply`. Returns `true` on the terminator.
fn apply_event(event: SseEvent, reply: &mut ChatResponse) -> Result<bool> {
    let payload = match event {
        SseEvent::Done => return Ok(true),
        SseEvent::Data(payload) => payload,
    };

    let chunk: StreamChunk = serde_json::from_str(&payload).map_err(|e| {
        ReviewLensError::parse(format!(
            "invalid stream chunk: {e} (got: {})",
            &payload[..floor_char_boundary(&payload, 200)]
        ))
    })?;

    if let Some(error) = chunk.error {
        return Err(ReviewLensError::Model(error.message));
    }

    for choice in chunk.choices {
        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                reply.fragments.push(content);
            }
        }
    }

    if let Some(usage) = chunk.usage {
        reply.tokens_in = usage.prompt_tokens;
        reply.tokens_out = usage.completion_tokens;
    }

    Ok(false)
}

/// Largest char boundary `<= max` in `s`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
