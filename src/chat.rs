//! Chat assistant bridge
//!
//! Sends the conversation to an OpenAI-style chat completions endpoint,
//! retrying rate-limited requests with exponential backoff. Failures never
//! reach the caller: they become a fixed fallback reply in the transcript.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ChatConfig};
use crate::keywords::{self, DepartmentSuggestion};
use crate::metrics::MetricsCollector;
use crate::models::ChatMessage;

/// Reply appended when the completion API cannot produce one
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong. Please try again later.";

/// System instruction sent ahead of every conversation
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful medical assistant.";

/// One message of a completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

impl CompletionMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Body of a chat completions request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model name
    pub model: String,
    /// System instruction, context window, then the new user turn
    pub messages: Vec<CompletionMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Reply length cap
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionContent,
}

#[derive(Debug, Deserialize)]
struct CompletionContent {
    content: Option<String>,
}

/// Why a completion call produced no reply
#[derive(Error, Debug)]
pub enum CompletionError {
    /// HTTP 429; the only retryable failure
    #[error("Rate limited by completion API")]
    RateLimited,

    /// Any other non-success status
    #[error("Completion API returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Connection, TLS or timeout failure
    #[error("Completion request failed: {0}")]
    Transport(String),

    /// 2xx with a body that carries no reply
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
}

impl CompletionError {
    /// True when the request may be retried after a delay.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

/// A chat completions backend
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one request and return the trimmed reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// [`CompletionClient`] for OpenAI-compatible HTTP endpoints
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    /// Build a client with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Build a client from loaded configuration; `OPENAI_API_KEY` wins over the file.
    pub fn from_config(config: &AppConfig) -> Result<Self, CompletionError> {
        Self::new(
            config.chat.endpoint.clone(),
            config.get_api_key(),
            Duration::from_secs(config.chat.request_timeout_secs),
        )
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Transport(format!("Request timed out: {e}"))
            } else {
                CompletionError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CompletionError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| CompletionError::MalformedResponse("no choices in response".to_string()))
    }
}

/// Exponential backoff for rate-limited requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy from the chat section of the configuration
    #[must_use]
    pub const fn from_config(config: &ChatConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    /// Delay before retry number `retry` (zero-based): base, 2x base, 4x base, ...
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(retry))
    }
}

/// Result of a completion call after retries
#[derive(Debug)]
pub struct RetryOutcome {
    /// Final attempt's result
    pub result: Result<String, CompletionError>,
    /// Retries performed
    pub retries: u32,
}

/// Call `client`, sleeping and retrying only on rate limiting.
pub async fn complete_with_retry<C>(client: &C, request: &CompletionRequest, policy: RetryPolicy) -> RetryOutcome
where
    C: CompletionClient + ?Sized,
{
    let mut retries = 0;
    loop {
        match client.complete(request).await {
            Err(e) if e.is_rate_limited() && retries < policy.max_retries => {
                let delay = policy.delay_for(retries);
                warn!(retry = retries + 1, delay_ms = delay.as_millis() as u64, "Rate limited, backing off");
                tokio::time::sleep(delay).await;
                retries += 1;
            }
            result => return RetryOutcome { result, retries },
        }
    }
}

/// Assemble the outbound request: system instruction, the last
/// `history_window` turns oldest first, then the new user turn.
#[must_use]
pub fn build_outbound_request(history: &[ChatMessage], text: &str, config: &ChatConfig) -> CompletionRequest {
    let start = history.len().saturating_sub(config.history_window);
    let mut messages = Vec::with_capacity(history.len() - start + 2);
    messages.push(CompletionMessage::new("system", config.system_prompt.as_str()));
    messages.extend(
        history[start..]
            .iter()
            .map(|turn| CompletionMessage::new(turn.sender.role(), turn.text.as_str())),
    );
    messages.push(CompletionMessage::new("user", text));

    CompletionRequest {
        model: config.model.clone(),
        messages,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// What happened to one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was blank; nothing was recorded
    Empty,
    /// A request is already outstanding; input was dropped
    Busy,
    /// A bot turn was appended
    Replied {
        /// The appended bot text
        reply: String,
        /// Department hint active after this turn
        suggestion: Option<DepartmentSuggestion>,
        /// True when `reply` is the fallback message
        fell_back: bool,
    },
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// In-memory conversation with at most one request in flight
pub struct ChatAssistant<C> {
    client: C,
    config: ChatConfig,
    policy: RetryPolicy,
    history: Mutex<Vec<ChatMessage>>,
    busy: AtomicBool,
    suggestion: Mutex<Option<DepartmentSuggestion>>,
    metrics: Arc<MetricsCollector>,
}

impl<C: CompletionClient> ChatAssistant<C> {
    /// Start an empty conversation
    pub fn new(client: C, config: ChatConfig) -> Self {
        let policy = RetryPolicy::from_config(&config);
        Self {
            client,
            config,
            policy,
            history: Mutex::new(Vec::new()),
            busy: AtomicBool::new(false),
            suggestion: Mutex::new(None),
            metrics: MetricsCollector::shared(),
        }
    }

    /// Report request outcomes to `metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Override the backoff policy
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Transcript so far, oldest first
    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// True while a request is outstanding
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Most recent department hint, if any message has produced one
    pub fn active_suggestion(&self) -> Option<DepartmentSuggestion> {
        self.suggestion.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Submit one user message and wait for the bot turn.
    pub async fn send(&self, input: &str) -> SendOutcome {
        let text = input.trim();
        if text.is_empty() {
            return SendOutcome::Empty;
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Dropping message while a request is outstanding");
            return SendOutcome::Busy;
        }
        let _busy = BusyGuard(&self.busy);

        if let Some(found) = keywords::suggest_department(text) {
            debug!(keyword = found.keyword, department = found.department.id, "Department suggested");
            *self.suggestion.lock().unwrap_or_else(PoisonError::into_inner) = Some(found);
        }

        let request = {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            let request = build_outbound_request(&history, text, &self.config);
            history.push(ChatMessage::user(text));
            request
        };

        let started = tokio::time::Instant::now();
        let RetryOutcome { result, retries } = complete_with_retry(&self.client, &request, self.policy).await;

        let (reply, fell_back) = match result {
            Ok(reply) => {
                info!(retries, "Chat reply received");
                (reply, false)
            }
            Err(e) => {
                warn!(error = %e, retries, "Chat request failed, using fallback reply");
                (FALLBACK_REPLY.to_string(), true)
            }
        };
        self.metrics.record_chat_request(started.elapsed(), retries, fell_back);

        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ChatMessage::bot(reply.as_str()));

        SendOutcome::Replied {
            reply,
            suggestion: self.active_suggestion(),
            fell_back,
        }
    }
}
