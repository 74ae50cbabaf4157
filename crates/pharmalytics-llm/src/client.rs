//! Inference client for the hosted generative model.
//!
//! [`InferenceClient`] is the raw transport. [`Inference`] is the shared
//! handle the engine holds: it renders prompts, retries transient failures
//! and turns any final failure into an absent result.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prompts::InferenceRequest;
use crate::TaskKind;

/// Inference errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Cannot reach inference endpoint at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Inference endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl InferenceError {
    /// Whether a retry may succeed. 4xx responses (auth, quota, bad
    /// request) are final.
    pub fn is_transient(&self) -> bool {
        match self {
            InferenceError::Connection(_) | InferenceError::Timeout(_) => true,
            InferenceError::Status { status, .. } => *status >= 500,
            InferenceError::ResponseParsing(_) | InferenceError::HttpClient(_) => false,
        }
    }
}

pub type InferenceResult<T> = Result<T, InferenceError>;

/// Raw text generation against a model endpoint.
pub trait InferenceClient: Send + Sync {
    fn generate(&self, task: TaskKind, prompt: &str) -> InferenceResult<String>;

    /// Model identifier used for a task (recorded alongside analyses).
    fn model_for(&self, task: TaskKind) -> &str;
}

// =========================================================================
// Configuration
// =========================================================================

/// Settings for the hosted inference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub models: HashMap<TaskKind, String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        let mut models = HashMap::new();
        models.insert(TaskKind::Interaction, "ibm-granite/granite-7b-instruct".to_string());
        models.insert(TaskKind::Dosage, "ibm-granite/granite-3b-code-instruct".to_string());
        models.insert(TaskKind::SideEffect, "ibm-granite/granite-7b-instruct".to_string());
        models.insert(TaskKind::Extraction, "ibm-granite/granite-7b-instruct".to_string());

        Self {
            base_url: "https://api-inference.huggingface.co/models".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            max_new_tokens: 500,
            temperature: 0.1,
            max_retries: 2,
            retry_backoff_ms: 500,
            models,
        }
    }
}

impl InferenceConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

// =========================================================================
// Hugging Face client
// =========================================================================

/// Client for the Hugging Face Inference API.
pub struct HuggingFaceClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    max_new_tokens: u32,
    temperature: f32,
    models: HashMap<TaskKind, String>,
}

/// Request body for a text-generation model.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Serialize)]
struct GenerateParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

/// The API answers with either a list or a single object.
#[derive(Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Many(Vec<GeneratedText>),
    One(GeneratedText),
}

#[derive(Deserialize)]
struct GeneratedText {
    #[serde(default)]
    generated_text: String,
}

impl GenerateResponse {
    fn into_text(self) -> String {
        match self {
            GenerateResponse::Many(items) => items
                .into_iter()
                .next()
                .map(|g| g.generated_text)
                .unwrap_or_default(),
            GenerateResponse::One(item) => item.generated_text,
        }
    }
}

impl HuggingFaceClient {
    pub fn new(config: &InferenceConfig) -> InferenceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InferenceError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
            timeout_secs: config.timeout_secs,
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            models: config.models.clone(),
        })
    }

    fn endpoint(&self, task: TaskKind) -> String {
        format!("{}/{}", self.base_url, self.model_for(task))
    }
}

impl InferenceClient for HuggingFaceClient {
    fn generate(&self, task: TaskKind, prompt: &str) -> InferenceResult<String> {
        let url = self.endpoint(task);
        let body = GenerateRequest {
            inputs: prompt,
            parameters: GenerateParameters {
                max_new_tokens: self.max_new_tokens,
                temperature: self.temperature,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    InferenceError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    InferenceError::Timeout(self.timeout_secs)
                } else {
                    InferenceError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| InferenceError::ResponseParsing(e.to_string()))?;

        Ok(parsed.into_text())
    }

    fn model_for(&self, task: TaskKind) -> &str {
        self.models.get(&task).map(String::as_str).unwrap_or("unknown")
    }
}

// =========================================================================
// Shared inference handle
// =========================================================================

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        InferenceConfig::default().retry_policy()
    }
}

/// Process-wide inference handle, created once and shared by reference.
#[derive(Clone)]
pub struct Inference {
    client: Arc<dyn InferenceClient>,
    retry: RetryPolicy,
}

impl Inference {
    pub fn new(client: Arc<dyn InferenceClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Hugging Face-backed handle built from config.
    pub fn from_config(config: &InferenceConfig) -> InferenceResult<Self> {
        let client = HuggingFaceClient::new(config)?;
        Ok(Self::new(Arc::new(client), config.retry_policy()))
    }

    pub fn model_for(&self, task: TaskKind) -> &str {
        self.client.model_for(task)
    }

    /// Run a request. Failures are logged and reported as `None`.
    pub fn infer(&self, request: &InferenceRequest<'_>) -> Option<String> {
        let task = request.task();
        match self.try_infer(task, &request.prompt()) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(task = %task, error = %e, "Inference failed, continuing without it");
                None
            }
        }
    }

    /// Run a raw prompt with the retry policy applied.
    pub fn try_infer(&self, task: TaskKind, prompt: &str) -> InferenceResult<String> {
        let mut attempt = 0;
        loop {
            match self.client.generate(task, prompt) {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::debug!(
                        task = %task,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient inference failure, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// =========================================================================
// Mock client
// =========================================================================

/// Mock client for testing without a live endpoint.
///
/// Scripted results are consumed first (per task), then the per-task
/// response, then the default response.
pub struct MockInferenceClient {
    default_response: InferenceResult<String>,
    responses: HashMap<TaskKind, InferenceResult<String>>,
    script: Mutex<HashMap<TaskKind, VecDeque<InferenceResult<String>>>>,
    calls: Mutex<Vec<(TaskKind, String)>>,
}

impl MockInferenceClient {
    pub fn new(response: &str) -> Self {
        Self {
            default_response: Ok(response.to_string()),
            responses: HashMap::new(),
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails with `error`.
    pub fn failing(error: InferenceError) -> Self {
        Self {
            default_response: Err(error),
            ..Self::new("")
        }
    }

    pub fn with_response(mut self, task: TaskKind, response: &str) -> Self {
        self.responses.insert(task, Ok(response.to_string()));
        self
    }

    pub fn with_error(mut self, task: TaskKind, error: InferenceError) -> Self {
        self.responses.insert(task, Err(error));
        self
    }

    pub fn with_script(self, task: TaskKind, results: Vec<InferenceResult<String>>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task, results.into());
        self
    }

    /// Prompts received so far, in call order.
    pub fn calls(&self) -> Vec<(TaskKind, String)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl InferenceClient for MockInferenceClient {
    fn generate(&self, task: TaskKind, prompt: &str) -> InferenceResult<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((task, prompt.to_string()));

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&task)
            .and_then(VecDeque::pop_front);
        if let Some(result) = scripted {
            return result;
        }

        self.responses
            .get(&task)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone())
    }

    fn model_for(&self, _task: TaskKind) -> &str {
        "mock"
    }
}
