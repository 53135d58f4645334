//! Generative-model backends that turn a prompt into a summary.
//!
//! Gemini is used when `GEMINI_API_KEY` is set; otherwise requests go to an
//! Ollama server (`OLLAMA_HOST`, default `http://localhost:11434`).

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use ollama_rs::Ollama;
use ollama_rs::error::OllamaError;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::models::ModelOptions;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

/// Errors returned by a [`Summarizer`].
#[derive(Error, Debug)]
pub enum SummarizerError {
    /// Error during HTTP request communication, including non-2xx statuses.
    #[error("API communication failure: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Ollama request failed: {0}")]
    Ollama(#[from] OllamaError),

    /// The model refused the prompt.
    #[error("Prompt was blocked: {0}")]
    Blocked(String),

    #[error("Invalid model host: {0}")]
    InvalidHost(#[from] url::ParseError),
}

/// A generative model that answers a single prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Sends `prompt` and returns the generated text, which may be empty.
    async fn summarize(&self, prompt: &str, max_tokens: u32) -> Result<String, SummarizerError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, SummarizerError> {
        if self.candidates.is_empty() {
            if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(SummarizerError::Blocked(reason));
            }
        }

        Ok(self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default())
    }
}

/// Google Gemini over its REST `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiSummarizer {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiSummarizer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, prompt: &str, max_tokens: u32) -> Result<String, SummarizerError> {
        info!("Sending summary request to Gemini model {}", self.model);

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
            },
        };

        let response: GenerateContentResponse = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = response.into_text()?;
        debug!("Gemini returned {} characters", text.len());
        Ok(text)
    }
}

/// A model served by Ollama.
#[derive(Debug)]
pub struct OllamaSummarizer {
    client: Ollama,
    model: String,
}

impl OllamaSummarizer {
    pub fn new(client: Ollama, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Points at the Ollama server at `host`, e.g. `http://localhost:11434`.
    pub fn from_url(host: &str, model: impl Into<String>) -> Result<Self, SummarizerError> {
        let parsed = url::Url::parse(host)?;
        let host_str = parsed
            .host_str()
            .ok_or(url::ParseError::EmptyHost)?
            .to_string();
        let port = parsed.port_or_known_default().unwrap_or(11434);
        let host_with_scheme = format!("{}://{}", parsed.scheme(), host_str);

        Ok(Self::new(Ollama::new(host_with_scheme, port), model))
    }

    /// Configures the client from `OLLAMA_HOST` and `DEFAULT_OLLAMA_MODEL`.
    pub fn from_env() -> Self {
        let model = env::var("DEFAULT_OLLAMA_MODEL").unwrap_or_else(|_| {
            warn!(
                "DEFAULT_OLLAMA_MODEL environment variable not set. Using '{}'.",
                DEFAULT_OLLAMA_MODEL
            );
            DEFAULT_OLLAMA_MODEL.to_string()
        });

        match env::var("OLLAMA_HOST") {
            Ok(host) => Self::from_url(&host, model.clone()).unwrap_or_else(|e| {
                error!("Ignoring OLLAMA_HOST {:?}: {}", host, e);
                Self::new(Ollama::default(), model)
            }),
            Err(_) => Self::new(Ollama::default(), model),
        }
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(&self, prompt: &str, max_tokens: u32) -> Result<String, SummarizerError> {
        info!("Sending summary request to Ollama model {}", self.model);

        let request = ChatMessageRequest::new(
            self.model.clone(),
            vec![ChatMessage::user(prompt.to_string())],
        )
        .options(ModelOptions::default().num_predict(num_predict(max_tokens)));

        match self.client.send_chat_messages(request).await {
            Ok(response) => {
                debug!("Successfully received response from Ollama");
                Ok(response.message.content)
            }
            Err(e) => {
                error!("Failed to get response from Ollama: {}", e);
                Err(e.into())
            }
        }
    }
}

/// Ollama's `num_predict` is signed; budgets past `i32::MAX` saturate.
fn num_predict(max_tokens: u32) -> i32 {
    i32::try_from(max_tokens).unwrap_or(i32::MAX)
}

/// Picks the backend from the environment: Gemini when `GEMINI_API_KEY` is set, Ollama otherwise.
pub fn summarizer_from_env() -> Arc<dyn Summarizer> {
    match env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => {
            let model =
                env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
            info!("Gemini model {} initialized", model);
            Arc::new(GeminiSummarizer::new(GEMINI_BASE_URL, key, model))
        }
        _ => {
            warn!("No Gemini API key found, summarizing with Ollama");
            Arc::new(OllamaSummarizer::from_env())
        }
    }
}
