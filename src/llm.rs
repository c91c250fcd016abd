use std::{sync::Arc, time::Duration};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, error, debug};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("model unavailable: {0}")] Unavailable(String),
    #[error("HTTP error: {0}")] Http(String),
    #[error("backend returned status={status} body={body}")] Backend { status: u16, body: String },
    #[error("parse error: {0}")] Parse(String),
    #[error("timed out after {0:?}")] Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

/// Opaque text-completion capability. Implementations must be shareable across requests.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, CompletionError>;
}

// --- Ollama-compatible backend ---

pub struct OllamaCompleter {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaCompleter {
    pub fn new(client: Client, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), model: model.into() }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry { name: String }

#[async_trait]
impl TextCompleter for OllamaCompleter {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, CompletionError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_predict": params.max_tokens,
                "temperature": params.temperature,
                "top_k": params.top_k,
                "top_p": params.top_p,
                "repeat_penalty": params.repeat_penalty,
            }
        });

        debug!("📤 Completion request to {} ({} prompt chars)", url, prompt.len());

        let response = self.client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ Model backend error response: {}", body);
            return Err(CompletionError::Backend { status: status.as_u16(), body });
        }

        let parsed: GenerateResponse = response.json().await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;
        Ok(parsed.response)
    }
}

/// First configured candidate that is installed. A bare name also matches `name:latest`.
pub fn pick_model(candidates: &[String], installed: &[String]) -> Option<String> {
    candidates.iter().find_map(|want| {
        installed.iter().find(|have| {
            *have == want || (!want.contains(':') && **have == format!("{want}:latest"))
        }).cloned()
    })
}

// --- Model lifecycle ---

pub struct LoadedModel {
    pub name: String,
    pub completer: Arc<dyn TextCompleter>,
}

#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<LoadedModel, CompletionError>;
}

pub struct OllamaLoader {
    client: Client,
    base_url: String,
    candidates: Vec<String>,
}

impl OllamaLoader {
    pub fn new(base_url: impl Into<String>, candidates: Vec<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into(), candidates }
    }
}

#[async_trait]
impl ModelLoader for OllamaLoader {
    async fn load(&self) -> Result<LoadedModel, CompletionError> {
        let url = format!("{}/api/tags", self.base_url);
        info!("🔗 Probing model backend at {}", url);

        let response = self.client.get(&url).send().await
            .map_err(|e| CompletionError::Unavailable(format!("backend unreachable: {e}")))?;
        if !response.status().is_success() {
            return Err(CompletionError::Unavailable(format!("tag listing failed with status {}", response.status())));
        }
        let tags: TagsResponse = response.json().await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;
        let installed: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();

        let name = pick_model(&self.candidates, &installed).ok_or_else(|| {
            CompletionError::Unavailable(format!(
                "none of [{}] installed (found: [{}])",
                self.candidates.join(", "),
                installed.join(", ")
            ))
        })?;

        let completer = OllamaCompleter::new(self.client.clone(), self.base_url.clone(), name.clone());
        Ok(LoadedModel { name, completer: Arc::new(completer) })
    }
}

/// Loader used when generation is switched off in config.
pub struct DisabledLoader;

#[async_trait]
impl ModelLoader for DisabledLoader {
    async fn load(&self) -> Result<LoadedModel, CompletionError> {
        Err(CompletionError::Unavailable("model backend disabled by configuration".into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelState {
    Unloaded,
    Loaded { name: String, at: DateTime<Utc> },
    Failed { reason: String, at: DateTime<Utc> },
}

struct LoadOutcome {
    model: Result<LoadedModel, String>,
    at: DateTime<Utc>,
}

pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Holds the model capability. The loader runs at most once; a failure is final.
pub struct ModelSlot {
    loader: Box<dyn ModelLoader>,
    load_timeout: Duration,
    cell: OnceCell<LoadOutcome>,
}

impl ModelSlot {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self { loader: Box::new(loader), load_timeout: DEFAULT_LOAD_TIMEOUT, cell: OnceCell::new() }
    }

    /// A load that outlives `timeout` settles the slot as failed.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub async fn get_or_load(&self) -> Option<Arc<dyn TextCompleter>> {
        let outcome = self.cell.get_or_init(|| async {
            info!("Loading generative model...");
            let loaded = tokio::time::timeout(self.load_timeout, self.loader.load()).await
                .unwrap_or_else(|_| Err(CompletionError::Timeout(self.load_timeout)));
            let model = match loaded {
                Ok(m) => {
                    info!("✅ Model '{}' loaded", m.name);
                    Ok(m)
                }
                Err(e) => {
                    error!("❌ Model load failed, using rule-based responses: {}", e);
                    Err(e.to_string())
                }
            };
            LoadOutcome { model, at: Utc::now() }
        }).await;
        outcome.model.as_ref().ok().map(|m| m.completer.clone())
    }

    /// Current state without triggering a load.
    pub fn state(&self) -> ModelState {
        match self.cell.get() {
            None => ModelState::Unloaded,
            Some(LoadOutcome { model: Ok(m), at }) => ModelState::Loaded { name: m.name.clone(), at: *at },
            Some(LoadOutcome { model: Err(reason), at }) => ModelState::Failed { reason: reason.clone(), at: *at },
        }
    }
}
