use std::{str::FromStr, time::Duration};
use thiserror::Error;

use crate::{llm::{GenerationParams, DEFAULT_LOAD_TIMEOUT}, quality::QualityPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelBackend {
    Ollama,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: ModelBackend,
    pub ollama_base_url: String,
    pub model_names: Vec<String>,
    pub preload: bool,
    pub load_timeout: Duration,
    pub cors_allow_origin: String,
    pub stylist: StylistConfig,
}

/// Tunables for the two generators. None of these values are load-bearing.
#[derive(Debug, Clone)]
pub struct StylistConfig {
    pub response_params: GenerationParams,
    pub reasoning_params: GenerationParams,
    pub response_policy: QualityPolicy,
    pub reasoning_policy: QualityPolicy,
    pub timeout: Duration,
}

impl Default for StylistConfig {
    fn default() -> Self {
        Self {
            response_params: GenerationParams { max_tokens: 100, temperature: 0.7, top_k: 40, top_p: 0.9, repeat_penalty: 1.2 },
            reasoning_params: GenerationParams { max_tokens: 50, temperature: 0.6, top_k: 40, top_p: 0.9, repeat_penalty: 1.3 },
            response_policy: QualityPolicy::response_default(),
            reasoning_policy: QualityPolicy::reasoning_default(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            backend: ModelBackend::Ollama,
            ollama_base_url: "http://localhost:11434".to_string(),
            model_names: vec!["llama3.2:1b".into(), "phi3:mini".into(), "tinyllama".into()],
            preload: true,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            cors_allow_origin: "http://localhost:3000".to_string(),
            stylist: StylistConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, so tests need not touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(port) = parse::<u16>(&lookup, "PORT")? { cfg.port = port; }
        if let Some(backend) = lookup("MODEL_BACKEND") {
            cfg.backend = match backend.trim().to_ascii_lowercase().as_str() {
                "ollama" => ModelBackend::Ollama,
                "disabled" | "none" | "off" => ModelBackend::Disabled,
                _ => return Err(ConfigError::Invalid { key: "MODEL_BACKEND", value: backend }),
            };
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            cfg.ollama_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(names) = lookup("MODEL_NAMES") {
            let names: Vec<String> = names.split(',').map(str::trim).filter(|n| !n.is_empty()).map(String::from).collect();
            if names.is_empty() {
                return Err(ConfigError::Invalid { key: "MODEL_NAMES", value: String::new() });
            }
            cfg.model_names = names;
        }
        if let Some(preload) = parse::<bool>(&lookup, "MODEL_PRELOAD")? { cfg.preload = preload; }
        if let Some(secs) = parse::<u64>(&lookup, "MODEL_LOAD_TIMEOUT_SECS")? { cfg.load_timeout = Duration::from_secs(secs); }
        if let Some(origin) = lookup("CORS_ALLOW_ORIGIN") { cfg.cors_allow_origin = origin; }

        let s = &mut cfg.stylist;
        if let Some(secs) = parse::<u64>(&lookup, "GENERATION_TIMEOUT_SECS")? { s.timeout = Duration::from_secs(secs); }
        if let Some(v) = parse(&lookup, "RESPONSE_MAX_TOKENS")? { s.response_params.max_tokens = v; }
        if let Some(v) = parse(&lookup, "RESPONSE_TEMPERATURE")? { s.response_params.temperature = v; }
        if let Some(v) = parse(&lookup, "REASONING_MAX_TOKENS")? { s.reasoning_params.max_tokens = v; }
        if let Some(v) = parse(&lookup, "REASONING_TEMPERATURE")? { s.reasoning_params.temperature = v; }

        Ok(cfg)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
