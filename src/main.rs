mod config;
mod llm;
mod models;
mod quality;
mod routes;
mod stylist;

use anyhow::Context;
use axum::http::HeaderValue;
use routes::{router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{
    config::{Config, ModelBackend},
    llm::{DisabledLoader, ModelSlot, OllamaLoader},
    stylist::Stylist,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    let model = match config.backend {
        ModelBackend::Ollama => {
            tracing::info!("Model backend: {} (candidates: {})", config.ollama_base_url, config.model_names.join(", "));
            ModelSlot::new(OllamaLoader::new(config.ollama_base_url.clone(), config.model_names.clone()))
        }
        ModelBackend::Disabled => {
            tracing::info!("Model backend disabled - serving rule-based responses only");
            ModelSlot::new(DisabledLoader)
        }
    };
    let state = AppState {
        model: Arc::new(model.with_load_timeout(config.load_timeout)),
        stylist: Arc::new(Stylist::new(config.stylist.clone())),
    };

    // Resolve the model before taking traffic so the failed state is settled up front.
    if config.preload {
        state.model.get_or_load().await;
    }

    let app = router(state).layer(cors_layer(&config.cors_allow_origin)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let value = HeaderValue::from_str(origin.trim())
            .with_context(|| format!("invalid CORS_ALLOW_ORIGIN {origin:?}"))?;
        AllowOrigin::exact(value)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
    }
}
