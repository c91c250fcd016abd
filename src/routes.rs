use axum::{Json, Router, extract::State, routing::{get, post}};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::{
    llm::{ModelSlot, ModelState},
    models::{GenerationRequest, GenerationResult, HealthReport},
    stylist::Stylist,
};

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ModelSlot>,
    pub stylist: Arc<Stylist>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/generate-response", post(generate_response))
        .route("/generate-reasoning", post(generate_reasoning))
        .with_state(state)
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "FitPrint AI Backend is running" }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let (model_state, model, model_error, checked_at) = match state.model.state() {
        ModelState::Unloaded => ("unloaded", None, None, None),
        ModelState::Loaded { name, at } => ("loaded", Some(name), None, Some(at)),
        ModelState::Failed { reason, at } => ("failed", None, Some(reason), Some(at)),
    };
    Json(HealthReport {
        status: "healthy".to_string(),
        model_state: model_state.to_string(),
        model_loaded: model.is_some(),
        model,
        model_error,
        checked_at,
    })
}

pub async fn generate_response(State(state): State<AppState>, Json(body): Json<GenerationRequest>) -> Json<GenerationResult> {
    let span = info_span!("generate_response", request_id = %Uuid::new_v4());
    async move {
        info!("🎯 Response requested for {} outfits", body.outfit_descriptions.len());
        let model = state.model.get_or_load().await;
        Json(state.stylist.generate(&body, model.as_deref()).await)
    }
    .instrument(span)
    .await
}

pub async fn generate_reasoning(State(state): State<AppState>, Json(body): Json<GenerationRequest>) -> Json<GenerationResult> {
    let span = info_span!("generate_reasoning", request_id = %Uuid::new_v4());
    async move {
        let model = state.model.get_or_load().await;
        Json(state.stylist.generate_reasoning(&body, model.as_deref()).await)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::StylistConfig,
        llm::{testing::ScriptedCompleter, CompletionError, DisabledLoader, LoadedModel, ModelLoader, TextCompleter},
    };
    use async_trait::async_trait;
    use axum::{body::Body, http::{Request, StatusCode}};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    struct StaticLoader(Arc<dyn TextCompleter>);

    #[async_trait]
    impl ModelLoader for StaticLoader {
        async fn load(&self) -> Result<LoadedModel, CompletionError> {
            Ok(LoadedModel { name: "scripted".into(), completer: self.0.clone() })
        }
    }

    fn state_with(loader: impl ModelLoader + 'static) -> AppState {
        AppState {
            model: Arc::new(ModelSlot::new(loader)),
            stylist: Arc::new(Stylist::new(StylistConfig::default())),
        }
    }

    async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder.header("content-type", "application/json").body(Body::from(b.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn business_body() -> Value {
        json!({
            "message": "What should I wear to the office?",
            "occasion": "business",
            "wardrobeItems": [
                {"id": "1", "name": "Blazer", "color": "Navy Blue", "category": "outerwear", "colorHex": "#1F2A44"},
                {"id": "2", "name": "Oxford", "color": "White", "category": "tops", "colorHex": "#FFFFFF"}
            ],
            "outfitDescriptions": ["navy blazer + white shirt"]
        })
    }

    #[tokio::test]
    async fn root_reports_running() {
        let (status, body) = call(router(state_with(DisabledLoader)), "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "FitPrint AI Backend is running");
    }

    #[tokio::test]
    async fn health_does_not_trigger_load() {
        let (_, body) = call(router(state_with(DisabledLoader)), "GET", "/health", None).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_state"], "unloaded");
        assert_eq!(body["model_loaded"], false);
    }

    #[tokio::test]
    async fn disabled_model_yields_template_and_health_reports_reason() {
        let state = state_with(DisabledLoader);
        let (status, body) = call(router(state.clone()), "POST", "/generate-response", Some(business_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ai_used"], false);
        assert_eq!(
            body["message"],
            "Perfect! I've curated 1 stylish outfit for your business. Each combination is carefully selected from your wardrobe to help you look your best!"
        );
        assert!(body["reasoning"].is_null());

        let (_, health) = call(router(state), "GET", "/health", None).await;
        assert_eq!(health["model_state"], "failed");
        assert!(health["model_error"].as_str().unwrap().contains("disabled"));
    }

    #[tokio::test]
    async fn loaded_model_reply_is_returned() {
        let model = Arc::new(ScriptedCompleter::replying("Your navy blazer over a white oxford is a sharp, confident office look!"));
        let state = state_with(StaticLoader(model));
        let (_, body) = call(router(state.clone()), "POST", "/generate-response", Some(business_body())).await;
        assert_eq!(body["ai_used"], true);
        assert_eq!(body["message"], "Your navy blazer over a white oxford is a sharp, confident office look!");

        let (_, health) = call(router(state), "GET", "/health", None).await;
        assert_eq!(health["model_loaded"], true);
        assert_eq!(health["model"], "scripted");
    }

    #[tokio::test]
    async fn reasoning_endpoint_falls_back_on_gibberish() {
        let model = Arc::new(ScriptedCompleter::replying("How to wear a blazer: the first thing to know."));
        let (status, body) = call(router(state_with(StaticLoader(model))), "POST", "/generate-reasoning", Some(business_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ai_used"], false);
        assert_eq!(body["message"], "This Navy Blue and White combination creates a harmonious look perfect for business occasions.");
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_by_extractor() {
        let (status, _) = call(router(state_with(DisabledLoader)), "POST", "/generate-response", Some(json!({"occasion": 3}))).await;
        assert!(status.is_client_error());
    }
}
