//! Outfit response and reasoning generation.
//!
//! Both generators follow the same shape: build a prompt, ask the model, clean the
//! output, screen it with a [`QualityPolicy`](crate::quality::QualityPolicy), and fall back to a fixed template on
//! any miss. The caller always gets a usable message.

use tracing::{info, warn, debug};

use crate::{
    config::StylistConfig,
    llm::{CompletionError, GenerationParams, TextCompleter},
    models::{GenerationRequest, GenerationResult},
    quality::{clean_output, truncate_chars},
};

const PROMPT_ITEM_LIMIT: usize = 10;
const PROMPT_OUTFIT_LIMIT: usize = 5;
// Caller-supplied text interpolated into templates is clamped to keep them bounded.
const TEMPLATE_OCCASION_CHARS: usize = 60;
const TEMPLATE_COLORS_CHARS: usize = 120;

pub const GENERIC_REASONING: &str = "A stylish combination that works well together.";

const COLD_WORDS: [&str; 4] = ["cold", "freezing", "chilly", "cool"];
const HOT_WORDS: [&str; 3] = ["hot", "warm", "sweating"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weather {
    Cold,
    Hot,
    Neutral,
}

/// Cold words are checked first, so a message mentioning both reads as cold.
pub fn detect_weather(message: &str) -> Weather {
    let lower = message.to_lowercase();
    if COLD_WORDS.iter().any(|w| lower.contains(w)) {
        Weather::Cold
    } else if HOT_WORDS.iter().any(|w| lower.contains(w)) {
        Weather::Hot
    } else {
        Weather::Neutral
    }
}

fn outfit_noun(count: usize) -> &'static str {
    if count == 1 { "outfit" } else { "outfits" }
}

pub fn response_template(count: usize, occasion: &str, weather: Weather) -> String {
    let noun = outfit_noun(count);
    match weather {
        Weather::Cold => format!("Perfect! I've curated {count} warm and stylish {noun} for when you're feeling cold. These combinations will help keep you cozy while looking great!"),
        Weather::Hot => format!("Perfect! I've curated {count} lightweight and breathable {noun} for when you're feeling hot. These combinations will keep you cool and comfortable!"),
        Weather::Neutral => {
            let occasion = truncate_chars(occasion, TEMPLATE_OCCASION_CHARS);
            format!("Perfect! I've curated {count} stylish {noun} for your {occasion}. Each combination is carefully selected from your wardrobe to help you look your best!")
        }
    }
}

/// `look` is "harmonious" after a rejected reply and "stylish" after a failed call.
pub fn reasoning_template(request: &GenerationRequest, look: &str) -> String {
    let occasion = truncate_chars(request.occasion_or_default(), TEMPLATE_OCCASION_CHARS);
    let colors = distinct_colors(request);
    if colors.is_empty() {
        format!("This combination creates a {look} look perfect for {occasion} occasions.")
    } else {
        let colors = colors.join(" and ");
        let colors = truncate_chars(&colors, TEMPLATE_COLORS_CHARS);
        format!("This {colors} combination creates a {look} look perfect for {occasion} occasions.")
    }
}

fn distinct_colors(request: &GenerationRequest) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for item in &request.wardrobe_items {
        let color = item.color.trim();
        if !color.is_empty() && !seen.contains(&color) {
            seen.push(color);
        }
    }
    seen
}

pub fn build_response_prompt(request: &GenerationRequest, weather: Weather) -> String {
    let wardrobe = request.wardrobe_items.iter()
        .take(PROMPT_ITEM_LIMIT)
        .map(|i| format!("{} ({} {})", i.name, i.color, i.category))
        .collect::<Vec<_>>()
        .join(", ");
    let outfits = request.outfit_descriptions.iter()
        .take(PROMPT_OUTFIT_LIMIT)
        .enumerate()
        .map(|(i, d)| format!("{}. {}", i + 1, d))
        .collect::<Vec<_>>()
        .join("\n");
    let weather_context = match weather {
        Weather::Cold => " The user mentioned feeling cold, so emphasize warmth and layering.",
        Weather::Hot => " The user mentioned feeling hot, so emphasize lightweight and breathable options.",
        Weather::Neutral => "",
    };

    format!(
        "As a fashion stylist, a user said: \"{message}\"\n\n\
        Their wardrobe includes: {wardrobe}\n\n\
        I found {count} outfit combinations for {occasion}:\n{outfits}\n\n\
        Provide a friendly, enthusiastic 2-3 sentence response introducing these recommendations.{weather_context} \
        Be conversational and helpful. Keep it concise and fashion-focused. Do not include quotes around your response.",
        message = request.message,
        count = request.outfit_descriptions.len(),
        occasion = request.occasion_or_default(),
    )
}

pub fn build_reasoning_prompt(request: &GenerationRequest, outfit: &str) -> String {
    format!(
        "As a fashion stylist, explain why these items work well together for {}: {}.\n\n\
        Give a brief, stylish 1-sentence explanation. Be specific about color harmony and style.",
        request.occasion_or_default(),
        outfit
    )
}

pub struct Stylist {
    config: StylistConfig,
}

impl Stylist {
    pub fn new(config: StylistConfig) -> Self { Self { config } }

    pub async fn generate(&self, request: &GenerationRequest, model: Option<&dyn TextCompleter>) -> GenerationResult {
        let count = request.outfit_descriptions.len();
        let occasion = request.occasion_or_default();

        let Some(model) = model else {
            info!("⚠️ Model not available - using rule-based response");
            return GenerationResult::fallback(response_template(count, occasion, Weather::Neutral));
        };

        let weather = detect_weather(&request.message);
        let prompt = build_response_prompt(request, weather);
        info!("🤖 Generating response ({} outfits, occasion '{}', weather {:?})", count, occasion, weather);

        let raw = match self.complete(model, &prompt, &self.config.response_params).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("❌ Response generation failed, using rule-based response: {}", e);
                return GenerationResult::fallback(response_template(count, occasion, Weather::Neutral));
            }
        };
        debug!("📝 Raw model response: {}", truncate_chars(&raw, 100));

        let cleaned = clean_output(&raw);
        match self.config.response_policy.check(&cleaned) {
            Ok(()) => {
                info!("✅ Model response accepted ({} chars)", cleaned.chars().count());
                GenerationResult::from_model(cleaned)
            }
            Err(rejection) => {
                warn!("⚠️ Model response filtered ({}) - using contextual template", rejection);
                GenerationResult::fallback(response_template(count, occasion, weather))
            }
        }
    }

    pub async fn generate_reasoning(&self, request: &GenerationRequest, model: Option<&dyn TextCompleter>) -> GenerationResult {
        let (Some(model), Some(outfit)) = (model, request.outfit_descriptions.first()) else {
            return GenerationResult::fallback(GENERIC_REASONING.to_string());
        };

        let prompt = build_reasoning_prompt(request, outfit);
        let raw = match self.complete(model, &prompt, &self.config.reasoning_params).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("❌ Reasoning generation failed: {}", e);
                return GenerationResult::fallback(reasoning_template(request, "stylish"));
            }
        };

        let cleaned = clean_output(&raw);
        match self.config.reasoning_policy.check(&cleaned) {
            Ok(()) => GenerationResult::from_model(cleaned),
            Err(rejection) => {
                warn!("⚠️ Reasoning filtered ({})", rejection);
                GenerationResult::fallback(reasoning_template(request, "harmonious"))
            }
        }
    }

    async fn complete(&self, model: &dyn TextCompleter, prompt: &str, params: &GenerationParams) -> Result<String, CompletionError> {
        match tokio::time::timeout(self.config.timeout, model.complete(prompt, params)).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(self.config.timeout)),
        }
    }
}
