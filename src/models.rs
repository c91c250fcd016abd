use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

pub const DEFAULT_OCCASION: &str = "casual";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeItem {
    pub id: String,
    pub name: String,
    pub color: String,
    pub category: String,
    pub color_hex: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub message: String,
    #[serde(default)]
    pub occasion: Option<String>, // e.g. business, party, date
    #[serde(default)]
    pub wardrobe_items: Vec<WardrobeItem>,
    #[serde(default)]
    pub outfit_descriptions: Vec<String>,
}

impl GenerationRequest {
    /// Occasion as used in prompts and templates; blank counts as missing.
    pub fn occasion_or_default(&self) -> &str {
        match self.occasion.as_deref().map(str::trim) {
            Some(o) if !o.is_empty() => o,
            _ => DEFAULT_OCCASION,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GenerationResult {
    pub message: String,
    pub reasoning: Option<String>,
    pub ai_used: bool,
}

impl GenerationResult {
    pub fn fallback(message: String) -> Self {
        Self { message, reasoning: None, ai_used: false }
    }

    pub fn from_model(message: String) -> Self {
        Self { message, reasoning: None, ai_used: true }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthReport {
    pub status: String,
    pub model_state: String,
    pub model_loaded: bool,
    pub model: Option<String>,
    pub model_error: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_parses_camel_case_body() {
        let body = r##"{
            "message": "what should I wear?",
            "occasion": "business",
            "wardrobeItems": [{"id":"1","name":"Blazer","color":"Navy Blue","category":"outerwear","colorHex":"#1F2A44"}],
            "outfitDescriptions": ["navy blazer + white shirt"]
        }"##;
        let req: GenerationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.occasion_or_default(), "business");
        assert_eq!(req.wardrobe_items[0].color_hex, "#1F2A44");
        assert_eq!(req.outfit_descriptions.len(), 1);
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let req: GenerationRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(req.wardrobe_items.is_empty());
        assert!(req.outfit_descriptions.is_empty());
        assert_eq!(req.occasion_or_default(), "casual");
    }

    #[test]
    fn blank_occasion_falls_back_to_casual() {
        let req = GenerationRequest { occasion: Some("   ".into()), ..Default::default() };
        assert_eq!(req.occasion_or_default(), "casual");
    }

    #[test]
    fn result_serializes_snake_case_flag() {
        let json = serde_json::to_value(GenerationResult::fallback("ok".into())).unwrap();
        assert_eq!(json["ai_used"], false);
        assert!(json["reasoning"].is_null());
    }
}
