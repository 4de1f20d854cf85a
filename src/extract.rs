//! Ingredient extraction for the chat assistant.
//!
//! A language model turns free text into a list of ingredients; matching
//! against recipes is purely local.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::{recipes::FallbackSet, types::Recipe};

/// Pulls ingredient names out of free text.
///
/// Implementations never fail: anything unusable yields an empty list.
#[async_trait]
pub trait IngredientExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Vec<String>;
}

/// Used when no model key is configured.
pub struct DisabledExtractor;

#[async_trait]
impl IngredientExtractor for DisabledExtractor {
    async fn extract(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Extraction through the Gemini `generateContent` endpoint.
pub struct GeminiExtractor {
    client: Client,
    api_url: String,
    api_key: String,
}

impl GeminiExtractor {
    pub fn new(client: Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, reqwest::Error> {
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let response: Value = self
            .client
            .post(&self.api_url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl IngredientExtractor for GeminiExtractor {
    async fn extract(&self, text: &str) -> Vec<String> {
        match self.generate(&prompt(text)).await {
            Ok(raw) => {
                let ingredients = parse_ingredients(&raw);
                if ingredients.is_empty() {
                    tracing::debug!(raw = %raw, "model returned no usable ingredients");
                }
                ingredients
            }
            Err(e) => {
                tracing::warn!(error = %e, "ingredient extraction failed");
                Vec::new()
            }
        }
    }
}

fn prompt(text: &str) -> String {
    format!(
        r#"You extract cooking ingredients from user text.
Return strict JSON only, without markdown or explanation, in this format:
{{"ingredients": ["ingredient1", "ingredient2"]}}

Input: "I have chicken, garlic, and tomato"
Output: {{"ingredients": ["chicken", "garlic", "tomato"]}}

Input: "What can I cook with rice and eggs?"
Output: {{"ingredients": ["rice", "eggs"]}}

Input: "I only have lime juice and garlic"
Output: {{"ingredients": ["lime", "garlic"]}}

Now extract ingredients from:
"{text}""#
    )
}

/// Reads the `ingredients` array from the outermost `{...}` block of a model
/// reply. Anything else in the reply is ignored.
pub fn parse_ingredients(raw: &str) -> Vec<String> {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }

    serde_json::from_str::<Value>(&raw[start..=end])
        .ok()
        .and_then(|v| {
            v["ingredients"].as_array().map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
        })
        .unwrap_or_default()
}

/// Recipes with at least one ingredient word that overlaps a search term.
///
/// Ingredient lines are lowercased, stripped to letters and spaces, and split
/// into words; a word matches a term when either contains the other.
pub fn find_matching_recipes(fallback: &FallbackSet, ingredients: &[String]) -> Vec<Recipe> {
    let terms: Vec<String> = ingredients
        .iter()
        .map(|i| i.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return Vec::new();
    }

    fallback
        .all()
        .iter()
        .filter(|recipe| {
            recipe.ingredients.iter().any(|line| {
                let clean: String = line
                    .to_lowercase()
                    .chars()
                    .filter(|c| c.is_ascii_lowercase() || c.is_whitespace())
                    .collect();
                clean.split_whitespace().any(|word| {
                    terms
                        .iter()
                        .any(|term| word.contains(term.as_str()) || term.contains(word))
                })
            })
        })
        .cloned()
        .collect()
}

/// The assistant's reply for the extracted ingredients.
pub fn bot_response(ingredients: &[String]) -> String {
    if ingredients.is_empty() {
        "I couldn't detect ingredients. Try telling me what ingredients you have!".to_string()
    } else {
        format!(
            "Based on your ingredients ({}), here are some ideas!",
            ingredients.join(", ")
        )
    }
}
