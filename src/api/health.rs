use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use crate::server::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "recipeProvider": {
            "configured": state.lookup.has_provider(),
            "availability": state.lookup.breaker().state(),
        },
        "musicProvider": { "configured": state.tokens.is_configured() },
        "ingredientExtraction": { "configured": state.config.gemini_api_key.is_some() },
    }))
}
