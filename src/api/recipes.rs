use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    api::{ApiError, ApiResult},
    extract,
    server::AppState,
    types::{
        AutocompleteParams, ChatRequest, ChatResponse, IdParams, Recipe, RecipeSummary,
        SearchParams,
    },
};

/// `GET /api/recipes?query=&cuisine=`. Never fails: a degraded provider means
/// fallback results.
pub async fn search_recipes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Recipe>> {
    let query = params.query.unwrap_or_default();
    Json(state.lookup.search(&query, params.cuisine.as_deref()).await)
}

/// `GET /api/recipeInfo?id=`
pub async fn recipe_info(
    State(state): State<AppState>,
    Query(params): Query<IdParams>,
) -> ApiResult<Json<Recipe>> {
    let id = params
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing recipe id".to_string()))?;
    Ok(Json(state.lookup.get_by_id(&id).await?))
}

/// `GET /api/autocomplete?query=`
pub async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Json<Vec<RecipeSummary>> {
    let query = params.query.unwrap_or_default();
    Json(state.lookup.autocomplete(&query).await)
}

/// `POST /api/chat-ingredients {message}`
pub async fn chat_ingredients(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let ingredients = state.extractor.extract(&body.message).await;
    let recipes = extract::find_matching_recipes(state.lookup.fallback(), &ingredients);
    tracing::debug!(?ingredients, matches = recipes.len(), "chat ingredients");

    Json(ChatResponse {
        bot_response: extract::bot_response(&ingredients),
        ingredients,
        recipes,
    })
}
