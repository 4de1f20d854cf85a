use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde_json::{Value, json};

use crate::{
    api::{ApiError, ApiResult, caller_authorization, require_user},
    orchestrator::{RecipeQuery, RecipeWithMusic},
    server::AppState,
    spotify::Authorization,
    types::{
        AddTracksBody, AssembledPlaylist, AssemblePlaylistBody, CreatePlaylistBody, PlaylistRef,
        RecommendationsRequest, RecommendationsResponse,
    },
};

/// `POST /api/recommendations {cuisine}` with the caller's credential.
pub async fn recommendations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RecommendationsRequest>,
) -> ApiResult<Json<RecommendationsResponse>> {
    let mut auth = require_user(&state, &headers).await?;
    let cuisine = body.cuisine.unwrap_or_default();
    let (genre, tracks) = state.catalog.recommendations(&mut auth, &cuisine).await?;
    Ok(Json(RecommendationsResponse { genre, tracks }))
}

/// `GET /api/pair/{cuisine}` with the app credential.
pub async fn pair(
    State(state): State<AppState>,
    Path(cuisine): Path<String>,
) -> ApiResult<Json<RecommendationsResponse>> {
    if !state.tokens.is_configured() {
        return Err(ApiError::Unavailable(
            "music provider is not configured".to_string(),
        ));
    }
    let mut auth = Authorization::App;
    let (genre, tracks) = state.catalog.recommendations(&mut auth, &cuisine).await?;
    Ok(Json(RecommendationsResponse { genre, tracks }))
}

/// `POST /api/createPlaylist {userId, recipeTitle}`
pub async fn create_playlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreatePlaylistBody>,
) -> ApiResult<Json<PlaylistRef>> {
    let mut auth = require_user(&state, &headers).await?;
    let playlist = state
        .playlists
        .create_playlist(&mut auth, &body.user_id, &body.recipe_title)
        .await?;
    Ok(Json(playlist))
}

/// `POST /api/addTracks {playlistId, uris}`
pub async fn add_tracks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AddTracksBody>,
) -> ApiResult<Json<Value>> {
    let mut auth = require_user(&state, &headers).await?;
    let added = state
        .playlists
        .add_tracks(&mut auth, &body.playlist_id, &body.uris)
        .await?;
    Ok(Json(json!({ "playlistId": body.playlist_id, "tracksAdded": added })))
}

/// `POST /api/playlist {userId?, recipeTitle, uris}`: create, populate and
/// wait for the embed in one call.
pub async fn assemble_playlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AssemblePlaylistBody>,
) -> ApiResult<Json<AssembledPlaylist>> {
    let mut auth = require_user(&state, &headers).await?;
    let user_id = match body.user_id.filter(|u| !u.is_empty()) {
        Some(user_id) => user_id,
        None => state.catalog.current_user(&mut auth).await?.id,
    };
    let assembled = state
        .playlists
        .assemble(&mut auth, &user_id, &body.recipe_title, &body.uris)
        .await?;
    Ok(Json(assembled))
}

/// `POST /api/recipe-with-music`
pub async fn recipe_with_music(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(query): Json<RecipeQuery>,
) -> ApiResult<Json<RecipeWithMusic>> {
    let auth = caller_authorization(&state, &headers).await;
    let result = state
        .orchestrator
        .build_recipe_with_music(&query, auth)
        .await?;
    Ok(Json(result))
}
