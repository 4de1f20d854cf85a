//! # API Module
//!
//! This module provides the HTTP endpoints the FlavorMatch UI talks to. Every
//! handler is a thin async function over the services in
//! [`crate::server::AppState`]; the recipe, music and playlist logic lives in
//! those services.
//!
//! ## Endpoints
//!
//! ### Recipes
//!
//! - `GET /api/recipes?query=&cuisine=` - Search, or the browse page when the
//!   query is empty. Always answers, from fallback data if necessary.
//! - `GET /api/recipeInfo?id=` - One recipe; 404 when nobody knows the id.
//! - `GET /api/autocomplete?query=` - At most eight title suggestions.
//! - `POST /api/chat-ingredients` - Ingredient extraction and matching.
//!
//! ### Music
//!
//! - `POST /api/recommendations` - Tracks for a cuisine, as the logged-in user.
//! - `GET /api/pair/{cuisine}` - Tracks for a cuisine, as the application.
//! - `POST /api/createPlaylist`, `POST /api/addTracks` - Playlist writes.
//! - `POST /api/playlist` - Create, populate and wait for the embed.
//! - `POST /api/recipe-with-music` - Recipe plus tracks plus optional playlist.
//!
//! ### Authentication
//!
//! - [`login`] - Starts the authorization-code flow with PKCE.
//! - [`callback`] - Exchanges the code and redirects to the UI with the tokens
//!   and a session id.
//! - [`refresh`] - Renews a user credential.
//! - [`me`] - The logged-in user's profile.
//!
//! ### Monitoring
//!
//! - [`health`] - Status, version, breaker state and configured integrations.
//!
//! ## Caller Identity
//!
//! User calls identify themselves with an `X-Session-Id` header (issued by the
//! callback) and/or an `Authorization: Bearer <token>` header. A known session
//! is preferred because its credential can be renewed.
//!
//! ## Errors
//!
//! Handlers return [`ApiError`], rendered as `{"error": "..."}`:
//! not found is 404, expired credentials 401, missing configuration 503,
//! upstream failures 502 and bad input 400.

mod callback;
mod error;
mod health;
mod music;
mod recipes;

use axum::http::{HeaderMap, header::AUTHORIZATION};

pub use callback::{callback, login, me, refresh};
pub use error::{ApiError, ApiResult};
pub use health::health;
pub use music::{
    add_tracks, assemble_playlist, create_playlist, pair, recipe_with_music, recommendations,
};
pub use recipes::{autocomplete, chat_ingredients, recipe_info, search_recipes};

use crate::{server::AppState, spotify::Authorization};

/// Header carrying the session id issued at login.
pub const SESSION_HEADER: &str = "x-session-id";

pub(crate) async fn caller_authorization(
    state: &AppState,
    headers: &HeaderMap,
) -> Option<Authorization> {
    let session = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    state.tokens.user_authorization(session, bearer).await
}

pub(crate) async fn require_user(state: &AppState, headers: &HeaderMap) -> ApiResult<Authorization> {
    caller_authorization(state, headers)
        .await
        .ok_or_else(|| ApiError::Unauthorized("log in with the music provider first".to_string()))
}
