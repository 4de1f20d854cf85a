use std::sync::Arc;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::{
    error::{LookupError, OrchestratorError},
    genre,
    recipes::RecipeLookup,
    spotify::{
        Authorization, MusicCatalog, PlaylistAssembler, TokenLifecycleManager,
        tracks::RECOMMENDATION_LIMIT,
    },
    types::{AssembledPlaylist, Recipe, Track},
};

/// What the caller wants: a recipe by id or by search, and optionally a playlist.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeQuery {
    pub query: Option<String>,
    pub id: Option<String>,
    pub cuisine: Option<String>,
    pub create_playlist: bool,
    pub user_id: Option<String>,
}

impl RecipeQuery {
    pub fn search(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

/// A recipe with whatever music could be found for it.
///
/// `music_error` explains why `tracks` is empty or `playlist` is missing; the
/// recipe itself is always present.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeWithMusic {
    pub recipe: Recipe,
    pub genre: String,
    pub tracks: Vec<Track>,
    pub recommended_track: Option<Track>,
    pub playlist: Option<AssembledPlaylist>,
    pub music_error: Option<String>,
}

/// Composes recipe lookup, genre mapping and the music provider.
///
/// The recipe half decides success; the music half only ever degrades the
/// answer.
pub struct Orchestrator {
    lookup: Arc<RecipeLookup>,
    catalog: Arc<MusicCatalog>,
    playlists: Arc<PlaylistAssembler>,
    tokens: Arc<TokenLifecycleManager>,
}

impl Orchestrator {
    pub fn new(
        lookup: Arc<RecipeLookup>,
        catalog: Arc<MusicCatalog>,
        playlists: Arc<PlaylistAssembler>,
        tokens: Arc<TokenLifecycleManager>,
    ) -> Self {
        Self {
            lookup,
            catalog,
            playlists,
            tokens,
        }
    }

    /// Looks up the recipe, then tries to attach tracks and, when asked and a
    /// user is logged in, a playlist.
    ///
    /// Without a user authorization, tracks are fetched with the app credential
    /// when the music provider is configured.
    pub async fn build_recipe_with_music(
        &self,
        query: &RecipeQuery,
        auth: Option<Authorization>,
    ) -> Result<RecipeWithMusic, OrchestratorError> {
        let recipe = self.find_recipe(query).await?;
        let genre = genre::map_cuisine_to_genre(&recipe.cuisine).to_string();

        let mut result = RecipeWithMusic {
            recipe,
            genre,
            tracks: Vec::new(),
            recommended_track: None,
            playlist: None,
            music_error: None,
        };

        let mut auth = match auth {
            Some(auth) => auth,
            None if self.tokens.is_configured() => Authorization::App,
            None => {
                result.music_error = Some("music provider is not configured".to_string());
                return Ok(result);
            }
        };

        match self
            .catalog
            .tracks_for_genre(&mut auth, &result.genre, RECOMMENDATION_LIMIT)
            .await
        {
            Ok(tracks) => result.tracks = tracks,
            Err(e) => {
                tracing::warn!(genre = %result.genre, error = %e, "no tracks for recipe");
                result.music_error = Some(e.to_string());
                return Ok(result);
            }
        }
        result.recommended_track = result.tracks.choose(&mut rand::rng()).cloned();

        if query.create_playlist {
            match self.playlist_for(query, &mut auth, &result).await {
                Ok(playlist) => result.playlist = Some(playlist),
                Err(message) => {
                    tracing::warn!(error = %message, "playlist skipped");
                    result.music_error = Some(message);
                }
            }
        }

        Ok(result)
    }

    async fn find_recipe(&self, query: &RecipeQuery) -> Result<Recipe, OrchestratorError> {
        if let Some(id) = query.id.as_deref().filter(|id| !id.trim().is_empty()) {
            return Ok(self.lookup.get_by_id(id).await?);
        }

        let text = query
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(OrchestratorError::EmptyQuery)?;

        self.lookup
            .search(text, query.cuisine.as_deref())
            .await
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NotFound(text.to_string()).into())
    }

    async fn playlist_for(
        &self,
        query: &RecipeQuery,
        auth: &mut Authorization,
        result: &RecipeWithMusic,
    ) -> Result<AssembledPlaylist, String> {
        if !auth.is_user() {
            return Err("log in to create playlists".to_string());
        }

        let user_id = match query.user_id.as_deref().filter(|u| !u.is_empty()) {
            Some(user_id) => user_id.to_string(),
            None => {
                self.catalog
                    .current_user(auth)
                    .await
                    .map_err(|e| e.to_string())?
                    .id
            }
        };

        let uris: Vec<String> = result.tracks.iter().map(|t| t.uri.clone()).collect();
        self.playlists
            .assemble(auth, &user_id, &result.recipe.title, &uris)
            .await
            .map_err(|e| e.to_string())
    }
}
