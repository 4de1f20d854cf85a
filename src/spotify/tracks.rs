use std::sync::Arc;

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::{
    error::MusicError,
    genre,
    spotify::auth::{Authorization, TokenLifecycleManager},
    types::{SearchTracksResponse, Track, UserProfile},
};

/// Number of tracks requested per recommendation.
pub const RECOMMENDATION_LIMIT: u32 = 10;

/// Read-only catalogue calls: track search and the current user's profile.
///
/// Every call goes through
/// [`TokenLifecycleManager::call_with_auth`], so it works with an app
/// authorization as well as a user one and renews the token once on a 401.
pub struct MusicCatalog {
    tokens: Arc<TokenLifecycleManager>,
}

impl MusicCatalog {
    pub fn new(tokens: Arc<TokenLifecycleManager>) -> Self {
        Self { tokens }
    }

    /// Searches tracks tagged with `genre`.
    ///
    /// # Arguments
    ///
    /// * `auth` - App or user authorization
    /// * `genre` - Spotify genre, used as a `genre:"..."` search filter
    /// * `limit` - Maximum number of tracks
    ///
    /// # Errors
    ///
    /// - [`MusicError::Auth`] when no usable token can be obtained
    /// - [`MusicError::Status`] on a non-success answer
    /// - [`MusicError::Decode`] when the search page has an unexpected shape
    ///
    /// # Example
    ///
    /// ```
    /// let tracks = catalog
    ///     .tracks_for_genre(&mut Authorization::App, "latin", 10)
    ///     .await?;
    /// ```
    pub async fn tracks_for_genre(
        &self,
        auth: &mut Authorization,
        genre: &str,
        limit: u32,
    ) -> Result<Vec<Track>, MusicError> {
        let url = format!("{}/search", self.tokens.config().api_url);
        let query = format!("genre:\"{genre}\"");
        let limit = limit.to_string();

        let response = self
            .tokens
            .call_with_auth(auth, |client, token| {
                client
                    .get(&url)
                    .bearer_auth(token)
                    .query(&[("q", query.as_str()), ("type", "track"), ("limit", limit.as_str())])
            })
            .await?;

        let page: SearchTracksResponse = read_json(response).await?;
        Ok(page.tracks.items.into_iter().map(Track::from).collect())
    }

    /// Maps the cuisine to a genre and fetches tracks for it.
    ///
    /// # Returns
    ///
    /// The genre that was searched and up to [`RECOMMENDATION_LIMIT`] tracks.
    /// Unknown cuisines search `pop`.
    ///
    /// # Errors
    ///
    /// Same as [`tracks_for_genre`](Self::tracks_for_genre).
    pub async fn recommendations(
        &self,
        auth: &mut Authorization,
        cuisine: &str,
    ) -> Result<(String, Vec<Track>), MusicError> {
        let genre = genre::map_cuisine_to_genre(cuisine);
        let tracks = self
            .tracks_for_genre(auth, genre, RECOMMENDATION_LIMIT)
            .await?;
        Ok((genre.to_string(), tracks))
    }

    /// The profile of the user behind `auth`.
    ///
    /// Used to find the owner id before a playlist is created.
    ///
    /// # Errors
    ///
    /// Same kinds as [`tracks_for_genre`](Self::tracks_for_genre). An app
    /// authorization has no user behind it, so this call is only made with a
    /// user authorization.
    pub async fn current_user(&self, auth: &mut Authorization) -> Result<UserProfile, MusicError> {
        let url = format!("{}/me", self.tokens.config().api_url);
        let response = self
            .tokens
            .call_with_auth(auth, |client, token| client.get(&url).bearer_auth(token))
            .await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, MusicError> {
    let status = response.status();
    if !status.is_success() {
        return Err(MusicError::Status(status));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| MusicError::Decode(e.to_string()))
}
