use std::{sync::Arc, time::Duration};

use reqwest::Url;
use serde_json::Value;
use tokio::time::sleep;

use crate::{
    config::EmbedPollConfig,
    error::{AuthError, PlaylistError},
    spotify::auth::{Authorization, TokenLifecycleManager},
    types::{AddTrackToPlaylistRequest, AssembledPlaylist, CreatePlaylistRequest, PlaylistRef},
};

/// Spotify accepts at most this many URIs per add-tracks request.
const TRACKS_PER_REQUEST: usize = 100;
const EMBED_BASE_URL: &str = "https://open.spotify.com/embed/playlist";
const PLAYLIST_BASE_URL: &str = "https://open.spotify.com/playlist";

/// Name given to the playlist created for a recipe.
///
/// # Example
///
/// ```
/// assert_eq!(playlist_name(" Carne Asada "), "FlavorMatch: Carne Asada");
/// ```
pub fn playlist_name(recipe_title: &str) -> String {
    format!("FlavorMatch: {}", recipe_title.trim())
}

/// Builds playlists on Spotify: create, populate, then wait for the embed
/// preview to catch up.
///
/// Spotify's embeddable preview is eventually consistent with the playlist
/// itself, so a playlist that exists and has tracks may not render inline
/// yet. Readiness is polled through the oEmbed endpoint with a fixed number
/// of attempts at a fixed interval.
pub struct PlaylistAssembler {
    tokens: Arc<TokenLifecycleManager>,
    poll: EmbedPollConfig,
}

impl PlaylistAssembler {
    pub fn new(tokens: Arc<TokenLifecycleManager>, poll: EmbedPollConfig) -> Self {
        Self { tokens, poll }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = Url::parse(&self.tokens.config().api_url).map_err(|e| e.to_string())?;
        url.path_segments_mut()
            .map_err(|_| "api url cannot take a path".to_string())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Creates a private playlist named after the recipe.
    ///
    /// The provider must answer with a playlist id; a success status without
    /// one is a [`PlaylistError::Create`].
    ///
    /// # Arguments
    ///
    /// * `auth` - A user authorization; app tokens cannot own playlists
    /// * `user_id` - Spotify id of the owning user
    /// * `recipe_title` - Used for the playlist name and description
    ///
    /// # Returns
    ///
    /// A [`PlaylistRef`] with the id, the name, the public URL and the embed
    /// URL of the new playlist.
    ///
    /// # Errors
    ///
    /// - [`PlaylistError::Create`] on a non-success status, a transport failure
    ///   or a response without an id
    /// - [`PlaylistError::Auth`] when the credential cannot be renewed
    ///
    /// # Example
    ///
    /// ```
    /// let playlist = assembler
    ///     .create_playlist(&mut auth, "chef", "Carne Asada")
    ///     .await?;
    /// println!("{}", playlist.embed_url);
    /// ```
    pub async fn create_playlist(
        &self,
        auth: &mut Authorization,
        user_id: &str,
        recipe_title: &str,
    ) -> Result<PlaylistRef, PlaylistError> {
        let url = self
            .endpoint(&["users", user_id, "playlists"])
            .map_err(PlaylistError::Create)?;
        let body = CreatePlaylistRequest {
            name: playlist_name(recipe_title),
            description: format!("Music to cook {} by.", recipe_title.trim()),
            public: false,
        };

        let response = self
            .tokens
            .call_with_auth(auth, |client, token| {
                client.post(url.clone()).bearer_auth(token).json(&body)
            })
            .await
            .map_err(|e| request_failed(e, PlaylistError::Create))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlaylistError::Create(format!("provider answered {status}")));
        }
        let json: Value = response
            .json()
            .await
            .map_err(|e| PlaylistError::Create(e.to_string()))?;

        let id = json["id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PlaylistError::Create("response carried no playlist id".to_string()))?
            .to_string();

        tracing::info!(playlist = %id, "playlist created");
        Ok(PlaylistRef {
            name: json["name"]
                .as_str()
                .map(str::to_string)
                .unwrap_or(body.name),
            external_url: json["external_urls"]["spotify"]
                .as_str()
                .map(str::to_string)
                .or_else(|| Some(format!("{PLAYLIST_BASE_URL}/{id}"))),
            embed_url: format!("{EMBED_BASE_URL}/{id}"),
            id,
        })
    }

    /// Adds tracks in order, in chunks of 100. The first rejected chunk fails
    /// the whole call; nothing is rolled back on the provider side.
    ///
    /// # Arguments
    ///
    /// * `auth` - A user authorization allowed to modify the playlist
    /// * `playlist_id` - Id returned by [`create_playlist`](Self::create_playlist)
    /// * `track_uris` - `spotify:track:...` URIs, added in the given order
    ///
    /// # Returns
    ///
    /// The number of URIs sent. An empty list sends nothing and returns 0.
    ///
    /// # Errors
    ///
    /// - [`PlaylistError::TrackAdd`] on the first rejected chunk or transport
    ///   failure; later chunks are not sent
    /// - [`PlaylistError::Auth`] when the credential cannot be renewed
    pub async fn add_tracks(
        &self,
        auth: &mut Authorization,
        playlist_id: &str,
        track_uris: &[String],
    ) -> Result<usize, PlaylistError> {
        if track_uris.is_empty() {
            return Ok(0);
        }
        let url = self
            .endpoint(&["playlists", playlist_id, "tracks"])
            .map_err(PlaylistError::TrackAdd)?;

        for chunk in track_uris.chunks(TRACKS_PER_REQUEST) {
            let body = AddTrackToPlaylistRequest {
                uris: chunk.to_vec(),
            };
            let response = self
                .tokens
                .call_with_auth(auth, |client, token| {
                    client.post(url.clone()).bearer_auth(token).json(&body)
                })
                .await
                .map_err(|e| request_failed(e, PlaylistError::TrackAdd))?;

            let status = response.status();
            if !status.is_success() {
                return Err(PlaylistError::TrackAdd(format!(
                    "provider answered {status}"
                )));
            }
        }

        tracing::info!(playlist = %playlist_id, count = track_uris.len(), "tracks added");
        Ok(track_uris.len())
    }

    /// Polls until the playlist's embed metadata exists.
    ///
    /// At most `max_attempts` requests with `interval` between them; each one is
    /// bounded by the HTTP client's timeout. Returns `false` when attempts run
    /// out and never fails: the caller decides whether to embed anyway.
    ///
    /// # Arguments
    ///
    /// * `playlist_id` - Playlist to check
    /// * `max_attempts` - Upper bound on oEmbed requests
    /// * `interval` - Pause between two requests; there is none after the last
    ///
    /// # Example
    ///
    /// ```
    /// let ready = assembler
    ///     .wait_for_embed_ready(&playlist.id, 5, Duration::from_secs(1))
    ///     .await;
    /// ```
    pub async fn wait_for_embed_ready(
        &self,
        playlist_id: &str,
        max_attempts: u32,
        interval: Duration,
    ) -> bool {
        let playlist_url = format!("{PLAYLIST_BASE_URL}/{playlist_id}");

        for attempt in 1..=max_attempts {
            if self.embed_ready(&playlist_url).await {
                tracing::debug!(playlist = %playlist_id, attempt, "embed ready");
                return true;
            }
            if attempt < max_attempts {
                sleep(interval).await;
            }
        }

        tracing::info!(playlist = %playlist_id, max_attempts, "embed still preparing");
        false
    }

    async fn embed_ready(&self, playlist_url: &str) -> bool {
        let response = self
            .tokens
            .http()
            .get(&self.tokens.config().oembed_url)
            .query(&[("url", playlist_url)])
            .send()
            .await;

        let Ok(response) = response else {
            return false;
        };
        if !response.status().is_success() {
            return false;
        }
        response
            .json::<Value>()
            .await
            .map(|json| json["html"].as_str().is_some_and(|html| !html.is_empty()))
            .unwrap_or(false)
    }

    /// Create, populate, then wait for the embed, strictly in that order.
    ///
    /// An embed that is still preparing when polling stops does not fail the
    /// call; `embed_ready` is reported as `false` instead. Polling uses the
    /// configured attempt count and interval.
    ///
    /// # Errors
    ///
    /// Any error of [`create_playlist`](Self::create_playlist) or
    /// [`add_tracks`](Self::add_tracks). A failed creation sends no further
    /// requests.
    pub async fn assemble(
        &self,
        auth: &mut Authorization,
        user_id: &str,
        recipe_title: &str,
        track_uris: &[String],
    ) -> Result<AssembledPlaylist, PlaylistError> {
        let playlist = self.create_playlist(auth, user_id, recipe_title).await?;
        let tracks_added = self.add_tracks(auth, &playlist.id, track_uris).await?;
        let embed_ready = self
            .wait_for_embed_ready(&playlist.id, self.poll.max_attempts, self.poll.interval)
            .await;

        Ok(AssembledPlaylist {
            playlist,
            tracks_added,
            embed_ready,
        })
    }
}

/// Transport failures belong to the write that was attempted; credential
/// failures stay auth errors.
fn request_failed(e: AuthError, wrap: fn(String) -> PlaylistError) -> PlaylistError {
    match e {
        AuthError::Http(e) => wrap(e.to_string()),
        other => PlaylistError::Auth(other),
    }
}
