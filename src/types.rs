use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// A recipe in the shape the UI consumes, whichever source it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: u64,
    pub title: String,
    pub image: String,
    pub summary: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub cuisine: String,
    pub ready_in_minutes: Option<u32>,
    pub servings: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: u64,
    pub title: String,
}

#[derive(Tabled)]
pub struct RecipeTableRow {
    pub id: u64,
    pub title: String,
    pub cuisine: String,
    pub minutes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub uri: String,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub name: String,
    pub artists: String,
}

/// Local handle on a playlist that lives on the music provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRef {
    pub id: String,
    pub name: String,
    pub external_url: Option<String>,
    pub embed_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledPlaylist {
    pub playlist: PlaylistRef,
    pub tracks_added: usize,
    /// False when the embed preview was still being prepared when polling stopped.
    pub embed_ready: bool,
}

/// An OAuth access token with its renewal material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
}

/// Lifecycle of a single credential slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialState {
    Unset,
    Valid,
    Expired,
}

impl Credential {
    /// Lifetime assumed when the provider does not declare one.
    pub const DEFAULT_LIFETIME_SECS: i64 = 3600;

    /// Wraps a bare bearer token handed to us by the UI.
    pub fn bearer(access_token: String, now: DateTime<Utc>) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at: now + Duration::seconds(Self::DEFAULT_LIFETIME_SECS),
            scope: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn state(credential: Option<&Credential>, now: DateTime<Utc>) -> CredentialState {
        match credential {
            None => CredentialState::Unset,
            Some(c) if c.is_expired(now) => CredentialState::Expired,
            Some(_) => CredentialState::Valid,
        }
    }
}

/// Token endpoint response for every grant type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
}

/// Login started by `/login` and waiting for its `/callback`.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub code_verifier: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    pub public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchTracksResponse {
    pub tracks: TrackPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackPage {
    pub items: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

impl From<SpotifyTrack> for Track {
    fn from(t: SpotifyTrack) -> Self {
        Track {
            id: t.id,
            name: t.name,
            artists: t.artists.into_iter().map(|a| a.name).collect(),
            uri: t.uri,
        }
    }
}

// HTTP request and response bodies

#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub cuisine: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdParams {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutocompleteParams {
    pub query: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationsRequest {
    pub cuisine: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub genre: String,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistBody {
    pub user_id: String,
    pub recipe_title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTracksBody {
    pub playlist_id: String,
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblePlaylistBody {
    pub user_id: Option<String>,
    pub recipe_title: String,
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshBody {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub ingredients: Vec<String>,
    pub recipes: Vec<Recipe>,
    pub bot_response: String,
}
