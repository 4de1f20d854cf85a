//! Configuration management for the FlavorMatch backend.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. Third-party credentials are all optional: a missing
//! key switches the affected feature into a degraded mode instead of stopping the
//! process.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. `.env` file in the working directory
//! 4. Application defaults (where applicable)

use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:5001";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_SPOONACULAR_API_URL: &str = "https://api.spoonacular.com";
const DEFAULT_SPOTIFY_SCOPE: &str =
    "playlist-modify-public playlist-modify-private user-read-private";
const DEFAULT_SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_SPOTIFY_OEMBED_URL: &str = "https://open.spotify.com/oembed";
const DEFAULT_GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

/// Loads environment variables from `.env` files.
///
/// Looks for a `.env` file in the platform-specific local data directory under
/// `flavormatch/.env`, then for one in the working directory. Values that are
/// already set in the process environment win over both files. A missing file is
/// not an error: every key has a default or degrades gracefully.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/flavormatch/.env`
/// - macOS: `~/Library/Application Support/flavormatch/.env`
/// - Windows: `%LOCALAPPDATA%/flavormatch/.env`
///
/// # Errors
///
/// Returns an error only if the data directory cannot be created.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if dotenv::from_path(&path).is_err() {
        tracing::debug!(path = %path.display(), "no .env in data directory");
    }
    if dotenv::dotenv().is_err() {
        tracing::debug!("no .env in working directory");
    }
    Ok(())
}

/// Returns the application's local data directory (`<data_local_dir>/flavormatch`).
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("flavormatch");
    path
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    non_empty(key)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Returns the address the HTTP server binds to.
///
/// Reads `SERVER_ADDRESS`, falling back to `127.0.0.1:5001`.
pub fn server_addr() -> String {
    non_empty("SERVER_ADDRESS").unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string())
}

/// Returns the UI origin that `/callback` redirects back to (`FRONTEND_URL`).
pub fn frontend_url() -> String {
    non_empty("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string())
}

/// Returns the Spoonacular API key, if configured.
///
/// Without a key the recipe lookup runs in fallback-only mode.
pub fn spoonacular_api_key() -> Option<String> {
    non_empty("SPOONACULAR_API_KEY")
}

/// Returns the Spoonacular API base URL.
pub fn spoonacular_api_url() -> String {
    non_empty("SPOONACULAR_API_URL").unwrap_or_else(|| DEFAULT_SPOONACULAR_API_URL.to_string())
}

/// Returns the Spotify API client ID for authentication.
///
/// Retrieves the `SPOTIFY_API_AUTH_CLIENT_ID` environment variable which
/// contains the client ID obtained when registering the application with
/// Spotify's developer platform.
pub fn spotify_client_id() -> Option<String> {
    non_empty("SPOTIFY_API_AUTH_CLIENT_ID")
}

/// Returns the Spotify API client secret for authentication.
///
/// Required for the client-credentials grant and used for the
/// authorization-code exchange.
///
/// # Security Note
///
/// The client secret should be kept confidential and never exposed in logs
/// or version control.
pub fn spotify_client_secret() -> Option<String> {
    non_empty("SPOTIFY_API_AUTH_CLIENT_SECRET")
}

/// Returns the Spotify OAuth redirect URI.
///
/// This must match the redirect URI registered in the Spotify application
/// settings and point at this server's `/callback`.
pub fn spotify_redirect_uri() -> Option<String> {
    non_empty("SPOTIFY_API_REDIRECT_URI")
}

/// Returns the Spotify API scope permissions requested at login.
pub fn spotify_scope() -> String {
    non_empty("SPOTIFY_API_AUTH_SCOPE").unwrap_or_else(|| DEFAULT_SPOTIFY_SCOPE.to_string())
}

/// Returns the Spotify OAuth authorization URL.
pub fn spotify_apiauth_url() -> String {
    non_empty("SPOTIFY_API_AUTH_URL").unwrap_or_else(|| DEFAULT_SPOTIFY_AUTH_URL.to_string())
}

/// Returns the Spotify Web API base URL.
pub fn spotify_apiurl() -> String {
    non_empty("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_SPOTIFY_API_URL.to_string())
}

/// Returns the Spotify OAuth token exchange URL.
pub fn spotify_apitoken_url() -> String {
    non_empty("SPOTIFY_API_TOKEN_URL").unwrap_or_else(|| DEFAULT_SPOTIFY_TOKEN_URL.to_string())
}

/// Returns the Spotify oEmbed URL used to check playlist embed readiness.
pub fn spotify_oembed_url() -> String {
    non_empty("SPOTIFY_OEMBED_URL").unwrap_or_else(|| DEFAULT_SPOTIFY_OEMBED_URL.to_string())
}

/// Returns the Gemini API key for ingredient extraction, if configured.
pub fn gemini_api_key() -> Option<String> {
    non_empty("GEMINI_API_KEY")
}

/// Returns the Gemini `generateContent` endpoint.
pub fn gemini_api_url() -> String {
    non_empty("GEMINI_API_URL").unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string())
}

/// Spotify integration settings.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: String,
    pub auth_url: String,
    pub api_url: String,
    pub token_url: String,
    pub oembed_url: String,
}

impl SpotifyConfig {
    pub fn from_env() -> Self {
        Self {
            client_id: spotify_client_id(),
            client_secret: spotify_client_secret(),
            redirect_uri: spotify_redirect_uri(),
            scope: spotify_scope(),
            auth_url: spotify_apiauth_url(),
            api_url: spotify_apiurl(),
            token_url: spotify_apitoken_url(),
            oembed_url: spotify_oembed_url(),
        }
    }

    /// True when both client id and secret are present.
    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

/// Recipe provider settings.
#[derive(Debug, Clone)]
pub struct RecipeProviderConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub cooldown: Duration,
}

/// Polling bounds for playlist embed readiness.
#[derive(Debug, Clone, Copy)]
pub struct EmbedPollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for EmbedPollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_millis(1000),
        }
    }
}

/// Typed application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub frontend_url: String,
    pub recipes: RecipeProviderConfig,
    pub spotify: SpotifyConfig,
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: String,
    pub http_timeout: Duration,
    pub embed_poll: EmbedPollConfig,
    pub persist_sessions: bool,
}

impl Config {
    /// Builds the configuration from the process environment.
    pub fn from_env() -> Self {
        Self {
            server_addr: server_addr(),
            frontend_url: frontend_url(),
            recipes: RecipeProviderConfig {
                api_key: spoonacular_api_key(),
                api_url: spoonacular_api_url(),
                cooldown: Duration::from_secs(parse_or("PROVIDER_COOLDOWN_SECS", 300)),
            },
            spotify: SpotifyConfig::from_env(),
            gemini_api_key: gemini_api_key(),
            gemini_api_url: gemini_api_url(),
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 10)),
            embed_poll: EmbedPollConfig {
                max_attempts: parse_or("EMBED_POLL_ATTEMPTS", 5),
                interval: Duration::from_millis(parse_or("EMBED_POLL_INTERVAL_MS", 1000)),
            },
            persist_sessions: parse_or("SESSION_PERSIST", false),
        }
    }

    /// A configuration with no third-party keys: fallback-only recipes, no music.
    pub fn offline() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDRESS.to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            recipes: RecipeProviderConfig {
                api_key: None,
                api_url: DEFAULT_SPOONACULAR_API_URL.to_string(),
                cooldown: Duration::from_secs(300),
            },
            spotify: SpotifyConfig {
                client_id: None,
                client_secret: None,
                redirect_uri: None,
                scope: DEFAULT_SPOTIFY_SCOPE.to_string(),
                auth_url: DEFAULT_SPOTIFY_AUTH_URL.to_string(),
                api_url: DEFAULT_SPOTIFY_API_URL.to_string(),
                token_url: DEFAULT_SPOTIFY_TOKEN_URL.to_string(),
                oembed_url: DEFAULT_SPOTIFY_OEMBED_URL.to_string(),
            },
            gemini_api_key: None,
            gemini_api_url: DEFAULT_GEMINI_API_URL.to_string(),
            http_timeout: Duration::from_secs(10),
            embed_poll: EmbedPollConfig::default(),
            persist_sessions: false,
        }
    }

    /// Parses the configured server address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        SocketAddr::from_str(&self.server_addr)
    }

    /// Names of the optional keys that are absent.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.recipes.api_key.is_none() {
            missing.push("SPOONACULAR_API_KEY");
        }
        if self.spotify.client_id.is_none() {
            missing.push("SPOTIFY_API_AUTH_CLIENT_ID");
        }
        if self.spotify.client_secret.is_none() {
            missing.push("SPOTIFY_API_AUTH_CLIENT_SECRET");
        }
        if self.spotify.redirect_uri.is_none() {
            missing.push("SPOTIFY_API_REDIRECT_URI");
        }
        if self.gemini_api_key.is_none() {
            missing.push("GEMINI_API_KEY");
        }
        missing
    }
}
