//! Error types for the FlavorMatch backend.
//!
//! Each component returns its own error enum so the orchestrator and the HTTP
//! layer can decide, per error kind, whether to degrade or fail.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the primary recipe provider.
///
/// Always recorded against the breaker; callers fall back to local data.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("recipe provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("recipe provider answered {0}")]
    Status(StatusCode),

    #[error("recipe provider task aborted: {0}")]
    Task(String),
}

/// Recipe lookup failures surfaced to callers.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("recipe {0} not found")]
    NotFound(String),
}

/// Credential and token-lifecycle failures.
#[derive(Error, Debug)]
pub enum AuthError {
    /// A required key is absent; the music feature runs degraded.
    #[error("music provider is not configured: {0} missing")]
    ConfigMissing(&'static str),

    /// The one-shot authorization-code exchange failed.
    #[error("authorization code exchange failed: {0}")]
    Exchange(String),

    /// The credential could not be renewed; the user must log in again.
    #[error("music provider credential expired: {0}")]
    Expired(String),

    /// The token endpoint refused the grant or answered without a token.
    #[error("token endpoint rejected the request: {0}")]
    Rejected(String),

    #[error("music provider request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures on read calls to the music provider (search, profile).
#[derive(Error, Debug)]
pub enum MusicError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("music provider answered {0}")]
    Status(StatusCode),

    #[error("music provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected music provider response: {0}")]
    Decode(String),
}

/// Failures while writing a playlist.
#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("playlist creation failed: {0}")]
    Create(String),

    #[error("adding tracks failed: {0}")]
    TrackAdd(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Failures that stop the recipe-with-music composition entirely.
///
/// Music-side errors never end up here; they degrade into a recipe without
/// music.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("either a query or a recipe id is required")]
    EmptyQuery,
}
