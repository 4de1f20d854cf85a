//! # Spotify Integration Module
//!
//! This module is the integration layer between FlavorMatch and the Spotify Web
//! API. It owns credential lifecycles, catalogue reads and playlist writes, and
//! keeps HTTP details away from the orchestrator and the HTTP handlers.
//!
//! ## Architecture
//!
//! ```text
//! Orchestrator / HTTP handlers
//!          ↓
//! Spotify Integration Layer
//!     ├── Token lifecycle (user + app credentials)
//!     ├── Music catalogue (genre search, profile)
//!     └── Playlist assembly (create, populate, embed readiness)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Core Modules
//!
//! ### Token Lifecycle Module
//!
//! [`auth`] - Obtains and renews credentials:
//! - **Authorization Code with PKCE**: Browser login with a one-time `state`
//! - **Refresh Grant**: Renews user credentials; a rotated refresh token is kept
//! - **Client Credentials**: Cached app token for anonymous catalogue reads
//! - **Bounded Retry**: One renewal and one re-send per outbound call on a 401
//!
//! ### Catalogue Module
//!
//! [`tracks`] - Read-only calls:
//! - **Genre Search**: `GET /search?q=genre:"<genre>"&type=track`
//! - **Recommendations**: Cuisine to genre to tracks
//! - **Profile**: `GET /me` for the logged-in user
//!
//! ### Playlist Module
//!
//! [`playlist`] - Playlist writes:
//! - **Creation**: Private playlist named `FlavorMatch: <recipe title>`
//! - **Track Addition**: Ordered, in requests of at most 100 URIs
//! - **Embed Readiness**: Bounded polling of the oEmbed endpoint
//!
//! ## Error Handling
//!
//! Every call returns a typed error from [`crate::error`]:
//! - **`AuthError`** - Missing configuration, failed exchange, expired credential
//! - **`MusicError`** - Non-success status or undecodable body on reads
//! - **`PlaylistError`** - Creation or track addition failed
//!
//! Callers decide whether a failure degrades the response or fails it.
//!
//! ## Usage Patterns
//!
//! ```rust
//! let mut auth = tokens
//!     .user_authorization(Some(&session), None)
//!     .await
//!     .unwrap_or(Authorization::App);
//! let (genre, tracks) = catalog.recommendations(&mut auth, "mexican").await?;
//! ```
//!
//! ## Thread Safety
//!
//! The token manager, catalogue and assembler are shared behind `Arc` by the
//! application state. The app credential cache is guarded by an async mutex;
//! per-call user credentials travel in the caller's [`auth::Authorization`].

pub mod auth;
pub mod playlist;
pub mod tracks;

pub use auth::{Authorization, LoginRedirect, TokenLifecycleManager};
pub use playlist::PlaylistAssembler;
pub use tracks::MusicCatalog;
