//! # CLI Module
//!
//! This module provides the command-line interface for FlavorMatch. It runs
//! the HTTP backend and offers quick terminal access to the same services the
//! UI uses.
//!
//! ## Command Categories
//!
//! ### Server
//!
//! - [`serve`] - Starts the HTTP backend with tracing enabled
//!
//! ### Recipes and Music
//!
//! - [`search`] - Searches recipes, falling back to the built-in set
//! - [`genre`] - Prints the music genre for a cuisine
//! - [`pair`] - Finds a recipe and the tracks that go with it
//!
//! ### Authentication
//!
//! - [`login`] - Opens the running server's login page in a browser
//!
//! ## Output
//!
//! Commands print through the crate's coloured macros (`info!`, `success!`,
//! `warning!`, `error!`) and render lists with `tabled`. Network work shows an
//! `indicatif` spinner. `error!` ends the process, so it is only used when the
//! command cannot produce anything useful.
//!
//! ## Usage Patterns
//!
//! ```bash
//! flavormatch serve --addr 0.0.0.0:5001
//! flavormatch search "carbonara" --cuisine italian
//! flavormatch genre mexican
//! flavormatch pair "carne asada" --limit 5
//! flavormatch login
//! ```
//!
//! ## Dependencies
//!
//! - [`crate::server`] - Service wiring shared with the HTTP backend
//! - [`crate::orchestrator`] - Recipe plus music composition
//! - [`crate::genre`] - Cuisine to genre mapping

mod auth;
mod progress;
mod recipes;
mod serve;

pub use auth::login;
pub use recipes::genre;
pub use recipes::pair;
pub use recipes::search;
pub use serve::serve;
