//! FlavorMatch backend library
//!
//! This library pairs recipes with music. It looks recipes up from a primary
//! recipe provider (with a static fallback set when that provider is degraded),
//! maps the recipe's cuisine to a music genre, and talks to the Spotify Web API
//! to recommend tracks and assemble playlists.
//!
//! # Modules
//!
//! - `api` - HTTP handlers exposed to the UI
//! - `cli` - Command-line interface implementations
//! - `clock` - Injectable wall clock used by time-dependent components
//! - `config` - Configuration management and environment variables
//! - `error` - Typed error values returned by every component
//! - `extract` - Ingredient extraction from free text and ingredient matching
//! - `genre` - Cuisine to music genre mapping
//! - `logging` - Tracing subscriber setup
//! - `management` - Per-session credential storage
//! - `orchestrator` - Recipe plus music composition
//! - `recipes` - Recipe provider, circuit breaker, fallback data and lookup facade
//! - `server` - Application state and HTTP server
//! - `spotify` - Spotify token lifecycle, track search and playlist assembly
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use flavormatch::{config, server};
//!
//! #[tokio::main]
//! async fn main() -> flavormatch::Res<()> {
//!     config::load_env().await?;
//!     let config = config::Config::from_env();
//!     server::start_api_server(config).await
//! }
//! ```

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod extract;
pub mod genre;
pub mod logging;
pub mod management;
pub mod orchestrator;
pub mod recipes;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used by bootstrap code (loading configuration, building the application
/// state, binding the server) where any error is reported and ends the
/// process. Components return their own typed errors from [`error`].
///
/// # Type Parameters
///
/// - `T` - The success type returned on successful operations
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// Used by the command line for general information and status updates.
/// Service code logs through `tracing` instead.
///
/// # Example
///
/// ```
/// info!("Looking up {}...", query);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Playlist {} created", id);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for fatal command-line failures where recovery is not possible.
/// Never used inside the services, which return typed errors instead.
///
/// # Example
///
/// ```
/// error!("Failed to bind {}", addr);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```
/// warning!("No music provider configured, skipping tracks");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
