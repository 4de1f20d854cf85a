//! # Recipes Module
//!
//! Recipe discovery with graceful degradation. The primary provider
//! (Spoonacular) is reached through a circuit breaker; whenever it is
//! unavailable, unconfigured, or fails mid-call, answers come from a small
//! static fallback set so callers never end up without a result.
//!
//! ```text
//! RecipeLookup
//!     ├── ProviderAvailability (breaker, shared across requests)
//!     ├── RecipeProvider (Spoonacular over reqwest)
//!     └── FallbackSet (built-in recipes)
//! ```

mod breaker;
mod fallback;
mod lookup;
mod provider;

pub use breaker::{AvailabilityState, BreakerPhase, ProviderAvailability};
pub use fallback::{FallbackSet, builtin_recipes};
pub use lookup::{AUTOCOMPLETE_LIMIT, BROWSE_PAGE_SIZE, RecipeLookup};
pub use provider::{RecipeProvider, SpoonacularClient};
