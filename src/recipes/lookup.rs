use std::{future::Future, sync::Arc};

use crate::{
    error::{LookupError, ProviderError},
    recipes::{FallbackSet, ProviderAvailability, RecipeProvider},
    types::{Recipe, RecipeSummary},
};

/// Size of the page returned for an empty search query.
pub const BROWSE_PAGE_SIZE: usize = 10;
/// Maximum number of autocomplete suggestions.
pub const AUTOCOMPLETE_LIMIT: usize = 8;
const SEARCH_PAGE_SIZE: usize = 20;

/// Recipe lookup that always produces a usable answer.
///
/// Calls go to the primary provider while its breaker allows it. Any provider
/// failure is recorded on the breaker and the same call is answered from the
/// fallback set. Without a provider (no API key) every call is served locally.
pub struct RecipeLookup {
    provider: Option<Arc<dyn RecipeProvider>>,
    breaker: Arc<ProviderAvailability>,
    fallback: FallbackSet,
}

impl RecipeLookup {
    pub fn new(
        provider: Option<Arc<dyn RecipeProvider>>,
        breaker: Arc<ProviderAvailability>,
        fallback: FallbackSet,
    ) -> Self {
        Self {
            provider,
            breaker,
            fallback,
        }
    }

    pub fn breaker(&self) -> &Arc<ProviderAvailability> {
        &self.breaker
    }

    pub fn fallback(&self) -> &FallbackSet {
        &self.fallback
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Searches by title, optionally restricted to a cuisine.
    ///
    /// An empty query returns the browse page: at most [`BROWSE_PAGE_SIZE`]
    /// recipes, from the provider when it is up, else from the fallback set.
    pub async fn search(&self, query: &str, cuisine: Option<&str>) -> Vec<Recipe> {
        let query = query.trim();
        let cuisine = cuisine.map(str::trim).filter(|c| !c.is_empty());
        let limit = if query.is_empty() {
            BROWSE_PAGE_SIZE
        } else {
            SEARCH_PAGE_SIZE
        };

        if let Some(provider) = self.live_provider() {
            let q = query.to_string();
            let c = cuisine.map(str::to_string);
            let found = self
                .guarded("search", provider, move |p| async move {
                    p.search(&q, c.as_deref(), limit).await
                })
                .await;
            if let Some(mut recipes) = found {
                recipes.truncate(limit);
                return recipes;
            }
        }

        if query.is_empty() {
            self.fallback.browse(cuisine, BROWSE_PAGE_SIZE)
        } else {
            self.fallback.search(query, cuisine)
        }
    }

    /// Fetches one recipe. The fallback set answers first; the provider is
    /// only asked for ids it does not hold.
    pub async fn get_by_id(&self, id: &str) -> Result<Recipe, LookupError> {
        let not_found = || LookupError::NotFound(id.to_string());
        let numeric: u64 = id.trim().parse().map_err(|_| not_found())?;

        if let Some(recipe) = self.fallback.get(numeric) {
            return Ok(recipe);
        }

        let Some(provider) = self.live_provider() else {
            return Err(not_found());
        };
        self.guarded("information", provider, move |p| async move {
            p.information(numeric).await
        })
        .await
        .flatten()
        .ok_or_else(not_found)
    }

    /// Case-insensitive "starts with" suggestions, at most [`AUTOCOMPLETE_LIMIT`].
    pub async fn autocomplete(&self, prefix: &str) -> Vec<RecipeSummary> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Vec::new();
        }

        if let Some(provider) = self.live_provider() {
            let p_owned = prefix.to_string();
            let found = self
                .guarded("autocomplete", provider, move |p| async move {
                    p.autocomplete(&p_owned, AUTOCOMPLETE_LIMIT).await
                })
                .await;
            if let Some(mut suggestions) = found {
                suggestions.truncate(AUTOCOMPLETE_LIMIT);
                return suggestions;
            }
        }

        self.fallback.autocomplete(prefix, AUTOCOMPLETE_LIMIT)
    }

    fn live_provider(&self) -> Option<Arc<dyn RecipeProvider>> {
        let provider = self.provider.as_ref()?;
        self.breaker
            .is_available()
            .then(|| Arc::clone(provider))
    }

    /// Runs one provider call in its own task and records the outcome on the
    /// breaker there, so an abandoned request still reports what happened.
    async fn guarded<T, F, Fut>(
        &self,
        operation: &'static str,
        provider: Arc<dyn RecipeProvider>,
        call: F,
    ) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn RecipeProvider>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>> + Send + 'static,
    {
        let breaker = Arc::clone(&self.breaker);
        let pending = call(provider);
        let task = tokio::spawn(async move {
            let result = pending.await;
            match &result {
                Ok(_) => breaker.record_success(),
                Err(e) => {
                    tracing::warn!(
                        provider = breaker.provider(),
                        operation,
                        error = %e,
                        "recipe provider failed, serving fallback"
                    );
                    breaker.record_failure();
                }
            }
            result
        });

        match task.await {
            Ok(result) => result.ok(),
            Err(e) => {
                let e = ProviderError::Task(e.to_string());
                tracing::warn!(operation, error = %e, "recipe provider task died");
                self.breaker.record_failure();
                None
            }
        }
    }
}
