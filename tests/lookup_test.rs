mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::{TimeDelta, TimeZone, Utc};
use common::Hits;
use flavormatch::{
    clock::{Clock, ManualClock, SystemClock},
    error::{LookupError, ProviderError},
    genre::map_cuisine_to_genre,
    recipes::{
        BreakerPhase, FallbackSet, ProviderAvailability, RecipeLookup, RecipeProvider,
        SpoonacularClient, builtin_recipes,
    },
    types::{Recipe, RecipeSummary},
    utils,
};
use serde_json::{Value, json};

/// Provider that counts calls and either fails or answers with fixed data.
struct CountingProvider {
    calls: AtomicUsize,
    fail: bool,
    recipes: Vec<Recipe>,
}

impl CountingProvider {
    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
            recipes: vec![],
        })
    }

    fn with(recipes: Vec<Recipe>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            recipes,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer<T>(&self, value: T) -> Result<T, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(ProviderError::Status(StatusCode::INTERNAL_SERVER_ERROR))
        } else {
            Ok(value)
        }
    }
}

#[async_trait]
impl RecipeProvider for CountingProvider {
    async fn search(
        &self,
        _query: &str,
        _cuisine: Option<&str>,
        number: usize,
    ) -> Result<Vec<Recipe>, ProviderError> {
        self.answer(self.recipes.iter().take(number).cloned().collect())
    }

    async fn information(&self, id: u64) -> Result<Option<Recipe>, ProviderError> {
        self.answer(self.recipes.iter().find(|r| r.id == id).cloned())
    }

    async fn autocomplete(
        &self,
        _prefix: &str,
        number: usize,
    ) -> Result<Vec<RecipeSummary>, ProviderError> {
        self.answer(
            self.recipes
                .iter()
                .take(number)
                .map(|r| RecipeSummary {
                    id: r.id,
                    title: r.title.clone(),
                })
                .collect(),
        )
    }
}

fn provider_recipe(id: u64, title: &str, cuisine: &str) -> Recipe {
    Recipe {
        id,
        title: title.to_string(),
        image: String::new(),
        summary: String::new(),
        ingredients: vec!["1 tortilla".to_string()],
        instructions: String::new(),
        cuisine: cuisine.to_string(),
        ready_in_minutes: Some(20),
        servings: Some(2),
    }
}

fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ))
}

fn lookup_with(
    provider: Option<Arc<dyn RecipeProvider>>,
    clock: Arc<dyn Clock>,
) -> (RecipeLookup, Arc<ProviderAvailability>) {
    let breaker = Arc::new(ProviderAvailability::new(
        "test",
        Duration::from_secs(300),
        clock,
    ));
    let lookup = RecipeLookup::new(provider, Arc::clone(&breaker), FallbackSet::default());
    (lookup, breaker)
}

fn fallback_titles() -> Vec<String> {
    builtin_recipes().into_iter().map(|r| r.title).collect()
}

#[tokio::test]
async fn test_open_breaker_never_calls_provider() {
    let provider = CountingProvider::with(vec![provider_recipe(42, "Tacos", "mexican")]);
    let (lookup, breaker) = lookup_with(Some(provider.clone() as Arc<dyn RecipeProvider>), manual_clock());
    breaker.record_failure();

    let titles = fallback_titles();
    for query in ["carne", "sushi", "", "nothing-like-this", "a"] {
        let found = lookup.search(query, None).await;
        assert!(found.iter().all(|r| titles.contains(&r.title)));
    }
    assert!(lookup.autocomplete("sp").await.iter().all(|s| s.id <= 5));
    assert!(matches!(
        lookup.get_by_id("42").await,
        Err(LookupError::NotFound(_))
    ));

    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_failing_provider_falls_back_and_trips_breaker() {
    let provider = CountingProvider::failing();
    let (lookup, breaker) = lookup_with(Some(provider.clone() as Arc<dyn RecipeProvider>), manual_clock());

    let found = lookup.search("carne asada", None).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Carne Asada");
    assert_eq!(found[0].cuisine, "mexican");
    assert_eq!(map_cuisine_to_genre(&found[0].cuisine), "latin");

    assert_eq!(provider.calls(), 1);
    assert_eq!(breaker.state().phase, BreakerPhase::Open);

    // Further calls stay local until the cooldown passes
    lookup.search("carne asada", None).await;
    lookup.autocomplete("car").await;
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_provider_is_retried_after_cooldown() {
    let clock = manual_clock();
    let provider = CountingProvider::failing();
    let (lookup, breaker) = lookup_with(Some(provider.clone() as Arc<dyn RecipeProvider>), clock.clone());

    lookup.search("sushi", None).await;
    assert_eq!(provider.calls(), 1);

    clock.advance(TimeDelta::seconds(301));
    let found = lookup.search("sushi", None).await;
    assert_eq!(found[0].title, "Sushi Rolls");
    assert_eq!(provider.calls(), 2);
    assert_eq!(breaker.state().phase, BreakerPhase::Open);
}

#[tokio::test]
async fn test_healthy_provider_answers() {
    let provider = CountingProvider::with(vec![provider_recipe(42, "Tacos al Pastor", "mexican")]);
    let (lookup, breaker) = lookup_with(Some(provider.clone() as Arc<dyn RecipeProvider>), manual_clock());

    let found = lookup.search("tacos", Some("mexican")).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 42);
    assert!(breaker.state().healthy);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_empty_query_returns_browse_page() {
    let (lookup, _) = lookup_with(None, manual_clock());

    let all = lookup.search("", None).await;
    assert_eq!(all.len(), 5);

    let italian = lookup.search("   ", Some("Italian")).await;
    assert_eq!(italian.len(), 1);
    assert_eq!(italian[0].title, "Spaghetti Carbonara");
}

#[tokio::test]
async fn test_cuisine_filter_must_match() {
    let (lookup, _) = lookup_with(None, manual_clock());

    assert_eq!(lookup.search("carne", Some("mexican")).await.len(), 1);
    assert!(lookup.search("carne", Some("italian")).await.is_empty());
}

#[tokio::test]
async fn test_get_by_id_prefers_fallback() {
    let provider = CountingProvider::with(vec![provider_recipe(42, "Tacos", "mexican")]);
    let (lookup, _) = lookup_with(Some(provider.clone() as Arc<dyn RecipeProvider>), manual_clock());

    let recipe = lookup.get_by_id("1").await.unwrap();
    assert_eq!(recipe.title, "Carne Asada");
    assert_eq!(provider.calls(), 0);

    let recipe = lookup.get_by_id("42").await.unwrap();
    assert_eq!(recipe.title, "Tacos");
    assert_eq!(provider.calls(), 1);

    assert!(matches!(
        lookup.get_by_id("777").await,
        Err(LookupError::NotFound(id)) if id == "777"
    ));
    assert!(matches!(
        lookup.get_by_id("not-a-number").await,
        Err(LookupError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_autocomplete_from_fallback() {
    let (lookup, _) = lookup_with(None, manual_clock());

    let suggestions = lookup.autocomplete("SP").await;
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].title, "Spaghetti Carbonara");
    assert!(lookup.autocomplete("").await.is_empty());
}

async fn failing_search(State(hits): State<Hits>) -> StatusCode {
    hits.hit();
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn good_search(State(hits): State<Hits>) -> Json<Value> {
    hits.hit();
    Json(json!({
        "results": [{
            "id": 715538,
            "title": "Bruschetta",
            "image": "https://img.example/715538.jpg",
            "cuisines": ["Italian", "Mediterranean"],
            "readyInMinutes": 35,
            "servings": 6,
            "extendedIngredients": [{ "original": "4 tomatoes", "name": "tomato" }]
        }]
    }))
}

#[tokio::test]
async fn test_spoonacular_error_trips_breaker() {
    let hits = Hits::default();
    let base = common::serve(
        Router::new()
            .route("/recipes/complexSearch", get(failing_search))
            .with_state(hits.clone()),
    )
    .await;

    let client = utils::http_client(Duration::from_secs(5)).unwrap();
    let provider = Arc::new(SpoonacularClient::new(client, base, "key"));
    let (lookup, breaker) = lookup_with(Some(provider as Arc<dyn RecipeProvider>), Arc::new(SystemClock));

    let found = lookup.search("carne asada", None).await;
    assert_eq!(found[0].title, "Carne Asada");
    assert_eq!(hits.count(), 1);
    assert!(!breaker.state().healthy);

    lookup.search("carne asada", None).await;
    assert_eq!(hits.count(), 1);
}

#[tokio::test]
async fn test_spoonacular_results_are_mapped() {
    let hits = Hits::default();
    let base = common::serve(
        Router::new()
            .route("/recipes/complexSearch", get(good_search))
            .with_state(hits.clone()),
    )
    .await;

    let client = utils::http_client(Duration::from_secs(5)).unwrap();
    let provider = Arc::new(SpoonacularClient::new(client, base, "key"));
    let (lookup, breaker) = lookup_with(Some(provider as Arc<dyn RecipeProvider>), Arc::new(SystemClock));

    let found = lookup.search("bruschetta", None).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 715538);
    assert_eq!(found[0].cuisine, "italian");
    assert_eq!(found[0].ingredients, vec!["4 tomatoes".to_string()]);
    assert_eq!(found[0].ready_in_minutes, Some(35));
    assert!(breaker.state().healthy);
    assert_eq!(hits.count(), 1);
}

#[tokio::test]
async fn test_unreachable_provider_falls_back() {
    let client = utils::http_client(Duration::from_secs(2)).unwrap();
    // Port 9 (discard) is not listening on loopback
    let provider = Arc::new(SpoonacularClient::new(client, "http://127.0.0.1:9", "key"));
    let (lookup, breaker) = lookup_with(Some(provider as Arc<dyn RecipeProvider>), Arc::new(SystemClock));

    let found = lookup.search("crêpes", None).await;
    assert_eq!(found[0].title, "Crêpes Suzette");
    assert!(!breaker.state().healthy);
}

/// Provider that answers with an error only after a delay.
struct SlowFailingProvider {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowFailingProvider {
    async fn fail_later<T>(&self) -> Result<T, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Err(ProviderError::Status(StatusCode::BAD_GATEWAY))
    }
}

#[async_trait]
impl RecipeProvider for SlowFailingProvider {
    async fn search(
        &self,
        _query: &str,
        _cuisine: Option<&str>,
        _number: usize,
    ) -> Result<Vec<Recipe>, ProviderError> {
        self.fail_later().await
    }

    async fn information(&self, _id: u64) -> Result<Option<Recipe>, ProviderError> {
        self.fail_later().await
    }

    async fn autocomplete(
        &self,
        _prefix: &str,
        _number: usize,
    ) -> Result<Vec<RecipeSummary>, ProviderError> {
        self.fail_later().await
    }
}

#[tokio::test]
async fn test_abandoned_search_still_trips_breaker() {
    let provider = Arc::new(SlowFailingProvider {
        delay: Duration::from_millis(150),
        calls: AtomicUsize::new(0),
    });
    let (lookup, breaker) = lookup_with(
        Some(provider.clone() as Arc<dyn RecipeProvider>),
        manual_clock(),
    );

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        lookup.search("carne asada", None),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(breaker.state().phase, BreakerPhase::Closed);

    // The provider call keeps running and reports its failure
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(breaker.state().phase, BreakerPhase::Open);
    assert!(!breaker.state().healthy);

    lookup.search("carne asada", None).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}
