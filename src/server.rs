use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    Res, api,
    clock::{Clock, SystemClock},
    config::{self, Config},
    extract::{DisabledExtractor, GeminiExtractor, IngredientExtractor},
    management::CredentialStore,
    orchestrator::Orchestrator,
    recipes::{FallbackSet, ProviderAvailability, RecipeLookup, RecipeProvider, SpoonacularClient},
    spotify::{MusicCatalog, PlaylistAssembler, TokenLifecycleManager},
    utils,
};

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub lookup: Arc<RecipeLookup>,
    pub tokens: Arc<TokenLifecycleManager>,
    pub catalog: Arc<MusicCatalog>,
    pub playlists: Arc<PlaylistAssembler>,
    pub orchestrator: Arc<Orchestrator>,
    pub extractor: Arc<dyn IngredientExtractor>,
}

impl AppState {
    /// Wires the services from configuration. Absent keys leave the matching
    /// feature in its degraded mode.
    pub fn from_config(config: Config, clock: Arc<dyn Clock>) -> Res<Self> {
        let client = utils::http_client(config.http_timeout)?;

        let provider = config.recipes.api_key.clone().map(|key| {
            Arc::new(SpoonacularClient::new(
                client.clone(),
                config.recipes.api_url.clone(),
                key,
            )) as Arc<dyn RecipeProvider>
        });

        let extractor: Arc<dyn IngredientExtractor> = match config.gemini_api_key.clone() {
            Some(key) => Arc::new(GeminiExtractor::new(
                client.clone(),
                config.gemini_api_url.clone(),
                key,
            )),
            None => Arc::new(DisabledExtractor),
        };

        Self::new(config, clock, client, provider, extractor)
    }

    /// Wires the services around an explicit recipe provider and extractor.
    pub fn new(
        config: Config,
        clock: Arc<dyn Clock>,
        client: reqwest::Client,
        provider: Option<Arc<dyn RecipeProvider>>,
        extractor: Arc<dyn IngredientExtractor>,
    ) -> Res<Self> {
        let breaker = Arc::new(ProviderAvailability::new(
            "spoonacular",
            config.recipes.cooldown,
            Arc::clone(&clock),
        ));
        let lookup = Arc::new(RecipeLookup::new(provider, breaker, FallbackSet::default()));

        let sessions = Arc::new(if config.persist_sessions {
            CredentialStore::persistent(config::data_dir().join("sessions"))
        } else {
            CredentialStore::in_memory()
        });
        let tokens = Arc::new(TokenLifecycleManager::new(
            config.spotify.clone(),
            client,
            clock,
            sessions,
        ));
        let catalog = Arc::new(MusicCatalog::new(Arc::clone(&tokens)));
        let playlists = Arc::new(PlaylistAssembler::new(
            Arc::clone(&tokens),
            config.embed_poll,
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&lookup),
            Arc::clone(&catalog),
            Arc::clone(&playlists),
            Arc::clone(&tokens),
        ));

        Ok(Self {
            config: Arc::new(config),
            lookup,
            tokens,
            catalog,
            playlists,
            orchestrator,
            extractor,
        })
    }
}

/// The full HTTP surface.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/login", get(api::login))
        .route("/callback", get(api::callback))
        .route("/refresh", post(api::refresh))
        .route("/me", get(api::me))
        .route("/api/recipes", get(api::search_recipes))
        .route("/api/recipeInfo", get(api::recipe_info))
        .route("/api/autocomplete", get(api::autocomplete))
        .route("/api/chat-ingredients", post(api::chat_ingredients))
        .route("/api/recommendations", post(api::recommendations))
        .route("/api/pair/{cuisine}", get(api::pair))
        .route("/api/createPlaylist", post(api::create_playlist))
        .route("/api/addTracks", post(api::add_tracks))
        .route("/api/playlist", post(api::assemble_playlist))
        .route("/api/recipe-with-music", post(api::recipe_with_music))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until the process ends.
pub async fn start_api_server(config: Config) -> Res<()> {
    let missing = config.missing_keys();
    if !missing.is_empty() {
        tracing::warn!(
            missing = ?missing,
            "running degraded: features backed by these keys use fallbacks"
        );
    }

    let addr = config.socket_addr()?;
    let state = AppState::from_config(config, Arc::new(SystemClock))?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "FlavorMatch backend listening");
    axum::serve(listener, app).await?;
    Ok(())
}
