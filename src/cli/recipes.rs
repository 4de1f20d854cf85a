use std::sync::Arc;

use tabled::Table;

use crate::{
    cli::progress::spinner,
    clock::SystemClock,
    config::Config,
    error, genre, info,
    orchestrator::RecipeQuery,
    server::AppState,
    success, utils, warning,
};

fn app_state() -> AppState {
    match AppState::from_config(Config::from_env(), Arc::new(SystemClock)) {
        Ok(state) => state,
        Err(e) => error!("Cannot set up services. Err: {}", e),
    }
}

pub async fn search(query: String, cuisine: Option<String>) {
    let state = app_state();
    if !state.lookup.has_provider() {
        warning!("SPOONACULAR_API_KEY is not set, searching the built-in recipes only");
    }

    let pb = spinner("Searching recipes...");
    let recipes = state.lookup.search(&query, cuisine.as_deref()).await;
    pb.finish_and_clear();

    if recipes.is_empty() {
        warning!("No recipes found for '{}'", query);
        return;
    }
    if !state.lookup.breaker().state().healthy {
        info!("Recipe provider unavailable, showing built-in recipes");
    }
    println!("{}", Table::new(utils::recipe_table_rows(&recipes)));
}

pub fn genre(cuisine: String) {
    println!("{}", genre::map_cuisine_to_genre(&cuisine));
}

pub async fn pair(query: String, limit: usize) {
    let state = app_state();

    let pb = spinner("Pairing recipe with music...");
    let result = state
        .orchestrator
        .build_recipe_with_music(&RecipeQuery::search(query), None)
        .await;
    pb.finish_and_clear();

    let result = match result {
        Ok(result) => result,
        Err(e) => error!("Cannot pair recipe. Err: {}", e),
    };

    success!(
        "{} ({}) pairs with {}",
        result.recipe.title,
        result.recipe.cuisine,
        result.genre
    );
    if let Some(reason) = &result.music_error {
        warning!("No tracks: {}", reason);
        return;
    }
    if let Some(track) = &result.recommended_track {
        info!("Try: {} by {}", track.name, track.artists.join(", "));
    }

    let tracks: Vec<_> = result.tracks.into_iter().take(limit).collect();
    println!("{}", Table::new(utils::track_table_rows(&tracks)));
}
