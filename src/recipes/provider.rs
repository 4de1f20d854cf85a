use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::ProviderError,
    types::{Recipe, RecipeSummary},
};

/// The primary recipe source.
///
/// Implementations only report what happened; breaker bookkeeping and
/// fallback are the lookup facade's job.
#[async_trait]
pub trait RecipeProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        cuisine: Option<&str>,
        number: usize,
    ) -> Result<Vec<Recipe>, ProviderError>;

    /// `Ok(None)` when the provider does not know the id.
    async fn information(&self, id: u64) -> Result<Option<Recipe>, ProviderError>;

    async fn autocomplete(
        &self,
        prefix: &str,
        number: usize,
    ) -> Result<Vec<RecipeSummary>, ProviderError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpoonacularRecipe {
    id: u64,
    title: String,
    image: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    extended_ingredients: Option<Vec<SpoonacularIngredient>>,
    instructions: Option<String>,
    #[serde(default)]
    cuisines: Option<Vec<String>>,
    ready_in_minutes: Option<u32>,
    servings: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SpoonacularIngredient {
    original: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ComplexSearchResponse {
    results: Vec<SpoonacularRecipe>,
}

#[derive(Debug, Deserialize)]
struct AutocompleteItem {
    id: u64,
    title: String,
}

impl From<SpoonacularRecipe> for Recipe {
    fn from(r: SpoonacularRecipe) -> Self {
        let ingredients = r
            .extended_ingredients
            .unwrap_or_default()
            .into_iter()
            .filter_map(|i| i.original.or(i.name))
            .collect();
        let cuisine = r
            .cuisines
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|c| c.to_lowercase())
            .unwrap_or_default();

        Recipe {
            id: r.id,
            title: r.title,
            image: r.image.unwrap_or_default(),
            summary: r.summary.unwrap_or_default(),
            ingredients,
            instructions: r.instructions.unwrap_or_default(),
            cuisine,
            ready_in_minutes: r.ready_in_minutes,
            servings: r.servings,
        }
    }
}

/// Spoonacular Food API client.
pub struct SpoonacularClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SpoonacularClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<T>().await?)),
            status => Err(ProviderError::Status(status)),
        }
    }
}

#[async_trait]
impl RecipeProvider for SpoonacularClient {
    async fn search(
        &self,
        query: &str,
        cuisine: Option<&str>,
        number: usize,
    ) -> Result<Vec<Recipe>, ProviderError> {
        let mut params = vec![
            ("number", number.to_string()),
            ("addRecipeInformation", "true".to_string()),
            ("fillIngredients", "true".to_string()),
        ];
        if !query.trim().is_empty() {
            params.push(("query", query.trim().to_string()));
        }
        if let Some(cuisine) = cuisine.filter(|c| !c.trim().is_empty()) {
            params.push(("cuisine", cuisine.trim().to_string()));
        }

        let response: Option<ComplexSearchResponse> =
            self.get("/recipes/complexSearch", &params).await?;
        // complexSearch never legitimately 404s
        let response = response.ok_or(ProviderError::Status(StatusCode::NOT_FOUND))?;
        Ok(response.results.into_iter().map(Recipe::from).collect())
    }

    async fn information(&self, id: u64) -> Result<Option<Recipe>, ProviderError> {
        let recipe: Option<SpoonacularRecipe> = self
            .get(
                &format!("/recipes/{id}/information"),
                &[("includeNutrition", "false".to_string())],
            )
            .await?;
        Ok(recipe.map(Recipe::from))
    }

    async fn autocomplete(
        &self,
        prefix: &str,
        number: usize,
    ) -> Result<Vec<RecipeSummary>, ProviderError> {
        let items: Option<Vec<AutocompleteItem>> = self
            .get(
                "/recipes/autocomplete",
                &[
                    ("query", prefix.trim().to_string()),
                    ("number", number.to_string()),
                ],
            )
            .await?;
        Ok(items
            .unwrap_or_default()
            .into_iter()
            .map(|i| RecipeSummary {
                id: i.id,
                title: i.title,
            })
            .collect())
    }
}
