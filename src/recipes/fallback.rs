use crate::{
    types::{Recipe, RecipeSummary},
    utils,
};

/// Local recipes served when the primary provider is unavailable.
#[derive(Debug, Clone)]
pub struct FallbackSet {
    recipes: Vec<Recipe>,
}

impl Default for FallbackSet {
    fn default() -> Self {
        Self::new(builtin_recipes())
    }
}

impl FallbackSet {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    pub fn all(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Case-insensitive substring match on the title. With a cuisine filter the
    /// recipe's cuisine must also equal it, ignoring case.
    pub fn search(&self, query: &str, cuisine: Option<&str>) -> Vec<Recipe> {
        let query = query.trim();
        self.recipes
            .iter()
            .filter(|r| utils::contains_ignore_case(&r.title, query))
            .filter(|r| matches_cuisine(r, cuisine))
            .cloned()
            .collect()
    }

    /// First `limit` recipes, cuisine filter applied.
    pub fn browse(&self, cuisine: Option<&str>, limit: usize) -> Vec<Recipe> {
        self.recipes
            .iter()
            .filter(|r| matches_cuisine(r, cuisine))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn autocomplete(&self, prefix: &str, limit: usize) -> Vec<RecipeSummary> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Vec::new();
        }
        self.recipes
            .iter()
            .filter(|r| utils::starts_with_ignore_case(&r.title, prefix))
            .take(limit)
            .map(|r| RecipeSummary {
                id: r.id,
                title: r.title.clone(),
            })
            .collect()
    }

    pub fn get(&self, id: u64) -> Option<Recipe> {
        self.recipes.iter().find(|r| r.id == id).cloned()
    }
}

fn matches_cuisine(recipe: &Recipe, cuisine: Option<&str>) -> bool {
    match cuisine.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => recipe.cuisine.eq_ignore_ascii_case(c),
        None => true,
    }
}

#[allow(clippy::too_many_arguments)]
fn recipe(
    id: u64,
    title: &str,
    summary: &str,
    ingredients: &[&str],
    instructions: &str,
    cuisine: &str,
    ready_in_minutes: u32,
    servings: u32,
) -> Recipe {
    Recipe {
        id,
        title: title.to_string(),
        image: format!("https://spoonacular.com/recipeImages/{id}-556x370.jpg"),
        summary: summary.to_string(),
        ingredients: ingredients.iter().map(|i| i.to_string()).collect(),
        instructions: instructions.to_string(),
        cuisine: cuisine.to_string(),
        ready_in_minutes: Some(ready_in_minutes),
        servings: Some(servings),
    }
}

/// The built-in fallback recipes.
pub fn builtin_recipes() -> Vec<Recipe> {
    vec![
        recipe(
            1,
            "Carne Asada",
            "A delicious grilled beef dish with Mexican spices. Perfect with rice, guacamole, and salsa.",
            &[
                "2 lbs flank steak",
                "1/4 cup lime juice",
                "3 cloves garlic, minced",
                "Salt and pepper to taste",
                "1 tbsp olive oil",
            ],
            "Marinate steak with lime, garlic, salt, and olive oil. Grill 5 minutes per side. Slice and serve.",
            "mexican",
            40,
            4,
        ),
        recipe(
            2,
            "Sushi Rolls",
            "Classic Japanese sushi rolls made with seasoned rice and fresh fish.",
            &[
                "2 cups sushi rice",
                "1 sheet nori",
                "1/2 lb fresh salmon",
                "1 avocado, sliced",
            ],
            "Lay out nori, spread rice evenly, add fillings, and roll tightly. Slice and serve with soy sauce.",
            "japanese",
            50,
            2,
        ),
        recipe(
            3,
            "Spaghetti Carbonara",
            "An Italian pasta dish with creamy egg sauce, pancetta, and Parmesan.",
            &[
                "8 oz spaghetti",
                "2 eggs",
                "1/2 cup grated Parmesan",
                "4 oz pancetta",
            ],
            "Cook pasta, fry pancetta, whisk eggs and cheese, then combine everything over low heat.",
            "italian",
            25,
            2,
        ),
        recipe(
            4,
            "Paneer Tikka",
            "Indian cottage cheese cubes marinated with spices and grilled to perfection.",
            &[
                "200g paneer cubes",
                "1/2 cup yogurt",
                "1 tbsp tikka masala",
                "1 tsp lemon juice",
            ],
            "Marinate paneer in yogurt and spices for 30 minutes. Grill until charred and serve hot.",
            "indian",
            45,
            3,
        ),
        recipe(
            5,
            "Crêpes Suzette",
            "A French dessert featuring delicate crêpes with orange-butter sauce.",
            &["1 cup flour", "2 eggs", "1 cup milk", "2 tbsp orange liqueur"],
            "Make thin crêpes and serve with orange-butter sauce flambéed in liqueur.",
            "french",
            30,
            4,
        ),
    ]
}
