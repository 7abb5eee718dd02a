use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Identifier assigned by the recipe API; stable across endpoints
pub type RecipeId = i64;

/// Recipe summary as returned by the list endpoints.
///
/// Only `id` and `title` are guaranteed; every enrichment field depends on
/// which endpoint produced the record. Two recipes are equal when their ids
/// are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    /// Local asset name or remote URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_in_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spoonacular_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_serving: Option<f64>,
    // Populated by findByIngredients only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_ingredient_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missed_ingredient_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u32>,
}

impl Recipe {
    /// Create a recipe with only the required fields set
    pub fn new(id: RecipeId, title: impl Into<String>, image: Option<String>) -> Self {
        Recipe {
            id,
            title: title.into(),
            image,
            image_type: None,
            servings: None,
            ready_in_minutes: None,
            source_name: None,
            source_url: None,
            spoonacular_score: None,
            health_score: None,
            price_per_serving: None,
            used_ingredient_count: None,
            missed_ingredient_count: None,
            likes: None,
        }
    }

    /// True when the image refers to a bundled asset rather than a URL
    pub fn is_local_image(&self) -> bool {
        self.image
            .as_deref()
            .map(|image| !image.contains("http"))
            .unwrap_or(false)
    }
}

impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Recipe {}

impl Hash for Recipe {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Full recipe as returned by the single-recipe information endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetail {
    pub id: RecipeId,
    pub title: String,
    /// Long-form summary, usually HTML
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Free text or HTML
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub ready_in_minutes: Option<u32>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub spoonacular_score: Option<f64>,
    #[serde(default)]
    pub health_score: Option<f64>,
    #[serde(default)]
    pub price_per_serving: Option<f64>,
    #[serde(default)]
    pub dish_types: Option<Vec<String>>,
    #[serde(default)]
    pub diets: Option<Vec<String>>,
    #[serde(default)]
    pub occasions: Option<Vec<String>>,
    #[serde(default)]
    pub extended_ingredients: Option<Vec<Ingredient>>,
}

impl RecipeDetail {
    /// Summary view of this recipe, suitable for the favorites list
    pub fn summary_recipe(&self) -> Recipe {
        let mut recipe = Recipe::new(self.id, self.title.clone(), self.image.clone());
        recipe.servings = self.servings;
        recipe.ready_in_minutes = self.ready_in_minutes;
        recipe.source_name = self.source_name.clone();
        recipe.source_url = self.source_url.clone();
        recipe
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        self.extended_ingredients.as_deref().unwrap_or(&[])
    }
}

impl PartialEq for RecipeDetail {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecipeDetail {}

/// Ingredient line of a recipe detail. The API fills these fields inconsistently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Ingredient {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    /// Original free-text line, e.g. "2 cups of flour"
    #[serde(default)]
    pub original: Option<String>,
}
