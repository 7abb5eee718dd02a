//! Recipe discovery client: a Spoonacular API client with a featured-recipe
//! cache, and a favorites engine that keeps a local slot and a per-user
//! remote collection in sync across sign-in changes.
//!
//! ```no_run
//! # async fn run() -> Result<(), forkly::ForklyError> {
//! let recipes = forkly::search_recipes("pasta").await?;
//! for recipe in recipes {
//!     println!("{} {}", recipe.id, recipe.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod favorites;
pub mod model;
pub mod text;
pub mod viewmodels;

pub use api::{IngredientSearch, RecipeApi, SearchCriteria, SpoonacularClient};
pub use auth::{IdentityProvider, InMemoryIdentityProvider, UserSession};
pub use config::{load_config, ForklyConfig};
pub use error::{AuthError, FavoritesError, ForklyError, RecipeApiError};
pub use favorites::{FavoritesEngine, FavoritesOptions};
pub use model::{Ingredient, Recipe, RecipeDetail, RecipeId};

/// Client built from `forkly.toml` and `FORKLY__*` environment variables
pub fn client_from_config() -> Result<SpoonacularClient, ForklyError> {
    let config = ForklyConfig::load()?;
    SpoonacularClient::new(&config.api)
}

/// Search recipes by free text with the configured client
pub async fn search_recipes(query: &str) -> Result<Vec<Recipe>, ForklyError> {
    let client = client_from_config()?;
    Ok(client.search(&SearchCriteria::query(query)).await?)
}

/// Full information for one recipe with the configured client
pub async fn get_recipe_details(id: RecipeId) -> Result<RecipeDetail, ForklyError> {
    let client = client_from_config()?;
    Ok(client.get_details(id).await?)
}

/// Random featured recipes with the configured client
pub async fn fetch_featured_recipes() -> Result<Vec<Recipe>, ForklyError> {
    let client = client_from_config()?;
    Ok(client.fetch_featured(false).await?)
}
