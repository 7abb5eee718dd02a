mod cache;
mod client;
mod criteria;
mod decode;
mod transport;

pub use cache::FeaturedCache;
pub use client::{
    mask_api_key, ApiKeyStatus, EndpointDiagnostics, EndpointOutcome, EndpointReport,
    SpoonacularClient,
};
pub use criteria::{IngredientSearch, SearchCriteria};
pub use decode::Envelope;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

use crate::error::RecipeApiError;
use crate::model::{Recipe, RecipeDetail, RecipeId};
use async_trait::async_trait;

/// Operations the app needs from the third-party recipe API.
///
/// View models only see this trait, so tests can hand them an in-memory
/// double instead of a client talking to the network.
#[async_trait]
pub trait RecipeApi: Send + Sync {
    /// Complex search; only the options set on `criteria` are transmitted
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Recipe>, RecipeApiError>;

    /// Single recipe with ingredients and instructions, nutrition disabled
    async fn get_details(&self, id: RecipeId) -> Result<RecipeDetail, RecipeApiError>;

    /// Random featured recipes, served from cache while it is fresh
    async fn fetch_featured(&self, force_refresh: bool) -> Result<Vec<Recipe>, RecipeApiError>;

    /// Recipes that use the given ingredients
    async fn find_by_ingredients(
        &self,
        query: &IngredientSearch,
    ) -> Result<Vec<Recipe>, RecipeApiError>;
}
