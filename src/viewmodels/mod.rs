//! State holders the views bind to. Each publishes its state on a `watch`
//! channel and offers synchronous getters for the current value.

mod auth;
mod detail;
mod featured;
mod search;

pub use auth::AuthViewModel;
pub use detail::{DetailState, RecipeDetailViewModel};
pub use featured::{FeaturedRecipesViewModel, FeaturedState};
pub use search::{SearchState, SearchViewModel};
