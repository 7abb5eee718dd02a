use crate::api::{IngredientSearch, RecipeApi};
use crate::config::FeaturedConfig;
use crate::error::{RecipeApiError, ServerErrorKind};
use crate::model::Recipe;
use log::{error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeaturedState {
    pub recipes: Vec<Recipe>,
    pub is_loading: bool,
    pub error_message: Option<String>,
}

/// Featured recipes for the home screen.
///
/// The random endpoint is tried first. When it fails, one retry goes to
/// find-by-ingredients with a fixed ingredient list; only when that fails
/// too is the error shown.
pub struct FeaturedRecipesViewModel {
    api: Arc<dyn RecipeApi>,
    fallback: IngredientSearch,
    state: watch::Sender<FeaturedState>,
    generation: AtomicU64,
}

impl FeaturedRecipesViewModel {
    pub fn new(api: Arc<dyn RecipeApi>, config: &FeaturedConfig) -> Self {
        let fallback =
            IngredientSearch::new(config.fallback_ingredients.iter().cloned())
                .number(config.fallback_count)
                .limit_license(true)
                .ranking(1)
                .ignore_pantry(false);
        let (state, _) = watch::channel(FeaturedState::default());
        Self {
            api,
            fallback,
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub async fn load(&self, force_refresh: bool) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error_message = None;
        });

        let result = match self.api.fetch_featured(force_refresh).await {
            Ok(recipes) => {
                info!("Loaded {} featured recipes from the random endpoint", recipes.len());
                Ok(recipes)
            }
            Err(e) => {
                warn!("Random recipes failed ({}), trying findByIngredients instead", e);
                self.api.find_by_ingredients(&self.fallback).await.inspect(|recipes| {
                    info!("Loaded {} featured recipes from findByIngredients", recipes.len())
                })
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }

        self.state.send_modify(|s| {
            s.is_loading = false;
            match result {
                Ok(recipes) => s.recipes = recipes,
                Err(e) => {
                    log_final_failure(&e);
                    s.error_message = Some(e.to_string());
                }
            }
        });
    }

    /// Reload, bypassing the featured cache
    pub async fn retry(&self) {
        self.load(true).await;
    }

    pub fn state(&self) -> FeaturedState {
        self.state.borrow().clone()
    }

    pub fn recipes(&self) -> Vec<Recipe> {
        self.state.borrow().recipes.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error_message(&self) -> Option<String> {
        self.state.borrow().error_message.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeaturedState> {
        self.state.subscribe()
    }
}

fn log_final_failure(e: &RecipeApiError) {
    error!("Both featured endpoints failed: {}", e);
    match e {
        RecipeApiError::Server { status, body } => {
            error!("Server error ({}): {}", status, body);
            match ServerErrorKind::from_status(*status) {
                ServerErrorKind::Other => {}
                kind => error!("{}", kind.hint()),
            }
        }
        RecipeApiError::Decode(decode) => error!("JSON decoding error: {}", decode),
        other => error!("Other API error: {:?}", other),
    }
}
