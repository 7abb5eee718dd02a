use crate::api::{IngredientSearch, RecipeApi, SearchCriteria};
use crate::model::Recipe;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

const RESULT_COUNT: u32 = 20;

const NO_MATCHES: &str = "No recipes found matching your criteria.";
const NO_INGREDIENT_MATCHES: &str = "No recipes found with these ingredients.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub results: Vec<Recipe>,
    pub is_loading: bool,
    pub error_message: Option<String>,
}

/// Recipe search with advanced filters.
///
/// Only the newest search may publish results; responses of searches that
/// were superseded while in flight are dropped.
pub struct SearchViewModel {
    api: Arc<dyn RecipeApi>,
    criteria: Mutex<SearchCriteria>,
    state: watch::Sender<SearchState>,
    generation: AtomicU64,
}

enum Route {
    Complex(SearchCriteria),
    Ingredients(IngredientSearch),
}

impl SearchViewModel {
    pub fn new(api: Arc<dyn RecipeApi>) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            api,
            criteria: Mutex::new(SearchCriteria::default()),
            state,
            generation: AtomicU64::new(0),
        }
    }

    fn criteria_mut(&self) -> MutexGuard<'_, SearchCriteria> {
        self.criteria
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.criteria_mut().query = Some(query.into());
    }

    /// Edit the filters in place
    pub fn update_criteria(&self, edit: impl FnOnce(&mut SearchCriteria)) {
        edit(&mut self.criteria_mut());
    }

    pub fn criteria(&self) -> SearchCriteria {
        self.criteria_mut().clone()
    }

    /// Clear every filter, keeping the query
    pub fn reset_filters(&self) {
        let mut criteria = self.criteria_mut();
        *criteria = SearchCriteria {
            query: criteria.query.take(),
            ..SearchCriteria::default()
        };
    }

    pub async fn search(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let route = match self.route() {
            Some(route) => route,
            None => {
                self.state.send_modify(|s| {
                    s.results.clear();
                    s.is_loading = false;
                });
                return;
            }
        };

        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error_message = None;
        });

        let (result, empty_message) = match &route {
            Route::Ingredients(query) => {
                debug!("Searching by ingredients: {:?}", query.ingredients);
                (self.api.find_by_ingredients(query).await, NO_INGREDIENT_MATCHES)
            }
            Route::Complex(criteria) => {
                debug!(
                    "Searching with query: {}, cuisine: {}, diet: {}",
                    criteria.trimmed_query().unwrap_or(""),
                    criteria.cuisine.as_deref().unwrap_or("none"),
                    criteria.diet.as_deref().unwrap_or("none"),
                );
                (self.api.search(criteria).await, NO_MATCHES)
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Dropping results of a superseded search");
            return;
        }

        self.state.send_modify(|s| {
            s.is_loading = false;
            match result {
                Ok(recipes) => {
                    s.error_message = recipes.is_empty().then(|| empty_message.to_string());
                    s.results = recipes;
                }
                Err(e) => {
                    s.results.clear();
                    s.error_message = Some(e.to_string());
                }
            }
        });
    }

    /// Pick the endpoint for the current criteria, `None` when there is
    /// nothing to search for
    fn route(&self) -> Option<Route> {
        let criteria = self.criteria_mut().clone();
        let has_query = criteria.trimmed_query().is_some();
        if !has_query && !criteria.has_filters() {
            return None;
        }

        let has_ingredients = criteria
            .include_ingredients
            .iter()
            .any(|i| !i.trim().is_empty());
        if !has_query && has_ingredients {
            let query = IngredientSearch::new(criteria.include_ingredients)
                .number(RESULT_COUNT)
                .limit_license(true)
                .ranking(1)
                .ignore_pantry(false);
            return Some(Route::Ingredients(query));
        }

        Some(Route::Complex(SearchCriteria {
            number: RESULT_COUNT,
            add_recipe_information: false,
            ..criteria
        }))
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn results(&self) -> Vec<Recipe> {
        self.state.borrow().results.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error_message(&self) -> Option<String> {
        self.state.borrow().error_message.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }
}
