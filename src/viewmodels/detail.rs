use crate::api::RecipeApi;
use crate::model::{Recipe, RecipeDetail, RecipeId};
use crate::text::{clean_html_tags, split_into_steps};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub struct DetailState {
    pub detail: Option<RecipeDetail>,
    pub is_loading: bool,
    pub error_message: Option<String>,
}

impl Default for DetailState {
    fn default() -> Self {
        Self {
            detail: None,
            is_loading: true,
            error_message: None,
        }
    }
}

/// Full information for one recipe.
///
/// A response is applied only if it belongs to the most recent request and
/// to the recipe currently being shown.
pub struct RecipeDetailViewModel {
    api: Arc<dyn RecipeApi>,
    state: watch::Sender<DetailState>,
    generation: AtomicU64,
    target: Mutex<Option<RecipeId>>,
}

impl RecipeDetailViewModel {
    pub fn new(api: Arc<dyn RecipeApi>) -> Self {
        let (state, _) = watch::channel(DetailState::default());
        Self {
            api,
            state,
            generation: AtomicU64::new(0),
            target: Mutex::new(None),
        }
    }

    fn set_target(&self, id: RecipeId) {
        *self.target.lock().unwrap_or_else(|e| e.into_inner()) = Some(id);
    }

    fn is_target(&self, id: RecipeId) -> bool {
        *self.target.lock().unwrap_or_else(|e| e.into_inner()) == Some(id)
    }

    pub async fn load(&self, id: RecipeId) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_target(id);
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error_message = None;
        });

        let result = self.api.get_details(id).await;

        if self.generation.load(Ordering::SeqCst) != generation || !self.is_target(id) {
            debug!("Dropping stale details for recipe {}", id);
            return;
        }

        self.state.send_modify(|s| {
            s.is_loading = false;
            match result {
                Ok(detail) => s.detail = Some(detail),
                Err(e) => s.error_message = Some(e.to_string()),
            }
        });
    }

    pub fn detail(&self) -> Option<RecipeDetail> {
        self.state.borrow().detail.clone()
    }

    /// Summary with markup removed, empty when unknown
    pub fn cleaned_summary(&self) -> String {
        self.state
            .borrow()
            .detail
            .as_ref()
            .and_then(|d| d.summary.as_deref())
            .map(clean_html_tags)
            .unwrap_or_default()
    }

    pub fn cleaned_instructions(&self) -> String {
        self.state
            .borrow()
            .detail
            .as_ref()
            .and_then(|d| d.instructions.as_deref())
            .map(clean_html_tags)
            .unwrap_or_default()
    }

    pub fn instruction_steps(&self) -> Vec<String> {
        split_into_steps(&self.cleaned_instructions())
    }

    /// Summary form of the loaded recipe, for favoriting
    pub fn summary_recipe(&self) -> Option<Recipe> {
        self.state.borrow().detail.as_ref().map(RecipeDetail::summary_recipe)
    }

    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error_message(&self) -> Option<String> {
        self.state.borrow().error_message.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }
}
