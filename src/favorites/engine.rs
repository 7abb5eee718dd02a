use crate::auth::UserSession;
use crate::error::FavoritesError;
use crate::favorites::remote::{CollectionPath, RemoteStore, WriteBatch};
use crate::favorites::set::FavoriteSet;
use crate::favorites::store::KeyValueStore;
use crate::model::{Recipe, RecipeId};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Settings for [`FavoritesEngine`]
#[derive(Debug, Clone)]
pub struct FavoritesOptions {
    /// Key of the local favorites slot
    pub storage_key: String,
    /// Never contact the remote store (previews, test harnesses)
    pub preview: bool,
}

impl Default for FavoritesOptions {
    fn default() -> Self {
        Self {
            storage_key: "favoriteRecipes".to_string(),
            preview: false,
        }
    }
}

type Waiter = oneshot::Sender<Result<(), FavoritesError>>;

/// Resolves once the write triggered by a toggle has finished.
///
/// A write dropped because the identity changed in the meantime resolves
/// as `Ok(())`: the session it belonged to is gone.
#[must_use = "dropping the ticket does not cancel the write"]
pub struct PersistTicket {
    rx: oneshot::Receiver<Result<(), FavoritesError>>,
}

impl PersistTicket {
    pub async fn wait(self) -> Result<(), FavoritesError> {
        self.rx.await.unwrap_or(Err(FavoritesError::EngineStopped))
    }
}

struct PersistJob {
    epoch: u64,
    user_id: Option<String>,
    snapshot: Vec<Recipe>,
    waiters: Vec<Waiter>,
}

struct LoadJob {
    epoch: u64,
    generation: u64,
    user_id: Option<String>,
    done: oneshot::Sender<()>,
}

enum Job {
    Persist(PersistJob),
    Load(LoadJob),
}

struct PendingToggle {
    recipe: Recipe,
    waiter: Waiter,
}

struct EngineState {
    favorites: FavoriteSet,
    /// Bumped on every identity change; work tagged with an older epoch is dropped
    epoch: u64,
    user_id: Option<String>,
    /// Bumped on every reload; only the newest load may be applied
    generation: u64,
    loading: bool,
    /// Toggles made while a load was in flight, replayed on top of its result
    pending: Vec<PendingToggle>,
}

struct Shared {
    state: Mutex<EngineState>,
    local: Arc<dyn KeyValueStore>,
    remote: Arc<dyn RemoteStore>,
    options: FavoritesOptions,
    favorites_tx: watch::Sender<Vec<Recipe>>,
    loading_tx: watch::Sender<bool>,
    error_tx: watch::Sender<Option<String>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    fn publish(&self, state: &EngineState) {
        self.favorites_tx.send_replace(state.favorites.to_vec());
    }

    fn report(&self, message: String) {
        warn!("{}", message);
        self.error_tx.send_replace(Some(message));
    }

    async fn persist(&self, job: &PersistJob) -> Result<(), FavoritesError> {
        if !self.is_current(job.epoch) {
            debug!("Dropping favorites write from a previous session");
            return Ok(());
        }

        // The local slot is written on every persist, signed in or not
        let encoded = serde_json::to_vec(&job.snapshot)?;
        let local = self
            .local
            .set(&self.options.storage_key, encoded)
            .await
            .map_err(FavoritesError::from);
        if let Err(e) = &local {
            self.report(e.to_string());
        }

        let remote = match (&job.user_id, self.options.preview) {
            (Some(user_id), false) => self
                .persist_remote(job.epoch, user_id, &job.snapshot)
                .await
                .inspect_err(|e| self.report(format!("Error saving favorites: {}", e))),
            _ => Ok(()),
        };

        local.and(remote)
    }

    /// Mirror the snapshot into the user's collection: delete every existing
    /// document and write one per favorite, in a single batch
    async fn persist_remote(
        &self,
        epoch: u64,
        user_id: &str,
        snapshot: &[Recipe],
    ) -> Result<(), FavoritesError> {
        let collection = CollectionPath::favorites(user_id)?;
        let existing = self.remote.list(&collection).await?;

        if !self.is_current(epoch) {
            debug!("Identity changed during favorites write, skipping commit");
            return Ok(());
        }

        let mut batch = WriteBatch::new(collection);
        for document in existing {
            batch.delete(document.id);
        }
        for recipe in snapshot {
            batch.set(recipe.id.to_string(), serde_json::to_value(recipe)?);
        }

        let ops = batch.ops.len();
        self.remote.commit(batch).await?;
        debug!("Committed favorites batch with {} operations", ops);
        Ok(())
    }

    /// Fetch favorites for a user, degrading to the local slot on remote failure
    async fn fetch(&self, user_id: Option<&str>) -> Vec<Recipe> {
        let user_id = match user_id {
            Some(user_id) if !self.options.preview => user_id,
            _ => return self.read_local().await,
        };

        let listed = match CollectionPath::favorites(user_id) {
            Ok(collection) => self.remote.list(&collection).await,
            Err(e) => Err(e),
        };

        match listed {
            Ok(documents) => documents
                .into_iter()
                .filter_map(|doc| match serde_json::from_value::<Recipe>(doc.data) {
                    Ok(recipe) => Some(recipe),
                    Err(e) => {
                        warn!("Skipping unreadable favorite document {}: {}", doc.id, e);
                        None
                    }
                })
                .collect(),
            Err(e) => {
                self.report(format!("Error loading favorites: {}", e));
                self.read_local().await
            }
        }
    }

    /// Missing or corrupt local data reads as an empty set
    async fn read_local(&self) -> Vec<Recipe> {
        match self.local.get(&self.options.storage_key).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                debug!("Ignoring unreadable local favorites: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                debug!("Local favorites unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// Apply a finished load if it is still the newest one for the session.
    /// Returns the write needed to store replayed toggles, if any.
    fn apply_load(&self, job: &LoadJob, loaded: Vec<Recipe>) -> Option<PersistJob> {
        let mut state = self.lock();
        if state.epoch != job.epoch || state.generation != job.generation {
            debug!("Discarding superseded favorites load");
            return None;
        }

        let mut favorites = FavoriteSet::from_recipes(loaded);
        let pending = std::mem::take(&mut state.pending);
        let mut waiters = Vec::with_capacity(pending.len());
        for toggle in pending {
            favorites.toggle(toggle.recipe);
            waiters.push(toggle.waiter);
        }

        state.favorites = favorites;
        state.loading = false;
        self.publish(&state);
        self.loading_tx.send_replace(false);
        info!("Loaded {} favorites", state.favorites.len());

        (!waiters.is_empty()).then(|| PersistJob {
            epoch: state.epoch,
            user_id: state.user_id.clone(),
            snapshot: state.favorites.to_vec(),
            waiters,
        })
    }
}

/// Persist and load jobs run one at a time, in the order they were issued
async fn run_worker(
    shared: Arc<Shared>,
    jobs_tx: mpsc::WeakUnboundedSender<Job>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Persist(job) => {
                let result = shared.persist(&job).await;
                for waiter in job.waiters {
                    let _ = waiter.send(result.clone());
                }
            }
            Job::Load(job) => {
                let loaded = shared.fetch(job.user_id.as_deref()).await;
                if let Some(replay) = shared.apply_load(&job, loaded) {
                    match jobs_tx.upgrade() {
                        Some(tx) => {
                            let _ = tx.send(Job::Persist(replay));
                        }
                        None => {
                            let result = shared.persist(&replay).await;
                            for waiter in replay.waiters {
                                let _ = waiter.send(result.clone());
                            }
                        }
                    }
                }
                let _ = job.done.send(());
            }
        }
    }
    debug!("Favorites worker stopped");
}

#[derive(Clone)]
struct Core {
    shared: Arc<Shared>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl Core {
    /// Switch to `user_id` (clearing the set when the identity differs)
    /// and queue a load for it
    fn begin_reload(&self, user_id: Option<String>) -> oneshot::Receiver<()> {
        let (done, rx) = oneshot::channel();
        let job = {
            let mut state = self.shared.lock();
            if state.user_id != user_id {
                info!(
                    "Identity changed ({} -> {}), resetting favorites",
                    if state.user_id.is_some() { "present" } else { "absent" },
                    if user_id.is_some() { "present" } else { "absent" },
                );
                state.epoch += 1;
                state.user_id = user_id.clone();
                state.favorites.clear();
                // Writes of the previous identity will never happen
                for toggle in state.pending.drain(..) {
                    let _ = toggle.waiter.send(Ok(()));
                }
                self.shared.publish(&state);
            }
            state.generation += 1;
            state.loading = true;
            LoadJob {
                epoch: state.epoch,
                generation: state.generation,
                user_id,
                done,
            }
        };
        self.shared.loading_tx.send_replace(true);

        if self.jobs.send(Job::Load(job)).is_err() {
            warn!("Favorites worker is not running, reload dropped");
        }
        rx
    }

    async fn reload(&self, user_id: Option<String>) {
        let _ = self.begin_reload(user_id).await;
    }
}

/// Follow identity transitions and reload on every change of user id
async fn follow_identity(core: Core, mut identity: watch::Receiver<Option<UserSession>>) {
    while identity.changed().await.is_ok() {
        let user_id = identity
            .borrow_and_update()
            .as_ref()
            .map(|session| session.user_id.clone());
        let changed = core.shared.lock().user_id != user_id;
        if changed {
            core.reload(user_id).await;
        }
    }
}

/// Owns the favorites set and keeps it in sync with local and remote storage.
///
/// Reads are served from memory. Toggles update memory synchronously and
/// queue a write-through to the local slot and, with a signed-in user, to
/// `users/{uid}/favorites`. A single worker task runs writes and loads in
/// issue order. Identity changes start a new session: the set is cleared,
/// queued writes of the old session are dropped, and favorites are reloaded.
pub struct FavoritesEngine {
    core: Core,
    identity: watch::Receiver<Option<UserSession>>,
    watcher: JoinHandle<()>,
}

impl FavoritesEngine {
    /// Start the engine and wait for the initial load
    pub async fn start(
        identity: watch::Receiver<Option<UserSession>>,
        local: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteStore>,
        options: FavoritesOptions,
    ) -> Self {
        let (favorites_tx, _) = watch::channel(Vec::new());
        let (loading_tx, _) = watch::channel(false);
        let (error_tx, _) = watch::channel(None);

        let shared = Arc::new(Shared {
            state: Mutex::new(EngineState {
                favorites: FavoriteSet::new(),
                epoch: 0,
                user_id: None,
                generation: 0,
                loading: false,
                pending: Vec::new(),
            }),
            local,
            remote,
            options,
            favorites_tx,
            loading_tx,
            error_tx,
        });

        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(shared.clone(), jobs_tx.downgrade(), jobs_rx));

        let core = Core {
            shared,
            jobs: jobs_tx,
        };

        let mut watched = identity.clone();
        let initial = watched
            .borrow_and_update()
            .as_ref()
            .map(|session| session.user_id.clone());
        core.reload(initial).await;

        let watcher = tokio::spawn(follow_identity(core.clone(), watched));

        Self {
            core,
            identity,
            watcher,
        }
    }

    /// Add the recipe if absent, remove it otherwise.
    ///
    /// The in-memory set changes before this returns; the returned ticket
    /// resolves when the write-through has finished.
    pub fn toggle(&self, recipe: &Recipe) -> PersistTicket {
        let (waiter, rx) = oneshot::channel();
        let job = {
            let mut state = self.core.shared.lock();
            let added = state.favorites.toggle(recipe.clone());
            debug!(
                "{} favorite {} ({})",
                if added { "Added" } else { "Removed" },
                recipe.id,
                recipe.title
            );
            self.core.shared.publish(&state);

            if state.loading {
                state.pending.push(PendingToggle {
                    recipe: recipe.clone(),
                    waiter,
                });
                None
            } else {
                Some(PersistJob {
                    epoch: state.epoch,
                    user_id: state.user_id.clone(),
                    snapshot: state.favorites.to_vec(),
                    waiters: vec![waiter],
                })
            }
        };

        if let Some(job) = job {
            if self.core.jobs.send(Job::Persist(job)).is_err() {
                warn!("Favorites worker is not running, write dropped");
            }
        }
        PersistTicket { rx }
    }

    pub fn is_favorite(&self, recipe: &Recipe) -> bool {
        self.core.shared.lock().favorites.contains(recipe.id)
    }

    pub fn get_favorite(&self, id: RecipeId) -> Option<Recipe> {
        self.core.shared.lock().favorites.get(id).cloned()
    }

    /// Current favorites in display order
    pub fn favorites(&self) -> Vec<Recipe> {
        self.core.shared.lock().favorites.to_vec()
    }

    /// Reload for the identity currently reported by the provider
    pub async fn reload(&self) {
        let user_id = self
            .identity
            .borrow()
            .as_ref()
            .map(|session| session.user_id.clone());
        self.core.reload(user_id).await;
    }

    /// User id of the session the set belongs to
    pub fn current_user_id(&self) -> Option<String> {
        self.core.shared.lock().user_id.clone()
    }

    pub fn is_loading(&self) -> bool {
        *self.core.shared.loading_tx.borrow()
    }

    /// Most recent non-fatal sync error, for display
    pub fn error_message(&self) -> Option<String> {
        self.core.shared.error_tx.borrow().clone()
    }

    pub fn clear_error(&self) {
        self.core.shared.error_tx.send_replace(None);
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Recipe>> {
        self.core.shared.favorites_tx.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.core.shared.loading_tx.subscribe()
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<String>> {
        self.core.shared.error_tx.subscribe()
    }
}

impl Drop for FavoritesEngine {
    fn drop(&mut self) {
        // Queued writes still drain once the last sender is gone
        self.watcher.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::{InMemoryRemoteStore, MemoryStore};

    async fn guest_engine(local: Arc<MemoryStore>) -> FavoritesEngine {
        let (_tx, rx) = watch::channel(None);
        FavoritesEngine::start(
            rx,
            local,
            Arc::new(InMemoryRemoteStore::new()),
            FavoritesOptions::default(),
        )
        .await
    }

    #[tokio::test]
    async fn test_toggle_is_visible_before_persist_completes() {
        let engine = guest_engine(Arc::new(MemoryStore::new())).await;
        let recipe = Recipe::new(7, "Tacos", None);

        let ticket = engine.toggle(&recipe);
        assert!(engine.is_favorite(&recipe));
        assert_eq!(engine.get_favorite(7), Some(recipe.clone()));
        ticket.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_guest_writes_local_slot() {
        let local = Arc::new(MemoryStore::new());
        let engine = guest_engine(local.clone()).await;

        engine.toggle(&Recipe::new(1, "Soup", None)).wait().await.unwrap();
        engine.toggle(&Recipe::new(2, "Salad", None)).wait().await.unwrap();

        let stored = local.get("favoriteRecipes").await.unwrap().unwrap();
        let recipes: Vec<Recipe> = serde_json::from_slice(&stored).unwrap();
        let ids: Vec<_> = recipes.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_corrupt_local_data_starts_empty() {
        let local = Arc::new(MemoryStore::new());
        local
            .set("favoriteRecipes", b"{not json".to_vec())
            .await
            .unwrap();
        let engine = guest_engine(local).await;
        assert!(engine.favorites().is_empty());
        assert!(engine.error_message().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_optimistic_updates() {
        let engine = guest_engine(Arc::new(MemoryStore::new())).await;
        let rx = engine.subscribe();
        let _ticket = engine.toggle(&Recipe::new(3, "Stew", None));
        assert_eq!(rx.borrow().len(), 1);
    }
}
