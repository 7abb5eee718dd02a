use async_trait::async_trait;
use forkly::auth::UserSession;
use forkly::error::{FavoritesError, RemoteError, StoreError};
use forkly::favorites::{
    CollectionPath, FavoritesEngine, FavoritesOptions, InMemoryRemoteStore, KeyValueStore,
    MemoryStore, RemoteDocument, RemoteStore, WriteBatch,
};
use forkly::Recipe;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};

const KEY: &str = "favoriteRecipes";

/// Local store that counts writes
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }
}

/// Remote store whose next `list` call, once armed, blocks until released
#[derive(Default)]
struct GatedRemote {
    inner: InMemoryRemoteStore,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedRemote {
    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for GatedRemote {
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<RemoteDocument>, RemoteError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.list(collection).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError> {
        self.inner.commit(batch).await
    }
}

fn user(id: &str) -> Option<UserSession> {
    Some(UserSession::new(id, Some(format!("{}@example.com", id))))
}

fn ids(recipes: &[Recipe]) -> Vec<i64> {
    recipes.iter().map(|r| r.id).collect()
}

fn seed(remote: &InMemoryRemoteStore, uid: &str, recipe: &Recipe) {
    remote.insert(
        &CollectionPath::favorites(uid).unwrap(),
        recipe.id.to_string(),
        serde_json::to_value(recipe).unwrap(),
    );
}

async fn start(
    identity: watch::Receiver<Option<UserSession>>,
    local: Arc<dyn KeyValueStore>,
    remote: Arc<dyn RemoteStore>,
) -> FavoritesEngine {
    FavoritesEngine::start(identity, local, remote, FavoritesOptions::default()).await
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_double_toggle_empties_set_with_two_local_writes() {
    let (_tx, rx) = watch::channel(None);
    let local = Arc::new(CountingStore::default());
    let engine = start(rx, local.clone(), Arc::new(InMemoryRemoteStore::new())).await;
    let recipe = Recipe::new(7, "Pad Thai", None);

    let first = engine.toggle(&recipe);
    assert!(engine.is_favorite(&recipe));
    let second = engine.toggle(&recipe);
    assert!(!engine.is_favorite(&recipe));

    first.wait().await.unwrap();
    second.wait().await.unwrap();

    assert!(engine.favorites().is_empty());
    assert_eq!(local.writes.load(Ordering::SeqCst), 2);
    let stored: Vec<Recipe> =
        serde_json::from_slice(&local.get(KEY).await.unwrap().unwrap()).unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_signed_in_toggles_mirror_remote_collection() {
    let (_tx, rx) = watch::channel(user("alice"));
    let local = Arc::new(MemoryStore::new());
    let remote = Arc::new(InMemoryRemoteStore::new());
    let engine = start(rx, local.clone(), remote.clone()).await;
    let path = CollectionPath::favorites("alice").unwrap();

    engine.toggle(&Recipe::new(1, "Soup", None)).wait().await.unwrap();
    engine.toggle(&Recipe::new(2, "Salad", None)).wait().await.unwrap();
    assert_eq!(remote.document_ids(&path), vec!["1", "2"]);

    engine.toggle(&Recipe::new(1, "Soup", None)).wait().await.unwrap();
    assert_eq!(remote.document_ids(&path), vec!["2"]);
    assert_eq!(remote.commit_count(), 3);

    // Local slot is written even with a user present
    let stored: Vec<Recipe> =
        serde_json::from_slice(&local.get(KEY).await.unwrap().unwrap()).unwrap();
    assert_eq!(ids(&stored), vec![2]);
}

#[tokio::test]
async fn test_remote_favorites_load_on_sign_in() {
    let (tx, rx) = watch::channel(None);
    let remote = Arc::new(InMemoryRemoteStore::new());
    seed(&remote, "bob", &Recipe::new(10, "Curry", None));
    remote.insert(&CollectionPath::favorites("bob").unwrap(), "junk", json!({"title": 3}));
    let engine = start(rx, Arc::new(MemoryStore::new()), remote).await;
    assert!(engine.favorites().is_empty());

    tx.send(user("bob")).unwrap();
    wait_until(|| engine.current_user_id().as_deref() == Some("bob")).await;
    engine.reload().await;

    assert_eq!(ids(&engine.favorites()), vec![10]);
    assert!(engine.error_message().is_none());
}

#[tokio::test]
async fn test_sign_out_does_not_leak_previous_user() {
    let (tx, rx) = watch::channel(user("alice"));
    let remote = Arc::new(InMemoryRemoteStore::new());
    seed(&remote, "alice", &Recipe::new(4, "Risotto", None));
    let engine = start(rx, Arc::new(MemoryStore::new()), remote).await;
    assert_eq!(ids(&engine.favorites()), vec![4]);

    let mut updates = engine.subscribe();
    tx.send(None).unwrap();
    wait_until(|| engine.current_user_id().is_none()).await;
    engine.reload().await;

    assert!(engine.favorites().is_empty());
    assert!(updates.borrow_and_update().is_empty());
}

#[tokio::test]
async fn test_offline_remote_falls_back_to_local_with_error() {
    let local = Arc::new(MemoryStore::new());
    local
        .set(KEY, serde_json::to_vec(&vec![Recipe::new(3, "Chili", None)]).unwrap())
        .await
        .unwrap();
    let remote = Arc::new(InMemoryRemoteStore::new());
    remote.set_offline(true);

    let (_tx, rx) = watch::channel(user("carol"));
    let engine = start(rx, local.clone(), remote).await;

    assert_eq!(ids(&engine.favorites()), vec![3]);
    assert!(engine
        .error_message()
        .unwrap()
        .starts_with("Error loading favorites"));

    let err = engine
        .toggle(&Recipe::new(8, "Bread", None))
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, FavoritesError::Remote(RemoteError::Unavailable(_))));
    assert!(engine
        .error_message()
        .unwrap()
        .starts_with("Error saving favorites"));

    let stored: Vec<Recipe> =
        serde_json::from_slice(&local.get(KEY).await.unwrap().unwrap()).unwrap();
    assert_eq!(ids(&stored), vec![3, 8]);
}

#[tokio::test]
async fn test_preview_mode_never_touches_remote() {
    let remote = Arc::new(InMemoryRemoteStore::new());
    seed(&remote, "preview-user-id", &Recipe::new(1, "Remote only", None));
    let (_tx, rx) = watch::channel(user("preview-user-id"));
    let engine = FavoritesEngine::start(
        rx,
        Arc::new(MemoryStore::new()),
        remote.clone(),
        FavoritesOptions {
            preview: true,
            ..FavoritesOptions::default()
        },
    )
    .await;

    assert!(engine.favorites().is_empty());
    engine.toggle(&Recipe::new(2, "Local", None)).wait().await.unwrap();
    assert_eq!(remote.commit_count(), 0);
}

#[tokio::test]
async fn test_write_in_flight_during_identity_switch_is_dropped() {
    let (tx, rx) = watch::channel(user("alice"));
    let remote = Arc::new(GatedRemote::default());
    seed(&remote.inner, "bob", &Recipe::new(9, "Bob's pie", None));
    let engine = start(rx, Arc::new(MemoryStore::new()), remote.clone()).await;

    remote.arm();
    let ticket = engine.toggle(&Recipe::new(1, "Alice's soup", None));
    remote.entered.notified().await;

    tx.send(user("bob")).unwrap();
    wait_until(|| engine.current_user_id().as_deref() == Some("bob")).await;
    assert!(engine.favorites().is_empty());

    remote.release.notify_one();
    ticket.wait().await.unwrap();
    engine.reload().await;

    assert_eq!(ids(&engine.favorites()), vec![9]);
    assert_eq!(remote.inner.commit_count(), 0);
    assert!(remote
        .inner
        .document_ids(&CollectionPath::favorites("alice").unwrap())
        .is_empty());
}

#[tokio::test]
async fn test_toggle_during_load_is_applied_on_top_of_loaded_set() {
    let (tx, rx) = watch::channel(None);
    let remote = Arc::new(GatedRemote::default());
    seed(&remote.inner, "dana", &Recipe::new(5, "Gumbo", None));
    let engine = start(rx, Arc::new(MemoryStore::new()), remote.clone()).await;

    remote.arm();
    tx.send(user("dana")).unwrap();
    remote.entered.notified().await;
    assert!(engine.is_loading());

    let ticket = engine.toggle(&Recipe::new(6, "Cornbread", None));
    assert!(engine.is_favorite(&Recipe::new(6, "Cornbread", None)));

    remote.release.notify_one();
    ticket.wait().await.unwrap();

    assert_eq!(ids(&engine.favorites()), vec![5, 6]);
    assert!(!engine.is_loading());
    assert_eq!(
        remote.inner.document_ids(&CollectionPath::favorites("dana").unwrap()),
        vec!["5", "6"]
    );
}

#[tokio::test]
async fn test_user_id_with_path_separator_never_reaches_remote() {
    let local = Arc::new(MemoryStore::new());
    let remote = Arc::new(InMemoryRemoteStore::new());
    seed(&remote, "bob", &Recipe::new(9, "Bob's pie", None));
    let (_tx, rx) = watch::channel(user("mallory/../bob"));
    let engine = start(rx, local.clone(), remote.clone()).await;

    assert!(engine.favorites().is_empty());
    assert!(engine
        .error_message()
        .unwrap()
        .starts_with("Error loading favorites"));

    let err = engine
        .toggle(&Recipe::new(1, "Soup", None))
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, FavoritesError::Remote(RemoteError::Rejected(_))));
    assert_eq!(remote.commit_count(), 0);
    assert_eq!(
        remote.document_ids(&CollectionPath::favorites("bob").unwrap()),
        vec!["9"]
    );

    let stored: Vec<Recipe> =
        serde_json::from_slice(&local.get(KEY).await.unwrap().unwrap()).unwrap();
    assert_eq!(ids(&stored), vec![1]);
}
