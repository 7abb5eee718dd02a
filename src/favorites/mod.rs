//! Favorites synchronization: an in-memory set kept in step with a local
//! slot and a per-user remote collection.

mod engine;
mod remote;
mod set;
mod store;

pub use engine::{FavoritesEngine, FavoritesOptions, PersistTicket};
pub use remote::{BatchOp, CollectionPath, InMemoryRemoteStore, RemoteDocument, RemoteStore, WriteBatch};
pub use set::FavoriteSet;
pub use store::{FileStore, KeyValueStore, MemoryStore};
