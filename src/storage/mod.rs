//! # Storage Module - Save Persistence
//!
//! The engine treats storage as an opaque key-value blob store with three asynchronous
//! operations: load, save and remove ([`Persistence`]). Under that sits a synchronous
//! [`KvStore`] with two implementations:
//!
//! - [`SledStore`]: sled database, the default for real play
//! - [`MemoryStore`]: a mutex-guarded map for tests and throwaway sessions
//!
//! Store calls are synchronous and may touch disk, so [`Persistence`] runs them on tokio's
//! blocking pool.
//!
//! ```rust,no_run
//! use hugoland::storage::{Persistence, SledStore};
//! use std::sync::Arc;
//!
//! # async fn demo() -> hugoland::errors::GameResult<()> {
//! let store = SledStore::open("./data/hugoland.sled")?;
//! let persistence = Persistence::new(Arc::new(store), "hugoland_game_state");
//! if let Some(loaded) = persistence.load_state().await? {
//!     println!("zone {}", loaded.state.zone);
//! }
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use log::debug;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::{StorageBackend, StorageConfig};
use crate::errors::{GameError, GameResult};
use crate::game::snapshot::{self, LoadedState};
use crate::game::GameState;

const TREE_SAVES: &str = "saves";

/// Synchronous key-value store holding opaque blobs.
pub trait KvStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> GameResult<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: &[u8]) -> GameResult<()>;
    fn remove(&self, key: &str) -> GameResult<()>;
}

/// Sled-backed store. Every write is flushed before returning.
pub struct SledStore {
    _db: sled::Db,
    saves: sled::Tree,
}

impl SledStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> GameResult<Self> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let saves = db.open_tree(TREE_SAVES)?;
        Ok(Self { _db: db, saves })
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &str) -> GameResult<Option<Vec<u8>>> {
        Ok(self.saves.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> GameResult<()> {
        self.saves.insert(key.as_bytes(), value)?;
        self.saves.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> GameResult<()> {
        self.saves.remove(key.as_bytes())?;
        self.saves.flush()?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> GameResult<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| GameError::Internal("memory store lock poisoned".to_string()))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> GameResult<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> GameResult<()> {
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> GameResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Async load/save/remove of the single save blob, keyed by `state_key`.
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn KvStore>,
    key: String,
}

impl Persistence {
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Build the configured backend.
    pub fn from_config(config: &StorageConfig) -> GameResult<Self> {
        let store: Arc<dyn KvStore> = match config.backend {
            StorageBackend::Sled => Arc::new(SledStore::open(config.db_path())?),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(store, config.state_key.clone()))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn blocking<T, F>(&self, op: F) -> GameResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn KvStore, &str) -> GameResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || op(store.as_ref(), &key))
            .await
            .map_err(|e| GameError::Internal(format!("storage task failed: {}", e)))?
    }

    pub async fn load(&self) -> GameResult<Option<Vec<u8>>> {
        self.blocking(|store, key| store.get(key)).await
    }

    pub async fn save(&self, blob: Vec<u8>) -> GameResult<()> {
        let len = blob.len();
        self.blocking(move |store, key| store.put(key, &blob)).await?;
        debug!("saved {} bytes under '{}'", len, self.key);
        Ok(())
    }

    pub async fn remove(&self) -> GameResult<()> {
        self.blocking(|store, key| store.remove(key)).await
    }

    /// Load and decode the save, or `None` when nothing is stored yet.
    pub async fn load_state(&self) -> GameResult<Option<LoadedState>> {
        match self.load().await? {
            Some(bytes) => Ok(Some(snapshot::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn save_state(&self, state: &GameState, now: DateTime<Utc>) -> GameResult<()> {
        let blob = snapshot::encode(state, now)?;
        self.save(blob).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let p = Persistence::new(Arc::new(MemoryStore::new()), "k");
        assert!(p.load().await.unwrap().is_none());
        p.save(b"abc".to_vec()).await.unwrap();
        assert_eq!(p.load().await.unwrap(), Some(b"abc".to_vec()));
        p.remove().await.unwrap();
        assert!(p.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sled_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let p = Persistence::new(Arc::new(SledStore::open(dir.path()).unwrap()), "save");
            let mut state = GameState::new();
            state.coins = 4242;
            p.save_state(&state, Utc::now()).await.unwrap();
        }
        let p = Persistence::new(Arc::new(SledStore::open(dir.path()).unwrap()), "save");
        let loaded = p.load_state().await.unwrap().unwrap();
        assert_eq!(loaded.state.coins, 4242);
    }
}
