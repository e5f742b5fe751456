//! User-curated favorites and their persistence.
//!
//! The in-memory [`Favorites`] set is authoritative for the session. Every
//! mutation hands a snapshot to [`FavoritesPersister`], which writes it on a
//! detached task; write failures are logged and never reach the caller.

use crate::error::{AppError, Result};
use crate::pokemon::Entity;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Durable string storage keyed by name.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// Keeps every key in one JSON object on disk, rewritten atomically
/// (temporary file + rename) on each `set`.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<HashMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                AppError::Persistence(format!("corrupt store {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(AppError::from(e)),
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut values = match self.read_all().await {
            Ok(values) => values,
            Err(AppError::Persistence(msg)) if msg.starts_with("corrupt") => {
                tracing::warn!("Replacing unreadable store: {}", msg);
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&values)
            .map_err(|e| AppError::Persistence(format!("failed to serialize store: {}", e)))?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!("Wrote key {} to {}", key, self.path.display());
        Ok(())
    }
}

/// Process-local store, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: std::sync::Mutex<HashMap<String, String>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AppError::Persistence("write rejected".to_string()));
        }
        self.put_raw(key, &value);
        Ok(())
    }
}

/// Favorite entities keyed by id, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Favorites {
    entries: Vec<Entity>,
}

impl Favorites {
    /// Builds the set, keeping the first occurrence of each id.
    pub fn from_entities(entities: Vec<Entity>) -> Self {
        let mut favorites = Self::default();
        for entity in entities {
            if !favorites.contains(entity.id) {
                favorites.entries.push(entity);
            }
        }
        favorites
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entities: Vec<Entity> = serde_json::from_str(json)?;
        Ok(Self::from_entities(entities))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Removes the entity when present, appends it otherwise. Returns whether
    /// it is a favorite afterwards.
    pub fn toggle(&mut self, entity: Entity) -> bool {
        match self.entries.iter().position(|fav| fav.id == entity.id) {
            Some(pos) => {
                self.entries.remove(pos);
                false
            }
            None => {
                self.entries.push(entity);
                true
            }
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.iter().any(|fav| fav.id == id)
    }

    pub fn entries(&self) -> &[Entity] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Completion of one detached persistence write.
pub struct PersistHandle(Option<JoinHandle<()>>);

impl PersistHandle {
    pub fn detached() -> Self {
        Self(None)
    }

    /// Waits for the write to finish; the write itself never reports failure here.
    pub async fn wait(self) {
        if let Some(handle) = self.0 {
            if let Err(e) = handle.await {
                tracing::error!("Favorites persistence task aborted: {}", e);
            }
        }
    }
}

pub struct FavoritesPersister {
    store: Arc<dyn KeyValueStore>,
    key: String,
    // Highest generation attempted so far; older snapshots finishing late are skipped
    written: Arc<tokio::sync::Mutex<u64>>,
}

impl FavoritesPersister {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            written: Arc::new(tokio::sync::Mutex::new(0)),
        }
    }

    /// Reads the persisted set. Absent or unreadable data is an empty set.
    pub async fn load(&self) -> Favorites {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!("No persisted favorites under {}", self.key);
                return Favorites::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read favorites: {}", e);
                return Favorites::default();
            }
        };

        match Favorites::from_json(&raw) {
            Ok(favorites) => {
                tracing::info!("Loaded {} favorites", favorites.len());
                favorites
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupt favorites data: {}", e);
                Favorites::default()
            }
        }
    }

    /// Writes `snapshot` on a detached task. `generation` must grow with
    /// every mutation so a stale snapshot never overwrites a newer one.
    pub fn persist(&self, generation: u64, snapshot: &Favorites) -> PersistHandle {
        let json = match snapshot.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize favorites: {}", e);
                return PersistHandle::detached();
            }
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!("Favorites not persisted, no async runtime: {}", e);
                return PersistHandle::detached();
            }
        };

        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        let written = Arc::clone(&self.written);
        PersistHandle(Some(runtime.spawn(async move {
            let mut last = written.lock().await;
            if generation <= *last {
                tracing::debug!("Skipping stale favorites snapshot {}", generation);
                return;
            }
            *last = generation;
            if let Err(e) = store.set(&key, json).await {
                tracing::warn!("Failed to persist favorites: {}", e);
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::entity;

    const KEY: &str = "@pokemon_favorites";

    #[test]
    fn test_toggle_twice_restores_state() {
        let mut favorites = Favorites::from_entities(vec![entity(1, "bulbasaur", &["grass"])]);
        let before = favorites.clone();
        let pikachu = entity(25, "pikachu", &["electric"]);

        assert!(favorites.toggle(pikachu.clone()));
        assert!(favorites.contains(25));
        assert!(!favorites.toggle(pikachu));
        assert!(!favorites.contains(25));
        assert_eq!(favorites, before);
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let favorites = Favorites::from_entities(vec![
            entity(4, "charmander", &["fire"]),
            entity(4, "charmander", &["fire"]),
            entity(7, "squirtle", &["water"]),
        ]);
        assert_eq!(favorites.len(), 2);
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let store = Arc::new(MemoryStore::new());
        let persister = FavoritesPersister::new(store.clone(), KEY);

        let mut favorites = Favorites::default();
        favorites.toggle(entity(25, "pikachu", &["electric"]));
        persister.persist(1, &favorites).wait().await;

        let reloaded = FavoritesPersister::new(store, KEY).load().await;
        assert_eq!(reloaded, favorites);
    }

    #[tokio::test]
    async fn test_corrupt_or_missing_data_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        let persister = FavoritesPersister::new(store.clone(), KEY);
        assert!(persister.load().await.is_empty());

        store.put_raw(KEY, "{not json");
        assert!(persister.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let persister = FavoritesPersister::new(store.clone(), KEY);

        let newer = Favorites::from_entities(vec![entity(1, "bulbasaur", &["grass"])]);
        persister.persist(2, &newer).wait().await;
        persister.persist(1, &Favorites::default()).wait().await;

        assert_eq!(persister.load().await, newer);
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        store.fail_writes(true);
        let persister = FavoritesPersister::new(store.clone(), KEY);

        let favorites = Favorites::from_entities(vec![entity(1, "bulbasaur", &["grass"])]);
        persister.persist(1, &favorites).wait().await;
        assert!(store.raw(KEY).is_none());
    }

    #[tokio::test]
    async fn test_older_snapshot_skipped_after_failed_newer_write() {
        let store = Arc::new(MemoryStore::new());
        let persister = FavoritesPersister::new(store.clone(), KEY);

        store.fail_writes(true);
        let newer = Favorites::from_entities(vec![
            entity(1, "bulbasaur", &["grass"]),
            entity(4, "charmander", &["fire"]),
        ]);
        persister.persist(2, &newer).wait().await;

        store.fail_writes(false);
        let older = Favorites::from_entities(vec![entity(1, "bulbasaur", &["grass"])]);
        persister.persist(1, &older).wait().await;
        assert!(store.raw(KEY).is_none());

        persister.persist(3, &newer).wait().await;
        assert_eq!(persister.load().await, newer);
    }

    #[tokio::test]
    async fn test_json_file_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("favorites.json");

        let store = JsonFileStore::new(&path);
        store.set(KEY, "[]".to_string()).await.unwrap();
        store.set("other", "x".to_string()).await.unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get(KEY).await.unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.get("other").await.unwrap().as_deref(), Some("x"));
        assert!(reopened.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_file_store_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        std::fs::write(&path, "garbage").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.get(KEY).await.is_err());
        store.set(KEY, "[]".to_string()).await.unwrap();
        assert_eq!(store.get(KEY).await.unwrap().as_deref(), Some("[]"));
    }
}
