use crate::config::PokemonConfig;
use crate::store::PokemonStore;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Delays search input until it has been stable for `delay`; each new query
/// cancels the one still waiting.
pub struct SearchDebouncer {
    store: Arc<PokemonStore>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchDebouncer {
    pub fn new(store: Arc<PokemonStore>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn from_config(store: Arc<PokemonStore>, config: &PokemonConfig) -> Self {
        Self::new(store, config.search_debounce())
    }

    pub fn submit(&self, query: impl Into<String>) {
        let query = query.into();
        let store = Arc::clone(&self.store);
        let delay = self.delay;

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.search_pokemon(&query).await;
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    /// Waits for the most recently submitted query to be applied.
    pub async fn settle(&self) {
        let task = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!("Debounced search task failed: {}", e);
                }
            }
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        if let Some(task) = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiService;
    use crate::cache::TtlCache;
    use crate::favorites::{FavoritesPersister, MemoryStore};
    use crate::store::StoreSettings;
    use crate::testing::{BASE_URL, FakeTransport, fake_client};

    fn store(transport: Arc<FakeTransport>) -> Arc<PokemonStore> {
        let api = ApiService::new(fake_client(transport), TtlCache::disabled());
        let persister = FavoritesPersister::new(Arc::new(MemoryStore::new()), "favorites");
        Arc::new(PokemonStore::new(api, persister, StoreSettings::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_query_is_searched() {
        let transport = Arc::new(FakeTransport::new());
        transport.add_pokemon(4, "charmander", &["fire"]);
        let store = store(transport.clone());
        let debouncer = SearchDebouncer::new(store.clone(), Duration::from_millis(300));

        debouncer.submit("c");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.submit("char");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.submit("charmander");
        debouncer.settle().await;

        assert_eq!(transport.calls(&format!("{}/pokemon/c", BASE_URL)), 0);
        assert_eq!(transport.calls(&format!("{}/pokemon/char", BASE_URL)), 0);
        assert_eq!(transport.calls(&format!("{}/pokemon/charmander", BASE_URL)), 1);
        assert_eq!(store.snapshot().search_query, "charmander");
        assert_eq!(store.filtered_list().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_happens_before_delay() {
        let transport = Arc::new(FakeTransport::new());
        let store = store(transport.clone());
        let debouncer = SearchDebouncer::from_config(store.clone(), &PokemonConfig::default());

        debouncer.submit("pika");
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(store.snapshot().search_query, "");

        debouncer.settle().await;
        assert_eq!(store.snapshot().search_query, "pika");
    }
}
