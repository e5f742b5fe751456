use crate::api::ApiService;
use crate::error::Result;
use crate::pokemon::{Entity, NameIndexEntry};
use futures::stream::{self, StreamExt};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Every known name/url pair, loaded in one bulk call.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: Vec<NameIndexEntry>,
}

impl NameIndex {
    pub fn new(entries: Vec<NameIndexEntry>) -> Self {
        Self { entries }
    }

    pub async fn load_all(api: &ApiService, limit: usize) -> Result<Self> {
        let entries = api.list_page(limit, 0).await?;
        tracing::info!("Loaded name index with {} entries", entries.len());
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[NameIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First `limit` entries, in index order, whose name contains `query`
    /// case-insensitively or whose id contains it.
    pub fn matches(&self, query: &str, limit: usize) -> Vec<&NameIndexEntry> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();

        self.entries
            .iter()
            .filter(|entry| {
                entry.name.to_lowercase().contains(&needle)
                    || entry
                        .id()
                        .is_some_and(|id| id.to_string().contains(query))
            })
            .take(limit)
            .collect()
    }

    /// Resolves matches to full entities, keeping index order. Failed
    /// lookups are dropped.
    pub async fn search(
        &self,
        api: &ApiService,
        query: &str,
        limit: usize,
        concurrency: usize,
    ) -> Vec<Entity> {
        let matches: Vec<NameIndexEntry> =
            self.matches(query, limit).into_iter().cloned().collect();
        tracing::debug!("Name index search {:?}: {} candidates", query, matches.len());

        stream::iter(matches)
            .map(|entry| async move {
                match api.get_pokemon(&entry.name).await {
                    Ok(entity) => Some(entity),
                    Err(e) => {
                        tracing::warn!("Dropping search hit {}: {}", entry.name, e);
                        None
                    }
                }
            })
            .buffered(concurrency.max(1))
            .filter_map(|entity| async move { entity })
            .collect()
            .await
    }
}
