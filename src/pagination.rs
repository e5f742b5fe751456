use crate::api::ApiService;
use crate::error::Result;
use crate::pokemon::Entity;
use futures::stream::{self, StreamExt};

/// Offset/limit cursor over the list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

impl Pager {
    pub fn new(limit: usize) -> Self {
        Self {
            offset: 0,
            limit,
            has_more: true,
        }
    }

    /// Offset the next request should use.
    pub fn next_offset(&self, reset: bool) -> usize {
        if reset { 0 } else { self.offset }
    }

    /// Folds a fetched page into `list` and advances the cursor.
    ///
    /// A page shorter than `limit` ends the data, even when it is short only
    /// because some items failed to resolve.
    pub fn apply(&mut self, list: &mut Vec<Entity>, page: Vec<Entity>, reset: bool) {
        let start = self.next_offset(reset);
        self.has_more = page.len() == self.limit;
        self.offset = start + self.limit;

        if reset {
            *list = page;
        } else {
            list.extend(page);
        }
    }
}

/// Fetches one window of the list endpoint and resolves every item to a
/// full entity. Items that fail to resolve are dropped.
pub async fn fetch_page(
    api: &ApiService,
    offset: usize,
    limit: usize,
    concurrency: usize,
) -> Result<Vec<Entity>> {
    let entries = api.list_page(limit, offset).await?;
    let requested = entries.len();

    let page: Vec<Entity> = stream::iter(entries.into_iter().enumerate())
        .map(|(index, entry)| async move {
            // The list endpoint is ordered by id; fall back to that when the url has none
            let key = entry
                .id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| (offset + index + 1).to_string());
            match api.get_pokemon(&key).await {
                Ok(entity) => Some(entity),
                Err(e) => {
                    tracing::warn!("Dropping {} from page at offset {}: {}", entry.name, offset, e);
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .filter_map(|entity| async move { entity })
        .collect()
        .await;

    tracing::debug!(
        "Fetched page offset={} limit={}: {}/{} resolved",
        offset,
        limit,
        page.len(),
        requested
    );
    Ok(page)
}
