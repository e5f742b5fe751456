//! The single state container behind the catalog.
//!
//! [`PokemonStore`] owns the paginated list, the active search and type
//! filters, the name index and the favorites set. All mutation goes through
//! its actions, and every action that touches the list or a filter leaves
//! `filtered_list` recomputed before the state lock is released, so a reader
//! never observes a half-applied update.
//!
//! Network awaits never happen under the lock. Requests for the same concern
//! carry a sequence number taken when they start; a result is applied only if
//! no newer request of that concern has started since.

use crate::api::ApiService;
use crate::cache::TtlCache;
use crate::client::ResourceClient;
use crate::config::{Config, PokemonConfig};
use crate::error::Result;
use crate::evolution::resolve_for_species;
use crate::favorites::{Favorites, FavoritesPersister, JsonFileStore, KeyValueStore, PersistHandle};
use crate::filter::{apply_filters, filterable_types, is_active_query, toggle_type};
use crate::name_index::NameIndex;
use crate::pagination::{Pager, fetch_page};
use crate::pokemon::{Entity, EvolutionNode, TypeTag};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy)]
pub struct StoreSettings {
    pub page_size: usize,
    pub search_limit: usize,
    pub name_index_limit: usize,
    pub concurrency: usize,
}

impl From<&PokemonConfig> for StoreSettings {
    fn from(config: &PokemonConfig) -> Self {
        Self {
            page_size: config.page_size,
            search_limit: config.search_limit,
            name_index_limit: config.name_index_limit,
            concurrency: config.concurrency,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings::from(&PokemonConfig::default())
    }
}

/// Consistent copy of every readable store field.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub pokemon_list: Vec<Entity>,
    pub filtered_list: Vec<Entity>,
    pub favorites: Vec<Entity>,
    pub pokemon_types: Vec<TypeTag>,
    pub loading: bool,
    pub searching: bool,
    pub detail_loading: bool,
    pub error: Option<String>,
    pub search_query: String,
    pub selected_types: Vec<String>,
    pub offset: usize,
    pub has_more: bool,
    pub name_index_size: usize,
    pub names_loading: bool,
    pub names_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PokemonDetail {
    #[serde(flatten)]
    pub entity: Entity,
    pub evolutions: Vec<EvolutionNode>,
}

struct State {
    pokemon_list: Vec<Entity>,
    filtered_list: Vec<Entity>,
    // Set while a global name search owns the view
    search_results: Option<Vec<Entity>>,
    favorites: Favorites,
    favorites_generation: u64,
    pokemon_types: Vec<TypeTag>,
    loading: bool,
    searching: bool,
    detail_requests: usize,
    error: Option<String>,
    search_query: String,
    selected_types: Vec<String>,
    pager: Pager,
    name_index: Arc<NameIndex>,
    names_loading: bool,
    names_error: Option<String>,
    list_seq: u64,
    search_seq: u64,
}

impl State {
    fn new(page_size: usize) -> Self {
        Self {
            pokemon_list: Vec::new(),
            filtered_list: Vec::new(),
            search_results: None,
            favorites: Favorites::default(),
            favorites_generation: 0,
            pokemon_types: Vec::new(),
            loading: false,
            searching: false,
            detail_requests: 0,
            error: None,
            search_query: String::new(),
            selected_types: Vec::new(),
            pager: Pager::new(page_size),
            name_index: Arc::new(NameIndex::default()),
            names_loading: false,
            names_error: None,
            list_seq: 0,
            search_seq: 0,
        }
    }

    fn refresh_view(&mut self) {
        self.filtered_list = match &self.search_results {
            Some(results) => apply_filters(results, "", &self.selected_types),
            None => apply_filters(&self.pokemon_list, &self.search_query, &self.selected_types),
        };
    }

    fn filters_active(&self) -> bool {
        is_active_query(&self.search_query) || !self.selected_types.is_empty()
    }
}

pub struct PokemonStore {
    api: ApiService,
    persister: FavoritesPersister,
    settings: StoreSettings,
    state: Mutex<State>,
}

impl PokemonStore {
    pub fn new(api: ApiService, persister: FavoritesPersister, settings: StoreSettings) -> Self {
        Self {
            api,
            persister,
            settings,
            state: Mutex::new(State::new(settings.page_size)),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = ResourceClient::from_config(&config.pokemon, &config.retry)?;
        let api = ApiService::new(client, TtlCache::new(&config.cache));
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.favorites.path));
        let persister = FavoritesPersister::new(store, config.favorites.key.clone());
        Ok(Self::new(api, persister, StoreSettings::from(&config.pokemon)))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.state();
        StoreSnapshot {
            pokemon_list: state.pokemon_list.clone(),
            filtered_list: state.filtered_list.clone(),
            favorites: state.favorites.entries().to_vec(),
            pokemon_types: state.pokemon_types.clone(),
            loading: state.loading,
            searching: state.searching,
            detail_loading: state.detail_requests > 0,
            error: state.error.clone(),
            search_query: state.search_query.clone(),
            selected_types: state.selected_types.clone(),
            offset: state.pager.offset,
            has_more: state.pager.has_more,
            name_index_size: state.name_index.len(),
            names_loading: state.names_loading,
            names_error: state.names_error.clone(),
        }
    }

    pub fn filtered_list(&self) -> Vec<Entity> {
        self.state().filtered_list.clone()
    }

    // Favorites

    pub async fn load_favorites(&self) {
        let loaded = self.persister.load().await;
        let mut state = self.state();
        if state.favorites_generation > 0 {
            tracing::warn!("Favorites changed while loading; keeping in-memory set");
            return;
        }
        state.favorites = loaded;
    }

    /// Flips membership in memory right away; the returned handle tracks the
    /// detached write and may be dropped.
    pub fn toggle_favorite(&self, entity: Entity) -> PersistHandle {
        let mut state = self.state();
        let id = entity.id;
        let now_favorite = state.favorites.toggle(entity);
        state.favorites_generation += 1;
        tracing::debug!("Pokémon {} favorite: {}", id, now_favorite);
        self.persister.persist(state.favorites_generation, &state.favorites)
    }

    pub fn is_favorite(&self, id: u32) -> bool {
        self.state().favorites.contains(id)
    }

    pub fn favorites(&self) -> Vec<Entity> {
        self.state().favorites.entries().to_vec()
    }

    // List

    // Claims the list concern; `guarded` refuses while a page is in flight,
    // the data is exhausted or a filter is active
    fn begin_list_fetch(&self, reset: bool, guarded: bool) -> Option<(u64, usize)> {
        let mut state = self.state();
        if guarded && (state.loading || !state.pager.has_more || state.filters_active()) {
            return None;
        }
        state.list_seq += 1;
        state.loading = true;
        state.error = None;
        Some((state.list_seq, state.pager.next_offset(reset)))
    }

    /// Fetches one page. `reset` starts over at offset 0 and replaces the list.
    pub async fn fetch_pokemon_list(&self, reset: bool) -> Result<()> {
        let Some((seq, offset)) = self.begin_list_fetch(reset, false) else {
            return Ok(());
        };
        self.run_list_fetch(seq, offset, reset).await
    }

    /// Infinite-scroll continuation. Returns whether a page was requested.
    pub async fn fetch_more_pokemon(&self) -> Result<bool> {
        let Some((seq, offset)) = self.begin_list_fetch(false, true) else {
            tracing::debug!("Not fetching more: busy, exhausted or filtered");
            return Ok(false);
        };
        self.run_list_fetch(seq, offset, false).await?;
        Ok(true)
    }

    async fn run_list_fetch(&self, seq: u64, offset: usize, reset: bool) -> Result<()> {
        let result = fetch_page(
            &self.api,
            offset,
            self.settings.page_size,
            self.settings.concurrency,
        )
        .await;

        let mut state = self.state();
        if state.list_seq != seq {
            tracing::debug!("Discarding superseded page at offset {}", offset);
            return Ok(());
        }
        state.loading = false;

        match result {
            Ok(page) => {
                let state = &mut *state;
                state.pager.apply(&mut state.pokemon_list, page, reset);
                state.refresh_view();
                tracing::info!(
                    "Pokémon list now {} entries (offset {}, more: {})",
                    state.pokemon_list.len(),
                    state.pager.offset,
                    state.pager.has_more
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to fetch Pokémon list: {}", e);
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    // Name index and search

    pub async fn fetch_all_pokemon_names(&self) -> Result<()> {
        {
            let mut state = self.state();
            if state.names_loading {
                return Ok(());
            }
            state.names_loading = true;
            state.names_error = None;
        }

        let result = NameIndex::load_all(&self.api, self.settings.name_index_limit).await;

        let mut state = self.state();
        state.names_loading = false;
        match result {
            Ok(index) => {
                state.name_index = Arc::new(index);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to fetch all Pokémon names: {}", e);
                state.names_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Global search. A blank query falls back to the local filtered view;
    /// otherwise the view is replaced by name index hits.
    pub async fn search_pokemon(&self, query: &str) {
        let (seq, index) = {
            let mut state = self.state();
            state.search_query = query.to_string();
            state.search_seq += 1;
            if !is_active_query(query) {
                state.search_results = None;
                state.searching = false;
                state.refresh_view();
                return;
            }
            state.searching = true;
            (state.search_seq, Arc::clone(&state.name_index))
        };

        let results = if index.is_empty() {
            tracing::debug!("Name index not loaded; exact lookup for {:?}", query);
            self.api.search_exact(query).await
        } else {
            index
                .search(
                    &self.api,
                    query,
                    self.settings.search_limit,
                    self.settings.concurrency,
                )
                .await
        };

        let mut state = self.state();
        if state.search_seq != seq {
            tracing::debug!("Discarding stale results for {:?}", query);
            return;
        }
        state.searching = false;
        state.search_results = Some(results);
        state.refresh_view();
    }

    // Filters

    pub fn toggle_type_filter(&self, type_name: &str) {
        let mut state = self.state();
        toggle_type(&mut state.selected_types, type_name);
        state.refresh_view();
    }

    pub fn apply_filters(&self) {
        self.state().refresh_view();
    }

    pub fn clear_filters(&self) {
        let mut state = self.state();
        state.search_query.clear();
        state.selected_types.clear();
        state.search_results = None;
        state.searching = false;
        // Outstanding searches must not repopulate the view
        state.search_seq += 1;
        state.filtered_list = state.pokemon_list.clone();
    }

    pub async fn fetch_pokemon_types(&self) {
        match self.api.get_types().await {
            Ok(types) => self.state().pokemon_types = types,
            Err(e) => tracing::error!("Error fetching types: {}", e),
        }
    }

    /// Types offered as filters, without the reserved pseudo-types.
    pub fn filterable_types(&self) -> Vec<TypeTag> {
        filterable_types(&self.state().pokemon_types)
    }

    // Detail

    /// Looks an entity up among loaded data before asking the provider.
    pub async fn entity(&self, id: u32) -> Result<Entity> {
        let known = {
            let state = self.state();
            state
                .pokemon_list
                .iter()
                .chain(state.filtered_list.iter())
                .chain(state.favorites.entries())
                .find(|e| e.id == id)
                .cloned()
        };
        match known {
            Some(entity) => Ok(entity),
            None => self.api.get_pokemon_by_id(id).await,
        }
    }

    pub async fn fetch_pokemon_with_evolutions(&self, id: u32) -> Result<PokemonDetail> {
        {
            let mut state = self.state();
            state.detail_requests += 1;
            state.error = None;
        }

        let result = self.load_detail(id).await;

        let mut state = self.state();
        state.detail_requests = state.detail_requests.saturating_sub(1);
        if let Err(e) = &result {
            tracing::error!("Failed to load Pokémon {}: {}", id, e);
            state.error = Some(e.to_string());
        }
        result
    }

    async fn load_detail(&self, id: u32) -> Result<PokemonDetail> {
        let entity = self.api.get_pokemon_by_id(id).await?;
        let species = self.api.get_species(id).await?;
        let evolutions = resolve_for_species(&self.api, &species).await;
        Ok(PokemonDetail { entity, evolutions })
    }

    pub fn clear_error(&self) {
        self.state().error = None;
    }
}
