use crate::cache::TtlCache;
use crate::client::ResourceClient;
use crate::error::Result;
use crate::normalize::normalize;
use crate::pokemon::{
    Entity, EvolutionChain, NameIndexEntry, NamedAPIResourceList, Pokemon, PokemonSpecies, TypeTag,
};

/// Typed access to the provider endpoints, with normalized detail lookups
/// memoized in a [`TtlCache`].
pub struct ApiService {
    client: ResourceClient,
    details: TtlCache<Entity>,
}

impl ApiService {
    pub fn new(client: ResourceClient, details: TtlCache<Entity>) -> Self {
        Self { client, details }
    }

    /// Detail lookup by numeric id or by name.
    pub async fn get_pokemon(&self, id_or_name: &str) -> Result<Entity> {
        let key = id_or_name.trim().to_lowercase();
        if let Some(entity) = self.details.get(&key) {
            return Ok(entity);
        }

        let raw: Pokemon = self.client.fetch(&format!("pokemon/{}", key), &[]).await?;
        let entity = normalize(&raw);
        tracing::debug!("Fetched Pokémon: {} (ID: {})", entity.name, entity.id);

        self.details.insert(entity.id.to_string(), entity.clone());
        self.details.insert(entity.name.clone(), entity.clone());

        let stats = self.details.stats();
        tracing::debug!(
            "Detail cache: {} entries, {:.0}% hit rate, {} evictions",
            self.details.len(),
            stats.hit_rate() * 100.0,
            stats.evictions
        );
        Ok(entity)
    }

    pub async fn get_pokemon_by_id(&self, id: u32) -> Result<Entity> {
        self.get_pokemon(&id.to_string()).await
    }

    pub async fn get_species(&self, id: u32) -> Result<PokemonSpecies> {
        self.client.fetch(&format!("pokemon-species/{}", id), &[]).await
    }

    pub async fn get_evolution_chain(&self, url: &str) -> Result<EvolutionChain> {
        self.client.fetch_url_as(url).await
    }

    pub async fn list_page(&self, limit: usize, offset: usize) -> Result<Vec<NameIndexEntry>> {
        let list: NamedAPIResourceList = self
            .client
            .fetch(
                "pokemon",
                &[("limit", limit.to_string()), ("offset", offset.to_string())],
            )
            .await?;
        Ok(list.results)
    }

    pub async fn get_types(&self) -> Result<Vec<TypeTag>> {
        let list: NamedAPIResourceList = self.client.fetch("type", &[]).await?;
        Ok(list
            .results
            .into_iter()
            .map(|r| TypeTag { name: r.name })
            .collect())
    }

    /// Exact name/id lookup; any failure is an empty result.
    pub async fn search_exact(&self, query: &str) -> Vec<Entity> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        match self.get_pokemon(query).await {
            Ok(entity) => vec![entity],
            Err(e) => {
                tracing::debug!("No exact match for {:?}: {}", query, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::testing::{BASE_URL, FakeTransport, fake_client};
    use serde_json::json;
    use std::sync::Arc;

    fn service(transport: Arc<FakeTransport>) -> ApiService {
        ApiService::new(fake_client(transport), TtlCache::new(&CacheConfig::default()))
    }

    #[tokio::test]
    async fn test_detail_lookups_are_memoized() {
        let transport = Arc::new(FakeTransport::new());
        transport.add_pokemon(25, "pikachu", &["electric"]);
        let api = service(transport.clone());

        let first = api.get_pokemon_by_id(25).await.unwrap();
        let second = api.get_pokemon("25").await.unwrap();
        let by_name = api.get_pokemon("Pikachu").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, by_name);
        assert_eq!(transport.calls(&format!("{}/pokemon/25", BASE_URL)), 1);
        assert_eq!(transport.calls(&format!("{}/pokemon/pikachu", BASE_URL)), 0);
    }

    #[tokio::test]
    async fn test_types_and_list_page() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            &format!("{}/type", BASE_URL),
            json!({"results": [{"name": "fire", "url": ""}, {"name": "shadow", "url": ""}]}),
        );
        transport.add_list(2, 0, &[(1, "bulbasaur"), (2, "ivysaur")]);
        let api = service(transport);

        let types = api.get_types().await.unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(types[0].name, "fire");

        let page = api.list_page(2, 0).await.unwrap();
        assert_eq!(page[1].name, "ivysaur");
        assert_eq!(page[1].id(), Some(2));
    }

    #[tokio::test]
    async fn test_search_exact_swallows_failures() {
        let transport = Arc::new(FakeTransport::new());
        transport.add_pokemon(4, "charmander", &["fire"]);
        let api = service(transport);

        assert_eq!(api.search_exact(" charmander ").await.len(), 1);
        assert!(api.search_exact("missingno").await.is_empty());
        assert!(api.search_exact("").await.is_empty());
    }
}
