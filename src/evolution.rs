use crate::api::ApiService;
use crate::pokemon::{ChainLink, EvolutionNode, PokemonSpecies};
use futures::future::join_all;

/// One visited chain node before detail resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub id: Option<u32>,
    pub name: String,
    pub min_level: Option<u32>,
}

impl ChainStep {
    // Ids come from the species URL; names are the fallback key
    fn lookup_key(&self) -> String {
        self.id
            .map(|id| id.to_string())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Depth-first pre-order walk of the chain tree.
///
/// Each node takes its level from the first transition detail of the edge
/// that leads into it; the root has none.
pub fn flatten_chain(root: &ChainLink) -> Vec<ChainStep> {
    let mut steps = Vec::new();
    let mut stack: Vec<(&ChainLink, Option<u32>)> = vec![(root, None)];

    while let Some((link, min_level)) = stack.pop() {
        steps.push(ChainStep {
            id: link.species.id(),
            name: link.species.name.clone(),
            min_level,
        });

        // Reversed so the first child is visited first
        for child in link.evolves_to.iter().rev() {
            let level = child
                .evolution_details
                .first()
                .and_then(|detail| detail.min_level)
                .filter(|level| *level > 0);
            stack.push((child, level));
        }
    }

    steps
}

/// Resolves the evolution line of a species into full entities, in chain
/// order. Missing members are dropped; a chain that cannot be fetched yields
/// an empty line.
pub async fn resolve_evolutions(api: &ApiService, species_id: u32) -> Vec<EvolutionNode> {
    match api.get_species(species_id).await {
        Ok(species) => resolve_for_species(api, &species).await,
        Err(e) => {
            tracing::warn!("Failed to fetch species {}: {}", species_id, e);
            Vec::new()
        }
    }
}

/// Same as [`resolve_evolutions`] for an already fetched species record.
pub async fn resolve_for_species(api: &ApiService, species: &PokemonSpecies) -> Vec<EvolutionNode> {
    let Some(chain_ref) = species.evolution_chain.as_ref() else {
        tracing::debug!("Species {} has no evolution chain", species.id);
        return Vec::new();
    };

    let chain = match api.get_evolution_chain(&chain_ref.url).await {
        Ok(chain) => chain,
        Err(e) => {
            tracing::warn!("Failed to fetch evolution chain {}: {}", chain_ref.url, e);
            return Vec::new();
        }
    };

    resolve_steps(api, flatten_chain(&chain.chain)).await
}

pub async fn resolve_steps(api: &ApiService, steps: Vec<ChainStep>) -> Vec<EvolutionNode> {
    let lookups = steps.iter().map(|step| async move {
        match api.get_pokemon(&step.lookup_key()).await {
            Ok(entity) => Some(EvolutionNode {
                entity,
                min_level: step.min_level,
            }),
            Err(e) => {
                tracing::warn!("Dropping evolution {} from chain: {}", step.name, e);
                None
            }
        }
    });

    join_all(lookups).await.into_iter().flatten().collect()
}
