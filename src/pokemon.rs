// pokemon.rs
// Provider documents as returned by the remote API, and the canonical shapes
// the rest of the crate works with.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NamedAPIResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl NamedAPIResource {
    /// Numeric id embedded as the last path segment of the resource URL.
    pub fn id(&self) -> Option<u32> {
        resource_id(&self.url)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct APIResource {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NamedAPIResourceList {
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<NamedAPIResource>,
}

// Raw detail record, before normalization
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub sprites: Option<PokemonSprites>,
    #[serde(default)]
    pub abilities: Vec<PokemonAbility>,
    #[serde(default)]
    pub stats: Vec<PokemonStat>,
    #[serde(default)]
    pub types: Vec<PokemonType>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PokemonSprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub other: Option<OtherSprites>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: Option<SpriteSet>,
    #[serde(default)]
    pub dream_world: Option<SpriteSet>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SpriteSet {
    #[serde(default)]
    pub front_default: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonAbility {
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub slot: u32,
    pub ability: Option<NamedAPIResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonStat {
    pub base_stat: u32,
    #[serde(default)]
    pub effort: u32,
    pub stat: Option<NamedAPIResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonType {
    #[serde(default)]
    pub slot: u32,
    pub r#type: Option<NamedAPIResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonSpecies {
    pub id: u32,
    pub name: String,
    pub evolution_chain: Option<APIResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EvolutionChain {
    #[serde(default)]
    pub id: u32,
    pub chain: ChainLink,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainLink {
    pub species: NamedAPIResource,
    #[serde(default)]
    pub evolution_details: Vec<EvolutionDetail>,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EvolutionDetail {
    #[serde(default)]
    pub min_level: Option<u32>,
    #[serde(default)]
    pub trigger: Option<NamedAPIResource>,
}

/// A normalized creature record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: u32,
    pub name: String,
    pub image: String,
    pub types: Vec<String>,
    /// Decimetres.
    pub height: u32,
    /// Hectograms.
    pub weight: u32,
    pub abilities: Vec<String>,
    pub stats: Vec<Stat>,
}

impl Entity {
    pub fn has_any_type(&self, wanted: &[String]) -> bool {
        self.types.iter().any(|t| wanted.contains(t))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Stat {
    pub name: String,
    pub value: u32,
}

impl Stat {
    // Display scaling only; values above this are legal
    pub const DISPLAY_MAX: u32 = 200;

    /// Share of the display bar, clamped to 1.0.
    pub fn display_ratio(&self) -> f64 {
        (self.value as f64 / Self::DISPLAY_MAX as f64).min(1.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EvolutionNode {
    #[serde(flatten)]
    pub entity: Entity,
    /// Level required to evolve into this form.
    pub min_level: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TypeTag {
    pub name: String,
}

impl TypeTag {
    pub const RESERVED: [&'static str; 2] = ["unknown", "shadow"];

    pub fn is_filterable(&self) -> bool {
        !Self::RESERVED.contains(&self.name.as_str())
    }
}

pub type NameIndexEntry = NamedAPIResource;

/// Extracts the trailing numeric segment of a provider URL such as
/// `https://pokeapi.co/api/v2/pokemon/25/`.
pub fn resource_id(url: &str) -> Option<u32> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}
