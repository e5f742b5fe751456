use crate::pokemon::{Entity, Pokemon, Stat};

const ARTWORK_FALLBACK: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork";

pub fn fallback_image(id: u32) -> String {
    format!("{}/{}.png", ARTWORK_FALLBACK, id)
}

/// Maps a raw detail record onto the canonical [`Entity`].
///
/// Image preference: official artwork, dream world, default front sprite,
/// then a URL templated from the id. Blank URLs count as absent.
pub fn normalize(raw: &Pokemon) -> Entity {
    let sprites = raw.sprites.as_ref();
    let other = sprites.and_then(|s| s.other.as_ref());

    let image = [
        other
            .and_then(|o| o.official_artwork.as_ref())
            .and_then(|s| s.front_default.as_deref()),
        other
            .and_then(|o| o.dream_world.as_ref())
            .and_then(|s| s.front_default.as_deref()),
        sprites.and_then(|s| s.front_default.as_deref()),
    ]
    .into_iter()
    .flatten()
    .find(|url| !url.trim().is_empty())
    .map(str::to_string)
    .unwrap_or_else(|| fallback_image(raw.id));

    let mut types: Vec<_> = raw
        .types
        .iter()
        .filter_map(|t| t.r#type.as_ref().map(|r| (t.slot, r.name.clone())))
        .collect();
    types.sort_by_key(|(slot, _)| *slot);

    Entity {
        id: raw.id,
        name: raw.name.to_lowercase(),
        image,
        types: types.into_iter().map(|(_, name)| name).collect(),
        height: raw.height,
        weight: raw.weight,
        abilities: raw
            .abilities
            .iter()
            .filter_map(|a| a.ability.as_ref().map(|r| r.name.clone()))
            .collect(),
        stats: raw
            .stats
            .iter()
            .filter_map(|s| {
                s.stat.as_ref().map(|r| Stat {
                    name: r.name.clone(),
                    value: s.base_stat,
                })
            })
            .collect(),
    }
}
