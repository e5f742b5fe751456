use crate::pokemon::{Entity, TypeTag};

/// True when `query` is a non-blank search.
pub fn is_active_query(query: &str) -> bool {
    !query.trim().is_empty()
}

pub fn matches_query(entity: &Entity, query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || entity.name.to_lowercase().contains(&query.to_lowercase())
}

pub fn matches_types(entity: &Entity, selected: &[String]) -> bool {
    selected.is_empty() || entity.has_any_type(selected)
}

/// Name-substring AND type-intersection view over `list`; inactive
/// predicates pass everything through.
pub fn apply_filters(list: &[Entity], query: &str, selected_types: &[String]) -> Vec<Entity> {
    if !is_active_query(query) && selected_types.is_empty() {
        return list.to_vec();
    }
    list.iter()
        .filter(|e| matches_query(e, query) && matches_types(e, selected_types))
        .cloned()
        .collect()
}

/// Adds `name` when absent, removes it when present. Insertion order is kept.
pub fn toggle_type(selected: &mut Vec<String>, name: &str) {
    if let Some(pos) = selected.iter().position(|t| t == name) {
        selected.remove(pos);
    } else {
        selected.push(name.to_string());
    }
}

/// The type vocabulary minus the reserved pseudo-types.
pub fn filterable_types(types: &[TypeTag]) -> Vec<TypeTag> {
    types.iter().filter(|t| t.is_filterable()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::entity;

    fn sample() -> Vec<Entity> {
        vec![
            entity(1, "bulbasaur", &["grass", "poison"]),
            entity(4, "charmander", &["fire"]),
            entity(6, "charizard", &["fire", "flying"]),
            entity(7, "squirtle", &["water"]),
        ]
    }

    fn names(list: &[Entity]) -> Vec<&str> {
        list.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_inactive_filters_are_identity() {
        let list = sample();
        assert_eq!(apply_filters(&list, "", &[]), list);
        assert_eq!(apply_filters(&list, "   ", &[]), list);
    }

    #[test]
    fn test_query_is_trimmed_and_case_insensitive() {
        let list = sample();
        assert_eq!(names(&apply_filters(&list, "  CHAR ", &[])), vec!["charmander", "charizard"]);
    }

    #[test]
    fn test_types_intersect() {
        let list = sample();
        let selected = vec!["flying".to_string(), "water".to_string()];
        assert_eq!(names(&apply_filters(&list, "", &selected)), vec!["charizard", "squirtle"]);
    }

    #[test]
    fn test_predicates_compose_with_and() {
        let list = sample();
        let selected = vec!["fire".to_string()];
        assert_eq!(names(&apply_filters(&list, "zard", &selected)), vec!["charizard"]);
        assert!(apply_filters(&list, "squirt", &selected).is_empty());
    }

    #[test]
    fn test_every_matching_entity_is_kept() {
        let list = sample();
        for e in &list {
            for len in 1..=e.name.len() {
                let query = e.name[..len].to_uppercase();
                assert!(apply_filters(&list, &query, &[]).contains(e), "{} / {}", e.name, query);
            }
        }
    }

    #[test]
    fn test_toggle_type_keeps_order() {
        let mut selected = Vec::new();
        toggle_type(&mut selected, "fire");
        toggle_type(&mut selected, "water");
        toggle_type(&mut selected, "grass");
        toggle_type(&mut selected, "water");
        assert_eq!(selected, vec!["fire", "grass"]);
    }

    #[test]
    fn test_filterable_types_drop_reserved() {
        let types: Vec<TypeTag> = ["normal", "unknown", "fire", "shadow"]
            .into_iter()
            .map(|name| TypeTag { name: name.to_string() })
            .collect();
        let kept: Vec<_> = filterable_types(&types).into_iter().map(|t| t.name).collect();
        assert_eq!(kept, vec!["normal", "fire"]);
    }
}
