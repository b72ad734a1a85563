//! Closed vocabulary of ingredients the guided-entry flows accept, with the
//! image asset each one is displayed with.

use serde::Serialize;

const MAX_SUGGESTIONS: usize = 6;

struct CatalogEntry {
    name: &'static str,
    asset: &'static str,
    width: u32,
    height: u32,
}

const fn entry(name: &'static str, asset: &'static str) -> CatalogEntry {
    CatalogEntry {
        name,
        asset,
        width: 48,
        height: 48,
    }
}

// Ordered as the autocomplete presents them.
const CATALOG: &[CatalogEntry] = &[
    entry("milk", "images/Milk.png"),
    entry("carrot", "images/Carrot.png"),
    CatalogEntry {
        name: "soy sauce",
        asset: "images/Soy_sauce.png",
        width: 36,
        height: 56,
    },
    entry("egg", "images/Egg.png"),
    entry("butter", "images/Butter.png"),
    entry("flour", "images/Flour.png"),
    entry("sugar", "images/Sugar.png"),
    entry("salt", "images/Salt.png"),
    entry("rice", "images/Rice.png"),
    entry("noodles", "images/Noodles.png"),
    entry("onion", "images/Onion.png"),
    entry("garlic", "images/Garlic.png"),
    entry("tomato", "images/Tomato.png"),
    entry("potato", "images/Potato.png"),
    entry("cheese", "images/Cheese.png"),
    entry("chicken", "images/Chicken.png"),
    entry("lettuce", "images/Lettuce.png"),
    CatalogEntry {
        name: "olive oil",
        asset: "images/Olive_oil.png",
        width: 36,
        height: 56,
    },
];

static DEFAULT_VISUAL: CatalogEntry = entry("", "images/default.png");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientVisual {
    pub asset: &'static str,
    pub width: u32,
    pub height: u32,
}

impl CatalogEntry {
    fn visual(&self) -> IngredientVisual {
        IngredientVisual {
            asset: self.asset,
            width: self.width,
            height: self.height,
        }
    }
}

/// Catalog lookup key. Unlike the reconciliation join key this also collapses
/// runs of internal whitespace.
#[must_use]
pub fn catalog_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn find(name: &str) -> Option<&'static CatalogEntry> {
    let key = catalog_key(name);
    CATALOG.iter().find(|e| e.name == key)
}

/// The catalog's spelling of `name`, if it is a known ingredient.
#[must_use]
pub fn canonical_name(name: &str) -> Option<&'static str> {
    find(name).map(|e| e.name)
}

#[must_use]
pub fn is_known(name: &str) -> bool {
    find(name).is_some()
}

#[must_use]
pub fn known_names() -> Vec<&'static str> {
    CATALOG.iter().map(|e| e.name).collect()
}

/// Autocomplete: catalog names containing `query`, capped at six. An empty
/// query suggests nothing.
#[must_use]
pub fn suggestions(query: &str) -> Vec<&'static str> {
    let q = catalog_key(query);
    if q.is_empty() {
        return Vec::new();
    }
    CATALOG
        .iter()
        .filter(|e| e.name.contains(&q))
        .map(|e| e.name)
        .take(MAX_SUGGESTIONS)
        .collect()
}

#[must_use]
pub fn resolve_visual(name: &str) -> IngredientVisual {
    find(name).unwrap_or(&DEFAULT_VISUAL).visual()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names_ordered() {
        let names = known_names();
        assert_eq!(&names[..4], &["milk", "carrot", "soy sauce", "egg"]);
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_is_known_normalizes() {
        assert!(is_known("Milk"));
        assert!(is_known("  EGG "));
        assert!(is_known("soy   sauce"));
        assert!(!is_known("dragon fruit"));
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("Soy Sauce"), Some("soy sauce"));
        assert_eq!(canonical_name("quinoa"), None);
    }

    #[test]
    fn test_suggestions() {
        assert!(suggestions("").is_empty());
        assert!(suggestions("   ").is_empty());
        assert_eq!(suggestions("car"), vec!["carrot"]);
        let o = suggestions("o");
        assert!(o.len() <= MAX_SUGGESTIONS);
        assert!(o.iter().all(|n| n.contains('o')));
    }

    #[test]
    fn test_resolve_visual_known_and_default() {
        let soy = resolve_visual("soy sauce");
        assert_eq!(soy.asset, "images/Soy_sauce.png");
        assert_eq!((soy.width, soy.height), (36, 56));

        let unknown = resolve_visual("durian");
        assert_eq!(unknown.asset, "images/default.png");
        assert_eq!((unknown.width, unknown.height), (48, 48));
    }
}
