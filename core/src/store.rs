//! Key-value persistence for the three collections.
//!
//! Each collection is one JSON array stored under a fixed, versioned key. A
//! format change means a new key; absence of data under a key reads as empty.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub const PANTRY_KEY: &str = "kitchie.ingredients.v1";
pub const RECIPES_KEY: &str = "kitchie.recipes.v1";
pub const SHOPPING_KEY: &str = "kitchie.shopping.v1";

/// String-keyed store holding serialized collections.
///
/// Implemented by the SQLite [`Database`](crate::db::Database) and by
/// [`MemoryStore`]. Mobile hosts can implement it over their platform storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Read a collection. Missing keys and malformed JSON both read as empty.
pub fn load_collection<T, S>(store: &S, key: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(items) => Ok(items),
        Err(e) => {
            warn!(key, error = %e, "stored collection is not a valid array; treating as empty");
            Ok(Vec::new())
        }
    }
}

pub fn save_collection<T, S>(store: &S, key: &str, items: &[T]) -> Result<()>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let json = serde_json::to_string(items).context("Failed to serialize collection")?;
    store
        .set(key, &json)
        .with_context(|| format!("Failed to write '{key}'"))?;
    debug!(key, count = items.len(), "saved collection");
    Ok(())
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PantryIngredient;

    #[test]
    fn test_missing_key_reads_empty() {
        let store = MemoryStore::new();
        let items: Vec<PantryIngredient> = load_collection(&store, PANTRY_KEY).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_malformed_json_reads_empty() {
        let store = MemoryStore::new();
        store.set(PANTRY_KEY, "{not json").unwrap();
        let items: Vec<PantryIngredient> = load_collection(&store, PANTRY_KEY).unwrap();
        assert!(items.is_empty());

        store.set(PANTRY_KEY, r#"{"id":"1"}"#).unwrap();
        let items: Vec<PantryIngredient> = load_collection(&store, PANTRY_KEY).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let items = vec![PantryIngredient {
            id: "1".to_string(),
            name: "Egg".to_string(),
            quantity: "3".to_string(),
            unit: None,
        }];
        save_collection(&store, PANTRY_KEY, &items).unwrap();
        let loaded: Vec<PantryIngredient> = load_collection(&store, PANTRY_KEY).unwrap();
        assert_eq!(loaded, items);
    }

    #[test]
    fn test_keys_are_versioned_and_distinct() {
        for key in [PANTRY_KEY, RECIPES_KEY, SHOPPING_KEY] {
            assert!(key.ends_with(".v1"));
        }
        assert_ne!(PANTRY_KEY, SHOPPING_KEY);
    }
}
