use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use anyhow::{Result, bail};
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info};

use crate::db::Database;
use crate::models::{
    ExportData, ImportSummary, NewRecipe, PantryIngredient, Recipe, ShoppingItem,
    UpdatePantryIngredient, UpdateShoppingItem, validate_catalog_name, validate_export_data,
    validate_positive_quantity, validate_recipe,
};
use crate::quantity::format_quantity;
use crate::reconcile::{self, IngredientStatus, Merge, RecipeFilter, RecipeStatus, Shortage};
use crate::store::{
    KeyValueStore, PANTRY_KEY, RECIPES_KEY, SHOPPING_KEY, load_collection, save_collection,
};
use crate::{EXPORT_VERSION, new_id};

/// Result of cooking a recipe.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CookOutcome {
    Cooked { pantry: Vec<PantryIngredient> },
    Short(Shortage),
}

/// Asked before summing into a shopping entry that already exists.
#[derive(Debug, Clone, Serialize)]
pub struct MergePrompt {
    pub name: String,
    pub existing_quantity: String,
    pub unit: String,
    pub adding: f64,
}

impl fmt::Display for MergePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "You already have {} {} of {} in your shopping list. Add {} more?",
            self.existing_quantity,
            self.unit,
            self.name,
            format_quantity(self.adding)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "item", rename_all = "snake_case")]
pub enum ShoppingAdd {
    Added(ShoppingItem),
    Merged(ShoppingItem),
    Declined,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BulkShoppingAdd {
    NothingMissing,
    Declined,
    Added {
        added: usize,
        merged: usize,
        items: Vec<ShoppingItem>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purchase {
    Checked,
    All,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseSummary {
    pub purchased: usize,
    pub pantry: Vec<PantryIngredient>,
    pub shopping: Vec<ShoppingItem>,
}

/// Entry point for every pantry, recipe and shopping-list operation.
///
/// Holds no copies of the collections: each operation reads what it needs
/// from the store, reconciles in memory, and writes each changed key once.
pub struct KitchenService<S = Database> {
    store: S,
}

impl KitchenService<Database> {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { store: db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { store: db })
    }
}

impl<S: KeyValueStore> KitchenService<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // --- Loading ---

    pub fn pantry(&self) -> Result<Vec<PantryIngredient>> {
        load_collection(&self.store, PANTRY_KEY)
    }

    pub fn recipes(&self) -> Result<Vec<Recipe>> {
        load_collection(&self.store, RECIPES_KEY)
    }

    pub fn shopping_list(&self) -> Result<Vec<ShoppingItem>> {
        load_collection(&self.store, SHOPPING_KEY)
    }

    // --- Pantry ---

    /// Manual stock entry. The name must be in the catalog; a matching
    /// (name, unit) record is topped up instead of duplicated.
    pub fn add_pantry_ingredient(
        &self,
        name: &str,
        quantity: &str,
        unit: Option<&str>,
    ) -> Result<PantryIngredient> {
        let name = validate_catalog_name(name)?;
        let amount = validate_positive_quantity(quantity)?;

        let mut pantry = self.pantry()?;
        let merge = reconcile::add_to_pantry(&mut pantry, &name, amount, unit);
        let item = pantry[merge.index()].clone();
        save_collection(&self.store, PANTRY_KEY, &pantry)?;
        debug!(name = %item.name, quantity = %item.quantity, "pantry add");
        Ok(item)
    }

    /// Edit a pantry record. A blank quantity keeps the old one. If the edit
    /// makes the record collide with another (name, unit), the two merge.
    pub fn update_pantry_ingredient(
        &self,
        id: &str,
        update: &UpdatePantryIngredient,
    ) -> Result<Option<PantryIngredient>> {
        let name = update
            .name
            .as_deref()
            .map(validate_catalog_name)
            .transpose()?;

        let mut pantry = self.pantry()?;
        let Some(item) = pantry.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            item.name = name;
        }
        if let Some(q) = update.quantity.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            item.quantity = q.to_string();
        }
        if let Some(unit) = update.unit.as_deref() {
            item.unit = Some(reconcile::unit_key(Some(unit)));
        }
        let (name, unit) = (item.name.clone(), item.unit.clone());

        let pantry = reconcile::coalesce(pantry);
        save_collection(&self.store, PANTRY_KEY, &pantry)?;
        Ok(reconcile::find_by_key(&pantry, &name, unit.as_deref()).map(|i| pantry[i].clone()))
    }

    pub fn delete_pantry_ingredient(&self, id: &str) -> Result<bool> {
        let mut pantry = self.pantry()?;
        let before = pantry.len();
        pantry.retain(|p| p.id != id);
        if pantry.len() == before {
            return Ok(false);
        }
        save_collection(&self.store, PANTRY_KEY, &pantry)?;
        Ok(true)
    }

    // --- Recipes ---

    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let valid = validate_recipe(recipe)?;
        let mut recipes = self.recipes()?;
        let created = Recipe {
            id: new_id(),
            title: valid.title,
            image_key: valid.image_key,
            ingredients: valid.ingredients,
        };
        recipes.push(created.clone());
        save_collection(&self.store, RECIPES_KEY, &recipes)?;
        info!(id = %created.id, title = %created.title, "recipe created");
        Ok(created)
    }

    pub fn update_recipe(&self, id: &str, recipe: &NewRecipe) -> Result<Option<Recipe>> {
        let valid = validate_recipe(recipe)?;
        let mut recipes = self.recipes()?;
        let Some(existing) = recipes.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        existing.title = valid.title;
        existing.image_key = valid.image_key;
        existing.ingredients = valid.ingredients;
        let updated = existing.clone();
        save_collection(&self.store, RECIPES_KEY, &recipes)?;
        Ok(Some(updated))
    }

    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        let mut recipes = self.recipes()?;
        let before = recipes.len();
        recipes.retain(|r| r.id != id);
        if recipes.len() == before {
            return Ok(false);
        }
        save_collection(&self.store, RECIPES_KEY, &recipes)?;
        Ok(true)
    }

    pub fn get_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        Ok(self.recipes()?.into_iter().find(|r| r.id == id))
    }

    /// Look up by id, falling back to a case-insensitive title match.
    pub fn find_recipe(&self, id_or_title: &str) -> Result<Option<Recipe>> {
        let recipes = self.recipes()?;
        if let Some(r) = recipes.iter().find(|r| r.id == id_or_title) {
            return Ok(Some(r.clone()));
        }
        let title = reconcile::normalize_name(id_or_title);
        Ok(recipes
            .into_iter()
            .find(|r| reconcile::normalize_name(&r.title) == title))
    }

    /// Recipes whose normalized title contains the normalized query.
    pub fn search_recipes(&self, query: &str) -> Result<Vec<Recipe>> {
        let q = reconcile::normalize_name(query);
        let recipes = self.recipes()?;
        if q.is_empty() {
            return Ok(recipes);
        }
        Ok(recipes
            .into_iter()
            .filter(|r| reconcile::normalize_name(&r.title).contains(&q))
            .collect())
    }

    pub fn recipe_status(&self, recipe: &Recipe, filter: RecipeFilter) -> Result<RecipeStatus> {
        let pantry = self.pantry()?;
        Ok(reconcile::recipe_status(recipe, &pantry, filter))
    }

    // --- Cooking ---

    /// Deduct the recipe's ingredients from a freshly loaded pantry. On a
    /// shortage nothing is written; otherwise the pantry is written once.
    pub fn cook(&self, recipe: &Recipe) -> Result<CookOutcome> {
        let pantry = self.pantry()?;
        match reconcile::deduct_for_recipe(&pantry, recipe) {
            Ok(next) => {
                save_collection(&self.store, PANTRY_KEY, &next)?;
                info!(recipe = %recipe.title, "cooked; pantry updated");
                Ok(CookOutcome::Cooked { pantry: next })
            }
            Err(shortage) => {
                info!(recipe = %recipe.title, %shortage, "cook aborted");
                Ok(CookOutcome::Short(shortage))
            }
        }
    }

    // --- Shopping list ---

    /// Add `amount` of an ingredient to the shopping list.
    ///
    /// If a (name, unit) entry already exists, `confirm` decides whether to
    /// sum into it; pass `|_| true` to skip the question.
    pub fn add_to_shopping<F>(
        &self,
        name: &str,
        amount: f64,
        unit: Option<&str>,
        confirm: F,
    ) -> Result<ShoppingAdd>
    where
        F: FnOnce(&MergePrompt) -> bool,
    {
        if name.trim().is_empty() {
            bail!("Item name cannot be empty");
        }
        if !amount.is_finite() || amount <= 0.0 {
            bail!("Quantity must be greater than 0");
        }

        let mut list = self.shopping_list()?;
        if let Some(idx) = reconcile::find_by_key(&list, name, unit) {
            let existing = &list[idx];
            let prompt = MergePrompt {
                name: name.trim().to_string(),
                existing_quantity: existing.quantity.clone(),
                unit: reconcile::unit_key(existing.unit.as_deref()),
                adding: amount,
            };
            if !confirm(&prompt) {
                return Ok(ShoppingAdd::Declined);
            }
        }

        let merge = reconcile::add_to_shopping_list(&mut list, name, amount, unit);
        let item = list[merge.index()].clone();
        save_collection(&self.store, SHOPPING_KEY, &list)?;
        Ok(match merge {
            Merge::Accrued(_) => ShoppingAdd::Merged(item),
            Merge::Appended(_) => ShoppingAdd::Added(item),
        })
    }

    /// Put every ingredient the pantry can't cover onto the shopping list.
    /// `confirm` is asked once for the whole batch; merges are not asked
    /// about individually. One write.
    pub fn add_missing_to_shopping<F>(&self, recipe: &Recipe, confirm: F) -> Result<BulkShoppingAdd>
    where
        F: FnOnce(&[IngredientStatus]) -> bool,
    {
        let status = self.recipe_status(recipe, RecipeFilter::Missing)?;
        let missing = status.ingredients;
        if missing.is_empty() {
            return Ok(BulkShoppingAdd::NothingMissing);
        }
        if !confirm(&missing) {
            return Ok(BulkShoppingAdd::Declined);
        }

        let mut list = self.shopping_list()?;
        let (mut added, mut merged) = (0, 0);
        let mut touched = Vec::with_capacity(missing.len());
        for ing in &missing {
            let merge =
                reconcile::add_to_shopping_list(&mut list, &ing.name, ing.need_qty, ing.unit.as_deref());
            match merge {
                Merge::Accrued(_) => merged += 1,
                Merge::Appended(_) => added += 1,
            }
            touched.push(merge.index());
        }
        save_collection(&self.store, SHOPPING_KEY, &list)?;
        info!(recipe = %recipe.title, added, merged, "missing ingredients added to shopping list");

        let items = touched.into_iter().map(|i| list[i].clone()).collect();
        Ok(BulkShoppingAdd::Added {
            added,
            merged,
            items,
        })
    }

    /// Edit a shopping entry. Blank fields keep their old value; a collision
    /// with another (name, unit) entry merges the two.
    pub fn update_shopping_item(
        &self,
        id: &str,
        update: &UpdateShoppingItem,
    ) -> Result<Option<ShoppingItem>> {
        let quantity = update
            .quantity
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(validate_positive_quantity)
            .transpose()?;

        let mut list = self.shopping_list()?;
        let Some(item) = list.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(n) = update.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            item.name = n.to_string();
        }
        if let Some(q) = quantity {
            item.quantity = format_quantity(q);
        }
        if let Some(unit) = update.unit.as_deref() {
            item.unit = Some(reconcile::unit_key(Some(unit)));
        }
        let (name, unit) = (item.name.clone(), item.unit.clone());

        let list = reconcile::coalesce(list);
        save_collection(&self.store, SHOPPING_KEY, &list)?;
        Ok(reconcile::find_by_key(&list, &name, unit.as_deref()).map(|i| list[i].clone()))
    }

    pub fn toggle_checked(&self, id: &str) -> Result<Option<ShoppingItem>> {
        let mut list = self.shopping_list()?;
        let Some(item) = list.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        item.checked = Some(!item.is_checked());
        let toggled = item.clone();
        save_collection(&self.store, SHOPPING_KEY, &list)?;
        Ok(Some(toggled))
    }

    pub fn delete_shopping_item(&self, id: &str) -> Result<bool> {
        let mut list = self.shopping_list()?;
        let before = list.len();
        list.retain(|s| s.id != id);
        if list.len() == before {
            return Ok(false);
        }
        save_collection(&self.store, SHOPPING_KEY, &list)?;
        Ok(true)
    }

    /// Remove checked entries; returns how many went.
    pub fn delete_checked(&self) -> Result<usize> {
        let mut list = self.shopping_list()?;
        let before = list.len();
        list.retain(|s| !s.is_checked());
        let removed = before - list.len();
        if removed > 0 {
            save_collection(&self.store, SHOPPING_KEY, &list)?;
        }
        Ok(removed)
    }

    pub fn clear_shopping_list(&self) -> Result<usize> {
        let count = self.shopping_list()?.len();
        save_collection::<ShoppingItem, _>(&self.store, SHOPPING_KEY, &[])?;
        Ok(count)
    }

    /// Move purchased entries into the pantry.
    ///
    /// The pantry is written first, then the shopping list. The two keys are
    /// not updated atomically: if the second write fails the pantry already
    /// holds the items while the list still shows them, and buying again
    /// credits them twice.
    pub fn buy(&self, which: Purchase) -> Result<PurchaseSummary> {
        let list = self.shopping_list()?;
        let purchased: Vec<ShoppingItem> = match which {
            Purchase::Checked => list.iter().filter(|s| s.is_checked()).cloned().collect(),
            Purchase::All => list.clone(),
        };
        if purchased.is_empty() {
            return Ok(PurchaseSummary {
                purchased: 0,
                pantry: self.pantry()?,
                shopping: list,
            });
        }

        let mut pantry = self.pantry()?;
        reconcile::credit_purchases(&mut pantry, &purchased);
        save_collection(&self.store, PANTRY_KEY, &pantry)?;

        let bought: HashSet<&str> = purchased.iter().map(|s| s.id.as_str()).collect();
        let remaining: Vec<ShoppingItem> = list
            .into_iter()
            .filter(|s| !bought.contains(s.id.as_str()))
            .collect();
        save_collection(&self.store, SHOPPING_KEY, &remaining)?;
        info!(count = purchased.len(), "purchased items moved to pantry");

        Ok(PurchaseSummary {
            purchased: purchased.len(),
            pantry,
            shopping: remaining,
        })
    }

    // --- Export / Import ---

    pub fn export_data(&self) -> Result<ExportData> {
        Ok(ExportData {
            version: EXPORT_VERSION,
            exported_at: Local::now().to_rfc3339(),
            pantry: self.pantry()?,
            recipes: self.recipes()?,
            shopping: self.shopping_list()?,
        })
    }

    /// Replace all three collections with the contents of `data`. Duplicate
    /// (name, unit) records in the pantry and shopping list are merged.
    pub fn import_data(&self, data: &ExportData) -> Result<ImportSummary> {
        validate_export_data(data)?;
        let pantry = reconcile::coalesce(data.pantry.clone());
        let shopping = reconcile::coalesce(data.shopping.clone());
        save_collection(&self.store, PANTRY_KEY, &pantry)?;
        save_collection(&self.store, RECIPES_KEY, &data.recipes)?;
        save_collection(&self.store, SHOPPING_KEY, &shopping)?;
        Ok(ImportSummary {
            pantry: pantry.len(),
            recipes: data.recipes.len(),
            shopping: shopping.len(),
        })
    }
}
