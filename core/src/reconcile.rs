//! Cross-collection reconciliation: matching ingredient records by name,
//! merging duplicates, deducting for cooking and accruing purchases.
//!
//! Everything here is pure and works on in-memory lists. Loading and saving
//! is the service's job, which keeps each operation to one write per key.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{PantryIngredient, Recipe, ShoppingItem};
use crate::new_id;
use crate::quantity::{format_quantity, parse_quantity};

const DEFAULT_UNIT: &str = "x";

/// Join key for ingredient names: trimmed and lowercased.
///
/// Internal whitespace is kept as-is, so "soy  sauce" and "soy sauce" are
/// different ingredients here.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Lowercased unit, `"x"` (a plain count) when absent or blank.
#[must_use]
pub fn unit_key(unit: Option<&str>) -> String {
    unit.map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_UNIT)
        .to_lowercase()
}

/// A record that merges with others sharing its (name, unit) key.
pub trait StockRecord {
    fn name(&self) -> &str;
    fn unit(&self) -> Option<&str>;
    fn quantity(&self) -> &str;
    fn set_quantity(&mut self, quantity: String);

    fn merge_key(&self) -> (String, String) {
        (normalize_name(self.name()), unit_key(self.unit()))
    }

    fn quantity_value(&self) -> f64 {
        parse_quantity(self.quantity())
    }

    /// Add `amount` to the stored quantity and rewrite it in canonical form.
    fn accrue(&mut self, amount: f64) {
        let next = self.quantity_value() + amount;
        self.set_quantity(format_quantity(next));
    }
}

impl StockRecord for PantryIngredient {
    fn name(&self) -> &str {
        &self.name
    }
    fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
    fn quantity(&self) -> &str {
        &self.quantity
    }
    fn set_quantity(&mut self, quantity: String) {
        self.quantity = quantity;
    }
}

impl StockRecord for ShoppingItem {
    fn name(&self) -> &str {
        &self.name
    }
    fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
    fn quantity(&self) -> &str {
        &self.quantity
    }
    fn set_quantity(&mut self, quantity: String) {
        self.quantity = quantity;
    }
}

pub fn find_by_key<T: StockRecord>(items: &[T], name: &str, unit: Option<&str>) -> Option<usize> {
    let key = (normalize_name(name), unit_key(unit));
    items.iter().position(|item| item.merge_key() == key)
}

/// Where a merge-by-key-sum landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Accrued(usize),
    Appended(usize),
}

impl Merge {
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Accrued(i) | Self::Appended(i) => i,
        }
    }
}

/// Sum `amount` into the record keyed by (name, unit), or append `create()`.
pub fn merge_by_key_sum<T, F>(
    items: &mut Vec<T>,
    name: &str,
    unit: Option<&str>,
    amount: f64,
    create: F,
) -> Merge
where
    T: StockRecord,
    F: FnOnce() -> T,
{
    if let Some(idx) = find_by_key(items, name, unit) {
        items[idx].accrue(amount);
        Merge::Accrued(idx)
    } else {
        items.push(create());
        Merge::Appended(items.len() - 1)
    }
}

/// Fold records that share a key into the first of them, summing quantities.
#[must_use]
pub fn coalesce<T: StockRecord>(items: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    for item in items {
        let key = item.merge_key();
        if let Some(&idx) = seen.get(&key) {
            let amount = item.quantity_value();
            out[idx].accrue(amount);
        } else {
            seen.insert(key, out.len());
            out.push(item);
        }
    }
    out
}

// --- Pantry and shopping merges ---

/// Manual pantry entry: accrue into a matching record or append a new one.
pub fn add_to_pantry(
    pantry: &mut Vec<PantryIngredient>,
    name: &str,
    amount: f64,
    unit: Option<&str>,
) -> Merge {
    let unit = unit_key(unit);
    let merge = merge_by_key_sum(pantry, name, Some(&unit), amount, || PantryIngredient {
        id: new_id(),
        name: name.trim().to_string(),
        quantity: format_quantity(amount),
        unit: Some(unit.clone()),
    });
    pantry[merge.index()].unit = Some(unit);
    merge
}

/// Put `amount` of an ingredient on the shopping list.
pub fn add_to_shopping_list(
    list: &mut Vec<ShoppingItem>,
    name: &str,
    amount: f64,
    unit: Option<&str>,
) -> Merge {
    let unit = unit_key(unit);
    merge_by_key_sum(list, name, Some(&unit), amount, || ShoppingItem {
        id: new_id(),
        name: name.trim().to_string(),
        quantity: format_quantity(amount),
        unit: Some(unit.clone()),
        checked: Some(false),
    })
}

/// Credit purchased shopping items to the pantry. New pantry records keep
/// the item's name and quantity text.
pub fn credit_purchases(pantry: &mut Vec<PantryIngredient>, purchased: &[ShoppingItem]) {
    for item in purchased {
        let unit = unit_key(item.unit.as_deref());
        merge_by_key_sum(
            pantry,
            &item.name,
            Some(&unit),
            item.quantity_value(),
            || PantryIngredient {
                id: new_id(),
                name: item.name.clone(),
                quantity: item.quantity.clone(),
                unit: Some(unit.clone()),
            },
        );
    }
}

// --- Availability ---

/// Normalized name -> parsed quantity. When two pantry records share a name
/// (different units), the later one wins.
#[must_use]
pub fn pantry_quantities(pantry: &[PantryIngredient]) -> HashMap<String, f64> {
    pantry
        .iter()
        .map(|p| (normalize_name(&p.name), p.quantity_value()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientStatus {
    pub name: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub have_qty: f64,
    pub need_qty: f64,
    pub has_it: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipeFilter {
    #[default]
    All,
    Missing,
}

#[must_use]
pub fn recipe_availability(recipe: &Recipe, have: &HashMap<String, f64>) -> Vec<IngredientStatus> {
    recipe
        .ingredients
        .iter()
        .map(|ri| {
            let key = normalize_name(&ri.name);
            let have_qty = have.get(&key).copied().unwrap_or(0.0);
            let need_qty = ri.need();
            IngredientStatus {
                name: ri.name.clone(),
                key,
                unit: ri.unit.clone(),
                have_qty,
                need_qty,
                has_it: have_qty >= need_qty && have_qty > 0.0,
            }
        })
        .collect()
}

#[must_use]
pub fn is_makeable(statuses: &[IngredientStatus]) -> bool {
    statuses.iter().all(|s| s.has_it)
}

#[must_use]
pub fn apply_filter(statuses: Vec<IngredientStatus>, filter: RecipeFilter) -> Vec<IngredientStatus> {
    match filter {
        RecipeFilter::All => statuses,
        RecipeFilter::Missing => statuses.into_iter().filter(|s| !s.has_it).collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeStatus {
    pub recipe: Recipe,
    pub makeable: bool,
    pub ingredients: Vec<IngredientStatus>,
}

/// Availability view for one recipe; `makeable` always reflects the full list
/// even when the filter hides ingredients.
#[must_use]
pub fn recipe_status(recipe: &Recipe, pantry: &[PantryIngredient], filter: RecipeFilter) -> RecipeStatus {
    let statuses = recipe_availability(recipe, &pantry_quantities(pantry));
    RecipeStatus {
        recipe: recipe.clone(),
        makeable: is_makeable(&statuses),
        ingredients: apply_filter(statuses, filter),
    }
}

// --- Cooking ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shortage {
    pub name: String,
    pub need: f64,
    pub have: f64,
}

impl std::fmt::Display for Shortage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Not enough {}: need {}, have {}",
            self.name,
            format_quantity(self.need),
            format_quantity(self.have)
        )
    }
}

/// Deduct every ingredient of `recipe` from a copy of `pantry`.
///
/// Ingredients are checked in recipe order while the copy is being mutated,
/// so a shortage on a later ingredient is detected after earlier ones were
/// already deducted in the copy. The caller must only persist the returned
/// list; on `Err` the original pantry is untouched.
pub fn deduct_for_recipe(
    pantry: &[PantryIngredient],
    recipe: &Recipe,
) -> Result<Vec<PantryIngredient>, Shortage> {
    let mut next = pantry.to_vec();
    let mut index = name_index(&next);

    for ri in &recipe.ingredients {
        let key = normalize_name(&ri.name);
        let need = ri.need();
        let idx = index.get(&key).copied();
        let have = idx.map_or(0.0, |i| next[i].quantity_value());

        let Some(idx) = idx.filter(|_| have >= need) else {
            return Err(Shortage {
                name: ri.name.clone(),
                need,
                have,
            });
        };

        let remaining = have - need;
        if remaining <= 0.0 {
            next.remove(idx);
            index = name_index(&next);
        } else {
            next[idx].quantity = format_quantity(remaining);
        }
    }

    Ok(next)
}

fn name_index(pantry: &[PantryIngredient]) -> HashMap<String, usize> {
    pantry
        .iter()
        .enumerate()
        .map(|(i, p)| (normalize_name(&p.name), i))
        .collect()
}
