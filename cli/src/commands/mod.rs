mod catalog;
mod cook;
mod helpers;
mod pantry;
mod recipe;
mod shopping;
mod transfer;

use anyhow::Result;

use kitchie_core::models::Recipe;
use kitchie_core::service::KitchenService;

use helpers::{match_id, not_found};

pub(crate) use catalog::cmd_catalog;
pub(crate) use cook::cmd_cook;
pub(crate) use pantry::{cmd_pantry_add, cmd_pantry_edit, cmd_pantry_list, cmd_pantry_remove};
pub(crate) use recipe::{
    cmd_recipe_create, cmd_recipe_delete, cmd_recipe_edit, cmd_recipe_import, cmd_recipe_list,
    cmd_recipe_show,
};
pub(crate) use shopping::{
    cmd_shop_add, cmd_shop_buy, cmd_shop_check, cmd_shop_clear, cmd_shop_clear_checked,
    cmd_shop_edit, cmd_shop_list, cmd_shop_missing, cmd_shop_remove,
};
pub(crate) use transfer::{cmd_export, cmd_import};

/// Resolve a recipe by id, id prefix, or title. Exits with status 2 when
/// nothing matches.
pub(super) fn resolve_recipe(svc: &KitchenService, query: &str, json: bool) -> Result<Recipe> {
    if let Some(recipe) = svc.find_recipe(query)? {
        return Ok(recipe);
    }
    let recipes = svc.recipes()?;
    if let Some(id) = match_id(recipes.iter().map(|r| r.id.as_str()), query)? {
        if let Some(recipe) = recipes.into_iter().find(|r| r.id == id) {
            return Ok(recipe);
        }
    }
    not_found(&format!("Recipe '{query}' not found"), json)
}
