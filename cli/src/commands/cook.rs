use anyhow::{Result, bail};
use std::process;

use kitchie_core::reconcile::RecipeFilter;
use kitchie_core::service::{CookOutcome, KitchenService};

use super::helpers::{confirm, print_json, to_title};
use super::recipe::print_status_table;
use super::resolve_recipe;

/// Check the recipe against the pantry, confirm, then deduct.
///
/// The pre-check uses the pantry as read here; the deduction re-reads it, so
/// a shortage can still be reported if stock changed in between.
pub(crate) fn cmd_cook(svc: &KitchenService, query: &str, yes: bool, json: bool) -> Result<()> {
    let recipe = resolve_recipe(svc, query, json)?;
    let status = svc.recipe_status(&recipe, RecipeFilter::Missing)?;

    if !status.makeable {
        if json {
            print_json(&serde_json::json!({ "status": "missing", "ingredients": status.ingredients }))?;
            process::exit(1);
        }
        print_status_table(&status.ingredients);
        let names: Vec<String> = status.ingredients.iter().map(|i| to_title(&i.name)).collect();
        bail!("You're missing: {}", names.join(", "));
    }

    if !confirm(
        "Finish cooking? This will deduct the required ingredients from your pantry.",
        yes,
    )? {
        eprintln!("Cancelled");
        return Ok(());
    }

    match svc.cook(&recipe)? {
        CookOutcome::Cooked { pantry } => {
            if json {
                print_json(&CookOutcome::Cooked { pantry })
            } else {
                println!("Done! Pantry updated for {} ({} items left)", recipe.title, pantry.len());
                Ok(())
            }
        }
        CookOutcome::Short(shortage) => {
            if json {
                print_json(&CookOutcome::Short(shortage))?;
                process::exit(1);
            }
            bail!("{shortage}");
        }
    }
}
