use anyhow::{Context, Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};
use tracing::warn;

use kitchie_core::catalog;
use kitchie_core::models::{NewRecipe, RecipeIngredient, dish_emoji};
use kitchie_core::quantity::{format_quantity, parse_quantity};
use kitchie_core::reconcile::{IngredientStatus, RecipeFilter, recipe_status};
use kitchie_core::service::KitchenService;

use super::helpers::{
    parse_dish_image, parse_ingredient_arg, print_json, short_id, truncate,
};
use super::resolve_recipe;

pub(crate) fn cmd_recipe_create(
    svc: &KitchenService,
    title: &str,
    image: Option<&str>,
    ingredients: &[String],
    json: bool,
) -> Result<()> {
    let ingredients = ingredients
        .iter()
        .map(|s| parse_ingredient_arg(s))
        .collect::<Result<Vec<_>>>()?;
    let recipe = svc.create_recipe(&NewRecipe {
        title: title.to_string(),
        image_key: parse_dish_image(image)?,
        ingredients,
    })?;
    if json {
        print_json(&recipe)
    } else {
        println!(
            "Created recipe: {} {} (id: {}, {} ingredients)",
            dish_emoji(recipe.image_key),
            recipe.title,
            short_id(&recipe.id),
            recipe.ingredients.len()
        );
        Ok(())
    }
}

pub(crate) fn cmd_recipe_edit(
    svc: &KitchenService,
    query: &str,
    title: Option<&str>,
    image: Option<&str>,
    ingredients: &[String],
    json: bool,
) -> Result<()> {
    let recipe = resolve_recipe(svc, query, json)?;
    let ingredients = if ingredients.is_empty() {
        recipe.ingredients.clone()
    } else {
        ingredients
            .iter()
            .map(|s| parse_ingredient_arg(s))
            .collect::<Result<Vec<_>>>()?
    };
    let image_key = match image {
        Some(key) => parse_dish_image(Some(key))?,
        None => recipe.image_key,
    };
    let edit = NewRecipe {
        title: title.map_or_else(|| recipe.title.clone(), String::from),
        image_key,
        ingredients,
    };

    let Some(updated) = svc.update_recipe(&recipe.id, &edit)? else {
        bail!("Recipe '{}' disappeared while editing", recipe.title);
    };
    if json {
        print_json(&updated)
    } else {
        println!("Updated recipe: {} {}", dish_emoji(updated.image_key), updated.title);
        Ok(())
    }
}

pub(crate) fn cmd_recipe_delete(svc: &KitchenService, query: &str, json: bool) -> Result<()> {
    let recipe = resolve_recipe(svc, query, json)?;
    svc.delete_recipe(&recipe.id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": recipe.id }));
    } else {
        println!("Deleted recipe: {}", recipe.title);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_list(svc: &KitchenService, search: Option<&str>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "")]
        dish: &'static str,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
        #[tabled(rename = "Missing")]
        missing: usize,
    }

    let recipes = svc.search_recipes(search.unwrap_or_default())?;
    let pantry = svc.pantry()?;
    let statuses: Vec<_> = recipes
        .iter()
        .map(|r| recipe_status(r, &pantry, RecipeFilter::Missing))
        .collect();

    if json {
        return print_json(&statuses);
    }
    if statuses.is_empty() {
        match search {
            Some(q) => eprintln!("No recipes match '{q}'"),
            None => eprintln!("No recipes yet. Create one with `kitchie recipe create`."),
        }
        return Ok(());
    }

    let rows: Vec<RecipeRow> = statuses
        .iter()
        .map(|s| RecipeRow {
            id: short_id(&s.recipe.id).to_string(),
            dish: dish_emoji(s.recipe.image_key),
            title: truncate(&s.recipe.title, 30),
            ingredients: s.recipe.ingredients.len(),
            missing: s.ingredients.len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_recipe_show(
    svc: &KitchenService,
    query: &str,
    missing_only: bool,
    json: bool,
) -> Result<()> {
    let recipe = resolve_recipe(svc, query, json)?;
    let filter = if missing_only {
        RecipeFilter::Missing
    } else {
        RecipeFilter::All
    };
    let status = svc.recipe_status(&recipe, filter)?;

    if json {
        return print_json(&status);
    }

    println!("=== {} {} ===", dish_emoji(recipe.image_key), recipe.title);
    if status.makeable {
        println!("  Everything is in the pantry. Ready to cook!\n");
    } else {
        println!("  Some ingredients are missing.\n");
    }
    if status.ingredients.is_empty() {
        println!("  Nothing missing.");
    } else {
        print_status_table(&status.ingredients);
    }
    Ok(())
}

pub(crate) fn print_status_table(ingredients: &[IngredientStatus]) {
    #[derive(Tabled)]
    struct StatusRow {
        #[tabled(rename = "Ingredient")]
        name: String,
        #[tabled(rename = "Need")]
        need: String,
        #[tabled(rename = "Have")]
        have: String,
        #[tabled(rename = "")]
        ok: &'static str,
    }

    let rows: Vec<StatusRow> = ingredients
        .iter()
        .map(|i| StatusRow {
            name: truncate(&i.name, 30),
            need: match &i.unit {
                Some(u) => format!("{} {u}", format_quantity(i.need_qty)),
                None => format_quantity(i.need_qty),
            },
            have: format_quantity(i.have_qty),
            ok: if i.has_it { "✓" } else { "✗" },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_recipe_import(
    svc: &KitchenService,
    file: &std::path::Path,
    title_override: Option<String>,
    image: Option<&str>,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let (recipe_data, _report) = cooklang::parse(&input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let title = title_override
        .or_else(|| recipe_data.metadata.title().map(String::from))
        .or_else(|| file.file_stem().and_then(|s| s.to_str()).map(String::from))
        .context("Could not determine recipe title. Use --title to specify one")?;

    let converter = cooklang::Converter::default();
    let grouped = recipe_data.group_ingredients(&converter);

    let mut ingredients = Vec::new();
    let mut skipped = Vec::new();
    for gi in &grouped {
        let ing = cooklang_ingredient(gi);
        if catalog::is_known(&ing.name) {
            ingredients.push(ing);
        } else {
            warn!(ingredient = %ing.name, "not in the ingredient catalog; skipped");
            skipped.push(ing.name);
        }
    }

    if ingredients.is_empty() {
        bail!("No catalog ingredients found in recipe");
    }

    let recipe = svc.create_recipe(&NewRecipe {
        title,
        image_key: parse_dish_image(image)?,
        ingredients,
    })?;

    if json {
        print_json(&serde_json::json!({ "recipe": recipe, "skipped": skipped }))
    } else {
        println!(
            "Imported recipe: {} ({} ingredients)",
            recipe.title,
            recipe.ingredients.len()
        );
        if !skipped.is_empty() {
            eprintln!("Skipped (not in catalog): {}", skipped.join(", "));
        }
        Ok(())
    }
}

fn cooklang_ingredient(gi: &cooklang::ingredient_list::GroupedIngredient<'_>) -> RecipeIngredient {
    // Only the first grouped quantity is kept.
    let (quantity, unit) =
        gi.quantity
            .iter()
            .next()
            .map_or((None, None), |qty: &cooklang::Quantity| {
                let value = match qty.value() {
                    cooklang::Value::Number(n) => n.value(),
                    cooklang::Value::Range { start, .. } => start.value(),
                    cooklang::Value::Text(t) => parse_quantity(t),
                };
                let quantity = (value.is_finite() && value > 0.0).then_some(value);
                (quantity, qty.unit().map(String::from))
            });

    RecipeIngredient {
        name: gi.ingredient.display_name().to_string(),
        quantity,
        unit,
    }
}
