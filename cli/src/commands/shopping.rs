use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use kitchie_core::models::{ShoppingItem, UpdateShoppingItem, validate_positive_quantity};
use kitchie_core::quantity::format_quantity;
use kitchie_core::service::{BulkShoppingAdd, KitchenService, Purchase, ShoppingAdd};

use super::helpers::{confirm, match_id, not_found, print_json, short_id, to_title, truncate};
use super::resolve_recipe;

pub(crate) fn cmd_shop_list(svc: &KitchenService, json: bool) -> Result<()> {
    let list = svc.shopping_list()?;
    if json {
        return print_json(&list);
    }
    if list.is_empty() {
        eprintln!("Your shopping list is empty.");
        return Ok(());
    }
    print_shopping_table(&list);
    Ok(())
}

pub(crate) fn cmd_shop_add(
    svc: &KitchenService,
    name: &str,
    quantity: &str,
    unit: Option<&str>,
    yes: bool,
    json: bool,
) -> Result<()> {
    let amount = validate_positive_quantity(quantity)?;
    let mut prompt_error = None;
    let outcome = svc.add_to_shopping(name, amount, unit, |prompt| {
        confirm(&prompt.to_string(), yes).unwrap_or_else(|e| {
            prompt_error = Some(e);
            false
        })
    })?;
    if let Some(e) = prompt_error {
        return Err(e);
    }

    if json {
        return print_json(&outcome);
    }
    match outcome {
        ShoppingAdd::Added(item) => println!("Added {} {} {}", item.quantity, unit_of(&item), item.name),
        ShoppingAdd::Merged(item) => {
            println!("{} is now {} {} on the list", item.name, item.quantity, unit_of(&item));
        }
        ShoppingAdd::Declined => eprintln!("Not added"),
    }
    Ok(())
}

/// Add everything a recipe still needs, asking once for the whole batch.
pub(crate) fn cmd_shop_missing(svc: &KitchenService, query: &str, yes: bool, json: bool) -> Result<()> {
    let recipe = resolve_recipe(svc, query, json)?;
    let mut prompt_error = None;
    let outcome = svc.add_missing_to_shopping(&recipe, |missing| {
        let lines: Vec<String> = missing
            .iter()
            .map(|m| format!("  - {} (x{})", to_title(&m.name), format_quantity(m.need_qty)))
            .collect();
        eprintln!("Missing for {}:\n{}", recipe.title, lines.join("\n"));
        confirm("Add all missing ingredients to your shopping list?", yes).unwrap_or_else(|e| {
            prompt_error = Some(e);
            false
        })
    })?;
    if let Some(e) = prompt_error {
        return Err(e);
    }

    if json {
        return print_json(&outcome);
    }
    match outcome {
        BulkShoppingAdd::NothingMissing => println!("You already have everything for {}", recipe.title),
        BulkShoppingAdd::Declined => eprintln!("Not added"),
        BulkShoppingAdd::Added { added, merged, .. } => {
            println!("Added {added} new item(s), topped up {merged} existing item(s)");
        }
    }
    Ok(())
}

pub(crate) fn cmd_shop_check(svc: &KitchenService, id: &str, json: bool) -> Result<()> {
    let id = resolve_shopping_id(svc, id, json)?;
    let Some(item) = svc.toggle_checked(&id)? else {
        not_found(&format!("Shopping item '{id}' not found"), json);
    };
    if json {
        print_json(&item)
    } else {
        let mark = if item.is_checked() { "checked" } else { "unchecked" };
        println!("{} {mark}", item.name);
        Ok(())
    }
}

pub(crate) fn cmd_shop_edit(
    svc: &KitchenService,
    id: &str,
    update: &UpdateShoppingItem,
    json: bool,
) -> Result<()> {
    let id = resolve_shopping_id(svc, id, json)?;
    let Some(item) = svc.update_shopping_item(&id, update)? else {
        not_found(&format!("Shopping item '{id}' not found"), json);
    };
    if json {
        print_json(&item)
    } else {
        println!("Updated {}: {} {}", item.name, item.quantity, unit_of(&item));
        Ok(())
    }
}

pub(crate) fn cmd_shop_remove(svc: &KitchenService, id: &str, json: bool) -> Result<()> {
    let id = resolve_shopping_id(svc, id, json)?;
    svc.delete_shopping_item(&id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Removed shopping item {}", short_id(&id));
    }
    Ok(())
}

pub(crate) fn cmd_shop_clear_checked(svc: &KitchenService, json: bool) -> Result<()> {
    let removed = svc.delete_checked()?;
    if json {
        println!("{}", serde_json::json!({ "deleted": removed }));
    } else if removed == 0 {
        eprintln!("No checked items");
    } else {
        println!("Removed {removed} checked item(s)");
    }
    Ok(())
}

pub(crate) fn cmd_shop_clear(svc: &KitchenService, yes: bool, json: bool) -> Result<()> {
    if !confirm("Delete every item on the shopping list?", yes)? {
        eprintln!("Cancelled");
        return Ok(());
    }
    let removed = svc.clear_shopping_list()?;
    if json {
        println!("{}", serde_json::json!({ "deleted": removed }));
    } else {
        println!("Cleared {removed} item(s)");
    }
    Ok(())
}

pub(crate) fn cmd_shop_buy(svc: &KitchenService, all: bool, json: bool) -> Result<()> {
    let which = if all { Purchase::All } else { Purchase::Checked };
    let summary = svc.buy(which)?;
    if json {
        return print_json(&summary);
    }
    if summary.purchased == 0 {
        if all {
            eprintln!("Your shopping list is empty.");
        } else {
            eprintln!("Nothing checked. Check items first or use --all.");
        }
    } else {
        println!(
            "Moved {} item(s) to the pantry; {} left on the list",
            summary.purchased,
            summary.shopping.len()
        );
    }
    Ok(())
}

fn resolve_shopping_id(svc: &KitchenService, prefix: &str, json: bool) -> Result<String> {
    let list = svc.shopping_list()?;
    match match_id(list.iter().map(|s| s.id.as_str()), prefix)? {
        Some(id) => Ok(id),
        None => not_found(&format!("Shopping item '{prefix}' not found"), json),
    }
}

fn unit_of(item: &ShoppingItem) -> &str {
    item.unit.as_deref().unwrap_or("x")
}

fn print_shopping_table(list: &[ShoppingItem]) {
    #[derive(Tabled)]
    struct ShoppingRow {
        #[tabled(rename = "")]
        checked: &'static str,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Unit")]
        unit: String,
    }

    let rows: Vec<ShoppingRow> = list
        .iter()
        .map(|s| ShoppingRow {
            checked: if s.is_checked() { "[x]" } else { "[ ]" },
            id: short_id(&s.id).to_string(),
            name: truncate(&s.name, 30),
            quantity: s.quantity.clone(),
            unit: unit_of(s).to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
