use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use kitchie_core::catalog::resolve_visual;
use kitchie_core::models::{PantryIngredient, UpdatePantryIngredient};
use kitchie_core::service::KitchenService;

use super::helpers::{match_id, not_found, print_json, short_id, truncate};

pub(crate) fn cmd_pantry_list(svc: &KitchenService, json: bool) -> Result<()> {
    let pantry = svc.pantry()?;
    if json {
        return print_json(&pantry);
    }
    if pantry.is_empty() {
        eprintln!("Your pantry is empty. Add something with `kitchie pantry add <name> <quantity>`.");
        return Ok(());
    }
    print_pantry_table(&pantry);
    Ok(())
}

pub(crate) fn cmd_pantry_add(
    svc: &KitchenService,
    name: &str,
    quantity: &str,
    unit: Option<&str>,
    json: bool,
) -> Result<()> {
    let item = svc.add_pantry_ingredient(name, quantity, unit)?;
    if json {
        print_json(&item)
    } else {
        let unit = item.unit.as_deref().unwrap_or("x");
        println!("Pantry now has {} {unit} of {}", item.quantity, item.name);
        Ok(())
    }
}

pub(crate) fn cmd_pantry_edit(
    svc: &KitchenService,
    id: &str,
    update: &UpdatePantryIngredient,
    json: bool,
) -> Result<()> {
    let Some(id) = resolve_pantry_id(svc, id)? else {
        not_found(&format!("Pantry item '{id}' not found"), json);
    };
    let Some(item) = svc.update_pantry_ingredient(&id, update)? else {
        not_found(&format!("Pantry item '{id}' not found"), json);
    };
    if json {
        print_json(&item)
    } else {
        let unit = item.unit.as_deref().unwrap_or("x");
        println!("Updated {}: {} {unit}", item.name, item.quantity);
        Ok(())
    }
}

pub(crate) fn cmd_pantry_remove(svc: &KitchenService, id: &str, json: bool) -> Result<()> {
    let Some(id) = resolve_pantry_id(svc, id)? else {
        not_found(&format!("Pantry item '{id}' not found"), json);
    };
    svc.delete_pantry_ingredient(&id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Removed pantry item {}", short_id(&id));
    }
    Ok(())
}

fn resolve_pantry_id(svc: &KitchenService, prefix: &str) -> Result<Option<String>> {
    let pantry = svc.pantry()?;
    match_id(pantry.iter().map(|p| p.id.as_str()), prefix)
}

fn print_pantry_table(pantry: &[PantryIngredient]) {
    #[derive(Tabled)]
    struct PantryRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Unit")]
        unit: String,
        #[tabled(rename = "Image")]
        image: String,
    }

    let rows: Vec<PantryRow> = pantry
        .iter()
        .map(|p| PantryRow {
            id: short_id(&p.id).to_string(),
            name: truncate(&p.name, 30),
            quantity: p.quantity.clone(),
            unit: p.unit.clone().unwrap_or_else(|| "x".to_string()),
            image: resolve_visual(&p.name).asset.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
