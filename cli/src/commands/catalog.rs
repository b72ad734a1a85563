use anyhow::Result;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use kitchie_core::catalog::{IngredientVisual, known_names, resolve_visual, suggestions};

use super::helpers::print_json;

#[derive(Serialize)]
struct CatalogItem {
    name: &'static str,
    #[serde(flatten)]
    visual: IngredientVisual,
}

/// List the ingredient catalog, or the autocomplete suggestions for `query`.
pub(crate) fn cmd_catalog(query: Option<&str>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct CatalogRow {
        #[tabled(rename = "Ingredient")]
        name: &'static str,
        #[tabled(rename = "Image")]
        asset: &'static str,
    }

    let names = match query {
        Some(q) => suggestions(q),
        None => known_names(),
    };
    let items: Vec<CatalogItem> = names
        .into_iter()
        .map(|name| CatalogItem {
            name,
            visual: resolve_visual(name),
        })
        .collect();

    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        eprintln!("No catalog ingredients match '{}'", query.unwrap_or_default());
        return Ok(());
    }

    let rows: Vec<CatalogRow> = items
        .iter()
        .map(|i| CatalogRow {
            name: i.name,
            asset: i.visual.asset,
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}
