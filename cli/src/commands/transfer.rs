use anyhow::{Context, Result};
use std::path::Path;

use kitchie_core::models::ExportData;
use kitchie_core::service::KitchenService;

use super::helpers::{confirm, print_json};

/// Write every collection as one JSON document, to `output` or stdout.
pub(crate) fn cmd_export(svc: &KitchenService, output: Option<&Path>) -> Result<()> {
    let data = svc.export_data()?;
    match output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&data)?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            eprintln!(
                "Exported {} pantry items, {} recipes, {} shopping items to {}",
                data.pantry.len(),
                data.recipes.len(),
                data.shopping.len(),
                path.display()
            );
            Ok(())
        }
        None => print_json(&data),
    }
}

/// Replace all local data with the contents of an export file.
pub(crate) fn cmd_import(svc: &KitchenService, file: &Path, yes: bool, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let data: ExportData = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid export file: {}", file.display()))?;

    if !confirm("Importing replaces your pantry, recipes and shopping list. Continue?", yes)? {
        eprintln!("Cancelled");
        return Ok(());
    }

    let summary = svc.import_data(&data)?;
    if json {
        print_json(&summary)
    } else {
        println!(
            "Imported {} pantry items, {} recipes, {} shopping items",
            summary.pantry, summary.recipes, summary.shopping
        );
        Ok(())
    }
}
