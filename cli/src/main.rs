mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_catalog, cmd_cook, cmd_export, cmd_import, cmd_pantry_add, cmd_pantry_edit,
    cmd_pantry_list, cmd_pantry_remove, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_edit,
    cmd_recipe_import, cmd_recipe_list, cmd_recipe_show, cmd_shop_add, cmd_shop_buy,
    cmd_shop_check, cmd_shop_clear, cmd_shop_clear_checked, cmd_shop_edit, cmd_shop_list,
    cmd_shop_missing, cmd_shop_remove,
};
use crate::config::Config;
use kitchie_core::models::{UpdatePantryIngredient, UpdateShoppingItem};
use kitchie_core::service::KitchenService;

#[derive(Parser)]
#[command(
    name = "kitchie",
    version,
    about = "Pantry, recipes and shopping list, kept in sync",
    long_about = "Track what's in your pantry, see which recipes you can cook, \
                  and turn what's missing into a shopping list."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage pantry stock
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Manage recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Cook a recipe, deducting its ingredients from the pantry
    Cook {
        /// Recipe id, id prefix, or title
        recipe: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the shopping list
    Shop {
        #[command(subcommand)]
        command: ShopCommands,
    },
    /// List catalog ingredients, or suggestions matching a query
    Catalog {
        /// Filter (substring match, up to 6 results)
        query: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export pantry, recipes and shopping list as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<std::path::PathBuf>,
    },
    /// Replace all data with the contents of an export file
    Import {
        /// Path to the export JSON
        file: std::path::PathBuf,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum PantryCommands {
    /// List pantry items
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add stock of a catalog ingredient (tops up a matching item)
    Add {
        /// Ingredient name (see `kitchie catalog`)
        name: String,
        /// Quantity (e.g. "2", "1.5", "0,5")
        quantity: String,
        /// Unit (default: x)
        #[arg(short, long)]
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a pantry item
    Edit {
        /// Pantry item id or id prefix
        id: String,
        /// New ingredient name
        #[arg(long)]
        name: Option<String>,
        /// New quantity (blank keeps the current one)
        #[arg(short, long)]
        quantity: Option<String>,
        /// New unit
        #[arg(short, long)]
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a pantry item
    Remove {
        /// Pantry item id or id prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List recipes with how many ingredients are missing
    List {
        /// Only recipes whose title contains this
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe and what the pantry has for it
    Show {
        /// Recipe id, id prefix, or title
        recipe: String,
        /// Only list missing ingredients
        #[arg(short, long)]
        missing: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a recipe
    Create {
        /// Recipe title
        title: String,
        /// Ingredient as name:quantity[:unit] (repeatable)
        #[arg(short, long = "ingredient", value_name = "NAME:QTY[:UNIT]")]
        ingredients: Vec<String>,
        /// Dish image: cake, eggs, noodles, salad, pizza, bento
        #[arg(long)]
        image: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a recipe (given ingredients replace the current list)
    Edit {
        /// Recipe id, id prefix, or title
        recipe: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// Ingredient as name:quantity[:unit] (repeatable)
        #[arg(short, long = "ingredient", value_name = "NAME:QTY[:UNIT]")]
        ingredients: Vec<String>,
        /// Dish image: cake, eggs, noodles, salad, pizza, bento
        #[arg(long)]
        image: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe
    Delete {
        /// Recipe id, id prefix, or title
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a recipe from a Cooklang (.cook) file
    Import {
        /// Path to the .cook file
        file: std::path::PathBuf,
        /// Title override (defaults to metadata title or filename)
        #[arg(long)]
        title: Option<String>,
        /// Dish image: cake, eggs, noodles, salad, pizza, bento
        #[arg(long)]
        image: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ShopCommands {
    /// Show the shopping list
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item (asks before topping up an existing one)
    Add {
        /// Item name
        name: String,
        /// Quantity to buy
        quantity: String,
        /// Unit (default: x)
        #[arg(short, long)]
        unit: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add every ingredient a recipe is missing
    Missing {
        /// Recipe id, id prefix, or title
        recipe: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle an item's checked mark
    Check {
        /// Shopping item id or id prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a shopping item
    Edit {
        /// Shopping item id or id prefix
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New quantity
        #[arg(short, long)]
        quantity: Option<String>,
        /// New unit
        #[arg(short, long)]
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a shopping item
    Remove {
        /// Shopping item id or id prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove all checked items
    ClearChecked {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every item
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move checked items (or all with --all) into the pantry
    Buy {
        /// Buy every item, checked or not
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    let svc = KitchenService::new(&config.db_path)?;

    match cli.command {
        Commands::Pantry { command } => match command {
            PantryCommands::List { json } => cmd_pantry_list(&svc, json),
            PantryCommands::Add {
                name,
                quantity,
                unit,
                json,
            } => cmd_pantry_add(&svc, &name, &quantity, unit.as_deref(), json),
            PantryCommands::Edit {
                id,
                name,
                quantity,
                unit,
                json,
            } => cmd_pantry_edit(
                &svc,
                &id,
                &UpdatePantryIngredient {
                    name,
                    quantity,
                    unit,
                },
                json,
            ),
            PantryCommands::Remove { id, json } => cmd_pantry_remove(&svc, &id, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::List { search, json } => cmd_recipe_list(&svc, search.as_deref(), json),
            RecipeCommands::Show {
                recipe,
                missing,
                json,
            } => cmd_recipe_show(&svc, &recipe, missing, json),
            RecipeCommands::Create {
                title,
                ingredients,
                image,
                json,
            } => cmd_recipe_create(&svc, &title, image.as_deref(), &ingredients, json),
            RecipeCommands::Edit {
                recipe,
                title,
                ingredients,
                image,
                json,
            } => cmd_recipe_edit(
                &svc,
                &recipe,
                title.as_deref(),
                image.as_deref(),
                &ingredients,
                json,
            ),
            RecipeCommands::Delete { recipe, json } => cmd_recipe_delete(&svc, &recipe, json),
            RecipeCommands::Import {
                file,
                title,
                image,
                json,
            } => cmd_recipe_import(&svc, &file, title, image.as_deref(), json),
        },
        Commands::Cook { recipe, yes, json } => cmd_cook(&svc, &recipe, yes, json),
        Commands::Shop { command } => match command {
            ShopCommands::List { json } => cmd_shop_list(&svc, json),
            ShopCommands::Add {
                name,
                quantity,
                unit,
                yes,
                json,
            } => cmd_shop_add(&svc, &name, &quantity, unit.as_deref(), yes, json),
            ShopCommands::Missing { recipe, yes, json } => {
                cmd_shop_missing(&svc, &recipe, yes, json)
            }
            ShopCommands::Check { id, json } => cmd_shop_check(&svc, &id, json),
            ShopCommands::Edit {
                id,
                name,
                quantity,
                unit,
                json,
            } => cmd_shop_edit(
                &svc,
                &id,
                &UpdateShoppingItem {
                    name,
                    quantity,
                    unit,
                },
                json,
            ),
            ShopCommands::Remove { id, json } => cmd_shop_remove(&svc, &id, json),
            ShopCommands::ClearChecked { json } => cmd_shop_clear_checked(&svc, json),
            ShopCommands::Clear { yes, json } => cmd_shop_clear(&svc, yes, json),
            ShopCommands::Buy { all, json } => cmd_shop_buy(&svc, all, json),
        },
        Commands::Catalog { query, json } => cmd_catalog(query.as_deref(), json),
        Commands::Export { output } => cmd_export(&svc, output.as_deref()),
        Commands::Import { file, yes, json } => cmd_import(&svc, &file, yes, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            server::start_server(svc, port, &bind, api_key, new_api_key).await
        }
    }
}
