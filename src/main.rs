//! # Recipe Harness CLI (`recipe`)
//!
//! The `recipe` binary manages the ingredient catalog and recipes, ranks
//! ingredient substitutes, and starts the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! recipe --config ./config/recipe.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `recipe init` | Create the SQLite database and run schema migrations |
//! | `recipe import` | Load ingredients and/or recipes from CSV |
//! | `recipe ingredients` | List catalog ingredients |
//! | `recipe substitutes <id>` | Rank substitutes for an ingredient |
//! | `recipe recipe <id>` | Show a recipe with its computed totals |
//! | `recipe recipes` | List recipes |
//! | `recipe serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! recipe init
//! recipe import --ingredients data/ingredients.csv --recipes data/recipes.csv
//! recipe substitutes ing_001 --limit 5 --explain
//! recipe recipe 3
//! recipe serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use recipe_harness::{commands, config, logging, migrate, server};

/// Recipe Harness CLI: recipe costing, nutrition totals and ingredient
/// substitutes.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/recipe.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "recipe",
    about = "Recipe Harness: recipe cost and nutrition totals with ingredient substitute ranking",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/recipe.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Import ingredients and/or recipes from CSV files.
    ///
    /// Existing ingredients are updated; existing recipes have their lines
    /// replaced.
    Import {
        /// Ingredient CSV (`id,ingredient_name,energy,...,supplier_name`).
        #[arg(long)]
        ingredients: Option<PathBuf>,

        /// Recipe CSV (`recipe_id,recipe_name,...,quantity_in_grams`).
        #[arg(long)]
        recipes: Option<PathBuf>,
    },

    /// List ingredients in id order.
    Ingredients {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Rank substitutes for an ingredient.
    Substitutes {
        /// Ingredient id (`7` or `ing_007`).
        id: String,

        /// Number of substitutes (defaults to `[substitutes].default_limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Show the per-component score breakdown.
        #[arg(long)]
        explain: bool,
    },

    /// Show one recipe with totals computed against the current catalog.
    Recipe {
        id: i64,
    },

    /// List recipes in id order.
    Recipes {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Start the HTTP API server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init_tracing(&cfg.logging.filter);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import {
            ingredients,
            recipes,
        } => {
            commands::run_import(&cfg, ingredients.as_deref(), recipes.as_deref()).await?;
        }
        Commands::Ingredients { skip, limit } => {
            commands::run_ingredients(&cfg, skip, limit).await?;
        }
        Commands::Substitutes { id, limit, explain } => {
            commands::run_substitutes(&cfg, &id, limit, explain).await?;
        }
        Commands::Recipe { id } => {
            commands::run_recipe(&cfg, id).await?;
        }
        Commands::Recipes { skip, limit } => {
            commands::run_recipes(&cfg, skip, limit).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
