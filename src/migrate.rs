use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index if missing. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Ingredients; nutrition per 100 g, NULL when unknown
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingredients (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            energy REAL,
            carb REAL,
            protein REAL,
            fat REAL,
            sugar REAL,
            water REAL,
            fiber REAL,
            cost_per_gram REAL NOT NULL,
            supplier_name TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    // AUTOINCREMENT keeps ids from being reused after deletes
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            recipe_type TEXT,
            cuisine TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Lines reference ingredients loosely: a catalog reload may drop one,
    // which surfaces as an inconsistency at read time.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipe_lines (
            recipe_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            ingredient_id INTEGER NOT NULL,
            quantity_grams REAL NOT NULL,
            PRIMARY KEY (recipe_id, position),
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_recipe_lines_ingredient ON recipe_lines(ingredient_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
