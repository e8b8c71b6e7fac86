use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn recipe_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("recipe");
    path
}

const INGREDIENTS_CSV: &str = "\
id,ingredient_name,energy,carb,protein,fat,sugar,water,fiber,cost_per_gram,supplier_name
ing_001,Whole Milk,61,4.8,3.2,3.3,5.1,88,0,0.0012,Dairy Co
ing_002,Skim Milk,34,5,3.4,0.1,5,91,0,0.0010,Dairy Co
ing_003,Oat Milk,48,6.7,1,1.5,4,89,0.8,0.0030,Oat House
ing_004,White Sugar,387,100,0,0,100,0,0,0.0020,Sweet Supply
ing_005,Wheat Flour,364,76,10,1,0.3,12,2.7,0.0015,
";

const RECIPES_CSV: &str = "\
recipe_id,recipe_name,recipe_type,cuisine,ingredient_id,quantity_in_grams
1,Sweet Milk,drink,,ing_001,200
1,Sweet Milk,drink,,ing_004,10
2,Flour Paste,base,French,5,100
";

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(data_dir.join("ingredients.csv"), INGREDIENTS_CSV).unwrap();
    fs::write(data_dir.join("recipes.csv"), RECIPES_CSV).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/recipe.sqlite"

[embedding]
provider = "disabled"

[substitutes]
default_limit = 3

[server]
bind = "127.0.0.1:8123"
"#,
        root.display()
    );

    let config_path = config_dir.join("recipe.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_recipe(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = recipe_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run recipe binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Init and import both seed files.
fn seeded_env() -> (TempDir, PathBuf) {
    let (tmp, config_path) = setup_test_env();
    let data = tmp.path().join("data");
    run_recipe(&config_path, &["init"]);
    let (stdout, stderr, success) = run_recipe(
        &config_path,
        &[
            "import",
            "--ingredients",
            data.join("ingredients.csv").to_str().unwrap(),
            "--recipes",
            data.join("recipes.csv").to_str().unwrap(),
        ],
    );
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    (tmp, config_path)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_recipe(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/recipe.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_recipe(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_recipe(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_import_reports_counts() {
    let (tmp, config_path) = setup_test_env();
    let data = tmp.path().join("data");
    run_recipe(&config_path, &["init"]);

    let (stdout, stderr, success) = run_recipe(
        &config_path,
        &[
            "import",
            "--ingredients",
            data.join("ingredients.csv").to_str().unwrap(),
            "--recipes",
            data.join("recipes.csv").to_str().unwrap(),
        ],
    );
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    assert!(
        stdout.contains("Imported 5 ingredients, 2 recipes (3 lines)."),
        "unexpected output: {}",
        stdout
    );
}

#[test]
fn test_import_twice_does_not_duplicate() {
    let (_tmp, config_path) = seeded_env();
    let data = _tmp.path().join("data");

    let (_, _, success) = run_recipe(
        &config_path,
        &[
            "import",
            "--ingredients",
            data.join("ingredients.csv").to_str().unwrap(),
        ],
    );
    assert!(success);

    let (stdout, _, _) = run_recipe(&config_path, &["ingredients"]);
    assert_eq!(stdout.matches("Whole Milk").count(), 1);
}

#[test]
fn test_import_without_files_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_recipe(&config_path, &["init"]);

    let (_, stderr, success) = run_recipe(&config_path, &["import"]);
    assert!(!success);
    assert!(stderr.contains("nothing to import"));
}

#[test]
fn test_import_rejects_negative_cost() {
    let (tmp, config_path) = setup_test_env();
    run_recipe(&config_path, &["init"]);

    let bad = tmp.path().join("data/bad.csv");
    fs::write(
        &bad,
        "id,ingredient_name,energy,carb,protein,fat,sugar,water,fiber,cost_per_gram,supplier_name\n\
         1,Salt,0,0,0,0,0,0,0,-1,\n",
    )
    .unwrap();

    let (_, stderr, success) =
        run_recipe(&config_path, &["import", "--ingredients", bad.to_str().unwrap()]);
    assert!(!success, "negative cost should be rejected");
    assert!(stderr.contains("line 2"), "stderr: {}", stderr);
}

#[test]
fn test_ingredients_listing() {
    let (_tmp, config_path) = seeded_env();

    let (stdout, _, success) = run_recipe(&config_path, &["ingredients"]);
    assert!(success);
    assert!(stdout.contains("Whole Milk"));
    assert!(stdout.contains("Wheat Flour"));
    // Listing is in id order.
    let milk = stdout.find("Whole Milk").unwrap();
    let flour = stdout.find("Wheat Flour").unwrap();
    assert!(milk < flour);

    let (stdout, _, _) = run_recipe(&config_path, &["ingredients", "--skip", "4"]);
    assert!(!stdout.contains("Whole Milk"));
    assert!(stdout.contains("Wheat Flour"));
}

#[test]
fn test_ingredients_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_recipe(&config_path, &["init"]);

    let (stdout, _, success) = run_recipe(&config_path, &["ingredients"]);
    assert!(success);
    assert!(stdout.contains("No ingredients."));
}

#[test]
fn test_substitutes_rank_similar_milk_first() {
    let (_tmp, config_path) = seeded_env();

    let (stdout, stderr, success) =
        run_recipe(&config_path, &["substitutes", "ing_001", "--limit", "2"]);
    assert!(success, "substitutes failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("text mode: string_only"));
    assert!(stdout.contains("1. "));
    assert!(stdout.contains("2. "));
    assert!(!stdout.contains("3. "));
    // The query never appears among its own substitutes.
    assert!(!stdout.contains("Whole Milk (id"));
    assert!(stdout.contains("Skim Milk"));
}

#[test]
fn test_substitutes_default_limit_from_config() {
    let (_tmp, config_path) = seeded_env();

    let (stdout, _, success) = run_recipe(&config_path, &["substitutes", "1"]);
    assert!(success);
    assert!(stdout.contains("3. "));
    assert!(!stdout.contains("4. "));
}

#[test]
fn test_substitutes_explain_breakdown() {
    let (_tmp, config_path) = seeded_env();

    let (stdout, _, success) =
        run_recipe(&config_path, &["substitutes", "2", "--limit", "1", "--explain"]);
    assert!(success);
    assert!(stdout.contains("nutrition="));
    assert!(stdout.contains("semantic=n/a"));
    assert!(stdout.contains("combined="));
}

#[test]
fn test_substitutes_unknown_ingredient_fails() {
    let (_tmp, config_path) = seeded_env();

    let (_, stderr, success) = run_recipe(&config_path, &["substitutes", "ing_999"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn test_substitutes_malformed_id_fails() {
    let (_tmp, config_path) = seeded_env();

    let (_, _, success) = run_recipe(&config_path, &["substitutes", "sugar"]);
    assert!(!success);
}

#[test]
fn test_recipe_totals() {
    let (_tmp, config_path) = seeded_env();

    let (stdout, stderr, success) = run_recipe(&config_path, &["recipe", "1"]);
    assert!(success, "recipe failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("name:    Sweet Milk"));
    assert!(stdout.contains("cuisine: -"));
    // 200 g milk at 0.0012 + 10 g sugar at 0.0020
    assert!(stdout.contains("cost:    0.26"), "stdout: {}", stdout);
    // 61 * 2 + 387 * 0.1
    assert!(stdout.contains("energy:  160.70"), "stdout: {}", stdout);
}

#[test]
fn test_recipe_missing_fails() {
    let (_tmp, config_path) = seeded_env();

    let (_, stderr, success) = run_recipe(&config_path, &["recipe", "42"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn test_recipes_listing() {
    let (_tmp, config_path) = seeded_env();

    let (stdout, _, success) = run_recipe(&config_path, &["recipes"]);
    assert!(success);
    assert!(stdout.contains("Sweet Milk  [drink / -]"));
    assert!(stdout.contains("Flour Paste  [base / French]"));

    let (stdout, _, _) = run_recipe(&config_path, &["recipes", "--skip", "1", "--limit", "1"]);
    assert!(!stdout.contains("Sweet Milk"));
    assert!(stdout.contains("Flour Paste"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, _, success) = run_recipe(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
}
