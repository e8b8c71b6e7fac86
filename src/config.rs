use anyhow::{Context, Result};
use recipe_harness_core::similarity::ScoringWeights;
use recipe_harness_core::CatalogSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub substitutes: SubstitutesConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Catalog settings derived from `[scoring]` and `[embedding]`.
    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            weights: self.scoring,
            embedding_batch_size: self.embedding.batch_size,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubstitutesConfig {
    #[serde(default = "default_substitute_limit")]
    pub default_limit: usize,
}

impl Default for SubstitutesConfig {
    fn default() -> Self {
        Self {
            default_limit: default_substitute_limit(),
        }
    }
}

fn default_substitute_limit() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive. `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate scoring
    config
        .scoring
        .validate()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    // Validate substitutes
    if config.substitutes.default_limit < 1 {
        anyhow::bail!("substitutes.default_limit must be >= 1");
    }

    // Validate embedding
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "ollama" => {
            if config.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified when provider is 'ollama'");
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!("embedding.dims must be > 0 when provider is 'ollama'");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, local, or ollama.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("recipe.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let (_dir, path) = write_config("[db]\npath = \"./data/recipes.sqlite\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.embedding.provider, "disabled");
        assert_eq!(config.scoring, ScoringWeights::default());
        assert_eq!(config.substitutes.default_limit, 3);
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_partial_scoring_section() {
        let (_dir, path) = write_config(
            "[db]\npath = \"x.sqlite\"\n[scoring]\nsemantic = 0.5\nstring = 0.5\n",
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.scoring.nutrition, 0.6);
        assert_eq!(config.scoring.semantic, 0.5);
    }

    #[test]
    fn test_rejects_unbalanced_weights() {
        let (_dir, path) =
            write_config("[db]\npath = \"x.sqlite\"\n[scoring]\nnutrition = 0.9\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("scoring.nutrition + scoring.text"));
    }

    #[test]
    fn test_ollama_requires_model_and_dims() {
        let (_dir, path) =
            write_config("[db]\npath = \"x.sqlite\"\n[embedding]\nprovider = \"ollama\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let (_dir, path) =
            write_config("[db]\npath = \"x.sqlite\"\n[embedding]\nprovider = \"openai\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_rejects_zero_default_limit() {
        let (_dir, path) =
            write_config("[db]\npath = \"x.sqlite\"\n[substitutes]\ndefault_limit = 0\n");
        assert!(load_config(&path).is_err());
    }
}
