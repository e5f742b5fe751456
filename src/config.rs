use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "POKEMON_CATALOG_CONFIG";

const DEFAULT_CONFIG: &str = include_str!("../config/config.toml");

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub pokemon: PokemonConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub favorites: FavoritesConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct PokemonConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub page_size: usize,
    pub name_index_limit: usize,
    pub search_limit: usize,
    pub search_debounce_ms: u64,
    // Upper bound on concurrent detail requests within one batch
    pub concurrency: usize,
}

impl Default for PokemonConfig {
    fn default() -> Self {
        Self {
            api_url: "https://pokeapi.co/api/v2".to_string(),
            timeout_secs: 15,
            page_size: 60,
            name_index_limit: 2000,
            search_limit: 20,
            search_debounce_ms: 300,
            concurrency: 16,
        }
    }
}

impl PokemonConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 2000,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_size: usize,
    pub expiration_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 2000,
            expiration_secs: 300,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct FavoritesConfig {
    pub path: PathBuf,
    pub key: String,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/favorites.json"),
            key: "@pokemon_favorites".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: Option<String>,
}

impl Config {
    /// Loads the file named by `POKEMON_CATALOG_CONFIG`, or the embedded default.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Self::from_toml(DEFAULT_CONFIG),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!("Failed to read config file {}: {}", path.display(), e);
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).map_err(|e| {
            tracing::error!("Failed to parse config: {}", e);
            AppError::from(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pokemon.api_url.trim().is_empty() {
            return Err(AppError::Config("pokemon.api_url must not be empty".into()));
        }
        if self.pokemon.page_size == 0 {
            return Err(AppError::Config("pokemon.page_size must be positive".into()));
        }
        if self.pokemon.search_limit == 0 {
            return Err(AppError::Config("pokemon.search_limit must be positive".into()));
        }
        if self.pokemon.concurrency == 0 {
            return Err(AppError::Config("pokemon.concurrency must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_parses() {
        let config = Config::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.pokemon.page_size, 60);
        assert_eq!(config.pokemon.timeout(), Duration::from_secs(15));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.favorites.key, "@pokemon_favorites");
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config = Config::from_toml(
            r#"
            [pokemon]
            page_size = 20

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.pokemon.page_size, 20);
        assert_eq!(config.pokemon.search_limit, 20);
        assert_eq!(config.pokemon.api_url, "https://pokeapi.co/api/v2");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Config::from_toml("[pokemon]\npage_size = 0\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let err = Config::from_toml("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
