//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_RANKING__TOP_N=5`). Typed sections
//! live in [`Settings`]; every field has a default so an empty config works.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::{CollectionSpec, DistanceMetric};

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load `config.toml` and the env-specific overlay from `dir`.
    pub fn load_from(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to parse settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub catalog: CatalogSettings,
    pub embedding: EmbeddingSettings,
    pub vector: VectorSettings,
    pub text: TextSettings,
    pub ranking: RankingSettings,
    pub indexing: IndexingSettings,
    pub server: ServerSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.embedding.dimension == 0 {
            return Err(Error::Configuration("embedding.dimension must be > 0".into()));
        }
        self.ranking.validate()?;
        if self.indexing.concurrency == 0 {
            return Err(Error::Configuration("indexing.concurrency must be >= 1".into()));
        }
        Ok(())
    }

    pub fn collection(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.vector.collection.clone(),
            dimension: self.embedding.dimension,
            distance: self.vector.distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Directory of JSON catalog snapshots.
    pub data_dir: String,
}

impl Default for CatalogSettings {
    fn default() -> Self { Self { data_dir: "data/catalog".to_string() } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    #[default]
    Http,
    Hashing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub base_url: String,
    pub model: String,
    pub timeout_ms: u64,
    pub dimension: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Http,
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            timeout_ms: 30_000,
            dimension: 768,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    pub db_path: String,
    pub collection: String,
    pub distance: DistanceMetric,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self { db_path: "data/lancedb".to_string(), collection: "products".to_string(), distance: DistanceMetric::Cosine }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    /// On-disk Tantivy directory; an in-RAM index is used when unset.
    pub index_dir: Option<String>,
}

/// Score-fusion policy. The defaults are the production policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    pub semantic_weight: f64,
    pub keyword_bonus: f64,
    pub top_n: usize,
    pub semantic_limit: usize,
    pub lexical_limit: usize,
    pub deadline_ms: Option<u64>,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self { semantic_weight: 0.7, keyword_bonus: 0.3, top_n: 10, semantic_limit: 10, lexical_limit: 20, deadline_ms: None }
    }
}

impl RankingSettings {
    pub fn validate(&self) -> Result<(), Error> {
        for (name, w) in [("semantic_weight", self.semantic_weight), ("keyword_bonus", self.keyword_bonus)] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::Configuration(format!("ranking.{name} must be a finite non-negative number, got {w}")));
            }
        }
        if self.top_n == 0 {
            return Err(Error::Configuration("ranking.top_n must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingSettings {
    /// Products embedded/upserted at the same time.
    pub concurrency: usize,
}

impl Default for IndexingSettings {
    fn default() -> Self { Self { concurrency: 1 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub admin_token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self { Self { host: "127.0.0.1".to_string(), port: 8080, admin_token: None } }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
