use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Twelve hours, the lifetime of both the snapshot and the lexical index.
const DEFAULT_TTL_SECS: u64 = 12 * 60 * 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Hosted Postgres store
    pub database: DatabaseConfig,
    /// External package overview endpoint
    pub snapshot: SnapshotConfig,
    /// Result limits and cache lifetimes
    pub search: SearchConfig,
    /// Query embedding for semantic search; `None` disables that branch
    pub embedding: Option<EmbeddingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub url: String,
    /// Bearer token sent with every snapshot request
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub snapshot_ttl_secs: u64,
    pub index_ttl_secs: u64,
    pub package_limit: usize,
    pub author_limit: usize,
    pub semantic_limit: usize,
    /// Semantic hits below this cosine similarity are dropped
    pub min_similarity: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_secs: DEFAULT_TTL_SECS,
            index_ttl_secs: DEFAULT_TTL_SECS,
            package_limit: 20,
            author_limit: 10,
            semantic_limit: 10,
            min_similarity: 0.5,
        }
    }
}

impl SearchConfig {
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the embedding API
    pub base_url: String,
    pub model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Empty values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let mut search = SearchConfig::default();
        if let Some(v) = get("CRAN_SEARCH_SNAPSHOT_TTL_SECS") {
            search.snapshot_ttl_secs = parse("CRAN_SEARCH_SNAPSHOT_TTL_SECS", v)?;
        }
        if let Some(v) = get("CRAN_SEARCH_INDEX_TTL_SECS") {
            search.index_ttl_secs = parse("CRAN_SEARCH_INDEX_TTL_SECS", v)?;
        }
        if let Some(v) = get("CRAN_SEARCH_PACKAGE_LIMIT") {
            search.package_limit = parse("CRAN_SEARCH_PACKAGE_LIMIT", v)?;
        }
        if let Some(v) = get("CRAN_SEARCH_AUTHOR_LIMIT") {
            search.author_limit = parse("CRAN_SEARCH_AUTHOR_LIMIT", v)?;
        }
        if let Some(v) = get("CRAN_SEARCH_SEMANTIC_LIMIT") {
            search.semantic_limit = parse("CRAN_SEARCH_SEMANTIC_LIMIT", v)?;
        }
        if let Some(v) = get("CRAN_SEARCH_MIN_SIMILARITY") {
            search.min_similarity = parse("CRAN_SEARCH_MIN_SIMILARITY", v)?;
        }

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => parse("DATABASE_MAX_CONNECTIONS", v)?,
            None => 5,
        };

        let embedding = match get("EMBEDDING_BASE_URL") {
            Some(base_url) => {
                let provider = get("EMBEDDING_PROVIDER").unwrap_or_else(|| "ollama".to_string());
                if provider != "ollama" && provider != "openai" {
                    return Err(ConfigError::Invalid {
                        name: "EMBEDDING_PROVIDER",
                        value: provider,
                    });
                }
                Some(EmbeddingConfig {
                    provider,
                    base_url: base_url.trim_end_matches('/').to_string(),
                    model: get("EMBEDDING_MODEL")
                        .unwrap_or_else(|| "nomic-embed-text".to_string()),
                    api_key: get("EMBEDDING_API_KEY"),
                })
            }
            None => None,
        };

        Ok(Self {
            bind_addr: get("CRAN_SEARCH_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:9000".to_string()),
            database: DatabaseConfig {
                url: require("DATABASE_URL")?,
                max_connections,
            },
            snapshot: SnapshotConfig {
                url: require("SNAPSHOT_URL")?,
                token: require("SNAPSHOT_TOKEN")?,
            },
            search,
            embedding,
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
