use std::sync::Arc;

use crate::cache::snapshot::{HttpSnapshotSource, SnapshotCache};
use crate::config::{Config, SearchConfig};
use crate::llm::embeddings::{LlmEmbedder, QueryEmbedder};
use crate::search::lexical::LexicalIndex;
use crate::search::universal::UniversalSearch;
use crate::store::{CatalogStore, PgCatalogStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub snapshots: Arc<SnapshotCache>,
    pub lexical: Arc<LexicalIndex>,
    pub catalog: Arc<dyn CatalogStore>,
    pub search: Arc<UniversalSearch>,
}

impl AppState {
    /// Wire up the production sources: HTTP snapshot endpoint, Postgres and
    /// (if configured) the embedding API.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        let snapshots = Arc::new(SnapshotCache::new(
            Arc::new(HttpSnapshotSource::new(
                http_client.clone(),
                config.snapshot.clone(),
            )),
            config.search.snapshot_ttl(),
        ));
        let catalog: Arc<dyn CatalogStore> =
            Arc::new(PgCatalogStore::connect_lazy(&config.database)?);
        let embedder = config.embedding.clone().map(|embedding| {
            Arc::new(LlmEmbedder::new(http_client.clone(), embedding)) as Arc<dyn QueryEmbedder>
        });

        Ok(Self::from_parts(snapshots, catalog, embedder, &config.search))
    }

    /// Assemble state from already constructed sources.
    pub fn from_parts(
        snapshots: Arc<SnapshotCache>,
        catalog: Arc<dyn CatalogStore>,
        embedder: Option<Arc<dyn QueryEmbedder>>,
        search_config: &SearchConfig,
    ) -> Self {
        let lexical = Arc::new(LexicalIndex::new(
            snapshots.clone(),
            search_config.index_ttl(),
        ));
        let search = Arc::new(UniversalSearch::new(
            lexical.clone(),
            catalog.clone(),
            embedder,
            search_config.clone(),
        ));

        Self {
            snapshots,
            lexical,
            catalog,
            search,
        }
    }
}
