use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::llm::embeddings::QueryEmbedder;
use crate::models::{
    AuthorHit, PackageHit, SearchHit, SearchIntent, SourceResults, SourceStatus,
    UniversalResults,
};
use crate::search::lexical::LexicalIndex;
use crate::store::CatalogStore;

/// Longest query, in characters, forwarded to any source.
pub const MAX_QUERY_CHARS: usize = 512;

/// Trim `query` and cut it to at most [`MAX_QUERY_CHARS`] characters.
pub fn truncate_query(query: &str) -> &str {
    let query = query.trim();
    match query.char_indices().nth(MAX_QUERY_CHARS) {
        Some((end, _)) => &query[..end],
        None => query,
    }
}

/// Lexical hits first, then semantic hits for names not seen yet.
pub fn merge_package_hits(lexical: Vec<PackageHit>, semantic: Vec<PackageHit>) -> Vec<PackageHit> {
    let mut seen = HashSet::new();
    lexical
        .into_iter()
        .chain(semantic)
        .filter(|hit| seen.insert(hit.name.clone()))
        .collect()
}

fn dedup_authors(authors: Vec<AuthorHit>) -> Vec<AuthorHit> {
    let mut seen = HashSet::new();
    authors.into_iter().filter(|a| seen.insert(a.id)).collect()
}

/// Stable partition: hits whose name or synopsis contains the query
/// (case-insensitively) move ahead of the rest, order otherwise kept.
pub fn rank_by_substring(hits: &mut [SearchHit], query: &str) {
    let needle = query.to_lowercase();
    hits.sort_by_key(|hit| {
        let in_name = hit.name().to_lowercase().contains(&needle);
        let in_synopsis = hit
            .synopsis()
            .is_some_and(|s| s.to_lowercase().contains(&needle));
        !(in_name || in_synopsis)
    });
}

/// Package hits followed by author hits, partitioned by [`rank_by_substring`].
pub fn combine(packages: &[PackageHit], authors: &[AuthorHit], query: &str) -> Vec<SearchHit> {
    let mut combined: Vec<SearchHit> = packages
        .iter()
        .cloned()
        .map(SearchHit::Package)
        .chain(authors.iter().cloned().map(SearchHit::Author))
        .collect();
    rank_by_substring(&mut combined, query);
    combined
}

/// Turn one branch outcome into hits plus status. A failure is logged here
/// and nowhere else.
fn settle<T>(branch: &'static str, outcome: Option<Result<Vec<T>>>) -> SourceResults<T> {
    match outcome {
        None => SourceResults::disabled(),
        Some(Ok(hits)) => SourceResults {
            hits,
            status: SourceStatus::Ok,
        },
        Some(Err(e)) => {
            tracing::warn!(branch, "Search branch failed: {e:#}");
            SourceResults {
                hits: Vec::new(),
                status: SourceStatus::Failed {
                    error: format!("{e:#}"),
                },
            }
        }
    }
}

/// The package branch is `ok` when either half produced results. A lexical
/// failure only shows as `failed` when semantic search could not cover it.
fn package_status(lexical: SourceStatus, semantic: &SourceStatus) -> SourceStatus {
    if lexical.is_failed() && *semantic == SourceStatus::Ok {
        SourceStatus::Ok
    } else {
        lexical
    }
}

/// Fans a query out to the lexical index, the semantic store query and the
/// author store query, then merges what comes back.
pub struct UniversalSearch {
    lexical: Arc<LexicalIndex>,
    catalog: Arc<dyn CatalogStore>,
    embedder: Option<Arc<dyn QueryEmbedder>>,
    config: SearchConfig,
}

impl UniversalSearch {
    pub fn new(
        lexical: Arc<LexicalIndex>,
        catalog: Arc<dyn CatalogStore>,
        embedder: Option<Arc<dyn QueryEmbedder>>,
        config: SearchConfig,
    ) -> Self {
        Self {
            lexical,
            catalog,
            embedder,
            config,
        }
    }

    pub async fn search_universal(&self, query: &str) -> UniversalResults {
        self.search(query, SearchIntent::All).await
    }

    async fn semantic_packages(&self, query: &str) -> Option<Result<Vec<PackageHit>>> {
        let embedder = self.embedder.as_ref()?;
        let result = async {
            let embedding = embedder.embed_query(query).await?;
            self.catalog
                .semantic_packages(
                    &embedding,
                    self.config.semantic_limit,
                    self.config.min_similarity,
                )
                .await
        }
        .await;
        Some(result)
    }

    /// Run the branches selected by `intent` concurrently. Every branch is
    /// awaited; a failing one contributes no hits and a `failed` status.
    pub async fn search(&self, query: &str, intent: SearchIntent) -> UniversalResults {
        let query = truncate_query(query);
        let want_packages = intent != SearchIntent::Authors;
        let want_authors = intent != SearchIntent::Packages;

        if query.is_empty() {
            let status = |wanted: bool| {
                if wanted {
                    SourceStatus::Ok
                } else {
                    SourceStatus::Disabled
                }
            };
            return UniversalResults {
                query: String::new(),
                combined: Vec::new(),
                packages: SourceResults {
                    hits: Vec::new(),
                    status: status(want_packages),
                },
                authors: SourceResults {
                    hits: Vec::new(),
                    status: status(want_authors),
                },
                semantic: SourceStatus::Disabled,
            };
        }

        let (lexical, semantic, authors) = tokio::join!(
            async {
                if want_packages {
                    Some(
                        self.lexical
                            .search_packages(query, self.config.package_limit)
                            .await,
                    )
                } else {
                    None
                }
            },
            async {
                if want_packages {
                    self.semantic_packages(query).await
                } else {
                    None
                }
            },
            async {
                if want_authors {
                    Some(
                        self.catalog
                            .search_authors(query, self.config.author_limit)
                            .await,
                    )
                } else {
                    None
                }
            },
        );

        let lexical = settle("lexical", lexical);
        let semantic = settle("semantic", semantic);
        let mut authors = settle("authors", authors);
        authors.hits = dedup_authors(authors.hits);

        let packages = SourceResults {
            status: package_status(lexical.status, &semantic.status),
            hits: merge_package_hits(lexical.hits, semantic.hits),
        };
        let combined = combine(&packages.hits, &authors.hits, query);

        UniversalResults {
            query: query.to_string(),
            combined,
            packages,
            authors,
            semantic: semantic.status,
        }
    }
}
