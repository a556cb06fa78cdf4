use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query};
use tantivy::schema::*;
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};

use crate::cache::expiring::ExpiringIndex;
use crate::cache::snapshot::SnapshotCache;
use crate::models::{HitSource, PackageHit, PackageOverview};

/// Allowed edit distance as a fraction of the query term length.
const FUZZY_RATIO: f32 = 0.3;
/// Largest distance the Levenshtein automaton supports.
const MAX_FUZZY_DISTANCE: u8 = 2;
const NAME_BOOST: f32 = 2.0;
const TITLE_BOOST: f32 = 1.0;
/// Per-term match weights. Automaton queries score a constant equal to their
/// boost, and a term's clauses add up.
const EXACT_BOOST: f32 = 3.0;
const PREFIX_BOOST: f32 = 2.0;
const FUZZY_BOOST: f32 = 1.0;

/// Fuzzy/prefix index over package names and titles, held in RAM.
pub struct PackageIndex {
    index: Index,
    reader: IndexReader,
    f_name: Field,
    f_title: Field,
    f_slug: Field,
    f_authors: Field,
    len: usize,
}

impl PackageIndex {
    /// Index a snapshot. Rows repeating an already seen name are skipped.
    pub fn build(packages: &[PackageOverview]) -> Result<Self> {
        let mut schema_builder = Schema::builder();
        let f_name = schema_builder.add_text_field("name", TEXT | STORED);
        let f_title = schema_builder.add_text_field("title", TEXT | STORED);
        let f_slug = schema_builder.add_text_field("slug", STORED);
        let f_authors = schema_builder.add_text_field("author_names", STORED);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, 50_000_000)
            .context("Failed to create index writer")?;

        let mut seen = HashSet::new();
        for package in packages {
            if !seen.insert(package.name.as_str()) {
                continue;
            }
            let mut doc = TantivyDocument::default();
            doc.add_text(f_name, &package.name);
            doc.add_text(f_title, &package.title);
            doc.add_text(f_slug, &package.slug);
            for author in &package.author_names {
                doc.add_text(f_authors, author);
            }
            writer.add_document(doc)?;
        }
        writer.commit().context("Failed to commit package index")?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("Failed to create reader")?;

        Ok(Self {
            index,
            reader,
            f_name,
            f_title,
            f_slug,
            f_authors,
            len: seen.len(),
        })
    }

    /// Number of distinct packages indexed.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lowercased word tokens of `text`, deduplicated, in input order.
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let mut analyzer = self
            .index
            .tokenizer_for_field(self.f_name)
            .context("No tokenizer for name field")?;
        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();
        while stream.advance() {
            let term = stream.token().text.clone();
            if !terms.contains(&term) {
                terms.push(term);
            }
        }
        Ok(terms)
    }

    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<PackageHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let terms = self.tokenize(query_str)?;
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for term in &terms {
            let distance = fuzzy_distance(term);
            for (field, field_boost) in [(self.f_name, NAME_BOOST), (self.f_title, TITLE_BOOST)] {
                let term = Term::from_field_text(field, term);
                let mut matchers = vec![
                    (FuzzyTermQuery::new(term.clone(), 0, true), EXACT_BOOST),
                    (FuzzyTermQuery::new_prefix(term.clone(), 0, true), PREFIX_BOOST),
                ];
                // Typos are matched against whole indexed terms only
                if distance > 0 {
                    matchers.push((FuzzyTermQuery::new(term, distance, true), FUZZY_BOOST));
                }
                for (query, boost) in matchers {
                    clauses.push((
                        Occur::Should,
                        Box::new(BoostQuery::new(Box::new(query), boost * field_boost)),
                    ));
                }
            }
        }
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit))
            .context("Search failed")?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (_score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(doc_address)
                .context("Failed to retrieve document")?;

            let text = |field: Field| {
                doc.get_first(field)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };

            hits.push(PackageHit {
                name: text(self.f_name),
                title: text(self.f_title),
                slug: text(self.f_slug),
                author_names: doc
                    .get_all(self.f_authors)
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect(),
                source: HitSource::Lexical,
                similarity: None,
            });
        }

        Ok(hits)
    }
}

/// Edit distance tolerated for a query term: 30% of its length, rounded,
/// capped at the automaton limit.
pub fn fuzzy_distance(term: &str) -> u8 {
    let scaled = (term.chars().count() as f32 * FUZZY_RATIO).round();
    (scaled as u8).min(MAX_FUZZY_DISTANCE)
}

/// Lazily built [`PackageIndex`] that is rebuilt from the snapshot cache when
/// its TTL elapses. The request that finds it expired pays for the rebuild.
pub struct LexicalIndex {
    snapshots: Arc<SnapshotCache>,
    ttl: Duration,
    current: RwLock<Option<ExpiringIndex<Arc<PackageIndex>>>>,
    rebuild: tokio::sync::Mutex<()>,
    builds: AtomicUsize,
}

impl LexicalIndex {
    pub fn new(snapshots: Arc<SnapshotCache>, ttl: Duration) -> Self {
        Self {
            snapshots,
            ttl,
            current: RwLock::new(None),
            rebuild: tokio::sync::Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    fn fresh(&self) -> Option<Arc<PackageIndex>> {
        self.current
            .read()
            .as_ref()
            .and_then(|entry| entry.fresh())
            .cloned()
    }

    async fn current_index(&self) -> Result<Arc<PackageIndex>> {
        if let Some(index) = self.fresh() {
            return Ok(index);
        }

        let _guard = self.rebuild.lock().await;
        if let Some(index) = self.fresh() {
            return Ok(index);
        }

        let packages = self.snapshots.get_all_overview_packages().await?;
        let index = tokio::task::spawn_blocking(move || PackageIndex::build(&packages))
            .await
            .context("Package index build task panicked")??;
        let index = Arc::new(index);

        self.builds.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Built lexical package index: {} packages", index.len());

        *self.current.write() = Some(ExpiringIndex::new(index.clone(), self.ttl));
        Ok(index)
    }

    /// Search package names and titles, rebuilding the index first if needed.
    pub async fn search_packages(&self, query: &str, limit: usize) -> Result<Vec<PackageHit>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let index = self.current_index().await?;
        index.search(query, limit)
    }

    /// Drop the index so the next search rebuilds it.
    pub fn invalidate(&self) {
        *self.current.write() = None;
    }

    /// How many times the index has been built.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::snapshot::tests::{overview, FakeSource};

    fn cran_sample() -> Vec<PackageOverview> {
        vec![
            overview(
                "ggplot2",
                "Create Elegant Data Visualisations Using the Grammar of Graphics",
            ),
            overview("ggthemes", "Extra Themes, Scales and Geoms for 'ggplot2'"),
            overview("dplyr", "A Grammar of Data Manipulation"),
            overview("data.table", "Extension of 'data.frame'"),
        ]
    }

    #[test]
    fn test_fuzzy_distance_scales_and_caps() {
        assert_eq!(fuzzy_distance("a"), 0);
        assert_eq!(fuzzy_distance("gg"), 1);
        assert_eq!(fuzzy_distance("dply"), 1);
        assert_eq!(fuzzy_distance("ggplot"), 2);
        assert_eq!(fuzzy_distance("visualisations"), 2);
    }

    #[test]
    fn test_prefix_query_ranks_name_match_first() {
        let index = PackageIndex::build(&cran_sample()).unwrap();
        let hits = index.search("ggplot", 10).unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();

        assert!(names.contains(&"ggplot2"));
        assert!(names.contains(&"ggthemes"));
        assert_eq!(names[0], "ggplot2");
        assert!(hits.iter().all(|h| h.source == HitSource::Lexical));
    }

    #[test]
    fn test_exact_prefix_outranks_typo_match() {
        let rows = vec![
            overview("gplots", "Various R Programming Tools"),
            overview("ggplot2", "Tools"),
        ];
        let index = PackageIndex::build(&rows).unwrap();
        let hits = index.search("ggplot", 10).unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["ggplot2", "gplots"]);
    }

    #[test]
    fn test_exact_term_outranks_longer_prefix() {
        let rows = vec![
            overview("shinyjs", "Easily Improve the User Experience"),
            overview("shiny", "Web Application Framework for R"),
        ];
        let index = PackageIndex::build(&rows).unwrap();
        let hits = index.search("shiny", 10).unwrap();
        assert_eq!(hits[0].name, "shiny");
        assert_eq!(hits[1].name, "shinyjs");
    }

    #[test]
    fn test_unrelated_words_do_not_match() {
        let rows = vec![
            overview("dplyr", "A Grammar of Data Manipulation"),
            overview("Seurat", "Tools for Single Cell Genomics"),
        ];
        let index = PackageIndex::build(&rows).unwrap();
        assert!(index.search("gg", 10).unwrap().is_empty());
        assert!(index.search("shiny", 10).unwrap().is_empty());
    }

    #[test]
    fn test_fuzzy_tolerates_typo() {
        let index = PackageIndex::build(&cran_sample()).unwrap();
        let hits = index.search("dplry", 10).unwrap();
        assert!(hits.iter().any(|h| h.name == "dplyr"));
    }

    #[test]
    fn test_duplicate_names_indexed_once() {
        let mut rows = cran_sample();
        rows.push(overview("dplyr", "Duplicate row"));
        let index = PackageIndex::build(&rows).unwrap();
        assert_eq!(index.len(), 4);

        let hits = index.search("dplyr", 10).unwrap();
        let dplyr: Vec<_> = hits.iter().filter(|h| h.name == "dplyr").collect();
        assert_eq!(dplyr.len(), 1);
        assert_eq!(dplyr[0].title, "A Grammar of Data Manipulation");
    }

    #[test]
    fn test_empty_query_and_zero_limit() {
        let index = PackageIndex::build(&cran_sample()).unwrap();
        assert!(index.search("   ", 10).unwrap().is_empty());
        assert!(index.search("--", 10).unwrap().is_empty());
        assert!(index.search("ggplot", 0).unwrap().is_empty());
    }

    #[test]
    fn test_limit_respected() {
        let rows: Vec<_> = (0..30)
            .map(|i| overview(&format!("pkg{i}"), "Shared title"))
            .collect();
        let index = PackageIndex::build(&rows).unwrap();
        assert_eq!(index.search("shared", 5).unwrap().len(), 5);
    }

    #[test]
    fn test_authors_round_trip_through_index() {
        let mut row = overview("shiny", "Web Application Framework for R");
        row.author_names = vec!["Winston Chang".to_string(), "Joe Cheng".to_string()];
        let index = PackageIndex::build(&[row]).unwrap();
        let hits = index.search("shiny", 1).unwrap();
        assert_eq!(hits[0].author_names, vec!["Winston Chang", "Joe Cheng"]);
        assert_eq!(hits[0].slug, "shiny");
    }

    const TTL: Duration = Duration::from_secs(12 * 60 * 60);

    #[tokio::test(start_paused = true)]
    async fn test_index_built_lazily_once_per_window() {
        let source = FakeSource::new(cran_sample());
        let snapshots = Arc::new(SnapshotCache::new(source.clone(), TTL));
        let lexical = LexicalIndex::new(snapshots, TTL);

        assert_eq!(lexical.build_count(), 0);
        lexical.search_packages("ggplot", 10).await.unwrap();
        lexical.search_packages("dplyr", 10).await.unwrap();
        assert_eq!(lexical.build_count(), 1);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_triggers_exactly_one_rebuild() {
        let source = FakeSource::new(cran_sample());
        let snapshots = Arc::new(SnapshotCache::new(source.clone(), TTL));
        let lexical = Arc::new(LexicalIndex::new(snapshots, TTL));

        lexical.search_packages("ggplot", 10).await.unwrap();
        tokio::time::advance(TTL + Duration::from_secs(1)).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lexical = lexical.clone();
            handles.push(tokio::spawn(async move {
                lexical.search_packages("ggplot", 10).await
            }));
        }
        for handle in handles {
            assert!(!handle.await.unwrap().unwrap().is_empty());
        }

        assert_eq!(lexical.build_count(), 2);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_failure_surfaces_as_error() {
        let source = FakeSource::new(cran_sample());
        source.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        let snapshots = Arc::new(SnapshotCache::new(source, TTL));
        let lexical = LexicalIndex::new(snapshots, TTL);

        assert!(lexical.search_packages("ggplot", 10).await.is_err());
        assert_eq!(lexical.build_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_rebuild() {
        let source = FakeSource::new(cran_sample());
        let snapshots = Arc::new(SnapshotCache::new(source, TTL));
        let lexical = LexicalIndex::new(snapshots, TTL);

        lexical.search_packages("ggplot", 10).await.unwrap();
        lexical.invalidate();
        lexical.search_packages("ggplot", 10).await.unwrap();
        assert_eq!(lexical.build_count(), 2);
    }
}
