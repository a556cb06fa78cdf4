//! Access to the hosted relational store that owns the package catalog.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{AuthorDetail, AuthorHit, PackageHit, PackageRelationship};

pub mod postgres;

pub use postgres::PgCatalogStore;

/// Read-only queries against the catalog. The store is the source of truth;
/// nothing here writes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Phrase full-text search over author names. No match is `Ok(vec![])`.
    async fn search_authors(&self, query: &str, limit: usize) -> Result<Vec<AuthorHit>>;

    /// Packages whose stored embedding is closest to `embedding`, most
    /// similar first, dropping anything below `min_similarity`.
    async fn semantic_packages(
        &self,
        embedding: &[f32],
        limit: usize,
        min_similarity: f64,
    ) -> Result<Vec<PackageHit>>;

    /// Author with the exact given name and the packages they work on.
    async fn author_by_name(&self, name: &str) -> Result<Option<AuthorDetail>>;

    /// Relationships declared by the named package.
    async fn package_relationships(&self, name: &str) -> Result<Vec<PackageRelationship>>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Catalog backed by vectors, recording every query string it sees.
    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        pub authors: Vec<AuthorHit>,
        pub semantic: Vec<PackageHit>,
        pub relationships: Vec<PackageRelationship>,
        pub fail: AtomicBool,
        pub queries: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn check(&self) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CatalogStore for FakeCatalog {
        async fn search_authors(&self, query: &str, limit: usize) -> Result<Vec<AuthorHit>> {
            self.queries.lock().push(query.to_string());
            self.check()?;
            let needle = query.to_lowercase();
            Ok(self
                .authors
                .iter()
                .filter(|a| a.name.to_lowercase().contains(&needle))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn semantic_packages(
            &self,
            _embedding: &[f32],
            limit: usize,
            min_similarity: f64,
        ) -> Result<Vec<PackageHit>> {
            self.check()?;
            Ok(self
                .semantic
                .iter()
                .filter(|p| p.similarity.unwrap_or_default() >= min_similarity)
                .take(limit)
                .cloned()
                .collect())
        }

        async fn author_by_name(&self, name: &str) -> Result<Option<AuthorDetail>> {
            self.check()?;
            Ok(self
                .authors
                .iter()
                .find(|a| a.name == name)
                .map(|a| AuthorDetail {
                    id: a.id,
                    name: a.name.clone(),
                    packages: Vec::new(),
                }))
        }

        async fn package_relationships(&self, _name: &str) -> Result<Vec<PackageRelationship>> {
            self.check()?;
            Ok(self.relationships.clone())
        }
    }

    pub(crate) fn author(id: i64, name: &str) -> AuthorHit {
        AuthorHit {
            id,
            name: name.to_string(),
            package_count: 1,
        }
    }
}
