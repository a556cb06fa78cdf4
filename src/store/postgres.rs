use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt::Write;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::models::{AuthorDetail, AuthorHit, HitSource, PackageHit, PackageRelationship};
use crate::store::CatalogStore;

const SEARCH_AUTHORS_SQL: &str = "
SELECT a.id, a.name, COUNT(acp.cran_package_id) AS package_count
FROM authors a
LEFT JOIN author_cran_package acp ON acp.author_id = a.id
WHERE to_tsvector('simple', a.name) @@ phraseto_tsquery('simple', $1)
GROUP BY a.id, a.name
ORDER BY package_count DESC, a.name
LIMIT $2";

const SEMANTIC_PACKAGES_SQL: &str = "
SELECT p.name, p.title, p.slug,
       (1 - (e.embedding <=> $1::text::vector))::float8 AS similarity
FROM cran_package_embeddings e
JOIN cran_packages p ON p.id = e.cran_package_id
WHERE 1 - (e.embedding <=> $1::text::vector) >= $2
ORDER BY e.embedding <=> $1::text::vector
LIMIT $3";

const AUTHOR_BY_NAME_SQL: &str = "
SELECT a.id, a.name,
       COALESCE(array_agg(p.name ORDER BY p.name) FILTER (WHERE p.name IS NOT NULL), '{}') AS packages
FROM authors a
LEFT JOIN author_cran_package acp ON acp.author_id = a.id
LEFT JOIN cran_packages p ON p.id = acp.cran_package_id
WHERE a.name = $1
GROUP BY a.id, a.name
LIMIT 1";

const PACKAGE_RELATIONSHIPS_SQL: &str = "
SELECT related.name AS package, r.relationship_type AS relationship
FROM cran_package_relationship r
JOIN cran_packages src ON src.id = r.package_id
JOIN cran_packages related ON related.id = r.related_package_id
WHERE src.name = $1
ORDER BY r.relationship_type, related.name";

#[derive(sqlx::FromRow)]
struct AuthorRow {
    id: i64,
    name: String,
    package_count: i64,
}

#[derive(sqlx::FromRow)]
struct SemanticRow {
    name: String,
    title: Option<String>,
    slug: Option<String>,
    similarity: f64,
}

#[derive(sqlx::FromRow)]
struct AuthorDetailRow {
    id: i64,
    name: String,
    packages: Vec<String>,
}

#[derive(sqlx::FromRow)]
struct RelationshipRow {
    package: String,
    relationship: String,
}

/// Catalog store backed by the hosted Postgres database.
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Build the pool without opening a connection; the first query connects.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(&config.url)
            .context("Invalid database URL")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// pgvector text literal, e.g. `[0.1,0.2,0.3]`.
fn vector_literal(embedding: &[f32]) -> String {
    let mut out = String::with_capacity(embedding.len() * 10 + 2);
    out.push('[');
    for (i, v) in embedding.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{v}");
    }
    out.push(']');
    out
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn search_authors(&self, query: &str, limit: usize) -> Result<Vec<AuthorHit>> {
        let rows: Vec<AuthorRow> = sqlx::query_as(SEARCH_AUTHORS_SQL)
            .bind(query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .context("Author search query failed")?;

        Ok(rows
            .into_iter()
            .map(|r| AuthorHit {
                id: r.id,
                name: r.name,
                package_count: r.package_count,
            })
            .collect())
    }

    async fn semantic_packages(
        &self,
        embedding: &[f32],
        limit: usize,
        min_similarity: f64,
    ) -> Result<Vec<PackageHit>> {
        if embedding.is_empty() {
            anyhow::bail!("Empty query embedding");
        }

        let rows: Vec<SemanticRow> = sqlx::query_as(SEMANTIC_PACKAGES_SQL)
            .bind(vector_literal(embedding))
            .bind(min_similarity)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .context("Semantic package query failed")?;

        Ok(rows
            .into_iter()
            .map(|r| PackageHit {
                slug: r.slug.unwrap_or_else(|| r.name.to_lowercase()),
                name: r.name,
                title: r.title.unwrap_or_default(),
                author_names: Vec::new(),
                source: HitSource::Semantic,
                similarity: Some(r.similarity),
            })
            .collect())
    }

    async fn author_by_name(&self, name: &str) -> Result<Option<AuthorDetail>> {
        let row: Option<AuthorDetailRow> = sqlx::query_as(AUTHOR_BY_NAME_SQL)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Author lookup failed")?;

        Ok(row.map(|r| AuthorDetail {
            id: r.id,
            name: r.name,
            packages: r.packages,
        }))
    }

    async fn package_relationships(&self, name: &str) -> Result<Vec<PackageRelationship>> {
        let rows: Vec<RelationshipRow> = sqlx::query_as(PACKAGE_RELATIONSHIPS_SQL)
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .context("Package relationship query failed")?;

        Ok(rows
            .into_iter()
            .map(|r| PackageRelationship {
                package: r.package,
                relationship: r.relationship,
            })
            .collect())
    }
}
