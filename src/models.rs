use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the package overview snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageOverview {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, alias = "authorNames")]
    pub author_names: Vec<String>,
}

/// Where a package hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitSource {
    Lexical,
    Semantic,
}

/// A package matched by the lexical index or the semantic store query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageHit {
    pub name: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub author_names: Vec<String>,
    pub source: HitSource,
    /// Cosine similarity, only set for semantic hits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// An author matched by the hosted store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorHit {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub package_count: i64,
}

/// One entry of the combined result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchHit {
    Package(PackageHit),
    Author(AuthorHit),
}

impl SearchHit {
    pub fn name(&self) -> &str {
        match self {
            SearchHit::Package(p) => &p.name,
            SearchHit::Author(a) => &a.name,
        }
    }

    /// Package title; authors have none.
    pub fn synopsis(&self) -> Option<&str> {
        match self {
            SearchHit::Package(p) if !p.title.is_empty() => Some(&p.title),
            _ => None,
        }
    }
}

/// Outcome of a single search branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    Failed { error: String },
    Disabled,
}

impl SourceStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, SourceStatus::Failed { .. })
    }
}

/// Hits from one source together with how that source fared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResults<T> {
    pub hits: Vec<T>,
    pub status: SourceStatus,
}

impl<T> SourceResults<T> {
    pub fn disabled() -> Self {
        Self {
            hits: Vec::new(),
            status: SourceStatus::Disabled,
        }
    }
}

/// Universal search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalResults {
    pub query: String,
    pub combined: Vec<SearchHit>,
    /// Lexical and semantic hits merged; `ok` if either half succeeded
    pub packages: SourceResults<PackageHit>,
    pub authors: SourceResults<AuthorHit>,
    /// Status of the semantic half of the package branch
    pub semantic: SourceStatus,
}

/// Which sources a search request should hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchIntent {
    #[default]
    All,
    Packages,
    Authors,
}

/// Form body of `POST /api/search`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchForm {
    #[serde(default)]
    pub q: String,
    #[serde(default, alias = "action")]
    pub intent: SearchIntent,
}

/// A dependency-style link between two packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRelationship {
    pub package: String,
    pub relationship: String,
}

/// Package detail response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDetail {
    pub package: PackageOverview,
    pub relationships: Vec<PackageRelationship>,
}

/// Author detail response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorDetail {
    pub id: i64,
    pub name: String,
    pub packages: Vec<String>,
}

/// Snapshot cache state reported by `/api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub loaded: bool,
    pub package_count: usize,
    pub fetched_at: Option<DateTime<Utc>>,
}
