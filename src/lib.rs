//! # cran-search
//!
//! Universal search backend for a CRAN package browser. A query is answered
//! from a local fuzzy/prefix index over a cached package snapshot and from
//! the hosted Postgres catalog, and the results are merged into one list.
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────────────┐
//!                     │  POST /api/search    │
//!                     │  q (≤512 chars)      │
//!                     └──────────┬───────────┘
//!                                │
//!          ┌─────────────────────┼─────────────────────┐
//!          ▼                     ▼                     ▼
//!  ┌───────────────┐    ┌─────────────────┐   ┌─────────────────┐
//!  │ Lexical index │    │ Semantic search │   │  Author search  │
//!  │ tantivy, RAM  │    │ embed + pgvector│   │ Postgres FTS    │
//!  │ fuzzy+prefix  │    │ (optional)      │   │ phrase query    │
//!  └───────┬───────┘    └────────┬────────┘   └────────┬────────┘
//!          │ rebuilt per TTL     │                     │
//!  ┌───────┴───────┐             │                     │
//!  │ Snapshot cache│             │                     │
//!  │ GET + bearer  │             │                     │
//!  └───────────────┘             │                     │
//!          └──────────┬──────────┘                     │
//!                     ▼                                │
//!          ┌─────────────────────┐                     │
//!          │ Package hits        │                     │
//!          │ lexical ++ semantic │                     │
//!          │ dedup by name       │                     │
//!          └──────────┬──────────┘                     │
//!                     └───────────────┬────────────────┘
//!                                     ▼
//!                     ┌──────────────────────────────┐
//!                     │ Combined: substring matches  │
//!                     │ first, stable otherwise      │
//!                     │ + per-branch status          │
//!                     └──────────────────────────────┘
//! ```
//!
//! Every branch is awaited; a failing branch contributes no hits and reports
//! `failed` in its status instead of failing the request.
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration; required values fail startup
//! - [`models`] - Snapshot rows, hits, per-branch status and response types
//! - [`cache`] - TTL wrapper and the package overview snapshot cache
//! - [`search::lexical`] - In-RAM tantivy index with fuzzy/prefix term queries
//! - [`search::universal`] - Fan-out, merge and substring-first ranking
//! - [`store`] - Hosted catalog queries (authors, semantic hits, relationships)
//! - [`llm::embeddings`] - Query embedding via Ollama or OpenAI-compatible APIs
//! - [`validate`] - Package and author identifier checks
//! - [`api`] - Axum HTTP handlers
//! - [`client`] - Debounced, last-write-wins search box dispatch
//! - [`state`] - Shared application state

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod llm;
pub mod models;
pub mod search;
pub mod state;
pub mod store;
pub mod validate;
