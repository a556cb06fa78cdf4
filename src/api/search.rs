use axum::extract::State;
use axum::http::StatusCode;
use axum::{Form, Json};

use crate::models::{SearchForm, UniversalResults};
use crate::state::AppState;
use crate::validate::ValidationError;

/// POST /api/search - Universal search over packages and authors:
///   1. Query trimmed and cut to 512 characters
///   2. Lexical index, semantic store query and author store query run
///      concurrently; failures degrade to empty branches
///   3. Package and author hits merged, substring matches first
pub async fn search(
    State(state): State<AppState>,
    Form(form): Form<SearchForm>,
) -> Result<Json<UniversalResults>, (StatusCode, String)> {
    if form.q.trim().is_empty() {
        return Err(ValidationError::EmptyQuery.into());
    }

    let results = state.search.search(&form.q, form.intent).await;
    tracing::debug!(
        query = %results.query,
        packages = results.packages.hits.len(),
        authors = results.authors.hits.len(),
        "Universal search served"
    );
    Ok(Json(results))
}
