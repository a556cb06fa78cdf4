use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::models::{AuthorDetail, PackageDetail};
use crate::state::AppState;
use crate::validate;

/// GET /api/packages/{name} - Snapshot row plus relationships from the store
pub async fn get_package(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PackageDetail>, (StatusCode, String)> {
    let name = validate::package_name(&name)?;

    let package = state.snapshots.find_package(name).await.map_err(|e| {
        tracing::error!("Snapshot unavailable: {e:#}");
        (
            StatusCode::BAD_GATEWAY,
            format!("Package snapshot unavailable: {e}"),
        )
    })?;
    let Some(package) = package else {
        return Err((StatusCode::NOT_FOUND, "Package not found".to_string()));
    };

    let relationships = match state.catalog.package_relationships(name).await {
        Ok(relationships) => relationships,
        Err(e) => {
            tracing::warn!("Relationship lookup for {name} failed: {e:#}");
            Vec::new()
        }
    };

    Ok(Json(PackageDetail {
        package,
        relationships,
    }))
}

/// GET /api/authors/{name} - Author and their packages; store failures read as
/// not found
pub async fn get_author(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AuthorDetail>, (StatusCode, String)> {
    let name = validate::author_name(&name)?;

    match state.catalog.author_by_name(name).await {
        Ok(Some(author)) => Ok(Json(author)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Author not found".to_string())),
        Err(e) => {
            tracing::warn!("Author lookup for {name} failed: {e:#}");
            Err((StatusCode::NOT_FOUND, "Author not found".to_string()))
        }
    }
}
