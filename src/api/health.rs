use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::models::SnapshotInfo;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub snapshot: SnapshotInfo,
    pub lexical_builds: usize,
}

/// GET /api/health - Cache state; never triggers a fetch
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        snapshot: state.snapshots.info(),
        lexical_builds: state.lexical.build_count(),
    })
}

/// POST /api/cache/invalidate - Drop the snapshot and the lexical index
pub async fn invalidate(State(state): State<AppState>) -> StatusCode {
    state.snapshots.invalidate();
    state.lexical.invalidate();
    tracing::info!("Snapshot and lexical index invalidated");
    StatusCode::NO_CONTENT
}
