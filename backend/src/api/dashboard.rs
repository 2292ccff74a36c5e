use axum::extract::State;
use serde_json::json;

use super::{ApiResult, ok};
use crate::error::StoreResultExt;
use crate::services::DashboardService;
use crate::state::AppState;

pub async fn stats(State(state): State<AppState>) -> ApiResult {
    let stats = DashboardService::new(state.store.clone())
        .stats()
        .await
        .or_storage("Failed to load dashboard stats")?;
    ok(json!({ "success": true, "data": stats }))
}
