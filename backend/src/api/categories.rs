use axum::Json;
use serde_json::{Value, json};

use crate::models::CATEGORIES;

pub async fn list_categories() -> Json<Value> {
    Json(json!({ "success": true, "data": CATEGORIES }))
}
