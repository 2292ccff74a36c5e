use axum::extract::{Path, State};
use serde_json::json;

use super::{ApiJson, ApiResult, created, ok, parse_id};
use crate::db::{Collection, Document, Filter, StoreError, Update};
use crate::error::{AppError, StoreResultExt};
use crate::models::{NewTutorRequest, to_document, validate_tutor_patch};
use crate::state::AppState;

pub async fn create_tutor(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewTutorRequest>,
) -> ApiResult {
    let tutor = req.validate()?;
    let doc = to_document(&tutor)
        .map_err(StoreError::from)
        .or_storage("Failed to add tutor")?;

    let id = state
        .store
        .insert_one(Collection::Tutors, doc)
        .await
        .or_storage("Failed to add tutor")?;

    created(json!({
        "success": true,
        "message": "Tutor added successfully",
        "insertedId": id,
    }))
}

pub async fn list_tutors(State(state): State<AppState>) -> ApiResult {
    let tutors = state
        .store
        .find_many(Collection::Tutors, &Filter::new())
        .await
        .or_storage("Failed to fetch tutors")?;
    ok(json!({ "success": true, "data": tutors }))
}

pub async fn get_tutor(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let tutor = state
        .store
        .find_by_id(Collection::Tutors, &id)
        .await
        .or_storage("Failed to fetch tutor")?
        .ok_or_else(|| AppError::not_found("Tutor not found"))?;
    ok(json!({ "success": true, "data": tutor }))
}

pub async fn update_tutor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<Document>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let patch = validate_tutor_patch(patch)?;

    let outcome = state
        .store
        .update_one(Collection::Tutors, &id, &Filter::new(), Update::Set(patch))
        .await
        .or_storage("Failed to update tutor")?;

    if outcome.matched == 0 {
        return Err(AppError::not_found("Tutor not found"));
    }

    ok(json!({
        "success": true,
        "message": "Tutor updated successfully",
        "modifiedCount": outcome.modified,
    }))
}

pub async fn delete_tutor(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    // Existing bookings keep pointing at the deleted tutor.
    let deleted = state
        .store
        .delete_one(Collection::Tutors, &id)
        .await
        .or_storage("Failed to delete tutor")?;

    let message = if deleted > 0 {
        "Tutor deleted successfully"
    } else {
        "No tutor deleted"
    };
    ok(json!({
        "success": true,
        "message": message,
        "deletedCount": deleted,
    }))
}
