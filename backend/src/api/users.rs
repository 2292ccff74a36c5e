use axum::extract::{Path, State};
use serde_json::{Map, Value, json};

use super::{ApiJson, ApiResult, created, ok, parse_id};
use crate::db::{Collection, Filter, StoreError, Update};
use crate::error::{AppError, StoreResultExt};
use crate::models::{NewUserRequest, RoleUpdateRequest, to_document};
use crate::state::AppState;

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewUserRequest>,
) -> ApiResult {
    let user = req.validate()?;

    let existing = state
        .store
        .find_one(Collection::Users, &Filter::new().eq("email", user.email.as_str()))
        .await
        .or_storage("Failed to create user")?;
    if existing.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let doc = to_document(&user)
        .map_err(StoreError::from)
        .or_storage("Failed to create user")?;

    // The unique index still catches a registration racing the check above.
    let id = match state.store.insert_one(Collection::Users, doc).await {
        Ok(id) => id,
        Err(StoreError::Duplicate(_)) => {
            return Err(AppError::Conflict("User already exists".to_string()));
        }
        Err(err) => return Err(err).or_storage("Failed to create user"),
    };

    created(json!({
        "success": true,
        "message": "User created successfully",
        "insertedId": id,
    }))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult {
    let users = state
        .store
        .find_many(Collection::Users, &Filter::new())
        .await
        .or_storage("Failed to fetch users")?;
    ok(json!({ "success": true, "data": users }))
}

pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult {
    let email = email.trim().to_lowercase();
    let user = state
        .store
        .find_one(Collection::Users, &Filter::new().eq("email", email))
        .await
        .or_storage("Failed to fetch user")?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    ok(json!({ "success": true, "data": user }))
}

pub async fn update_user_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RoleUpdateRequest>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let role = req.validate()?;

    let mut fields = Map::new();
    fields.insert("role".to_string(), Value::String(role));

    let outcome = state
        .store
        .update_one(Collection::Users, &id, &Filter::new(), Update::Set(fields))
        .await
        .or_storage("Failed to update user role")?;

    if outcome.matched == 0 {
        return Err(AppError::not_found("User not found"));
    }

    ok(json!({
        "success": true,
        "message": "User role updated",
        "modifiedCount": outcome.modified,
    }))
}

pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let deleted = state
        .store
        .delete_one(Collection::Users, &id)
        .await
        .or_storage("Failed to delete user")?;

    ok(json!({
        "success": true,
        "message": "User deleted",
        "deletedCount": deleted,
    }))
}
