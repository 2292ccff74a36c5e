use axum::extract::{Path, State};
use serde_json::json;

use super::{ApiJson, ApiResult, created, ok, parse_id};
use crate::db::{Collection, Filter, StoreError, Update};
use crate::error::{AppError, StoreResultExt};
use crate::models::{BookingPatch, NewBookingRequest, to_document};
use crate::services::ReviewService;
use crate::state::AppState;

pub async fn create_booking(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewBookingRequest>,
) -> ApiResult {
    let booking = req.validate()?;
    let doc = to_document(&booking)
        .map_err(StoreError::from)
        .or_storage("Failed to create booking")?;

    let id = state
        .store
        .insert_one(Collection::Bookings, doc)
        .await
        .or_storage("Failed to create booking")?;

    created(json!({
        "success": true,
        "message": "Booking created successfully",
        "insertedId": id,
    }))
}

pub async fn list_bookings(State(state): State<AppState>) -> ApiResult {
    let bookings = state
        .store
        .find_many(Collection::Bookings, &Filter::new())
        .await
        .or_storage("Failed to fetch bookings")?;
    ok(json!({ "success": true, "data": bookings }))
}

pub async fn bookings_for_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult {
    let email = email.trim().to_lowercase();
    let bookings = state
        .store
        .bookings_with_tutor(&email)
        .await
        .or_storage("Failed to fetch bookings")?;
    ok(json!({ "success": true, "data": bookings }))
}

pub async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<BookingPatch>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let patch = patch.validate()?;
    let fields = to_document(&patch)
        .map_err(StoreError::from)
        .or_storage("Failed to update booking")?;

    let outcome = state
        .store
        .update_one(Collection::Bookings, &id, &Filter::new(), Update::Set(fields))
        .await
        .or_storage("Failed to update booking")?;

    if outcome.matched == 0 {
        return Err(AppError::not_found("Booking not found"));
    }

    ok(json!({
        "success": true,
        "message": "Booking updated successfully",
        "modifiedCount": outcome.modified,
    }))
}

pub async fn delete_booking(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let deleted = state
        .store
        .delete_one(Collection::Bookings, &id)
        .await
        .or_storage("Failed to delete booking")?;

    ok(json!({
        "success": true,
        "message": "Booking deleted",
        "deletedCount": deleted,
    }))
}

pub async fn review_booking(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let outcome = ReviewService::new(state.store.clone())
        .mark_reviewed(&id)
        .await?;

    ok(json!({
        "success": true,
        "message": "Booking marked as reviewed",
        "bookingId": outcome.booking_id,
        "tutorId": outcome.tutor_id,
        "tutorUpdated": outcome.tutor_updated,
    }))
}
