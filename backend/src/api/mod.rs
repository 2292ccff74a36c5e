mod bookings;
mod categories;
mod dashboard;
mod tutors;
mod users;

use axum::extract::FromRequest;
use axum::routing::{get, patch};
use axum::{Json, Router, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::AppError;
use crate::models::RecordId;
use crate::state::AppState;

/// `axum::Json`, but malformed bodies become the usual 400 envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

pub type ApiResult = Result<(StatusCode, Json<Value>), AppError>;

pub(crate) fn ok(body: Value) -> ApiResult {
    Ok((StatusCode::OK, Json(body)))
}

pub(crate) fn created(body: Value) -> ApiResult {
    Ok((StatusCode::CREATED, Json(body)))
}

pub(crate) fn parse_id(raw: &str) -> Result<RecordId, AppError> {
    RecordId::parse(raw).ok_or_else(|| AppError::bad_request("Invalid id"))
}

pub fn router(state: AppState) -> Router {
    // `{key}` is an email for GET and a record id for PATCH/DELETE; the
    // router needs a single name per segment.
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/categories", get(categories::list_categories))
        .route("/tutors", get(tutors::list_tutors).post(tutors::create_tutor))
        .route(
            "/tutors/{id}",
            get(tutors::get_tutor)
                .patch(tutors::update_tutor)
                .delete(tutors::delete_tutor),
        )
        .route("/bookings", get(bookings::list_bookings).post(bookings::create_booking))
        .route("/bookings/reviewed/{id}", patch(bookings::review_booking))
        .route(
            "/bookings/{key}",
            get(bookings::bookings_for_email)
                .patch(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{key}",
            get(users::get_user_by_email)
                .patch(users::update_user_role)
                .delete(users::delete_user),
        )
        .route("/dashboard/stats", get(dashboard::stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "success": true, "message": "Tutor booking API is running" }))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))),
        Err(err) => {
            error!("health check failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "ok": false })))
        }
    }
}
