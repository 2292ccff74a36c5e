use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::db::{Collection, Filter, RecordStore, StoreError, Update};
use crate::error::{AppError, StoreResultExt};
use crate::models::{Booking, RecordId};

/// Marks a booking reviewed once, then bumps its tutor's review counter.
///
/// The two writes are issued one after the other. If the second fails the
/// booking stays reviewed without the counter change, and the error is
/// reported to the caller.
pub struct ReviewService {
    store: Arc<dyn RecordStore>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub booking_id: String,
    pub tutor_id: String,
    /// False when the booking's tutor no longer exists.
    pub tutor_updated: bool,
}

impl ReviewService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn mark_reviewed(&self, id: &RecordId) -> Result<ReviewOutcome, AppError> {
        let doc = self
            .store
            .find_by_id(Collection::Bookings, id)
            .await
            .or_storage("Failed to review booking")?
            .ok_or_else(|| AppError::not_found("Booking not found"))?;

        let booking: Booking = serde_json::from_value(Value::Object(doc))
            .map_err(StoreError::from)
            .or_storage("Failed to review booking")?;

        if booking.reviewed {
            return Err(AppError::bad_request("Booking already reviewed"));
        }

        let mut set = Map::new();
        set.insert("reviewed".to_string(), Value::Bool(true));
        let flagged = self
            .store
            .update_one(
                Collection::Bookings,
                id,
                &Filter::new().eq("reviewed", false),
                Update::Set(set),
            )
            .await
            .or_storage("Failed to review booking")?;

        // Another request flagged it between the read and the write.
        if flagged.modified == 0 {
            return Err(AppError::bad_request("Booking already reviewed"));
        }

        let Some(tutor_id) = RecordId::parse(&booking.tutor_id) else {
            warn!("booking {} has malformed tutorId {:?}", id, booking.tutor_id);
            return Ok(ReviewOutcome {
                booking_id: id.to_string(),
                tutor_id: booking.tutor_id,
                tutor_updated: false,
            });
        };

        let bumped = self
            .store
            .update_one(
                Collection::Tutors,
                &tutor_id,
                &Filter::new(),
                Update::Inc("review".to_string(), 1),
            )
            .await
            .or_storage("Failed to update tutor review count")?;

        if bumped.matched == 0 {
            warn!("booking {} reviewed but tutor {} no longer exists", id, tutor_id);
        } else {
            info!("booking {} reviewed, tutor {} review count incremented", id, tutor_id);
        }

        Ok(ReviewOutcome {
            booking_id: id.to_string(),
            tutor_id: tutor_id.to_string(),
            tutor_updated: bumped.modified > 0,
        })
    }
}
