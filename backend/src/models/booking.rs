use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{RecordId, ValidationError, now_rfc3339, required};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "tutorId")]
    pub tutor_id: String,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "bookedAt")]
    pub booked_at: String,
    #[serde(default)]
    pub reviewed: bool,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBookingRequest {
    #[serde(rename = "tutorId")]
    pub tutor_id: Option<String>,
    #[serde(rename = "userEmail")]
    pub user_email: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBooking {
    #[serde(rename = "tutorId")]
    pub tutor_id: RecordId,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "bookedAt")]
    pub booked_at: String,
    pub reviewed: bool,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Fields a booking PATCH may change. `reviewed` only moves through the
/// review workflow, so it is rejected here along with any unknown field.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BookingPatch {
    #[serde(rename = "tutorId", skip_serializing_if = "Option::is_none")]
    pub tutor_id: Option<String>,
    #[serde(rename = "userEmail", skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(rename = "bookedAt", alias = "date", skip_serializing_if = "Option::is_none")]
    pub booked_at: Option<String>,
}

/// Normalizes a booking date to RFC 3339 UTC. Accepts full timestamps or
/// plain `YYYY-MM-DD` dates (taken as midnight UTC).
pub fn parse_booking_date(raw: &str) -> Result<String, ValidationError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc).to_rfc3339());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().to_rfc3339())
        .ok_or_else(|| ValidationError::new("date must be an RFC 3339 timestamp or YYYY-MM-DD"))
}

fn parse_tutor_id(raw: &str) -> Result<RecordId, ValidationError> {
    RecordId::parse(raw.trim()).ok_or_else(|| ValidationError::new("Invalid tutorId"))
}

impl NewBookingRequest {
    pub fn validate(self) -> Result<NewBooking, ValidationError> {
        if self.tutor_id.is_none() || self.user_email.is_none() || self.date.is_none() {
            return Err(ValidationError::new("tutorId, userEmail and date are required"));
        }

        let tutor_id = parse_tutor_id(&required(self.tutor_id, "tutorId")?)?;
        let user_email = required(self.user_email, "userEmail")?.to_lowercase();
        let booked_at = parse_booking_date(&required(self.date, "date")?)?;

        Ok(NewBooking {
            tutor_id,
            user_email,
            booked_at,
            reviewed: false,
            created_at: now_rfc3339(),
        })
    }
}

impl BookingPatch {
    /// Normalizes every present field the same way creation does.
    pub fn validate(self) -> Result<BookingPatch, ValidationError> {
        let tutor_id = self
            .tutor_id
            .map(|raw| parse_tutor_id(&raw).map(String::from))
            .transpose()?;
        let user_email = self
            .user_email
            .map(|raw| required(Some(raw), "userEmail").map(|e| e.to_lowercase()))
            .transpose()?;
        let booked_at = self
            .booked_at
            .map(|raw| parse_booking_date(&raw))
            .transpose()?;

        if tutor_id.is_none() && user_email.is_none() && booked_at.is_none() {
            return Err(ValidationError::new("No fields to update"));
        }

        Ok(BookingPatch {
            tutor_id,
            user_email,
            booked_at,
        })
    }
}
