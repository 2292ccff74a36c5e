use std::sync::Arc;

use serde::Serialize;

use crate::db::{Collection, Filter, RecordStore, StoreError};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tutors: u64,
    pub total_bookings: u64,
    pub total_users: u64,
    pub pending_reviews: u64,
}

pub struct DashboardService {
    store: Arc<dyn RecordStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Issues the four counts concurrently. They are not a snapshot: writes
    /// landing in between may make them disagree with each other.
    pub async fn stats(&self) -> Result<DashboardStats, StoreError> {
        let all = Filter::new();
        let unreviewed = Filter::new().eq("reviewed", false);

        let (total_tutors, total_bookings, total_users, pending_reviews) = tokio::try_join!(
            self.store.count(Collection::Tutors, &all),
            self.store.count(Collection::Bookings, &all),
            self.store.count(Collection::Users, &all),
            self.store.count(Collection::Bookings, &unreviewed),
        )?;

        Ok(DashboardStats {
            total_tutors,
            total_bookings,
            total_users,
            pending_reviews,
        })
    }
}
