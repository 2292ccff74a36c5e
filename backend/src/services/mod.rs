pub mod dashboard;
pub mod review_service;

pub use dashboard::{DashboardService, DashboardStats};
pub use review_service::{ReviewOutcome, ReviewService};
