pub mod sqlite;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::RecordId;

pub use sqlite::SqliteStore;

/// A stored record: top-level JSON object. Reads carry the id under `_id`.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Tutors,
    Bookings,
    Users,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Tutors => "tutors",
            Collection::Bookings => "bookings",
            Collection::Users => "users",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Duplicate key in {0}")]
    Duplicate(&'static str),

    #[error("Invalid field name: {0}")]
    InvalidField(String),

    #[error("Corrupt document {id} in {collection}: {source}")]
    Corrupt {
        collection: &'static str,
        id: String,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Conjunction of top-level field equalities.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }
}

#[derive(Debug, Clone)]
pub enum Update {
    /// Overwrite the given top-level fields.
    Set(Document),
    /// Add to a numeric field; a missing field counts as zero.
    Inc(String, i64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert_one(&self, collection: Collection, doc: Document) -> Result<RecordId, StoreError>;

    async fn find_many(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, collection: Collection, id: &RecordId) -> Result<Option<Document>, StoreError>;

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, StoreError>;

    /// Applies `update` to the record with `id` if it also matches `guard`.
    async fn update_one(
        &self,
        collection: Collection,
        id: &RecordId,
        guard: &Filter,
        update: Update,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_one(&self, collection: Collection, id: &RecordId) -> Result<u64, StoreError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;

    /// Bookings for `email`, each joined with its tutor's `tutorName`,
    /// `language`, `price` and `image`. Bookings without a tutor are dropped.
    async fn bookings_with_tutor(&self, email: &str) -> Result<Vec<Document>, StoreError>;
}

pub(crate) fn check_field(field: &str) -> Result<(), StoreError> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidField(field.to_string()))
    }
}
