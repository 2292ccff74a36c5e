use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{
    Collection, Document, Filter, ID_FIELD, RecordStore, StoreError, Update, UpdateOutcome,
    check_field,
};
use crate::models::RecordId;

/// Fields copied from the tutor onto each booking by the booking join.
const JOINED_TUTOR_FIELDS: [&str; 4] = ["tutorName", "language", "price", "image"];

/// Document store on SQLite: one table per collection, one JSON document per row.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(Clone)]
enum Bind {
    Text(String),
    Int(i64),
    Real(f64),
}

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_all(mut query: SqliteQuery<'_>, binds: Vec<Bind>) -> SqliteQuery<'_> {
    for bind in binds {
        query = match bind {
            Bind::Text(s) => query.bind(s),
            Bind::Int(i) => query.bind(i),
            Bind::Real(f) => query.bind(f),
        };
    }
    query
}

fn json_path(field: &str) -> Result<String, StoreError> {
    check_field(field)?;
    Ok(format!("$.{}", field))
}

/// Renders `filter` as SQL conditions over `alias`. Returns `1 = 1` when empty.
fn conditions(alias: &str, filter: &Filter) -> Result<(String, Vec<Bind>), StoreError> {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    for (field, value) in filter.conditions() {
        if field == ID_FIELD {
            clauses.push(format!("{}.id IS ?", alias));
            binds.push(match value {
                Value::String(s) => Bind::Text(s.to_ascii_lowercase()),
                other => Bind::Text(other.to_string()),
            });
            continue;
        }

        let path = json_path(field)?;
        match value {
            Value::Null => {
                clauses.push(format!("json_extract({}.doc, ?) IS NULL", alias));
                binds.push(Bind::Text(path));
            }
            Value::Bool(b) => {
                clauses.push(format!("json_extract({}.doc, ?) = ?", alias));
                binds.push(Bind::Text(path));
                binds.push(Bind::Int(i64::from(*b)));
            }
            Value::Number(n) => {
                clauses.push(format!("json_extract({}.doc, ?) = ?", alias));
                binds.push(Bind::Text(path));
                binds.push(match n.as_i64() {
                    Some(i) => Bind::Int(i),
                    None => Bind::Real(n.as_f64().unwrap_or(f64::NAN)),
                });
            }
            Value::String(s) => {
                clauses.push(format!("json_extract({}.doc, ?) = ?", alias));
                binds.push(Bind::Text(path));
                binds.push(Bind::Text(s.clone()));
            }
            Value::Array(_) | Value::Object(_) => {
                clauses.push(format!("json_extract({}.doc, ?) = json(?)", alias));
                binds.push(Bind::Text(path));
                binds.push(Bind::Text(value.to_string()));
            }
        }
    }

    if clauses.is_empty() {
        Ok(("1 = 1".to_string(), binds))
    } else {
        Ok((clauses.join(" AND "), binds))
    }
}

/// Builds the `json_set` expression applying `update` to `doc`.
fn update_expr(update: &Update) -> Result<Option<(String, Vec<Bind>)>, StoreError> {
    match update {
        Update::Set(fields) => {
            let mut args = Vec::new();
            let mut binds = Vec::new();
            for (field, value) in fields {
                if field == ID_FIELD {
                    continue;
                }
                args.push("?, json(?)");
                binds.push(Bind::Text(json_path(field)?));
                binds.push(Bind::Text(serde_json::to_string(value)?));
            }
            if args.is_empty() {
                return Ok(None);
            }
            Ok(Some((format!("json_set(doc, {})", args.join(", ")), binds)))
        }
        Update::Inc(field, by) => {
            let path = json_path(field)?;
            Ok(Some((
                "json_set(doc, ?, COALESCE(json_extract(doc, ?), 0) + ?)".to_string(),
                vec![Bind::Text(path.clone()), Bind::Text(path), Bind::Int(*by)],
            )))
        }
    }
}

fn to_document(collection: Collection, id: String, raw: &str) -> Result<Document, StoreError> {
    let mut doc: Document = serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
        collection: collection.table(),
        id: id.clone(),
        source,
    })?;
    doc.insert(ID_FIELD.to_string(), Value::String(id));
    Ok(doc)
}

fn row_to_document(collection: Collection, row: &SqliteRow) -> Result<Document, StoreError> {
    let id: String = row.try_get("id")?;
    let raw: String = row.try_get("doc")?;
    to_document(collection, id, &raw)
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `url` and applies migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// A private in-memory database. Pinned to one connection that never
    /// expires, since every SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn select(
        &self,
        collection: Collection,
        filter: &Filter,
        limit: Option<u32>,
    ) -> Result<Vec<Document>, StoreError> {
        let (clause, binds) = conditions(collection.table(), filter)?;
        let mut sql = format!(
            "SELECT id, doc FROM {table} WHERE {clause} ORDER BY rowid",
            table = collection.table(),
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let rows = bind_all(sqlx::query(&sql), binds)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row_to_document(collection, row))
            .collect()
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("select 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_one(&self, collection: Collection, mut doc: Document) -> Result<RecordId, StoreError> {
        doc.remove(ID_FIELD);
        let id = RecordId::generate();
        let raw = serde_json::to_string(&doc)?;
        let sql = format!("INSERT INTO {} (id, doc) VALUES (?, json(?))", collection.table());

        let result = sqlx::query(&sql)
            .bind(id.as_str())
            .bind(raw)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                debug!("inserted {} into {}", id, collection.table());
                Ok(id)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Duplicate(collection.table()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_many(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.select(collection, filter, None).await
    }

    async fn find_by_id(&self, collection: Collection, id: &RecordId) -> Result<Option<Document>, StoreError> {
        let sql = format!("SELECT id, doc FROM {} WHERE id = ?", collection.table());
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_document(collection, &row)).transpose()
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, StoreError> {
        Ok(self.select(collection, filter, Some(1)).await?.into_iter().next())
    }

    async fn update_one(
        &self,
        collection: Collection,
        id: &RecordId,
        guard: &Filter,
        update: Update,
    ) -> Result<UpdateOutcome, StoreError> {
        let table = collection.table();
        let (guard_clause, guard_binds) = conditions(table, guard)?;

        let modified = match update_expr(&update)? {
            Some((expr, expr_binds)) => {
                // Rendered twice: the second copy skips writes that change nothing.
                let repeated = expr_binds.clone();
                let sql = format!(
                    "UPDATE {table} SET doc = {expr} WHERE id = ? AND {guard_clause} AND doc IS NOT {expr}",
                );
                let mut binds = expr_binds;
                binds.push(Bind::Text(id.as_str().to_string()));
                binds.extend(guard_binds);
                binds.extend(repeated);

                bind_all(sqlx::query(&sql), binds)
                    .execute(&self.pool)
                    .await?
                    .rows_affected()
            }
            None => 0,
        };

        if modified > 0 {
            debug!("updated {} in {}", id, table);
            return Ok(UpdateOutcome {
                matched: modified,
                modified,
            });
        }

        let (guard_clause, guard_binds) = conditions(table, guard)?;
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE id = ? AND {guard_clause}");
        let mut binds = vec![Bind::Text(id.as_str().to_string())];
        binds.extend(guard_binds);
        let matched: i64 = bind_all(sqlx::query(&sql), binds)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        Ok(UpdateOutcome {
            matched: matched as u64,
            modified: 0,
        })
    }

    async fn delete_one(&self, collection: Collection, id: &RecordId) -> Result<u64, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", collection.table());
        let deleted = sqlx::query(&sql)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted)
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let (clause, binds) = conditions(collection.table(), filter)?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", collection.table(), clause);
        let count: i64 = bind_all(sqlx::query(&sql), binds)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        Ok(count as u64)
    }

    async fn bookings_with_tutor(&self, email: &str) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT bookings.id AS id, bookings.doc AS doc, tutors.id AS tutor_id, tutors.doc AS tutor
            FROM bookings
            INNER JOIN tutors ON tutors.id = json_extract(bookings.doc, '$.tutorId')
            WHERE json_extract(bookings.doc, '$.userEmail') = ?
            ORDER BY bookings.rowid
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let mut booking = row_to_document(Collection::Bookings, row)?;
                let tutor_id: String = row.try_get("tutor_id")?;
                let raw: String = row.try_get("tutor")?;
                let tutor = to_document(Collection::Tutors, tutor_id, &raw)?;
                for field in JOINED_TUTOR_FIELDS {
                    if let Some(value) = tutor.get(field) {
                        booking.insert(field.to_string(), value.clone());
                    }
                }
                Ok(booking)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn setup_test_db() -> SqliteStore {
        SqliteStore::in_memory()
            .await
            .expect("Failed to create test db")
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    async fn insert_tutor(store: &SqliteStore, name: &str) -> RecordId {
        store
            .insert_one(
                Collection::Tutors,
                doc(json!({
                    "tutorName": name,
                    "language": "Spanish",
                    "price": 20,
                    "review": 0,
                    "createdAt": "2026-01-01T00:00:00+00:00",
                })),
            )
            .await
            .expect("Failed to insert tutor")
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let store = setup_test_db().await;

        let id = insert_tutor(&store, "Ana").await;
        let found = store
            .find_by_id(Collection::Tutors, &id)
            .await
            .expect("Failed to fetch tutor")
            .expect("Tutor not found");

        assert_eq!(found["_id"], id.as_str());
        assert_eq!(found["tutorName"], "Ana");
        assert_eq!(found["price"], 20);

        assert_eq!(found["review"], 0);
        assert_eq!(found["createdAt"], "2026-01-01T00:00:00+00:00");

        let missing = RecordId::generate();
        assert!(store.find_by_id(Collection::Tutors, &missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_many_keeps_insertion_order_and_filters() {
        let store = setup_test_db().await;

        for (email, reviewed) in [("a@x.io", false), ("b@x.io", true), ("a@x.io", true)] {
            store
                .insert_one(
                    Collection::Bookings,
                    doc(json!({ "userEmail": email, "reviewed": reviewed })),
                )
                .await
                .unwrap();
        }

        let all = store.find_many(Collection::Bookings, &Filter::new()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1]["userEmail"], "b@x.io");

        let filter = Filter::new().eq("userEmail", "a@x.io").eq("reviewed", true);
        let matched = store.find_many(Collection::Bookings, &filter).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0]["_id"], all[2]["_id"]);

        let pending = store
            .count(Collection::Bookings, &Filter::new().eq("reviewed", false))
            .await
            .unwrap();
        assert_eq!(pending, 1);
    }

    #[tokio::test]
    async fn test_update_set_reports_matched_and_modified() {
        let store = setup_test_db().await;
        let id = insert_tutor(&store, "Ana").await;

        let outcome = store
            .update_one(
                Collection::Tutors,
                &id,
                &Filter::new(),
                Update::Set(doc(json!({ "price": 35, "bio": "native speaker", "image": null }))),
            )
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });

        let tutor = store.find_by_id(Collection::Tutors, &id).await.unwrap().unwrap();
        assert_eq!(tutor["price"], 35);
        assert_eq!(tutor["bio"], "native speaker");
        assert_eq!(tutor["image"], Value::Null);
        assert_eq!(tutor["tutorName"], "Ana");

        // 同じ値で更新しても modified は 0
        let again = store
            .update_one(
                Collection::Tutors,
                &id,
                &Filter::new(),
                Update::Set(doc(json!({ "price": 35 }))),
            )
            .await
            .unwrap();
        assert_eq!(again, UpdateOutcome { matched: 1, modified: 0 });

        let missing = store
            .update_one(
                Collection::Tutors,
                &RecordId::generate(),
                &Filter::new(),
                Update::Set(doc(json!({ "price": 1 }))),
            )
            .await
            .unwrap();
        assert_eq!(missing, UpdateOutcome::default());
    }

    #[tokio::test]
    async fn test_update_guard_and_increment() {
        let store = setup_test_db().await;
        let id = insert_tutor(&store, "Ana").await;

        let guard = Filter::new().eq("review", 0);
        let first = store
            .update_one(Collection::Tutors, &id, &guard, Update::Inc("review".into(), 1))
            .await
            .unwrap();
        assert_eq!(first.modified, 1);

        // review は 1 になったので guard に一致しない
        let second = store
            .update_one(Collection::Tutors, &id, &guard, Update::Inc("review".into(), 1))
            .await
            .unwrap();
        assert_eq!(second, UpdateOutcome { matched: 0, modified: 0 });

        let fresh = store
            .update_one(Collection::Tutors, &id, &Filter::new(), Update::Inc("lessons".into(), 2))
            .await
            .unwrap();
        assert_eq!(fresh.modified, 1);

        let tutor = store.find_by_id(Collection::Tutors, &id).await.unwrap().unwrap();
        assert_eq!(tutor["review"], 1);
        assert_eq!(tutor["lessons"], 2);
    }

    #[tokio::test]
    async fn test_unique_email() {
        let store = setup_test_db().await;
        let user = doc(json!({
            "name": "Mia",
            "email": "mia@example.com",
            "role": "user",
            "createdAt": "2026-01-01T00:00:00+00:00",
        }));

        let id = store.insert_one(Collection::Users, user.clone()).await.unwrap();
        let stored = store
            .find_one(Collection::Users, &Filter::new().eq("email", "mia@example.com"))
            .await
            .unwrap()
            .expect("user stored");
        assert_eq!(stored["_id"], id.as_str());
        assert_eq!(stored["role"], "user");

        let err = store.insert_one(Collection::Users, user).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("users")));

        let count = store.count(Collection::Users, &Filter::new()).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_delete_one() {
        let store = setup_test_db().await;
        let id = insert_tutor(&store, "Ana").await;

        assert_eq!(store.delete_one(Collection::Tutors, &id).await.unwrap(), 1);
        assert_eq!(store.delete_one(Collection::Tutors, &id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bookings_with_tutor_drops_orphans() {
        let store = setup_test_db().await;
        let ana = insert_tutor(&store, "Ana").await;
        let ben = insert_tutor(&store, "Ben").await;

        for tutor in [&ana, &ben] {
            store
                .insert_one(
                    Collection::Bookings,
                    doc(json!({ "tutorId": tutor.as_str(), "userEmail": "s@x.io", "reviewed": false })),
                )
                .await
                .unwrap();
        }
        store
            .insert_one(
                Collection::Bookings,
                doc(json!({ "tutorId": ana.as_str(), "userEmail": "other@x.io", "reviewed": false })),
            )
            .await
            .unwrap();

        store.delete_one(Collection::Tutors, &ben).await.unwrap();

        let joined = store.bookings_with_tutor("s@x.io").await.unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0]["tutorId"], ana.as_str());
        assert_eq!(joined[0]["tutorName"], "Ana");
        assert_eq!(joined[0]["language"], "Spanish");
        assert_eq!(joined[0]["price"], 20);
        assert!(joined[0].get("image").is_none());
    }

    #[tokio::test]
    async fn test_rejects_unsafe_field_names() {
        let store = setup_test_db().await;
        let filter = Filter::new().eq("email') OR 1=1 --", "x");
        let err = store.find_many(Collection::Users, &filter).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidField(_)));
    }
}
