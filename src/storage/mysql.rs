//! MySQL storage backend using sqlx.
//!
//! Gated behind the `mysql` feature flag. All resource kinds share a
//! single `resources` table: addressable fields (id, kind, name, slug,
//! username, email, timestamps) live in dedicated columns so unique
//! constraints and lookups work, and everything else is carried in a
//! JSON `data` column.
//!
//! UUIDs are stored as `CHAR(36)`, timestamps as `DATETIME(6)`, and
//! MySQL has no `RETURNING` so inserts re-read the row afterwards.

use super::{Lookup, ResourceStore, StoreError};
use crate::core::error::DuplicateKind;
use crate::core::resource::Resource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Schema management
// ---------------------------------------------------------------------------

/// Apply the shared `resources` table and its unique indexes.
/// Idempotent, safe to call on every startup.
pub async fn ensure_schema(pool: &MySqlPool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS resources (
            id CHAR(36) NOT NULL PRIMARY KEY,
            resource_kind VARCHAR(64) NOT NULL,
            name VARCHAR(512) NOT NULL DEFAULT '',
            slug VARCHAR(255) NOT NULL,
            username VARCHAR(255) NULL,
            email VARCHAR(320) NULL,
            data JSON,
            date_added DATETIME(6) NOT NULL,
            date_updated DATETIME(6) NOT NULL,
            UNIQUE KEY uq_slug (resource_kind, slug),
            UNIQUE KEY uq_username (username),
            UNIQUE KEY uq_email (email),
            INDEX idx_kind (resource_kind)
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create resources table: {}", e))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Fields stored in dedicated columns, excluded from the JSON data.
const COLUMN_FIELDS: &[&str] = &[
    "id",
    "name",
    "slug",
    "username",
    "email",
    "dateAdded",
    "dateUpdated",
];

/// One row of the shared table, in column order.
type ResourceRow = (
    String,                // id
    String,                // name
    String,                // slug
    Option<String>,        // username
    Option<String>,        // email
    serde_json::Value,     // data
    DateTime<Utc>,         // date_added
    DateTime<Utc>,         // date_updated
);

/// Map a sqlx error into the adapter contract, picking the duplicate
/// kind from the violated index name (MySQL error 1062 carries it in
/// the message).
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        let message = db_err.message();
        let kind = if message.contains("uq_username") {
            DuplicateKind::Username
        } else if message.contains("uq_email") {
            DuplicateKind::Email
        } else {
            DuplicateKind::Slug
        };
        return StoreError::Duplicate(kind);
    }
    StoreError::Engine(err.to_string())
}

// ---------------------------------------------------------------------------
// MysqlStore<T>
// ---------------------------------------------------------------------------

/// Store for one resource kind backed by the shared MySQL table.
#[derive(Clone, Debug)]
pub struct MysqlStore<T> {
    pool: MySqlPool,
    _marker: std::marker::PhantomData<T>,
}

impl<T> MysqlStore<T> {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            _marker: std::marker::PhantomData,
        }
    }
}

/// Column values pulled out of a record for binding.
struct ColumnValues {
    id: String,
    name: String,
    slug: String,
    username: Option<String>,
    email: Option<String>,
    data: serde_json::Value,
    date_added: DateTime<Utc>,
    date_updated: DateTime<Utc>,
}

impl<T: Resource> MysqlStore<T> {
    /// Split a record into dedicated columns plus the JSON remainder.
    fn extract_columns(record: &T) -> Result<ColumnValues, StoreError> {
        let mut json = serde_json::to_value(record)
            .map_err(|e| StoreError::Engine(format!("Failed to serialize record: {e}")))?;

        let obj = json.as_object_mut().ok_or_else(|| {
            StoreError::ContractViolation("record did not serialize to an object".to_string())
        })?;

        let take_str = |obj: &mut serde_json::Map<String, serde_json::Value>, key: &str| {
            obj.remove(key)
                .and_then(|v| v.as_str().map(str::to_string))
        };

        let name = take_str(obj, "name").unwrap_or_default();
        let slug = take_str(obj, "slug").unwrap_or_default();
        let username = take_str(obj, "username");
        let email = take_str(obj, "email");
        for field in COLUMN_FIELDS {
            obj.remove(*field);
        }

        Ok(ColumnValues {
            id: record.id().to_string(),
            name,
            slug,
            username,
            email,
            data: json,
            date_added: record.date_added(),
            date_updated: record.date_updated(),
        })
    }

    /// Merge a row's columns back into the JSON data and deserialize.
    fn reconstruct_record(row: ResourceRow) -> Result<T, StoreError> {
        let (id, name, slug, username, email, data, date_added, date_updated) = row;

        let mut json = if data.is_object() {
            data
        } else {
            serde_json::json!({})
        };

        if let Some(obj) = json.as_object_mut() {
            obj.insert("id".into(), serde_json::json!(id));
            obj.insert("name".into(), serde_json::json!(name));
            obj.insert("slug".into(), serde_json::json!(slug));
            if let Some(username) = username {
                obj.insert("username".into(), serde_json::json!(username));
            }
            if let Some(email) = email {
                obj.insert("email".into(), serde_json::json!(email));
            }
            obj.insert(
                "dateAdded".into(),
                serde_json::to_value(date_added)
                    .map_err(|e| StoreError::Engine(e.to_string()))?,
            );
            obj.insert(
                "dateUpdated".into(),
                serde_json::to_value(date_updated)
                    .map_err(|e| StoreError::Engine(e.to_string()))?,
            );
        }

        serde_json::from_value::<T>(json).map_err(|e| {
            StoreError::ContractViolation(format!("stored row does not deserialize: {e}"))
        })
    }
}

#[async_trait]
impl<T: Resource> ResourceStore<T> for MysqlStore<T> {
    async fn find_one(&self, lookup: &Lookup) -> Result<Option<T>, StoreError> {
        let (column, value) = match lookup {
            Lookup::Id(id) => ("id", id.to_string()),
            Lookup::Slug(slug) => ("slug", slug.clone()),
            Lookup::Username(username) => ("username", username.clone()),
        };

        let query = format!(
            "SELECT id, name, slug, username, email, data, date_added, date_updated \
             FROM resources WHERE resource_kind = ? AND {column} = ?"
        );

        let row = sqlx::query_as::<_, ResourceRow>(&query)
            .bind(T::kind())
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Some(Self::reconstruct_record(row)?)),
            None => Ok(None),
        }
    }

    async fn find_many(&self) -> Result<Vec<T>, StoreError> {
        let rows = sqlx::query_as::<_, ResourceRow>(
            "SELECT id, name, slug, username, email, data, date_added, date_updated \
             FROM resources WHERE resource_kind = ? ORDER BY date_added DESC",
        )
        .bind(T::kind())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(Self::reconstruct_record).collect()
    }

    async fn insert(&self, record: T) -> Result<T, StoreError> {
        let cols = Self::extract_columns(&record)?;

        sqlx::query(
            "INSERT INTO resources \
             (id, resource_kind, name, slug, username, email, data, date_added, date_updated) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&cols.id)
        .bind(T::kind())
        .bind(&cols.name)
        .bind(&cols.slug)
        .bind(&cols.username)
        .bind(&cols.email)
        .bind(&cols.data)
        .bind(cols.date_added)
        .bind(cols.date_updated)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        // No RETURNING in MySQL, re-read the stored row.
        self.find_one(&Lookup::Id(record.id()))
            .await?
            .ok_or_else(|| {
                StoreError::ContractViolation("record not found after insert".to_string())
            })
    }

    async fn update(&self, id: &Uuid, record: T) -> Result<u64, StoreError> {
        let cols = Self::extract_columns(&record)?;

        let result = sqlx::query(
            "UPDATE resources \
             SET name = ?, slug = ?, username = ?, email = ?, data = ?, date_updated = ? \
             WHERE id = ? AND resource_kind = ?",
        )
        .bind(&cols.name)
        .bind(&cols.slug)
        .bind(&cols.username)
        .bind(&cols.email)
        .bind(&cols.data)
        .bind(cols.date_updated)
        .bind(id.to_string())
        .bind(T::kind())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: &Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM resources WHERE id = ? AND resource_kind = ?")
            .bind(id.to_string())
            .bind(T::kind())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
