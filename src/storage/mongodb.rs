//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Gated behind the `mongodb_backend` feature flag. Uses a
//! collection-per-resource-kind pattern: each `MongoStore<T>` operates
//! on the collection named by `T::collection_name()`.
//!
//! # Serialization strategy
//!
//! Records are serialized via `serde_json::Value` as an intermediate
//! format, then converted to BSON documents. UUIDs are stored as
//! strings and timestamps as ISO 8601 strings, so both engines hold
//! the exact same field values. The `id` field is mapped to MongoDB's
//! `_id` convention at this boundary and nowhere else.

use super::{Lookup, ResourceStore, StoreError};
use crate::core::error::DuplicateKind;
use crate::core::resource::Resource;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert a serde_json::Value (expected to be an Object) into a BSON
/// Document, renaming `id` → `_id` for MongoDB convention.
fn json_to_document(json: serde_json::Value) -> Result<Document, StoreError> {
    let bson_val = mongodb::bson::to_bson(&json)
        .map_err(|e| StoreError::Engine(format!("Failed to convert JSON to BSON: {e}")))?;

    let mut doc = match bson_val {
        Bson::Document(d) => d,
        _ => {
            return Err(StoreError::ContractViolation(
                "expected BSON document, got non-object".to_string(),
            ));
        }
    };

    if let Some(id) = doc.remove("id") {
        doc.insert("_id", id);
    }

    Ok(doc)
}

/// Convert a BSON Document back into a serde_json::Value, renaming
/// `_id` → `id` for domain convention.
fn document_to_json(mut doc: Document) -> serde_json::Value {
    if let Some(id) = doc.remove("_id") {
        doc.insert("id", id);
    }

    Bson::Document(doc).into_relaxed_extjson()
}

/// Convert a UUID to its BSON string representation for queries.
fn uuid_bson(id: &Uuid) -> Bson {
    Bson::String(id.to_string())
}

/// Map a driver error into the adapter contract. Code 11000 is the
/// duplicate-key error; the violated index name identifies which
/// unique field collided.
fn map_write_error(err: mongodb::error::Error) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(ref we)) = *err.kind
        && we.code == 11000
    {
        let kind = if we.message.contains("uq_username") {
            DuplicateKind::Username
        } else if we.message.contains("uq_email") {
            DuplicateKind::Email
        } else {
            DuplicateKind::Slug
        };
        return StoreError::Duplicate(kind);
    }
    StoreError::Engine(err.to_string())
}

// ---------------------------------------------------------------------------
// Index bootstrap
// ---------------------------------------------------------------------------

/// Create the unique indexes every collection relies on. Sparse so
/// kinds without a username or email field are unaffected. Idempotent,
/// safe to call on every startup.
pub async fn ensure_indexes(database: &Database) -> anyhow::Result<()> {
    use mongodb::IndexModel;
    use mongodb::options::IndexOptions;

    let unique_sparse = |name: &str| {
        IndexOptions::builder()
            .unique(true)
            .sparse(true)
            .name(name.to_string())
            .build()
    };

    for collection in ["pages", "blog_posts", "users"] {
        let mut indexes = vec![
            IndexModel::builder()
                .keys(doc! { "slug": 1 })
                .options(unique_sparse("uq_slug"))
                .build(),
        ];
        if collection == "users" {
            indexes.push(
                IndexModel::builder()
                    .keys(doc! { "username": 1 })
                    .options(unique_sparse("uq_username"))
                    .build(),
            );
            indexes.push(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique_sparse("uq_email"))
                    .build(),
            );
        }

        database
            .collection::<Document>(collection)
            .create_indexes(indexes)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create indexes on {collection}: {e}"))?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// MongoStore<T>
// ---------------------------------------------------------------------------

/// Store for one resource kind backed by a MongoDB collection.
#[derive(Clone, Debug)]
pub struct MongoStore<T> {
    database: Database,
    _marker: std::marker::PhantomData<T>,
}

impl<T> MongoStore<T> {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: Resource> MongoStore<T> {
    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(T::collection_name())
    }

    fn record_to_document(record: &T) -> Result<Document, StoreError> {
        let json = serde_json::to_value(record)
            .map_err(|e| StoreError::Engine(format!("Failed to serialize record: {e}")))?;
        json_to_document(json)
    }

    fn document_to_record(doc: Document) -> Result<T, StoreError> {
        let json = document_to_json(doc);
        serde_json::from_value(json).map_err(|e| {
            StoreError::ContractViolation(format!("stored document does not deserialize: {e}"))
        })
    }

    fn lookup_filter(lookup: &Lookup) -> Document {
        match lookup {
            Lookup::Id(id) => doc! { "_id": uuid_bson(id) },
            Lookup::Slug(slug) => doc! { "slug": slug },
            Lookup::Username(username) => doc! { "username": username },
        }
    }
}

#[async_trait]
impl<T: Resource> ResourceStore<T> for MongoStore<T> {
    async fn find_one(&self, lookup: &Lookup) -> Result<Option<T>, StoreError> {
        let doc = self
            .collection()
            .find_one(Self::lookup_filter(lookup))
            .await
            .map_err(|e| StoreError::Engine(format!("Failed to fetch record: {e}")))?;

        match doc {
            Some(d) => Ok(Some(Self::document_to_record(d)?)),
            None => Ok(None),
        }
    }

    async fn find_many(&self) -> Result<Vec<T>, StoreError> {
        let cursor = self
            .collection()
            .find(doc! {})
            .sort(doc! { "dateAdded": -1 })
            .await
            .map_err(|e| StoreError::Engine(format!("Failed to list records: {e}")))?;

        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| StoreError::Engine(format!("Failed to collect records: {e}")))?;

        docs.into_iter().map(Self::document_to_record).collect()
    }

    async fn insert(&self, record: T) -> Result<T, StoreError> {
        let doc = Self::record_to_document(&record)?;
        let id_bson = uuid_bson(&record.id());

        self.collection()
            .insert_one(doc)
            .await
            .map_err(map_write_error)?;

        // Read back the stored version so the caller sees exactly what
        // the engine holds.
        let stored = self
            .collection()
            .find_one(doc! { "_id": id_bson })
            .await
            .map_err(|e| StoreError::Engine(format!("Failed to read back record: {e}")))?
            .ok_or_else(|| {
                StoreError::ContractViolation("record not found after insert".to_string())
            })?;

        Self::document_to_record(stored)
    }

    async fn update(&self, id: &Uuid, record: T) -> Result<u64, StoreError> {
        let doc = Self::record_to_document(&record)?;

        let result = self
            .collection()
            .replace_one(doc! { "_id": uuid_bson(id) }, doc)
            .await
            .map_err(map_write_error)?;

        Ok(result.matched_count)
    }

    async fn delete(&self, id: &Uuid) -> Result<u64, StoreError> {
        let result = self
            .collection()
            .delete_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| StoreError::Engine(format!("Failed to delete record: {e}")))?;

        Ok(result.deleted_count)
    }
}
