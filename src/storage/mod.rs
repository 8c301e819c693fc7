//! Storage backends
//!
//! Every engine implements the same capability contract,
//! [`ResourceStore`], and translates its native error and result
//! shapes at the adapter boundary, so controllers never see an
//! engine-native error object or document. [`Backend`] is the single
//! seam where engine choice is resolved; no other component inspects
//! the engine type.

use crate::core::error::DuplicateKind;
use crate::core::resource::Resource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[cfg(feature = "in-memory")]
pub mod in_memory;
#[cfg(feature = "mongodb_backend")]
pub mod mongodb;
#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryStore;
#[cfg(feature = "mongodb_backend")]
pub use mongodb::MongoStore;
#[cfg(feature = "mysql")]
pub use mysql::MysqlStore;

/// How a single record is addressed.
#[derive(Debug, Clone)]
pub enum Lookup {
    Id(Uuid),
    Slug(String),
    Username(String),
}

/// Errors crossing the adapter boundary.
///
/// Adapters map engine-native failures into exactly these shapes; the
/// controller maps them onto the response taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The engine reported a unique-constraint violation.
    #[error("duplicate {0}")]
    Duplicate(DuplicateKind),

    /// The engine responded with a shape the adapter does not
    /// recognize (missing count or id fields).
    #[error("storage contract violation: {0}")]
    ContractViolation(String),

    /// Any other engine-level failure.
    #[error("{0}")]
    Engine(String),
}

/// The capability contract every storage engine implements, once per
/// resource kind.
#[async_trait]
pub trait ResourceStore<T: Resource>: Send + Sync {
    /// Fetch one record, `Ok(None)` when nothing matches.
    async fn find_one(&self, lookup: &Lookup) -> Result<Option<T>, StoreError>;

    /// Fetch every record of the kind, newest first.
    async fn find_many(&self) -> Result<Vec<T>, StoreError>;

    /// Insert a record and return the stored version.
    async fn insert(&self, record: T) -> Result<T, StoreError>;

    /// Replace the record with the given id, returning the affected
    /// count (0 means the write landed on nothing).
    async fn update(&self, id: &Uuid, record: T) -> Result<u64, StoreError>;

    /// Delete the record with the given id, returning the affected count.
    async fn delete(&self, id: &Uuid) -> Result<u64, StoreError>;
}

/// Backend selection as declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Engine name: "memory", "mysql", or "mongodb".
    pub engine: Option<String>,

    /// Connection string, required for engine-backed stores.
    #[serde(default)]
    pub uri: Option<String>,

    /// Database name, required for mongodb.
    #[serde(default)]
    pub database: Option<String>,
}

impl BackendDescriptor {
    pub fn memory() -> Self {
        Self {
            engine: Some("memory".to_string()),
            uri: None,
            database: None,
        }
    }
}

/// A resolved, connected backend. Connection handles are shared; the
/// stores created from one `Backend` reuse them and never open or
/// close connections themselves.
#[derive(Clone)]
pub enum Backend {
    #[cfg(feature = "in-memory")]
    Memory,
    #[cfg(feature = "mysql")]
    Mysql(sqlx::MySqlPool),
    #[cfg(feature = "mongodb_backend")]
    Mongo(::mongodb::Database),
}

impl Backend {
    /// Resolve a descriptor into a connected backend.
    ///
    /// Dispatches purely on the declared engine name. An unrecognized
    /// or missing engine (including one not compiled in) yields
    /// `Ok(None)`; the caller decides whether that is fatal.
    /// Connection failures are errors, not `None`.
    pub async fn resolve(descriptor: &BackendDescriptor) -> anyhow::Result<Option<Backend>> {
        match descriptor.engine.as_deref() {
            #[cfg(feature = "in-memory")]
            Some("memory") => Ok(Some(Backend::Memory)),

            #[cfg(feature = "mysql")]
            Some("mysql") => {
                let uri = descriptor
                    .uri
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("mysql backend requires a connection uri"))?;
                let pool = sqlx::MySqlPool::connect(uri).await?;
                Ok(Some(Backend::Mysql(pool)))
            }

            #[cfg(feature = "mongodb_backend")]
            Some("mongodb") => {
                let uri = descriptor
                    .uri
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("mongodb backend requires a connection uri"))?;
                let database = descriptor
                    .database
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("mongodb backend requires a database name"))?;
                let client = ::mongodb::Client::with_uri_str(uri).await?;
                Ok(Some(Backend::Mongo(client.database(database))))
            }

            _ => Ok(None),
        }
    }

    /// Apply idempotent schema/index bootstrap for the selected engine.
    /// Safe to call on every startup.
    pub async fn provision(&self) -> anyhow::Result<()> {
        match self {
            #[cfg(feature = "in-memory")]
            Backend::Memory => Ok(()),
            #[cfg(feature = "mysql")]
            Backend::Mysql(pool) => mysql::ensure_schema(pool).await,
            #[cfg(feature = "mongodb_backend")]
            Backend::Mongo(db) => mongodb::ensure_indexes(db).await,
        }
    }

    /// Build the store for one resource kind against this backend.
    pub fn make_store<T: Resource>(&self) -> Arc<dyn ResourceStore<T>> {
        match self {
            #[cfg(feature = "in-memory")]
            Backend::Memory => Arc::new(InMemoryStore::<T>::new()),
            #[cfg(feature = "mysql")]
            Backend::Mysql(pool) => Arc::new(MysqlStore::<T>::new(pool.clone())),
            #[cfg(feature = "mongodb_backend")]
            Backend::Mongo(db) => Arc::new(MongoStore::<T>::new(db.clone())),
        }
    }
}
