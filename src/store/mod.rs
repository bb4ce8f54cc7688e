//! Data store abstraction: one trait, one adapter per backing store.

pub mod mongo;
pub mod postgres;

pub use mongo::MongoStore;
pub use postgres::PostgresStore;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::query::QuerySpec;
use crate::schema::CollectionDescriptor;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One row or document as it crosses the HTTP boundary.
pub type Record = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    MongoDb,
}

impl StoreKind {
    /// Identifier field of every record in this kind of store.
    pub fn id_field(self) -> &'static str {
        match self {
            StoreKind::Postgres => "id",
            StoreKind::MongoDb => "_id",
        }
    }
}

/// Schema discovery plus CRUD over named collections (tables or document collections).
#[async_trait]
pub trait DataStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    fn id_field(&self) -> &'static str {
        self.kind().id_field()
    }

    /// Collection names in store enumeration order.
    async fn collections(&self) -> Result<Vec<String>, StoreError>;

    async fn describe_collection(&self, name: &str) -> Result<CollectionDescriptor, StoreError>;

    /// Every collection with its properties. Re-queries the store on each call.
    async fn describe_all(&self) -> Result<Vec<CollectionDescriptor>, StoreError> {
        let names = self.collections().await?;
        let mut out = Vec::with_capacity(names.len());
        for name in &names {
            out.push(self.describe_collection(name).await?);
        }
        Ok(out)
    }

    async fn search(&self, collection: &str, spec: &QuerySpec) -> Result<Vec<Record>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// Returns the stored record, identifier populated.
    async fn insert_one(&self, collection: &str, record: Record) -> Result<Record, StoreError>;

    /// Inserts one by one in order. A failed item is logged and dropped; the rest still go through.
    async fn insert_many(&self, collection: &str, records: Vec<Record>) -> Result<Vec<Record>, StoreError> {
        let mut out = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match self.insert_one(collection, record).await {
                Ok(r) => out.push(r),
                Err(e) => tracing::warn!(collection, index, error = %e, "insert dropped"),
            }
        }
        Ok(out)
    }

    /// Updates the record whose identifier field matches. `None` when nothing matched.
    async fn update_one(&self, collection: &str, record: Record) -> Result<Option<Record>, StoreError>;

    /// Updates one by one in order; failures and misses are logged and dropped.
    async fn update_many(&self, collection: &str, records: Vec<Record>) -> Result<Vec<Record>, StoreError> {
        let mut out = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match self.update_one(collection, record).await {
                Ok(Some(r)) => out.push(r),
                Ok(None) => tracing::warn!(collection, index, "update matched nothing"),
                Err(e) => tracing::warn!(collection, index, error = %e, "update dropped"),
            }
        }
        Ok(out)
    }

    /// `true` when a record was removed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Open the store described by the configuration.
pub async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn DataStore>, StoreError> {
    tracing::info!(store = ?config.kind, database = %config.database_label(), "connecting to store");
    Ok(match config.kind {
        StoreKind::Postgres => Arc::new(PostgresStore::connect(config).await?),
        StoreKind::MongoDb => Arc::new(MongoStore::connect(config).await?),
    })
}
