//! Introspected API model: the set of collections routes and docs are generated from.

use crate::error::{AppError, ConfigError};
use crate::schema::descriptor::CollectionDescriptor;
use crate::store::DataStore;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct ApiModel {
    pub collections: Vec<CollectionDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ApiModel {
    /// Collection names must be unique.
    pub fn new(collections: Vec<CollectionDescriptor>) -> Result<Self, ConfigError> {
        let mut by_name = HashMap::with_capacity(collections.len());
        for (i, c) in collections.iter().enumerate() {
            if by_name.insert(c.name.clone(), i).is_some() {
                return Err(ConfigError::DuplicateCollection(c.name.clone()));
            }
        }
        Ok(ApiModel { collections, by_name })
    }

    /// Discover every collection and its properties. Any failure aborts: a partial model is never returned.
    pub async fn introspect(store: &dyn DataStore) -> Result<Self, AppError> {
        tracing::info!(store = ?store.kind(), "introspecting collections");
        let collections = store.describe_all().await?;
        for c in &collections {
            tracing::info!(collection = %c.name, properties = c.properties.len(), "discovered collection");
        }
        Ok(Self::new(collections)?)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionDescriptor> {
        self.by_name.get(name).map(|&i| &self.collections[i])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(|c| c.name.as_str())
    }
}
