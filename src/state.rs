//! Shared application state for all routes. Built once after introspection; read-only afterwards.

use crate::config::DocsConfig;
use crate::openapi::build_paths;
use crate::schema::{ApiModel, CollectionDescriptor};
use crate::store::DataStore;
use serde_json::Value;
use std::sync::Arc;

/// Pre-rendered documentation inputs. Only the server URL varies per request.
pub struct DocsState {
    pub paths: Value,
    pub database: String,
    pub config: DocsConfig,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub model: Arc<ApiModel>,
    pub docs: Arc<DocsState>,
}

impl AppState {
    pub fn new(store: Arc<dyn DataStore>, model: ApiModel, database: impl Into<String>, docs: DocsConfig) -> Self {
        let paths = build_paths(&model);
        AppState {
            store,
            model: Arc::new(model),
            docs: Arc::new(DocsState {
                paths,
                database: database.into(),
                config: docs,
            }),
        }
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionDescriptor> {
        self.model.collection(name)
    }
}
