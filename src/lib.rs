//! Schema REST: introspects a PostgreSQL or MongoDB database and serves a generic REST API
//! and an OpenAPI document for every table or collection found.

pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod query;
pub mod routes;
pub mod schema;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{CorsConfig, DocsConfig, ServerConfig, StoreConfig};
pub use error::{AppError, ConfigError, StoreError};
pub use query::{QuerySpec, QueryTranslator, SortDirection, SortKey};
pub use routes::app_router;
pub use schema::{map_type, ApiModel, CollectionDescriptor, LogicalType, PropertyDescriptor};
pub use state::AppState;
pub use store::{connect_store, DataStore, MongoStore, PostgresStore, Record, StoreKind};
