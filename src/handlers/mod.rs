//! HTTP handlers for collection CRUD and API documentation.

pub mod collection;
pub mod docs;
pub use collection::*;
pub use docs::*;
