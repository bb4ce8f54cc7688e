//! Collection CRUD routes. Paths are parameterized; handlers resolve the collection from the model.

use crate::handlers::collection::{
    create, delete, list, preflight_collection, preflight_item, read, update, update_by_id,
};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/:collection", get(list).post(create).put(update).options(preflight_collection))
        .route("/:collection/:id", get(read).put(update_by_id).delete(delete).options(preflight_item))
}
