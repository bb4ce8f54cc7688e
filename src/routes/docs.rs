use crate::handlers::docs::{openapi_json, swagger_ui};
use crate::openapi::{OPENAPI_JSON_PATH, SWAGGER_UI_PATH};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn docs_routes() -> Router<AppState> {
    Router::new()
        .route(OPENAPI_JSON_PATH, get(openapi_json))
        .route(SWAGGER_UI_PATH, get(swagger_ui))
}
