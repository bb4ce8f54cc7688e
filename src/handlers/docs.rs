//! OpenAPI document and Swagger UI.

use crate::openapi;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::Html,
    Json,
};
use serde_json::Value;

/// The document's server URL is taken from the request's Host header.
pub async fn openapi_json(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    Json(openapi::document(&state.docs.paths, &state.docs.database, host))
}

pub async fn swagger_ui(State(state): State<AppState>) -> Html<String> {
    Html(openapi::swagger_html(&state.docs.config))
}
