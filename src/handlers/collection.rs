//! Collection CRUD handlers: list, read, create, update, update by id, delete.
//! Every handler resolves the collection by path segment against the introspected model.

use crate::error::AppError;
use crate::query::QuerySpec;
use crate::state::AppState;
use crate::store::Record;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

fn ensure_collection(state: &AppState, name: &str) -> Result<(), AppError> {
    match state.collection(name) {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("collection {}", name))),
    }
}

fn body_to_record(value: Value) -> Result<Record, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("each item must be a JSON object".into())),
    }
}

fn body_to_records(items: Vec<Value>) -> Result<Vec<Record>, AppError> {
    items.into_iter().map(body_to_record).collect()
}

pub async fn list(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Record>>, AppError> {
    ensure_collection(&state, &collection)?;
    let spec = QuerySpec::from_params(params)?;
    let rows = state.store.search(&collection, &spec).await?;
    Ok(Json(rows))
}

/// 204 with an empty body when nothing has the id.
pub async fn read(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    ensure_collection(&state, &collection)?;
    Ok(match state.store.find_by_id(&collection, &id).await? {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// Object body inserts one record, array body inserts each element.
pub async fn create(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    ensure_collection(&state, &collection)?;
    match body {
        Value::Object(record) => {
            let created = state.store.insert_one(&collection, record).await?;
            Ok((StatusCode::CREATED, Json(created)).into_response())
        }
        Value::Array(items) => {
            let records = body_to_records(items)?;
            let created = state.store.insert_many(&collection, records).await?;
            Ok((StatusCode::CREATED, Json(created)).into_response())
        }
        _ => Err(AppError::BadRequest("body must be a JSON object or array".into())),
    }
}

/// Identifiers come from the body. A single update that matched nothing is 304.
pub async fn update(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    ensure_collection(&state, &collection)?;
    match body {
        Value::Object(record) => Ok(updated_one(state.store.update_one(&collection, record).await?)),
        Value::Array(items) => {
            let records = body_to_records(items)?;
            let updated = state.store.update_many(&collection, records).await?;
            Ok((StatusCode::OK, Json(updated)).into_response())
        }
        _ => Err(AppError::BadRequest("body must be a JSON object or array".into())),
    }
}

pub async fn update_by_id(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    ensure_collection(&state, &collection)?;
    let mut record = body_to_record(body)?;
    record.insert(state.store.id_field().to_string(), Value::String(id));
    Ok(updated_one(state.store.update_one(&collection, record).await?))
}

fn updated_one(result: Option<Record>) -> Response {
    match result {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => StatusCode::NOT_MODIFIED.into_response(),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<bool>, AppError> {
    ensure_collection(&state, &collection)?;
    if state.store.delete(&collection, &id).await? {
        Ok(Json(true))
    } else {
        Err(AppError::NotFound(format!("{} item {}", collection, id)))
    }
}

fn allow(methods: &'static str) -> Response {
    (StatusCode::OK, [(header::ALLOW, methods)], methods).into_response()
}

/// CORS preflight for `/:collection`. The CORS headers come from the router layers.
pub async fn preflight_collection() -> Response {
    allow("GET,POST,PUT")
}

/// CORS preflight for `/:collection/:id`.
pub async fn preflight_item() -> Response {
    allow("GET,PUT,DELETE")
}
