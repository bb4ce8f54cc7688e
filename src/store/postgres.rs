//! PostgreSQL adapter: information_schema introspection and parameterized CRUD through sqlx.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::query::{QuerySpec, QueryTranslator, SqlTranslator};
use crate::schema::{describe_property, CollectionDescriptor, LogicalType, PropertyDescriptor};
use crate::sql::{self, PgBindValue, QueryBuf, TableRef, LIST_COLUMNS, LIST_TABLES};
use crate::store::{DataStore, Record, StoreKind};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::RwLock;

/// SQLSTATE for "invalid text representation", raised when an id does not fit the key column type.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

pub struct PostgresStore {
    pool: PgPool,
    schema: String,
    /// Column metadata per table, refreshed whenever a table is described.
    columns: RwLock<HashMap<String, Vec<PropertyDescriptor>>>,
}

impl PostgresStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options = match &config.connection_string {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| StoreError::Connection(format!("invalid connection string: {}", e)))?,
            None => {
                let mut o = PgConnectOptions::new()
                    .host(&config.host)
                    .port(config.port.unwrap_or(5432));
                if let Some(user) = &config.user {
                    o = o.username(user);
                }
                if let Some(password) = &config.password {
                    o = o.password(password);
                }
                if let Some(db) = &config.database {
                    o = o.database(db);
                }
                o
            }
        };
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self::with_pool(pool, config.schema.clone()))
    }

    pub fn with_pool(pool: PgPool, schema: impl Into<String>) -> Self {
        PostgresStore {
            pool,
            schema: schema.into(),
            columns: RwLock::new(HashMap::new()),
        }
    }

    /// Known columns of a table; empty until the table has been described.
    fn known_columns(&self, table: &str) -> Vec<PropertyDescriptor> {
        self.columns
            .read()
            .map(|m| m.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<PgRow>, sqlx::Error> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query.fetch_optional(&self.pool).await
    }
}

#[async_trait]
impl DataStore for PostgresStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Postgres
    }

    async fn collections(&self) -> Result<Vec<String>, StoreError> {
        let names: Vec<String> = sqlx::query_scalar(LIST_TABLES)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionDescriptor, StoreError> {
        let rows: Vec<(String, String, String, String, Option<i32>)> = sqlx::query_as(LIST_COLUMNS)
            .bind(&self.schema)
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Introspection {
                collection: name.to_string(),
                message: e.to_string(),
            })?;
        let properties: Vec<PropertyDescriptor> = rows
            .into_iter()
            .map(|(column, udt, is_nullable, is_updatable, max_len)| {
                describe_property(
                    &column,
                    &udt,
                    is_nullable == "YES",
                    is_updatable == "YES",
                    max_len.and_then(|n| u32::try_from(n).ok()),
                )
            })
            .collect();
        if let Ok(mut cache) = self.columns.write() {
            cache.insert(name.to_string(), properties.clone());
        }
        Ok(CollectionDescriptor {
            name: name.to_string(),
            properties,
        })
    }

    async fn search(&self, collection: &str, spec: &QuerySpec) -> Result<Vec<Record>, StoreError> {
        let columns = self.known_columns(collection);
        let q = SqlTranslator::new(&self.schema)
            .with_columns(&columns)
            .translate(collection, spec);
        tracing::debug!(sql = %q.sql, "search");
        let rows = sqlx::query(&q.sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|r| row_to_record(r, &columns)).collect())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let columns = self.known_columns(collection);
        let t = self.table(collection, &columns);
        let q = sql::select_by_id(t, self.id_field(), id);
        let row = self.fetch_optional(&q).await.map_err(|e| id_error(e, id))?;
        Ok(row.map(|r| row_to_record(&r, &columns)))
    }

    async fn insert_one(&self, collection: &str, record: Record) -> Result<Record, StoreError> {
        let columns = self.known_columns(collection);
        let t = self.table(collection, &columns);
        let q = sql::insert(t, self.id_field(), &record);
        let row = self
            .fetch_optional(&q)
            .await?
            .ok_or_else(|| StoreError::Query(format!("insert into {} returned no row", collection)))?;
        Ok(row_to_record(&row, &columns))
    }

    async fn update_one(&self, collection: &str, record: Record) -> Result<Option<Record>, StoreError> {
        let id_field = self.id_field();
        let id = match record.get(id_field) {
            Some(v) if !v.is_null() => v.clone(),
            _ => return Err(StoreError::MissingIdentifier(id_field)),
        };
        let columns = self.known_columns(collection);
        let t = self.table(collection, &columns);
        let q = sql::update(t, id_field, &id, &record);
        let row = self
            .fetch_optional(&q)
            .await
            .map_err(|e| id_error(e, &id_text(&id)))?;
        Ok(row.map(|r| row_to_record(&r, &columns)))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let columns = self.known_columns(collection);
        let t = self.table(collection, &columns);
        let q = sql::delete(t, self.id_field(), id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let result = query.execute(&self.pool).await.map_err(|e| id_error(e, id))?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl PostgresStore {
    fn table<'a>(&'a self, table: &'a str, columns: &'a [PropertyDescriptor]) -> TableRef<'a> {
        TableRef {
            schema: &self.schema,
            table,
            columns,
        }
    }
}

/// Identifier failures keep their own variant; the rest convert as usual.
fn id_error(e: sqlx::Error, id: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(INVALID_TEXT_REPRESENTATION) {
            return StoreError::MalformedIdentifier(id.to_string());
        }
    }
    e.into()
}

fn id_text(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_to_record(row: &PgRow, columns: &[PropertyDescriptor]) -> Record {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Record::new();
    for col in row.columns() {
        let name = col.name();
        let mut v = cell_to_value(row, name);
        // numeric is selected as text; hand it back as a JSON number when it fits
        if let Value::String(s) = &v {
            let is_number = columns
                .iter()
                .any(|c| c.name == name && c.logical_type == Some(LogicalType::Number));
            if is_number {
                if let Ok(n) = s.parse::<serde_json::Number>() {
                    v = Value::Number(n);
                }
            }
        }
        map.insert(name.to_string(), v);
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(f64::from(n)) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
