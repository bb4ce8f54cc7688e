//! MongoDB adapter. Identifiers are ObjectIds exchanged as 24-char hex strings.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::query::{DocumentTranslator, QuerySpec, QueryTranslator};
use crate::schema::{describe_property, CollectionDescriptor, PropertyDescriptor};
use crate::store::{DataStore, Record, StoreKind};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::spec::ElementType;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::{Client, Collection, Database};
use serde_json::Value;

const ID_FIELD: &str = "_id";

pub struct MongoStore {
    db: Database,
    /// Derive properties from the first document of each collection.
    sample_schema: bool,
}

impl MongoStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let uri = match &config.connection_string {
            Some(uri) => uri.clone(),
            None => format!("mongodb://{}:{}", config.host, config.port.unwrap_or(27017)),
        };
        let database = config
            .database
            .as_deref()
            .ok_or_else(|| StoreError::Connection("no database name configured".into()))?;
        let client = Client::with_uri_str(&uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self::with_client(client, database, config.sample_schema))
    }

    pub fn with_client(client: Client, database: &str, sample_schema: bool) -> Self {
        MongoStore {
            db: client.database(database),
            sample_schema,
        }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

/// Parse a hex ObjectId; anything else is a malformed identifier.
pub fn parse_object_id(id: &str) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(id).map_err(|_| StoreError::MalformedIdentifier(id.to_string()))
}

fn id_filter(oid: ObjectId) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD, oid);
    filter
}

/// Native tag for a sampled BSON value, chosen so the type mapper recognises it.
pub fn native_tag(value: &Bson) -> String {
    match value.element_type() {
        ElementType::String => "text".into(),
        ElementType::Boolean => "bool".into(),
        ElementType::DateTime | ElementType::Timestamp => "timestamp".into(),
        ElementType::Int32 => "int4".into(),
        ElementType::Int64 | ElementType::Double | ElementType::Decimal128 => "numeric".into(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

fn sampled_properties(sample: &Document) -> Vec<PropertyDescriptor> {
    sample
        .iter()
        .map(|(name, value)| describe_property(name, &native_tag(value), true, name != ID_FIELD, None))
        .collect()
}

pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::from(dt.timestamp_millis()),
        },
        Bson::Document(d) => Value::Object(document_to_record(d)),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

pub fn document_to_record(doc: Document) -> Record {
    doc.into_iter().map(|(k, v)| (k, bson_to_json(v))).collect()
}

/// Split off `_id` (parsed as an ObjectId when present) and convert the remaining fields.
fn split_record(mut record: Record) -> Result<(Option<ObjectId>, Document), StoreError> {
    let id = match record.remove(ID_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(parse_object_id(&s)?),
        Some(other) => return Err(StoreError::MalformedIdentifier(other.to_string())),
    };
    let fields = mongodb::bson::to_document(&record).map_err(|e| StoreError::Query(e.to_string()))?;
    Ok((id, fields))
}

#[async_trait]
impl DataStore for MongoStore {
    fn kind(&self) -> StoreKind {
        StoreKind::MongoDb
    }

    async fn collections(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.db.list_collection_names(None).await?)
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionDescriptor, StoreError> {
        let properties = if self.sample_schema {
            let sample = self
                .collection(name)
                .find_one(None, None)
                .await
                .map_err(|e| StoreError::Introspection {
                    collection: name.to_string(),
                    message: e.to_string(),
                })?;
            sample.as_ref().map(sampled_properties).unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(CollectionDescriptor {
            name: name.to_string(),
            properties,
        })
    }

    async fn search(&self, collection: &str, spec: &QuerySpec) -> Result<Vec<Record>, StoreError> {
        let q = DocumentTranslator.translate(collection, spec);
        tracing::debug!(collection, filter = %q.filter, sort = ?q.sort, skip = ?q.skip, limit = ?q.limit, "search");
        let options = q.find_options();
        let cursor = self.collection(collection).find(q.filter, options).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(document_to_record).collect())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let oid = parse_object_id(id)?;
        let found = self.collection(collection).find_one(id_filter(oid), None).await?;
        Ok(found.map(document_to_record))
    }

    async fn insert_one(&self, collection: &str, record: Record) -> Result<Record, StoreError> {
        let (id, mut fields) = split_record(record)?;
        if let Some(oid) = id {
            fields.insert(ID_FIELD, oid);
        }
        let result = self.collection(collection).insert_one(&fields, None).await?;
        fields.insert(ID_FIELD, result.inserted_id);
        Ok(document_to_record(fields))
    }

    async fn update_one(&self, collection: &str, record: Record) -> Result<Option<Record>, StoreError> {
        let (id, fields) = split_record(record)?;
        let oid = id.ok_or(StoreError::MissingIdentifier(ID_FIELD))?;
        let coll = self.collection(collection);
        if !fields.is_empty() {
            let result = coll
                .update_one(id_filter(oid), doc! { "$set": fields }, None)
                .await?;
            if result.matched_count == 0 {
                return Ok(None);
            }
        }
        let updated = coll.find_one(id_filter(oid), None).await?;
        Ok(updated.map(document_to_record))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let oid = parse_object_id(id)?;
        let result = self.collection(collection).delete_one(id_filter(oid), None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogicalType;
    use mongodb::options::ClientOptions;
    use serde_json::json;

    async fn lazy_store() -> MongoStore {
        let options = ClientOptions::parse("mongodb://localhost:27017").await.unwrap();
        MongoStore::with_client(Client::with_options(options).unwrap(), "test", false)
    }

    #[test]
    fn object_id_parsing() {
        let oid = parse_object_id("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(oid.to_hex(), "507f1f77bcf86cd799439011");
        assert!(matches!(
            parse_object_id("not-a-valid-id"),
            Err(StoreError::MalformedIdentifier(s)) if s == "not-a-valid-id"
        ));
    }

    #[tokio::test]
    async fn malformed_id_fails_before_any_io() {
        let store = lazy_store().await;
        let err = store.find_by_id("users", "not-a-valid-id").await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedIdentifier(_)));
        let err = store.delete("users", "42").await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedIdentifier(_)));
    }

    #[tokio::test]
    async fn update_requires_an_identifier() {
        let store = lazy_store().await;
        let record = json!({"name": "Ada"}).as_object().cloned().unwrap();
        let err = store.update_one("users", record).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingIdentifier("_id")));
    }

    #[test]
    fn documents_convert_to_plain_json() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let d = doc! {
            "_id": oid,
            "name": "Ada",
            "age": 36_i32,
            "tags": ["a", "b"],
            "address": { "city": "London" },
        };
        assert_eq!(
            Value::Object(document_to_record(d)),
            json!({
                "_id": "507f1f77bcf86cd799439011",
                "name": "Ada",
                "age": 36,
                "tags": ["a", "b"],
                "address": {"city": "London"}
            })
        );
    }

    #[test]
    fn split_record_parses_id_and_keeps_fields() {
        let record = json!({"_id": "507f1f77bcf86cd799439011", "name": "Ada"})
            .as_object()
            .cloned()
            .unwrap();
        let (id, fields) = split_record(record).unwrap();
        assert_eq!(id.map(|o| o.to_hex()).as_deref(), Some("507f1f77bcf86cd799439011"));
        assert_eq!(fields, doc! { "name": "Ada" });

        let record = json!({"_id": 7}).as_object().cloned().unwrap();
        assert!(matches!(split_record(record), Err(StoreError::MalformedIdentifier(_))));
    }

    #[test]
    fn sampled_fields_map_to_logical_types() {
        let sample = doc! {
            "_id": ObjectId::new(),
            "name": "Ada",
            "active": true,
            "age": 36_i32,
            "score": 1.5_f64,
        };
        let props = sampled_properties(&sample);
        let types: Vec<_> = props.iter().map(|p| (p.name.as_str(), p.logical_type)).collect();
        assert_eq!(
            types,
            [
                ("_id", None),
                ("name", Some(LogicalType::String)),
                ("active", Some(LogicalType::Boolean)),
                ("age", Some(LogicalType::Integer)),
                ("score", Some(LogicalType::Number)),
            ]
        );
        assert!(!props[0].writable);
        assert!(props[1].writable);
    }
}
