//! Collection and property descriptors produced by introspection.

use serde::Serialize;
use serde_json::Value;

/// Store-independent type used for OpenAPI generation and example defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    String,
    Boolean,
    Integer,
    Number,
    Date,
}

impl LogicalType {
    /// OpenAPI `type` keyword. Dates are strings with a `date` format.
    pub fn openapi_type(self) -> &'static str {
        match self {
            LogicalType::String | LogicalType::Date => "string",
            LogicalType::Boolean => "boolean",
            LogicalType::Integer => "integer",
            LogicalType::Number => "number",
        }
    }
}

/// Generic metadata for one column or document field.
#[derive(Clone, Debug, Serialize)]
pub struct PropertyDescriptor {
    pub name: String,
    /// `None` when the native type has no logical mapping.
    pub logical_type: Option<LogicalType>,
    pub format: Option<&'static str>,
    /// Store-native type tag the descriptor was derived from (e.g. `varchar`, `int4`).
    pub native_type: String,
    pub nullable: bool,
    pub writable: bool,
    pub max_length: Option<u32>,
    pub example_default: Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct CollectionDescriptor {
    pub name: String,
    pub properties: Vec<PropertyDescriptor>,
}

impl CollectionDescriptor {
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
}
