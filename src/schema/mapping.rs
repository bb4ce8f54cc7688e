//! Native column type -> logical type, format and example default.
//!
//! Tags are matched by case-insensitive substring containment against
//! [`TYPE_TABLE`], first row wins. Overlapping tags such as `timestamptz`
//! therefore resolve by table position, never by tag length.

use crate::schema::descriptor::{LogicalType, PropertyDescriptor};
use serde_json::Value;

/// Result of mapping one native type tag.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeMapping {
    pub logical_type: Option<LogicalType>,
    pub format: Option<&'static str>,
    pub example_default: Value,
}

/// (needles, logical type, format). Order is significant.
const TYPE_TABLE: &[(&[&str], LogicalType, Option<&str>)] = &[
    (&["varchar", "text"], LogicalType::String, None),
    (&["bool"], LogicalType::Boolean, None),
    (&["date", "timestamp"], LogicalType::Date, Some("date")),
    (&["int4"], LogicalType::Integer, Some("int32")),
    (&["numeric"], LogicalType::Number, Some("double")),
];

pub fn map_type(native_tag: &str) -> TypeMapping {
    let tag = native_tag.to_lowercase();
    for (needles, logical, format) in TYPE_TABLE {
        if needles.iter().any(|n| tag.contains(n)) {
            return TypeMapping {
                logical_type: Some(*logical),
                format: *format,
                example_default: example_default(*logical),
            };
        }
    }
    TypeMapping {
        logical_type: None,
        format: None,
        example_default: Value::Null,
    }
}

fn example_default(logical: LogicalType) -> Value {
    match logical {
        LogicalType::String => Value::String("Lorem Ipsum".into()),
        LogicalType::Boolean => Value::Bool(true),
        LogicalType::Date => Value::String(chrono::Utc::now().to_rfc3339()),
        LogicalType::Integer | LogicalType::Number => Value::Number(0.into()),
    }
}

/// Build a descriptor from one native column/field metadata row.
pub fn describe_property(
    name: &str,
    native_tag: &str,
    nullable: bool,
    writable: bool,
    max_length: Option<u32>,
) -> PropertyDescriptor {
    let mapping = map_type(native_tag);
    PropertyDescriptor {
        name: name.to_string(),
        logical_type: mapping.logical_type,
        format: mapping.format,
        native_type: native_tag.to_string(),
        nullable,
        writable,
        max_length,
        example_default: mapping.example_default,
    }
}
