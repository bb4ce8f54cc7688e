//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and catalog queries for introspected tables.

use crate::schema::PropertyDescriptor;
use serde_json::{Map, Value};

/// Words PostgreSQL will not accept as bare column or table names.
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both", "case", "cast",
    "check", "collate", "column", "constraint", "create", "current_catalog", "current_date", "current_role",
    "current_time", "current_timestamp", "current_user", "default", "deferrable", "desc", "distinct", "do",
    "else", "end", "except", "false", "fetch", "for", "foreign", "from", "grant", "group", "having", "in",
    "initially", "intersect", "into", "lateral", "leading", "limit", "localtime", "localtimestamp", "not",
    "null", "offset", "on", "only", "or", "order", "placing", "primary", "references", "returning", "select",
    "session_user", "some", "symmetric", "system_user", "table", "then", "to", "trailing", "true", "union",
    "unique", "user", "using", "variadic", "when", "where", "window", "with",
];

/// Types the row decoder reads directly; anything else is selected as text.
const DECODABLE_TYPES: &[&str] = &[
    "int2", "int4", "int8", "float4", "float8", "bool", "uuid", "timestamptz", "timestamp", "date", "text",
    "varchar", "bpchar", "name", "json", "jsonb",
];

const TEXT_TYPES: &[&str] = &["text", "varchar", "bpchar", "name", "citext", "char"];

/// Quote an identifier the way PostgreSQL's `quote_ident` does: bare when it is a plain
/// lower-case non-reserved word, double-quoted otherwise.
pub fn quote_ident(s: &str) -> String {
    let plain = s
        .chars()
        .next()
        .map(|c| c.is_ascii_lowercase() || c == '_')
        .unwrap_or(false)
        && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain && !RESERVED_WORDS.contains(&s) {
        s.to_string()
    } else {
        format!("\"{}\"", s.replace('"', "\"\""))
    }
}

pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Single-quoted SQL string literal.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `%pattern%` with LIKE wildcards in the pattern escaped, so it matches as a plain substring.
pub fn like_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    escaped.push('%');
    for c in pattern.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    quote_literal(&escaped)
}

pub fn is_text_type(native_type: &str) -> bool {
    TEXT_TYPES.contains(&native_type.to_lowercase().as_str())
}

/// `$n::type` when the column type is known, plain `$n` otherwise.
fn placeholder(n: usize, native_type: Option<&str>) -> String {
    match native_type.filter(|t| !t.is_empty()) {
        Some(t) => format!("${}::{}", n, quote_ident(t)),
        None => format!("${}", n),
    }
}

fn native_type<'a>(columns: &'a [PropertyDescriptor], name: &str) -> Option<&'a str> {
    columns.iter().find(|c| c.name == name).map(|c| c.native_type.as_str())
}

/// SELECT list: `*` without column metadata; otherwise every column, with types the decoder
/// cannot read (numeric, arrays, enums) cast to text.
pub fn select_column_list(columns: &[PropertyDescriptor]) -> String {
    if columns.is_empty() {
        return "*".into();
    }
    columns
        .iter()
        .map(|c| {
            let q = quote_ident(&c.name);
            if DECODABLE_TYPES.contains(&c.native_type.as_str()) {
                q
            } else {
                format!("{}::text AS {}", q, q)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Target of a statement: schema, table and the table's known columns.
#[derive(Clone, Copy)]
pub struct TableRef<'a> {
    pub schema: &'a str,
    pub table: &'a str,
    pub columns: &'a [PropertyDescriptor],
}

impl TableRef<'_> {
    fn qualified(&self) -> String {
        qualified_table(self.schema, self.table)
    }

    fn id_placeholder(&self, n: usize, id_field: &str) -> String {
        placeholder(n, native_type(self.columns, id_field))
    }
}

/// SELECT one row by identifier.
pub fn select_by_id(t: TableRef<'_>, id_field: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::String(id.to_string()));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(t.columns),
        t.qualified(),
        quote_ident(id_field),
        t.id_placeholder(n, id_field)
    );
    q
}

/// INSERT every key of the record. The identifier is only sent when non-null so serial keys keep their default.
pub fn insert(t: TableRef<'_>, id_field: &str, record: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (k, v) in record {
        if k == id_field && v.is_null() {
            continue;
        }
        let n = q.push_param(v.clone());
        cols.push(quote_ident(k));
        placeholders.push(placeholder(n, native_type(t.columns, k)));
    }
    let returning = select_column_list(t.columns);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", t.qualified(), returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            t.qualified(),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE the row whose identifier equals `id`, setting every other key of the record.
/// With nothing to set this degrades to a SELECT of the same row.
pub fn update(t: TableRef<'_>, id_field: &str, id: &Value, record: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in record {
        if k == id_field {
            continue;
        }
        let n = q.push_param(v.clone());
        sets.push(format!("{} = {}", quote_ident(k), placeholder(n, native_type(t.columns, k))));
    }
    let n = q.push_param(id.clone());
    let cols = select_column_list(t.columns);
    let where_clause = format!("{} = {}", quote_ident(id_field), t.id_placeholder(n, id_field));
    q.sql = if sets.is_empty() {
        format!("SELECT {} FROM {} WHERE {}", cols, t.qualified(), where_clause)
    } else {
        format!(
            "UPDATE {} SET {} WHERE {} RETURNING {}",
            t.qualified(),
            sets.join(", "),
            where_clause,
            cols
        )
    };
    q
}

/// DELETE by identifier.
pub fn delete(t: TableRef<'_>, id_field: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::String(id.to_string()));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        t.qualified(),
        quote_ident(id_field),
        t.id_placeholder(n, id_field)
    );
    q
}

/// Tables and views of one schema, ordered by name. `$1` is the schema.
pub const LIST_TABLES: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = $1 ORDER BY table_name";

/// Column metadata of one table in ordinal order. `$1` is the schema, `$2` the table.
pub const LIST_COLUMNS: &str = "SELECT column_name::text, udt_name::text, is_nullable::text, \
     is_updatable::text, character_maximum_length::int4 \
     FROM information_schema.columns WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::describe_property;
    use serde_json::json;

    fn users() -> Vec<PropertyDescriptor> {
        vec![
            describe_property("id", "int4", false, true, None),
            describe_property("name", "varchar", true, true, Some(64)),
            describe_property("price", "numeric", true, true, None),
        ]
    }

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn catalog_listing_includes_views() {
        assert!(LIST_TABLES.contains("table_schema = $1"));
        assert!(!LIST_TABLES.contains("table_type"));
        assert!(LIST_TABLES.ends_with("ORDER BY table_name"));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "users");
        assert_eq!(quote_ident("order_items2"), "order_items2");
        assert_eq!(quote_ident("user"), "\"user\"");
        assert_eq!(quote_ident("FirstName"), "\"FirstName\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_ident("1abc"), "\"1abc\"");
        assert_eq!(quote_ident("name; DROP TABLE x"), "\"name; DROP TABLE x\"");
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("al"), "'%al%'");
        assert_eq!(like_pattern("o'neil"), "'%o''neil%'");
        assert_eq!(like_pattern("50%_off"), "'%50\\%\\_off%'");
    }

    #[test]
    fn test_select_column_list() {
        assert_eq!(select_column_list(&[]), "*");
        assert_eq!(select_column_list(&users()), "id, name, price::text AS price");
    }

    #[test]
    fn test_select_by_id_casts_to_key_type() {
        let cols = users();
        let t = TableRef { schema: "public", table: "users", columns: &cols };
        let q = select_by_id(t, "id", "42");
        assert_eq!(q.sql, "SELECT id, name, price::text AS price FROM public.users WHERE id = $1::int4");
        assert_eq!(q.params, vec![json!("42")]);
    }

    #[test]
    fn test_insert_skips_null_id() {
        let cols = users();
        let t = TableRef { schema: "public", table: "users", columns: &cols };
        let q = insert(t, "id", &map(json!({"id": null, "name": "Ada"})));
        assert_eq!(
            q.sql,
            "INSERT INTO public.users (name) VALUES ($1::varchar) RETURNING id, name, price::text AS price"
        );
        assert_eq!(q.params, vec![json!("Ada")]);
    }

    #[test]
    fn test_insert_empty_record_uses_defaults() {
        let t = TableRef { schema: "public", table: "users", columns: &[] };
        let q = insert(t, "id", &Map::new());
        assert_eq!(q.sql, "INSERT INTO public.users DEFAULT VALUES RETURNING *");
    }

    #[test]
    fn test_update_binds_id_last() {
        let cols = users();
        let t = TableRef { schema: "public", table: "users", columns: &cols };
        let q = update(t, "id", &json!(7), &map(json!({"id": 7, "name": "Bob"})));
        assert_eq!(
            q.sql,
            "UPDATE public.users SET name = $1::varchar WHERE id = $2::int4 RETURNING id, name, price::text AS price"
        );
        assert_eq!(q.params, vec![json!("Bob"), json!(7)]);
    }

    #[test]
    fn test_update_without_fields_selects() {
        let t = TableRef { schema: "public", table: "users", columns: &[] };
        let q = update(t, "id", &json!(7), &map(json!({"id": 7})));
        assert_eq!(q.sql, "SELECT * FROM public.users WHERE id = $1");
    }

    #[test]
    fn test_delete() {
        let cols = users();
        let t = TableRef { schema: "public", table: "user", columns: &cols };
        let q = delete(t, "id", "42");
        assert_eq!(q.sql, "DELETE FROM public.\"user\" WHERE id = $1::int4");
    }
}
