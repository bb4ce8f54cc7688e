//! QuerySpec -> PostgreSQL SELECT.

use crate::query::{QuerySpec, QueryTranslator, SortDirection};
use crate::schema::PropertyDescriptor;
use crate::sql::{is_text_type, like_pattern, qualified_table, quote_ident, select_column_list};

/// A complete SELECT statement. Filter patterns are inlined as escaped literals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqlQuery {
    pub sql: String,
}

/// Translates against one schema. Column metadata, when given, drives the select list and
/// makes non-text columns compare through `::text`.
pub struct SqlTranslator<'a> {
    schema: &'a str,
    columns: &'a [PropertyDescriptor],
}

impl<'a> SqlTranslator<'a> {
    pub fn new(schema: &'a str) -> Self {
        SqlTranslator { schema, columns: &[] }
    }

    pub fn with_columns(mut self, columns: &'a [PropertyDescriptor]) -> Self {
        self.columns = columns;
        self
    }

    fn filter_operand(&self, field: &str) -> String {
        let q = quote_ident(field);
        match self.columns.iter().find(|c| c.name == field) {
            Some(c) if !is_text_type(&c.native_type) => format!("{}::text", q),
            _ => q,
        }
    }
}

impl QueryTranslator for SqlTranslator<'_> {
    type Query = SqlQuery;

    fn translate(&self, collection: &str, spec: &QuerySpec) -> SqlQuery {
        let where_parts: Vec<String> = spec
            .filters
            .iter()
            .map(|(field, pattern)| format!("{} LIKE {}", self.filter_operand(field), like_pattern(pattern)))
            .collect();
        let where_clause = if where_parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_parts.join(" AND "))
        };
        let order_clause = if spec.sort.is_empty() {
            String::new()
        } else {
            let keys: Vec<String> = spec
                .sort
                .iter()
                .map(|k| {
                    let dir = match k.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{} {}", quote_ident(&k.field), dir)
                })
                .collect();
            format!(" ORDER BY {}", keys.join(", "))
        };
        let limit_clause = spec.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
        let offset_clause = spec.offset().map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
        SqlQuery {
            sql: format!(
                "SELECT {} FROM {}{}{}{}{}",
                select_column_list(self.columns),
                qualified_table(self.schema, collection),
                where_clause,
                order_clause,
                limit_clause,
                offset_clause
            ),
        }
    }
}
