//! QuerySpec -> MongoDB filter, sort and cursor window.

use crate::query::{QuerySpec, QueryTranslator, SortDirection};
use mongodb::bson::{Bson, Document, Regex};
use mongodb::options::FindOptions;

#[derive(Clone, Debug, PartialEq)]
pub struct DocumentQuery {
    pub collection: String,
    pub filter: Document,
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl DocumentQuery {
    pub fn find_options(&self) -> FindOptions {
        let mut options = FindOptions::default();
        options.sort = self.sort.clone();
        options.skip = self.skip;
        options.limit = self.limit;
        options
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentTranslator;

/// Unanchored regex matching `pattern` as a literal, case-sensitive substring.
pub fn substring_regex(pattern: &str) -> Bson {
    Bson::RegularExpression(Regex {
        pattern: format!(".*{}.*", regex::escape(pattern)),
        options: String::new(),
    })
}

impl QueryTranslator for DocumentTranslator {
    type Query = DocumentQuery;

    fn translate(&self, collection: &str, spec: &QuerySpec) -> DocumentQuery {
        let mut filter = Document::new();
        let repeated = spec
            .filters
            .iter()
            .enumerate()
            .any(|(i, (f, _))| spec.filters[..i].iter().any(|(g, _)| g == f));
        if repeated {
            let clauses: Vec<Bson> = spec
                .filters
                .iter()
                .map(|(field, pattern)| {
                    let mut clause = Document::new();
                    clause.insert(field.clone(), substring_regex(pattern));
                    Bson::Document(clause)
                })
                .collect();
            filter.insert("$and", clauses);
        } else {
            for (field, pattern) in &spec.filters {
                filter.insert(field.clone(), substring_regex(pattern));
            }
        }

        let sort = if spec.sort.is_empty() {
            None
        } else {
            let mut doc = Document::new();
            for key in &spec.sort {
                let dir = match key.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                };
                doc.insert(key.field.clone(), dir);
            }
            Some(doc)
        };

        DocumentQuery {
            collection: collection.to_string(),
            filter,
            sort,
            skip: spec.offset(),
            limit: spec.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)),
        }
    }
}
