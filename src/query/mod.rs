//! Store-agnostic filter/sort/paginate request and its translation into native queries.

pub mod document;
pub mod sql;

pub use document::{DocumentQuery, DocumentTranslator};
pub use sql::{SqlQuery, SqlTranslator};

use crate::error::AppError;

/// Query-string keys with a fixed meaning; never treated as filters.
pub const RESERVED_KEYS: &[&str] = &["limit", "page", "sort"];

/// Largest `limit`, `page` or offset a store accepts (PostgreSQL `bigint`, BSON `int64`).
pub const MAX_COUNT: u64 = i64::MAX as u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(AppError::BadRequest(format!(
                "invalid sort direction: {} (expected asc or desc)",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuerySpec {
    /// (field, substring pattern) pairs, combined with AND.
    pub filters: Vec<(String, String)>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Vec<SortKey>,
}

impl QuerySpec {
    /// Build from decoded query-string pairs, in request order.
    /// `sort` accepts `field[:asc|desc]` entries separated by `;` and may repeat.
    /// Filters with an empty value are ignored.
    pub fn from_params<I, K, V>(params: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut spec = QuerySpec::default();
        for (k, v) in params {
            let (k, v) = (k.as_ref(), v.as_ref());
            match k {
                "limit" => spec.limit = Some(parse_count(k, v)?),
                "page" => spec.page = Some(parse_count(k, v)?),
                "sort" => {
                    for entry in v.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                        spec.sort.push(parse_sort_key(entry)?);
                    }
                }
                _ => {
                    if !v.is_empty() {
                        spec.filters.push((k.to_string(), v.to_string()));
                    }
                }
            }
        }
        Ok(spec)
    }

    /// Rows to skip: `page * limit` when both are set, capped at [`MAX_COUNT`].
    pub fn offset(&self) -> Option<u64> {
        match (self.page, self.limit) {
            (Some(page), Some(limit)) => Some(page.saturating_mul(limit).min(MAX_COUNT)),
            _ => None,
        }
    }
}

fn parse_count(key: &str, value: &str) -> Result<u64, AppError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n <= MAX_COUNT => Ok(n),
        Ok(_) => Err(AppError::BadRequest(format!("{} must not exceed {}, got '{}'", key, MAX_COUNT, value))),
        Err(_) => Err(AppError::BadRequest(format!(
            "{} must be a non-negative integer, got '{}'",
            key, value
        ))),
    }
}

fn parse_sort_key(entry: &str) -> Result<SortKey, AppError> {
    let (field, direction) = match entry.split_once(':') {
        Some((f, d)) => (f.trim(), d.parse()?),
        None => (entry, SortDirection::Asc),
    };
    if field.is_empty() {
        return Err(AppError::BadRequest(format!("invalid sort entry: '{}'", entry)));
    }
    Ok(SortKey {
        field: field.to_string(),
        direction,
    })
}

/// Turns a [`QuerySpec`] into a query only the matching store adapter can execute.
pub trait QueryTranslator {
    type Query;

    fn translate(&self, collection: &str, spec: &QuerySpec) -> Self::Query;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(qs: &[(&str, &str)]) -> QuerySpec {
        QuerySpec::from_params(qs.iter().copied()).unwrap()
    }

    #[test]
    fn reserved_keys_are_not_filters() {
        let s = spec(&[("name", "al"), ("limit", "2"), ("page", "1"), ("sort", "name:desc"), ("city", "ber")]);
        assert_eq!(s.filters, vec![("name".into(), "al".into()), ("city".into(), "ber".into())]);
        assert!(s.filters.iter().all(|(f, _)| !RESERVED_KEYS.contains(&f.as_str())));
        assert_eq!(s.limit, Some(2));
        assert_eq!(s.page, Some(1));
    }

    #[test]
    fn offset_is_page_times_limit() {
        for (p, l) in [(0u64, 0u64), (0, 10), (1, 2), (3, 25), (7, 1)] {
            let s = QuerySpec {
                page: Some(p),
                limit: Some(l),
                ..Default::default()
            };
            assert_eq!(s.offset(), Some(p * l));
        }
    }

    #[test]
    fn limit_without_page_has_no_offset() {
        let s = spec(&[("limit", "5")]);
        assert_eq!(s.limit, Some(5));
        assert_eq!(s.offset(), None);
    }

    #[test]
    fn page_without_limit_is_ignored() {
        let s = spec(&[("page", "3")]);
        assert_eq!(s.offset(), None);
        assert_eq!(s.limit, None);
    }

    #[test]
    fn offset_is_capped_at_bigint_range() {
        let s = QuerySpec {
            page: Some(MAX_COUNT),
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(s.offset(), Some(MAX_COUNT));
    }

    #[test]
    fn counts_beyond_bigint_range_are_rejected() {
        assert_eq!(spec(&[("limit", "9223372036854775807")]).limit, Some(MAX_COUNT));
        let err = QuerySpec::from_params([("limit", "9223372036854775808")]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(QuerySpec::from_params([("page", "18446744073709551615")]).is_err());
    }

    #[test]
    fn sort_entries_default_to_ascending() {
        let s = spec(&[("sort", "name;age:desc"), ("sort", "id:ASC")]);
        let keys: Vec<_> = s.sort.iter().map(|k| (k.field.as_str(), k.direction)).collect();
        assert_eq!(
            keys,
            [("name", SortDirection::Asc), ("age", SortDirection::Desc), ("id", SortDirection::Asc)]
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(QuerySpec::from_params([("limit", "ten")]).is_err());
        assert!(QuerySpec::from_params([("page", "-1")]).is_err());
        assert!(QuerySpec::from_params([("sort", "name:sideways")]).is_err());
        assert!(QuerySpec::from_params([("sort", ":desc")]).is_err());
    }

    #[test]
    fn empty_filter_values_are_skipped() {
        let s = spec(&[("name", ""), ("city", "x")]);
        assert_eq!(s.filters, vec![("city".into(), "x".into())]);
    }
}
