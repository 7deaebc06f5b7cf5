//! Collection queries handed to a [`DataSource`](crate::source::DataSource).
//!
//! A [`Query`] names an entity and optionally restricts it with a [`Filter`].
//! Data sources translate it to whatever their backend speaks.
//!
//! ```rust
//! use quickview_core::{Filter, Query, RecordId};
//!
//! let query = Query::all("meal")
//!     .filter(Filter::equals("vegetarian", true))
//!     .id_in([RecordId::Int(1), RecordId::Int(2)]);
//!
//! assert_eq!(query.entity(), "meal");
//! assert!(matches!(query.where_clause(), Some(Filter::And(parts)) if parts.len() == 2));
//! ```

use crate::value::{Record, RecordId, Value};

/// A filter condition over a single record.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals value.
    Equals(String, Value),
    /// Field is one of the values.
    In(String, Vec<Value>),
    /// All conditions hold.
    And(Vec<Filter>),
}

impl Filter {
    /// Create an equality filter.
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals(field.into(), value.into())
    }

    /// Create an `IN` filter.
    pub fn is_in(field: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Restrict `id` to the given ids.
    pub fn id_in(ids: impl IntoIterator<Item = RecordId>) -> Self {
        Self::In("id".to_string(), ids.into_iter().map(Value::from).collect())
    }

    /// Combine two filters, flattening nested `And`s.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (this, Self::And(mut right)) => {
                right.insert(0, this);
                Self::And(right)
            }
            (this, other) => Self::And(vec![this, other]),
        }
    }

    /// Evaluate against a stored record. List-valued fields match when any
    /// element matches, the way a join would.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Equals(field, expected) => field_matches(record, field, |v| v == expected),
            Self::In(field, values) => field_matches(record, field, |v| values.contains(v)),
            Self::And(filters) => filters.iter().all(|f| f.matches(record)),
        }
    }
}

fn field_matches(record: &Record, field: &str, pred: impl Fn(&Value) -> bool) -> bool {
    match record.get(field) {
        Some(Value::List(items)) => items.iter().any(&pred),
        Some(value) => pred(value),
        None => pred(&Value::Null),
    }
}

/// A query over the records of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    entity: String,
    filter: Option<Filter>,
}

impl Query {
    /// All records of `entity`.
    pub fn all(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            filter: None,
        }
    }

    /// Add a filter; combined with any existing filter by `And`.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// Restrict to the given ids.
    pub fn id_in(self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.filter(Filter::id_in(ids))
    }

    /// The queried entity.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The filter, if any.
    pub fn where_clause(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Check whether a record satisfies the filter.
    pub fn matches(&self, record: &Record) -> bool {
        self.filter.as_ref().is_none_or(|f| f.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn test_query_all_matches_everything() {
        let query = Query::all("meal");
        assert!(query.where_clause().is_none());
        assert!(query.matches(&record! { "id" => 1 }));
    }

    #[test]
    fn test_id_in() {
        let query = Query::all("meal").id_in([RecordId::Int(1), RecordId::Int(3)]);
        assert!(query.matches(&record! { "id" => 1 }));
        assert!(!query.matches(&record! { "id" => 2 }));
    }

    #[test]
    fn test_filter_and_flattens() {
        let filter = Filter::equals("a", 1)
            .and(Filter::equals("b", 2))
            .and(Filter::equals("c", 3));
        assert!(matches!(filter, Filter::And(ref parts) if parts.len() == 3));
    }

    #[test]
    fn test_list_field_matches_any_element() {
        let row = record! { "id" => 1, "tags" => vec![4, 5] };
        assert!(Filter::equals("tags", 5).matches(&row));
        assert!(!Filter::is_in("tags", [6, 7]).matches(&row));
    }

    #[test]
    fn test_missing_field_compares_as_null() {
        let row = record! { "id" => 1 };
        assert!(Filter::equals("chef", Value::Null).matches(&row));
        assert!(!Filter::equals("chef", 2).matches(&row));
    }
}
