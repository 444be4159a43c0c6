//! Row and filter types shared by every table service backend

use serde_json::{Map, Value};

/// A table row: column name to JSON value
pub type Row = Map<String, Value>;

/// Equality predicate on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Column name
    pub column: String,
    /// Value compared against the column's text form
    pub value: String,
}

impl Filter {
    /// Create a `column = value` filter
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Whether a JSON cell satisfies this filter
    ///
    /// Numbers and strings compare by text so `"42"` matches both `42` and `"42"`.
    pub fn matches(&self, row: &Row) -> bool {
        match row.get(&self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Number(n)) => n.to_string() == self.value,
            Some(Value::Bool(b)) => b.to_string() == self.value,
            _ => false,
        }
    }
}

/// Options for selecting rows
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    /// Equality filters, all of which must hold
    pub filters: Vec<Filter>,

    /// Column to sort ascending by
    pub order_by: Option<String>,
}

impl SelectQuery {
    /// Create an unfiltered query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter (builder pattern)
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Sort ascending by a column (builder pattern)
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_select_query_builder() {
        let query = SelectQuery::new()
            .eq("user_id", "u1")
            .eq("id", "7")
            .order_by("created");
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0], Filter::eq("user_id", "u1"));
        assert_eq!(query.order_by.as_deref(), Some("created"));
    }

    #[test]
    fn test_filter_matches_string_and_number() {
        let r = row(json!({"id": 42, "user_id": "u1", "done": true}));
        assert!(Filter::eq("id", "42").matches(&r));
        assert!(Filter::eq("user_id", "u1").matches(&r));
        assert!(Filter::eq("done", "true").matches(&r));
        assert!(!Filter::eq("user_id", "u2").matches(&r));
        assert!(!Filter::eq("missing", "x").matches(&r));
    }
}
