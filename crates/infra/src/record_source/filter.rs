//! Field predicates understood by record stores.

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Op {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    NotIn,
}

/// One `(field, op, value)` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: Op,
    pub value: JsonValue,
}

/// Conjunction of predicates. An empty filter is a full-table scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

/// Timestamps are stored as RFC 3339 strings.
pub fn timestamp(at: DateTime<Utc>) -> JsonValue {
    JsonValue::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    fn with(mut self, field: &str, op: Op, value: JsonValue) -> Self {
        self.predicates.push(Predicate {
            field: field.to_string(),
            op,
            value,
        });
        self
    }

    pub fn eq(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.with(field, Op::Eq, value.into())
    }

    pub fn lt(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.with(field, Op::Lt, value.into())
    }

    pub fn gt(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.with(field, Op::Gt, value.into())
    }

    pub fn le(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.with(field, Op::Le, value.into())
    }

    pub fn ge(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.with(field, Op::Ge, value.into())
    }

    pub fn is_in<V: Into<JsonValue>>(
        self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect::<Vec<_>>();
        self.with(field, Op::In, JsonValue::Array(values))
    }

    pub fn not_in<V: Into<JsonValue>>(
        self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect::<Vec<_>>();
        self.with(field, Op::NotIn, JsonValue::Array(values))
    }

    /// Evaluate against a document's fields.
    pub fn matches(&self, fields: &Map<String, JsonValue>) -> bool {
        self.predicates.iter().all(|p| p.matches(fields))
    }
}

impl Predicate {
    pub fn matches(&self, fields: &Map<String, JsonValue>) -> bool {
        let actual = match fields.get(&self.field) {
            None | Some(JsonValue::Null) => return false,
            Some(v) => v,
        };

        match self.op {
            Op::Eq => values_equal(actual, &self.value),
            Op::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            Op::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            Op::Le => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Op::Ge => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Op::In => candidates(&self.value).any(|c| values_equal(actual, c)),
            Op::NotIn => !candidates(&self.value).any(|c| values_equal(actual, c)),
        }
    }
}

fn candidates(value: &JsonValue) -> impl Iterator<Item = &JsonValue> {
    value.as_array().into_iter().flatten()
}

fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering between two stored values; `None` when they are not comparable.
///
/// Strings that both parse as RFC 3339 compare chronologically, so offsets
/// other than `Z` order correctly.
fn compare(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (JsonValue::String(x), JsonValue::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
