//! Notebook record extraction from decoded payloads
//!
//! A decoded entry can hold a single notebook, a `{"notebooks": [...]}`
//! wrapper, a bare list of notebooks, or some other mapping that is kept as a
//! raw fallback record.

use serde_json::{Map, Value};

/// A JSON mapping describing one notebook
pub type NotebookRecord = Map<String, Value>;

/// Container shape of a decoded payload
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadShape {
    /// Mapping with `commands` or `cells`: a single notebook
    Single(NotebookRecord),
    /// Mapping whose `notebooks` key holds a list
    Wrapped(Vec<Value>),
    /// Mapping of any other form, kept whole
    Fallback(NotebookRecord),
    /// Top-level list of notebooks
    List(Vec<Value>),
    /// Scalar or null; holds no notebooks
    Empty,
}

impl PayloadShape {
    /// Classify a decoded payload by the keys it carries.
    #[must_use]
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key("commands") || map.contains_key("cells") => {
                Self::Single(map)
            }
            Value::Object(mut map) => match map.remove("notebooks") {
                Some(Value::Array(items)) => Self::Wrapped(items),
                Some(other) => {
                    map.insert("notebooks".to_string(), other);
                    Self::Fallback(map)
                }
                None => Self::Fallback(map),
            },
            Value::Array(items) => Self::List(items),
            _ => Self::Empty,
        }
    }
}

/// Iterator over the notebook records of one payload.
///
/// Consumes the payload; non-mapping list elements are skipped.
#[derive(Debug)]
pub struct NotebookRecords {
    inner: RecordsInner,
}

#[derive(Debug)]
enum RecordsInner {
    One(Option<NotebookRecord>),
    Many(std::vec::IntoIter<Value>),
}

impl Iterator for NotebookRecords {
    type Item = NotebookRecord;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            RecordsInner::One(record) => record.take(),
            RecordsInner::Many(items) => items.find_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            }),
        }
    }
}

impl From<PayloadShape> for NotebookRecords {
    fn from(shape: PayloadShape) -> Self {
        let inner = match shape {
            PayloadShape::Single(map) | PayloadShape::Fallback(map) => RecordsInner::One(Some(map)),
            PayloadShape::Wrapped(items) | PayloadShape::List(items) => {
                RecordsInner::Many(items.into_iter())
            }
            PayloadShape::Empty => RecordsInner::One(None),
        };
        Self { inner }
    }
}

/// Yield the notebook records held by a decoded payload.
#[must_use]
pub fn extract(value: Value) -> NotebookRecords {
    PayloadShape::classify(value).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_commands_notebook() {
        let value = json!({"name": "a", "commands": []});
        let records: Vec<_> = extract(value).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "a");
    }

    #[test]
    fn test_single_cells_notebook_ignores_notebooks_key() {
        let value = json!({"cells": [], "notebooks": [{"name": "inner"}]});
        let records: Vec<_> = extract(value).collect();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains_key("cells"));
    }

    #[test]
    fn test_wrapped_notebooks_skip_non_mappings() {
        let value = json!({"notebooks": [{"name": "x"}, 3, "str", {"name": "y"}]});
        let names: Vec<_> = extract(value)
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_notebooks_not_a_list_is_fallback() {
        let value = json!({"notebooks": "nope", "other": 1});
        let shape = PayloadShape::classify(value.clone());
        assert_eq!(
            shape,
            PayloadShape::Fallback(value.as_object().unwrap().clone())
        );
        assert_eq!(extract(value).count(), 1);
    }

    #[test]
    fn test_raw_fallback_mapping() {
        let value = json!({"version": "NotebookV1", "origId": 7});
        let records: Vec<_> = extract(value).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["origId"], 7);
    }

    #[test]
    fn test_top_level_list() {
        let value = json!([{"commands": []}, null, {"cells": []}]);
        assert_eq!(extract(value).count(), 2);
    }

    #[test]
    fn test_scalars_yield_nothing() {
        assert_eq!(extract(json!(42)).count(), 0);
        assert_eq!(extract(json!("text")).count(), 0);
        assert_eq!(extract(Value::Null).count(), 0);
    }

    #[test]
    fn test_iterator_is_exhausted_after_single() {
        let mut records = extract(json!({"commands": []}));
        assert!(records.next().is_some());
        assert!(records.next().is_none());
        assert!(records.next().is_none());
    }
}
