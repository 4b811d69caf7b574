use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::errors::StoreError;

/// Dot-separated address of a nested value inside a document.
///
/// Segments address object keys, or array slots when the container at that
/// point is an array and the segment parses as an index:
/// `weeks.week3.actionItems.1.completed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        if path.is_empty() {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
                message: "path is empty".into(),
            });
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
                message: "empty segment".into(),
            });
        }
        Ok(Self { segments })
    }

    /// Build a path from already-split segments. Segments must be non-empty
    /// and must not contain dots.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write `value` at this path. Missing intermediate object keys are
    /// created as empty maps; array slots must already exist.
    pub fn set(&self, root: &mut Value, value: Value) -> Result<(), StoreError> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(StoreError::InvalidPath {
                path: String::new(),
                message: "path is empty".into(),
            });
        };

        let mut current = root;
        for segment in parents {
            current = match current {
                Value::Object(map) => map
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new())),
                Value::Array(items) => {
                    let index = self.index_for(segment, items.len())?;
                    &mut items[index]
                }
                _ => return Err(self.not_found(segment)),
            };
        }

        match current {
            Value::Object(map) => {
                map.insert(last.clone(), value);
                Ok(())
            }
            Value::Array(items) => {
                let index = self.index_for(last, items.len())?;
                items[index] = value;
                Ok(())
            }
            _ => Err(self.not_found(last)),
        }
    }

    fn index_for(&self, segment: &str, len: usize) -> Result<usize, StoreError> {
        match segment.parse::<usize>() {
            Ok(index) if index < len => Ok(index),
            _ => Err(self.not_found(segment)),
        }
    }

    fn not_found(&self, segment: &str) -> StoreError {
        StoreError::PathNotFound {
            path: self.to_string(),
            segment: segment.to_string(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Apply a batch of partial updates in order. Either every update applies or
/// `data` is left untouched.
pub fn apply_updates(data: &mut Value, updates: &[(FieldPath, Value)]) -> Result<(), StoreError> {
    let mut staged = data.clone();
    for (path, value) in updates {
        path.set(&mut staged, value.clone())?;
    }
    *data = staged;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan_fixture() -> Value {
        json!({
            "weeks": {
                "week3": {
                    "actionItems": [
                        {"text": "a", "completed": false},
                        {"text": "b", "completed": false}
                    ]
                }
            }
        })
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("weeks..week1").is_err());
        assert!(FieldPath::parse("weeks.").is_err());
    }

    #[test]
    fn test_display_round_trips_segments() {
        let path = FieldPath::parse("weeks.week3.actionItems.1.completed").unwrap();
        assert_eq!(path.segments().len(), 5);
        assert_eq!(path.to_string(), "weeks.week3.actionItems.1.completed");
    }

    #[test]
    fn test_set_array_slot_field() {
        let mut doc = plan_fixture();
        let path = FieldPath::parse("weeks.week3.actionItems.1.completed").unwrap();
        path.set(&mut doc, json!(true)).unwrap();
        assert_eq!(doc["weeks"]["week3"]["actionItems"][1]["completed"], json!(true));
        assert_eq!(doc["weeks"]["week3"]["actionItems"][0]["completed"], json!(false));
    }

    #[test]
    fn test_set_creates_missing_maps() {
        let mut doc = json!({});
        FieldPath::parse("goals.meta.owner")
            .unwrap()
            .set(&mut doc, json!("sam"))
            .unwrap();
        assert_eq!(doc["goals"]["meta"]["owner"], "sam");
    }

    #[test]
    fn test_set_out_of_range_index_fails() {
        let mut doc = plan_fixture();
        let err = FieldPath::parse("weeks.week3.actionItems.5.text")
            .unwrap()
            .set(&mut doc, json!("x"))
            .unwrap_err();
        assert!(matches!(err, StoreError::PathNotFound { ref segment, .. } if segment == "5"));
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut doc = json!({"title": "plan"});
        let err = FieldPath::parse("title.inner")
            .unwrap()
            .set(&mut doc, json!(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::PathNotFound { .. }));
    }

    #[test]
    fn test_get_reads_nested_slot() {
        let doc = plan_fixture();
        let path = FieldPath::from_segments(["weeks", "week3", "actionItems", "0", "text"]);
        assert_eq!(path.get(&doc), Some(&json!("a")));
        assert_eq!(FieldPath::parse("weeks.week9").unwrap().get(&doc), None);
    }

    #[test]
    fn test_apply_updates_is_all_or_nothing() {
        let mut doc = plan_fixture();
        let updates = vec![
            (FieldPath::parse("weeks.week3.actionItems.0.text").unwrap(), json!("changed")),
            (FieldPath::parse("weeks.week3.actionItems.9.text").unwrap(), json!("boom")),
        ];
        assert!(apply_updates(&mut doc, &updates).is_err());
        assert_eq!(doc["weeks"]["week3"]["actionItems"][0]["text"], "a");
    }
}
