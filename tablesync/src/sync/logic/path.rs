//! Path expressions into row data
//!
//! A path is a dot-separated list of object keys where each key may be
//! followed by bracketed array indices: `metadata.author`, `items[0].name`,
//! `matrix[1][2]`.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SEGMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[\]]*)((?:\[[0-9]+\])*)$").expect("valid segment pattern"));
static INDEX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([0-9]+)\]").expect("valid index pattern"));

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    raw: String,
    segments: Vec<PathSegment>,
}

/// Error when parsing or following a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Path is empty
    Empty,
    /// Path contains an empty segment (`a..b`)
    EmptySegment { path: String },
    /// Brackets are malformed or hold something other than an index
    InvalidSegment { path: String, segment: String },
    /// Tried to read a key or index from a scalar value
    TypeMismatch {
        path: String,
        segment: String,
        found: &'static str,
    },
    /// Tried to write past the end of an array
    IndexOutOfRange { path: String, index: usize, len: usize },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "path cannot be empty"),
            PathError::EmptySegment { path } => {
                write!(f, "path '{}' contains an empty segment", path)
            }
            PathError::InvalidSegment { path, segment } => {
                write!(f, "path '{}' has invalid segment '{}'", path, segment)
            }
            PathError::TypeMismatch {
                path,
                segment,
                found,
            } => write!(
                f,
                "cannot read '{}' of {} while resolving '{}'",
                segment, found, path
            ),
            PathError::IndexOutOfRange { path, index, len } => write!(
                f,
                "index {} out of range (length {}) while writing '{}'",
                index, len, path
            ),
        }
    }
}

impl std::error::Error for PathError {}

impl PathExpr {
    /// Parse a path expression
    pub fn parse(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for part in path.split('.') {
            if part.is_empty() {
                return Err(PathError::EmptySegment {
                    path: path.to_string(),
                });
            }

            let captures =
                SEGMENT_PATTERN
                    .captures(part)
                    .ok_or_else(|| PathError::InvalidSegment {
                        path: path.to_string(),
                        segment: part.to_string(),
                    })?;

            let key = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_string()));
            }

            let indices = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
            for index in INDEX_PATTERN.captures_iter(indices) {
                let index = index[1]
                    .parse::<usize>()
                    .map_err(|_| PathError::InvalidSegment {
                        path: path.to_string(),
                        segment: part.to_string(),
                    })?;
                segments.push(PathSegment::Index(index));
            }
        }

        Ok(PathExpr {
            raw: path.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolve a path against a value
///
/// Returns `Ok(None)` when a key or index along the way is absent (or null),
/// and an error when the path tries to descend into a scalar.
pub fn resolve_path<'a>(root: &'a Value, path: &PathExpr) -> Result<Option<&'a Value>, PathError> {
    let mut current = root;

    for segment in &path.segments {
        let next = match (segment, current) {
            (_, Value::Null) => return Ok(None),
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            (segment, other) => {
                return Err(PathError::TypeMismatch {
                    path: path.raw.clone(),
                    segment: segment.to_string(),
                    found: type_name(other),
                });
            }
        };

        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }

    Ok(Some(current))
}

/// Write `value` at `path`, creating missing objects along the way
///
/// Array indices must already exist, or equal the array length to append.
pub fn set_path(root: &mut Value, path: &PathExpr, value: Value) -> Result<(), PathError> {
    let Some((last, parents)) = path.segments.split_last() else {
        return Err(PathError::Empty);
    };

    let mut current = root;
    for segment in parents {
        current = descend_mut(current, segment, path)?;
    }

    match (last, current) {
        (PathSegment::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (PathSegment::Key(key), slot) if slot.is_null() => {
            let mut map = serde_json::Map::new();
            map.insert(key.clone(), value);
            *slot = Value::Object(map);
            Ok(())
        }
        (PathSegment::Index(index), Value::Array(items)) => {
            if *index < items.len() {
                items[*index] = value;
                Ok(())
            } else if *index == items.len() {
                items.push(value);
                Ok(())
            } else {
                Err(PathError::IndexOutOfRange {
                    path: path.raw.clone(),
                    index: *index,
                    len: items.len(),
                })
            }
        }
        (segment, other) => Err(PathError::TypeMismatch {
            path: path.raw.clone(),
            segment: segment.to_string(),
            found: type_name(other),
        }),
    }
}

fn descend_mut<'a>(
    current: &'a mut Value,
    segment: &PathSegment,
    path: &PathExpr,
) -> Result<&'a mut Value, PathError> {
    if current.is_null() {
        if let PathSegment::Key(_) = segment {
            *current = Value::Object(serde_json::Map::new());
        }
    }

    match (segment, current) {
        (PathSegment::Key(key), Value::Object(map)) => Ok(map
            .entry(key.clone())
            .or_insert_with(|| Value::Object(serde_json::Map::new()))),
        (PathSegment::Index(index), Value::Array(items)) => {
            let len = items.len();
            items.get_mut(*index).ok_or(PathError::IndexOutOfRange {
                path: path.raw.clone(),
                index: *index,
                len,
            })
        }
        (segment, other) => Err(PathError::TypeMismatch {
            path: path.raw.clone(),
            segment: segment.to_string(),
            found: type_name(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_and_nested() {
        let path = PathExpr::parse("metadata.author").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("metadata".into()),
                PathSegment::Key("author".into())
            ]
        );

        let path = PathExpr::parse("items[0].tags[2]").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("items".into()),
                PathSegment::Index(0),
                PathSegment::Key("tags".into()),
                PathSegment::Index(2),
            ]
        );
    }

    #[test]
    fn test_parse_consecutive_indices() {
        let path = PathExpr::parse("matrix[1][2]").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("matrix".into()),
                PathSegment::Index(1),
                PathSegment::Index(2),
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(PathExpr::parse(""), Err(PathError::Empty));
        assert!(matches!(
            PathExpr::parse("a..b"),
            Err(PathError::EmptySegment { .. })
        ));
        assert!(matches!(
            PathExpr::parse("items[x]"),
            Err(PathError::InvalidSegment { .. })
        ));
        assert!(matches!(
            PathExpr::parse("items[0"),
            Err(PathError::InvalidSegment { .. })
        ));
    }

    #[test]
    fn test_resolve_nested_value() {
        let data = json!({"metadata": {"author": "Jane"}, "items": [{"name": "x"}]});

        let author = resolve_path(&data, &PathExpr::parse("metadata.author").unwrap()).unwrap();
        assert_eq!(author, Some(&json!("Jane")));

        let name = resolve_path(&data, &PathExpr::parse("items[0].name").unwrap()).unwrap();
        assert_eq!(name, Some(&json!("x")));
    }

    #[test]
    fn test_resolve_missing_is_none() {
        let data = json!({"metadata": {"author": "Jane"}, "items": []});

        assert_eq!(
            resolve_path(&data, &PathExpr::parse("metadata.editor").unwrap()).unwrap(),
            None
        );
        assert_eq!(
            resolve_path(&data, &PathExpr::parse("items[3].name").unwrap()).unwrap(),
            None
        );
        assert_eq!(
            resolve_path(&data, &PathExpr::parse("missing.deep.key").unwrap()).unwrap(),
            None
        );
    }

    #[test]
    fn test_resolve_into_scalar_is_error() {
        let data = json!({"title": "hello"});

        let err = resolve_path(&data, &PathExpr::parse("title.length").unwrap()).unwrap_err();
        assert!(matches!(err, PathError::TypeMismatch { found: "string", .. }));
        assert!(err.to_string().contains("title.length"));

        let err = resolve_path(&data, &PathExpr::parse("title[0]").unwrap()).unwrap_err();
        assert!(matches!(err, PathError::TypeMismatch { .. }));
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut data = json!({"title": "hello"});

        set_path(&mut data, &PathExpr::parse("metadata.author").unwrap(), json!("John")).unwrap();

        assert_eq!(data, json!({"title": "hello", "metadata": {"author": "John"}}));
    }

    #[test]
    fn test_set_array_element_and_append() {
        let mut data = json!({"tags": ["a", "b"]});

        set_path(&mut data, &PathExpr::parse("tags[1]").unwrap(), json!("B")).unwrap();
        set_path(&mut data, &PathExpr::parse("tags[2]").unwrap(), json!("c")).unwrap();

        assert_eq!(data, json!({"tags": ["a", "B", "c"]}));

        let err =
            set_path(&mut data, &PathExpr::parse("tags[9]").unwrap(), json!("z")).unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfRange { index: 9, len: 3, .. }));
    }
}
