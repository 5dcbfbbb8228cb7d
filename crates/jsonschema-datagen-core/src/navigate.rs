//! JSONPath-like lookup of sub-schemas.
//!
//! Paths address the *data* shape and are mapped onto schema keywords:
//!
//! | Path          | Schema location                                   |
//! |---------------|---------------------------------------------------|
//! | `$`           | the root schema                                   |
//! | `$.user.name` | `properties.user.properties.name`                 |
//! | `$.tags[0]`   | the schema for position 0 (tuple or homogeneous)  |
//! | `$.tags[*]`   | the schema shared by all (overflow) items         |

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::GenerateError;

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$|\.(\w+)|\[(\d+|\*)\]").expect("path segment regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Property(String),
    Index(usize),
    Wildcard,
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Property(name) => write!(f, ".{name}"),
            Segment::Index(i) => write!(f, "[{i}]"),
            Segment::Wildcard => f.write_str("[*]"),
        }
    }
}

/// Read-only view over one schema answering path queries.
///
/// ```
/// use jsonschema_datagen_core::SchemaNavigator;
/// use serde_json::json;
///
/// let schema = json!({
///     "type": "object",
///     "properties": {
///         "tags": { "type": "array", "items": { "type": "string" } }
///     }
/// });
/// let navigator = SchemaNavigator::new(schema);
/// assert_eq!(navigator.schema("$.tags[*]").unwrap(), json!({ "type": "string" }));
/// assert!(!navigator.has_path("$.missing"));
/// ```
#[derive(Debug, Clone)]
pub struct SchemaNavigator {
    root: Value,
}

impl SchemaNavigator {
    pub fn new(schema: Value) -> Self {
        Self { root: schema }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Owned copy of the sub-schema at `path`.
    pub fn schema(&self, path: &str) -> Result<Value, GenerateError> {
        let segments = parse_path(path)?;
        let mut current = &self.root;
        for segment in &segments {
            let next = match segment {
                Segment::Property(name) => property(current, name),
                Segment::Index(i) => position(current, *i),
                Segment::Wildcard => all_items(current),
            };
            current = next.ok_or_else(|| GenerateError::InvalidPath {
                path: path.to_string(),
                message: format!("no schema at segment {segment}"),
            })?;
        }
        Ok(current.clone())
    }

    /// Like [`schema`](Self::schema), with every failure mapped to `None`.
    pub fn find(&self, path: &str) -> Option<Value> {
        self.schema(path).ok()
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.find(path).is_some()
    }
}

fn parse_path(path: &str) -> Result<Vec<Segment>, GenerateError> {
    let invalid = |message: String| GenerateError::InvalidPath {
        path: path.to_string(),
        message,
    };

    if !path.starts_with('$') {
        return Err(invalid("path must start with '$'".to_string()));
    }

    let mut segments = Vec::new();
    let mut last_end = 0;
    for caps in SEGMENT_RE.captures_iter(path) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() != last_end {
            return Err(invalid(format!("invalid syntax at offset {last_end}")));
        }
        last_end = whole.end();

        if let Some(name) = caps.get(1) {
            segments.push(Segment::Property(name.as_str().to_string()));
        } else if let Some(index) = caps.get(2) {
            let segment = match index.as_str() {
                "*" => Segment::Wildcard,
                digits => digits
                    .parse()
                    .map(Segment::Index)
                    .map_err(|e| invalid(format!("bad index {digits}: {e}")))?,
            };
            segments.push(segment);
        }
    }

    if last_end != path.len() {
        return Err(invalid(format!("invalid syntax at offset {last_end}")));
    }
    Ok(segments)
}

fn property<'v>(schema: &'v Value, name: &str) -> Option<&'v Value> {
    schema.get("properties")?.get(name)
}

/// Schema for position `index`: prefix, then tail, then homogeneous items.
fn position(schema: &Value, index: usize) -> Option<&Value> {
    let items = schema.get("items");

    if let Some(prefix) = schema.get("prefixItems") {
        if let Some(positional) = prefix.as_array().and_then(|p| p.get(index)) {
            return Some(positional);
        }
        if let Some(tail) = items.filter(|i| !i.is_array()) {
            return Some(tail);
        }
    }

    match items {
        Some(Value::Array(tuple)) => tuple.get(index).or_else(|| additional_items(schema)),
        Some(homogeneous) => Some(homogeneous),
        None => None,
    }
}

/// Schema shared by all items beyond any positional prefix.
fn all_items(schema: &Value) -> Option<&Value> {
    match schema.get("items") {
        Some(Value::Array(_)) => additional_items(schema),
        Some(items) => Some(items),
        None => None,
    }
}

fn additional_items(schema: &Value) -> Option<&Value> {
    schema.get("additionalItems").filter(|v| !v.is_boolean())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn navigator() -> SchemaNavigator {
        SchemaNavigator::new(json!({
            "type": "object",
            "properties": {
                "user": {
                    "type": "object",
                    "properties": { "name": { "type": "string" } }
                },
                "tags": { "type": "array", "items": { "type": "string", "format": "email" } },
                "pair": {
                    "type": "array",
                    "prefixItems": [{ "type": "integer" }, { "type": "boolean" }],
                    "items": { "type": "null" }
                },
                "legacy": {
                    "type": "array",
                    "items": [{ "const": "a" }],
                    "additionalItems": { "const": "z" }
                },
                "closed": {
                    "type": "array",
                    "items": [{ "const": "a" }],
                    "additionalItems": false
                }
            }
        }))
    }

    #[test]
    fn test_root() {
        let nav = navigator();
        assert_eq!(nav.schema("$").unwrap(), *nav.root());
    }

    #[test]
    fn test_nested_property() {
        assert_eq!(
            navigator().schema("$.user.name").unwrap(),
            json!({ "type": "string" })
        );
    }

    #[test]
    fn test_homogeneous_items() {
        let nav = navigator();
        let expected = json!({ "type": "string", "format": "email" });
        assert_eq!(nav.schema("$.tags[*]").unwrap(), expected);
        assert_eq!(nav.schema("$.tags[7]").unwrap(), expected);
    }

    #[test]
    fn test_prefix_items() {
        let nav = navigator();
        assert_eq!(nav.schema("$.pair[1]").unwrap(), json!({ "type": "boolean" }));
        assert_eq!(nav.schema("$.pair[2]").unwrap(), json!({ "type": "null" }));
        assert_eq!(nav.schema("$.pair[*]").unwrap(), json!({ "type": "null" }));
    }

    #[test]
    fn test_legacy_tuple() {
        let nav = navigator();
        assert_eq!(nav.schema("$.legacy[0]").unwrap(), json!({ "const": "a" }));
        assert_eq!(nav.schema("$.legacy[3]").unwrap(), json!({ "const": "z" }));
        assert_eq!(nav.schema("$.legacy[*]").unwrap(), json!({ "const": "z" }));
        assert!(!nav.has_path("$.closed[1]"));
        assert!(!nav.has_path("$.closed[*]"));
    }

    #[test]
    fn test_missing_segment() {
        let err = navigator().schema("$.user.age").unwrap_err();
        match err {
            GenerateError::InvalidPath { path, message } => {
                assert_eq!(path, "$.user.age");
                assert!(message.contains(".age"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(navigator().find("$.user.age"), None);
    }

    #[test]
    fn test_syntax_errors() {
        let nav = navigator();
        for bad in [
            "user.name",
            "",
            "$.user..name",
            "$.tags[x]",
            "$.user-name",
            "$.tags[0",
            "$.user$.name",
            "$$",
        ] {
            assert!(
                matches!(nav.schema(bad), Err(GenerateError::InvalidPath { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(
            parse_path("$.a[0][*].b").unwrap(),
            vec![
                Segment::Property("a".to_string()),
                Segment::Index(0),
                Segment::Wildcard,
                Segment::Property("b".to_string()),
            ]
        );
        assert!(parse_path("$").unwrap().is_empty());
    }
}
