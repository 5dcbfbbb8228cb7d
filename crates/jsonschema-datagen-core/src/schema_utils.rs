//! JSON Pointer helpers and the keyword table shared by schema walkers.
//!
//! Two concerns live here:
//! 1. **JSON Pointer** (RFC 6901) escaping, splitting and resolution for
//!    local `$ref` targets and error paths
//! 2. **Child traversal** over every keyword that holds a sub-schema, so the
//!    flattener and `$ref` scanning agree on what counts as a schema position

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::error::GenerateError;

/// Keywords whose value is a map from names to schemas.
pub const MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "$defs",
    "definitions",
    "dependentSchemas",
];

/// Keywords whose value is a single schema.
pub const SINGLE_KEYWORDS: &[&str] = &[
    "additionalProperties",
    "unevaluatedProperties",
    "propertyNames",
    "unevaluatedItems",
    "additionalItems",
    "contains",
    "not",
    "if",
    "then",
    "else",
];

/// Keywords whose value is a list of schemas.
pub const ARRAY_KEYWORDS: &[&str] = &["anyOf", "oneOf", "allOf", "prefixItems"];

// ---------------------------------------------------------------------------
// JSON Pointer
// ---------------------------------------------------------------------------

/// Escape one segment: `~` becomes `~0`, `/` becomes `~1`.
pub fn escape_pointer_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains('~') || segment.contains('/') {
        Cow::Owned(segment.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Reverse of [`escape_pointer_segment`]. `~1` is decoded before `~0`.
pub fn unescape_pointer_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains("~0") || segment.contains("~1") {
        Cow::Owned(segment.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Append escaped segments to a pointer.
///
/// ```
/// use jsonschema_datagen_core::schema_utils::build_path;
/// assert_eq!(build_path("#", &["properties", "a/b"]), "#/properties/a~1b");
/// ```
pub fn build_path(parent: &str, segments: &[&str]) -> String {
    let mut path = parent.to_string();
    for segment in segments {
        path.push('/');
        path.push_str(&escape_pointer_segment(segment));
    }
    path
}

/// Split a pointer (with or without the leading `#`) into decoded segments.
///
/// ```
/// use jsonschema_datagen_core::schema_utils::split_path;
/// assert_eq!(split_path("#/$defs/a~1b"), vec!["$defs", "a/b"]);
/// assert!(split_path("#").is_empty());
/// ```
pub fn split_path(path: &str) -> Vec<String> {
    let stripped = path.strip_prefix('#').unwrap_or(path);
    if stripped.is_empty() {
        return Vec::new();
    }

    let mut segments = stripped.split('/');
    // "/a" splits into ["", "a"]; the first empty piece is the root.
    if stripped.starts_with('/') {
        segments.next();
    }

    segments
        .map(|s| unescape_pointer_segment(s).into_owned())
        .collect()
}

/// True for `#` and `#/...` references, the only form resolved in-document.
pub fn is_local_ref(reference: &str) -> bool {
    reference == "#" || reference.starts_with("#/")
}

/// Resolve a local reference against `root`, borrowing the target.
///
/// Returns `None` for non-local references and for pointers that walk off
/// the document.
pub fn resolve_pointer<'v>(root: &'v Value, reference: &str) -> Option<&'v Value> {
    if !is_local_ref(reference) {
        return None;
    }
    let mut current = root;
    for segment in split_path(reference) {
        current = match current {
            Value::Object(obj) => obj.get(&segment)?,
            Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

// ---------------------------------------------------------------------------
// Child traversal
// ---------------------------------------------------------------------------

/// Rebuild every sub-schema of `obj` through `walk_fn`.
///
/// `walk_fn` receives each child by value together with its pointer path and
/// returns the replacement. Values that are not schema-shaped for their
/// keyword (`additionalProperties: false`, `items: true`, `anyOf: 42`) are
/// kept as they are.
pub fn rebuild_children<F>(
    obj: &mut Map<String, Value>,
    path: &str,
    walk_fn: &mut F,
) -> Result<(), GenerateError>
where
    F: FnMut(Value, &str) -> Result<Value, GenerateError>,
{
    for &keyword in MAP_KEYWORDS {
        if let Some(Value::Object(map)) = obj.get_mut(keyword) {
            for (name, child) in map.iter_mut() {
                let child_path = build_path(path, &[keyword, name]);
                *child = walk_fn(child.take(), &child_path)?;
            }
        }
    }

    for &keyword in SINGLE_KEYWORDS {
        if let Some(child) = obj.get_mut(keyword) {
            if child.is_object() {
                let child_path = build_path(path, &[keyword]);
                *child = walk_fn(child.take(), &child_path)?;
            }
        }
    }

    for &keyword in ARRAY_KEYWORDS {
        if let Some(Value::Array(children)) = obj.get_mut(keyword) {
            for (i, child) in children.iter_mut().enumerate() {
                let child_path = build_path(path, &[keyword, &i.to_string()]);
                *child = walk_fn(child.take(), &child_path)?;
            }
        }
    }

    if let Some(items) = obj.get_mut("items") {
        match items {
            Value::Object(_) => {
                let child_path = build_path(path, &["items"]);
                *items = walk_fn(items.take(), &child_path)?;
            }
            Value::Array(children) => {
                for (i, child) in children.iter_mut().enumerate() {
                    let child_path = build_path(path, &["items", &i.to_string()]);
                    *child = walk_fn(child.take(), &child_path)?;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// True if any `$ref` remains outside `$defs`/`definitions`.
pub fn has_refs_outside_defs(value: &Value) -> bool {
    match value {
        Value::Object(obj) => obj.iter().any(|(key, child)| match key.as_str() {
            "$ref" => true,
            "$defs" | "definitions" => false,
            _ => has_refs_outside_defs(child),
        }),
        Value::Array(arr) => arr.iter().any(has_refs_outside_defs),
        _ => false,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // --- Escaping ---

    #[test]
    fn test_escape_borrows_when_clean() {
        let result = escape_pointer_segment("foo");
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_special() {
        assert_eq!(escape_pointer_segment("a/b~c"), "a~1b~0c");
    }

    #[test]
    fn test_unescape_order() {
        // "~01" is an escaped "~1", not an escaped "/"
        assert_eq!(unescape_pointer_segment("~01"), "~1");
        assert_eq!(unescape_pointer_segment("a~0b~1c"), "a~b/c");
    }

    #[test]
    fn test_build_path() {
        assert_eq!(build_path("#", &[]), "#");
        assert_eq!(build_path("#/properties", &["x"]), "#/properties/x");
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("#/properties/a~1b/items"), vec!["properties", "a/b", "items"]);
        assert_eq!(split_path("/properties/x"), vec!["properties", "x"]);
        assert_eq!(split_path("#/"), vec![""]);
    }

    // --- Resolution ---

    #[test]
    fn test_resolve_pointer() {
        let root = json!({
            "$defs": {
                "a/b": { "type": "string" },
                "list": [{ "type": "integer" }, { "type": "boolean" }]
            }
        });
        assert_eq!(
            resolve_pointer(&root, "#/$defs/a~1b"),
            Some(&json!({ "type": "string" }))
        );
        assert_eq!(
            resolve_pointer(&root, "#/$defs/list/1"),
            Some(&json!({ "type": "boolean" }))
        );
        assert_eq!(resolve_pointer(&root, "#"), Some(&root));
    }

    #[test]
    fn test_resolve_pointer_misses() {
        let root = json!({ "$defs": { "a": {} } });
        assert_eq!(resolve_pointer(&root, "#/$defs/missing"), None);
        assert_eq!(resolve_pointer(&root, "#/$defs/a/0"), None);
        assert_eq!(resolve_pointer(&root, "other.json#/a"), None);
        assert_eq!(resolve_pointer(&root, "#anchor"), None);
    }

    // --- Traversal ---

    #[test]
    fn test_rebuild_visits_all_schema_positions() {
        let mut schema = json!({
            "properties": { "a": {} },
            "patternProperties": { "^x-": {} },
            "additionalProperties": {},
            "propertyNames": {},
            "items": {},
            "prefixItems": [{}],
            "additionalItems": {},
            "contains": {},
            "anyOf": [{}],
            "oneOf": [{}],
            "allOf": [{}],
            "if": {},
            "then": {},
            "else": {},
            "not": {},
            "$defs": { "A": {} },
            "definitions": { "B": {} },
            "dependentSchemas": { "a": {} },
            "unevaluatedProperties": {},
            "unevaluatedItems": {}
        });
        let obj = schema.as_object_mut().unwrap();
        let mut paths = Vec::new();

        rebuild_children(obj, "#", &mut |value, path| {
            paths.push(path.to_string());
            Ok(value)
        })
        .unwrap();

        assert_eq!(paths.len(), 20);
        assert!(paths.contains(&"#/patternProperties/^x-".to_string()));
        assert!(paths.contains(&"#/prefixItems/0".to_string()));
    }

    #[test]
    fn test_rebuild_keeps_non_schema_values() {
        let mut schema = json!({
            "additionalProperties": false,
            "items": true,
            "anyOf": "invalid"
        });
        let obj = schema.as_object_mut().unwrap();
        let mut calls = 0;

        rebuild_children(obj, "#", &mut |value, _| {
            calls += 1;
            Ok(value)
        })
        .unwrap();

        assert_eq!(calls, 0);
        assert_eq!(obj["additionalProperties"], json!(false));
        assert_eq!(obj["items"], json!(true));
        assert_eq!(obj["anyOf"], json!("invalid"));
    }

    #[test]
    fn test_rebuild_replaces_children() {
        let mut schema = json!({ "items": [{ "type": "string" }, { "type": "integer" }] });
        let obj = schema.as_object_mut().unwrap();

        rebuild_children(obj, "#", &mut |_, path| Ok(json!({ "const": path })))
            .unwrap();

        assert_eq!(
            schema,
            json!({ "items": [{ "const": "#/items/0" }, { "const": "#/items/1" }] })
        );
    }

    #[test]
    fn test_has_refs_outside_defs() {
        assert!(!has_refs_outside_defs(&json!({
            "$defs": { "a": { "$ref": "#/$defs/a" } },
            "type": "string"
        })));
        assert!(has_refs_outside_defs(&json!({
            "properties": { "x": { "$ref": "#/$defs/a" } }
        })));
    }
}
