//! Schema flattening: `$ref` inlining and `allOf` merging.
//!
//! Runs before generation so the generator sees one self-contained tree.
//!
//! 1. **Reference resolution.** Every local `$ref` (`#` or `#/...`) is
//!    replaced by a resolved copy of its target, with sibling keywords
//!    overlaid on top. A `$ref` met while its own target is still being
//!    expanded is recursive: it is kept as is (or replaced by `{}`, per
//!    [`CircularRefOption`]) and the generator's recursion cap terminates it.
//! 2. **Composition merge.** `allOf` branches and their sibling keywords are
//!    folded bottom-up into a single schema.
//! 3. **Cleanup.** `$defs` / `definitions` are dropped once nothing outside
//!    them refers back in.
//!
//! ## Limitations
//!
//! - Only root-relative JSON Pointers are resolved. `$id`/`$anchor` scoping
//!   and remote documents are treated as missing references.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::{Map, Value};

use crate::config::{AllOfOption, CircularRefOption, FlattenOptions, MissingRefOption};
use crate::error::GenerateError;
use crate::schema_utils::{build_path, has_refs_outside_defs, rebuild_children, resolve_pointer};

/// Keywords whose merged value is the larger of the two.
const LOWER_BOUNDS: &[&str] = &[
    "minimum",
    "exclusiveMinimum",
    "minLength",
    "minItems",
    "minProperties",
    "minContains",
];

/// Keywords whose merged value is the smaller of the two.
const UPPER_BOUNDS: &[&str] = &[
    "maximum",
    "exclusiveMaximum",
    "maxLength",
    "maxItems",
    "maxProperties",
    "maxContains",
];

/// Flatten a raw schema.
///
/// ```
/// use jsonschema_datagen_core::{flatten, FlattenOptions};
/// use serde_json::json;
///
/// let raw = json!({
///     "properties": { "id": { "$ref": "#/$defs/Id" } },
///     "$defs": { "Id": { "type": "string", "format": "uuid" } }
/// });
/// let flat = flatten(&raw, &FlattenOptions::default()).unwrap();
/// assert_eq!(
///     flat,
///     json!({ "properties": { "id": { "type": "string", "format": "uuid" } } })
/// );
/// ```
pub fn flatten(raw: &Value, options: &FlattenOptions) -> Result<Value, GenerateError> {
    let mut ctx = RefContext {
        root: raw,
        options,
        visiting: HashSet::new(),
    };
    let resolved = resolve_refs(raw.clone(), "#", 0, &mut ctx)?;

    let merged = match options.all_of {
        AllOfOption::Merge => merge_compositions(resolved, "#", 0, options)?,
        AllOfOption::Skip => resolved,
    };

    Ok(strip_definitions(merged))
}

/// [`flatten`] over schema text.
pub fn flatten_str(json: &str, options: &FlattenOptions) -> Result<Value, GenerateError> {
    let raw: Value = serde_json::from_str(json)?;
    flatten(&raw, options)
}

// ---------------------------------------------------------------------------
// Phase 1: $ref resolution via DFS with cycle detection
// ---------------------------------------------------------------------------

struct RefContext<'a> {
    root: &'a Value,
    options: &'a FlattenOptions,
    /// References currently being expanded on this path.
    visiting: HashSet<String>,
}

fn check_depth(path: &str, depth: usize, options: &FlattenOptions) -> Result<(), GenerateError> {
    if depth > options.max_depth {
        return Err(GenerateError::RecursionDepthExceeded {
            path: path.to_string(),
            max_depth: options.max_depth,
        });
    }
    Ok(())
}

fn resolve_refs(
    node: Value,
    path: &str,
    depth: usize,
    ctx: &mut RefContext<'_>,
) -> Result<Value, GenerateError> {
    check_depth(path, depth, ctx.options)?;

    let Value::Object(mut obj) = node else {
        return Ok(node);
    };

    if let Some(reference) = obj.get("$ref").and_then(Value::as_str).map(str::to_string) {
        return resolve_single_ref(obj, &reference, path, depth, ctx);
    }

    resolve_children(&mut obj, path, depth, ctx)?;
    Ok(Value::Object(obj))
}

fn resolve_children(
    obj: &mut Map<String, Value>,
    path: &str,
    depth: usize,
    ctx: &mut RefContext<'_>,
) -> Result<(), GenerateError> {
    rebuild_children(obj, path, &mut |child, child_path| {
        resolve_refs(child, child_path, depth + 1, ctx)
    })
}

fn resolve_single_ref(
    mut obj: Map<String, Value>,
    reference: &str,
    path: &str,
    depth: usize,
    ctx: &mut RefContext<'_>,
) -> Result<Value, GenerateError> {
    if ctx.visiting.contains(reference) {
        return Ok(match ctx.options.on_circular {
            CircularRefOption::Resolve => {
                tracing::debug!(path, reference, "recursive $ref left for the generator");
                Value::Object(obj)
            }
            CircularRefOption::Skip => Value::Object(Map::new()),
        });
    }

    let Some(target) = resolve_pointer(ctx.root, reference) else {
        return match ctx.options.on_missing {
            MissingRefOption::Skip => {
                tracing::debug!(path, reference, "unresolvable $ref left in place");
                resolve_children(&mut obj, path, depth, ctx)?;
                Ok(Value::Object(obj))
            }
            MissingRefOption::Fail => Err(GenerateError::UnresolvableRef {
                path: path.to_string(),
                reference: reference.to_string(),
            }),
        };
    };

    // Chained refs (A -> B -> C) resolve through the recursive call.
    ctx.visiting.insert(reference.to_string());
    let resolved = resolve_refs(target.clone(), path, depth + 1, ctx);
    ctx.visiting.remove(reference);
    let resolved = resolved?;

    obj.shift_remove("$ref");
    if obj.is_empty() {
        return Ok(resolved);
    }
    resolve_children(&mut obj, path, depth, ctx)?;

    let mut merged = match resolved {
        Value::Object(m) => m,
        Value::Bool(true) => Map::new(),
        Value::Bool(false) => Map::from_iter([("not".to_string(), Value::Object(Map::new()))]),
        other => Map::from_iter([("const".to_string(), other)]),
    };
    // Site-specific keywords win over the definition.
    for (key, value) in obj {
        merged.insert(key, value);
    }
    Ok(Value::Object(merged))
}

// ---------------------------------------------------------------------------
// Phase 2: allOf merge
// ---------------------------------------------------------------------------

fn merge_compositions(
    node: Value,
    path: &str,
    depth: usize,
    options: &FlattenOptions,
) -> Result<Value, GenerateError> {
    check_depth(path, depth, options)?;

    let Value::Object(mut obj) = node else {
        return Ok(node);
    };

    // Bottom-up: branches are flat before they are merged.
    rebuild_children(&mut obj, path, &mut |child, child_path| {
        merge_compositions(child, child_path, depth + 1, options)
    })?;

    let branches = match obj.shift_remove("allOf") {
        Some(Value::Array(branches)) => branches,
        Some(other) => {
            obj.insert("allOf".to_string(), other);
            return Ok(Value::Object(obj));
        }
        None => return Ok(Value::Object(obj)),
    };

    // Sibling keywords act as an implicit first branch.
    let mut acc = Value::Object(obj);
    for branch in branches {
        acc = merge_two(acc, branch, path)?;
    }
    Ok(acc)
}

/// Merge two schemas. `overlay` wins on keywords without merge rules.
fn merge_two(base: Value, overlay: Value, path: &str) -> Result<Value, GenerateError> {
    // `false` admits nothing, so nothing can loosen it.
    if base == Value::Bool(false) || overlay == Value::Bool(false) {
        return Ok(Value::Bool(false));
    }
    let mut result = match base {
        Value::Object(m) => m,
        _ => return Ok(overlay),
    };
    let Value::Object(overlay) = overlay else {
        return Ok(Value::Object(result));
    };

    for (key, value) in overlay {
        match key.as_str() {
            "properties" => merge_properties(&mut result, value, path)?,
            "required" => merge_required(&mut result, value),
            "type" => intersect_type(&mut result, value, path)?,
            "const" => {
                if let Some(existing) = result.get("const") {
                    if *existing != value {
                        return Err(GenerateError::Schema {
                            path: path.to_string(),
                            message: format!("allOf const conflict: {existing} vs {value}"),
                        });
                    }
                }
                result.insert(key, value);
            }
            "enum" => intersect_enum(&mut result, value),
            "additionalProperties" => merge_additional_properties(&mut result, value, path)?,
            "items" => merge_items(&mut result, value, path)?,
            k if LOWER_BOUNDS.contains(&k) => tighten(&mut result, key, value, Ordering::Greater),
            k if UPPER_BOUNDS.contains(&k) => tighten(&mut result, key, value, Ordering::Less),
            _ => {
                result.insert(key, value);
            }
        }
    }

    Ok(Value::Object(result))
}

/// Shared property names merge recursively; new names are appended.
fn merge_properties(
    result: &mut Map<String, Value>,
    overlay: Value,
    path: &str,
) -> Result<(), GenerateError> {
    let Value::Object(overlay) = overlay else {
        return Ok(());
    };
    let base = result
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(base) = base.as_object_mut() else {
        return Ok(());
    };
    for (name, schema) in overlay {
        match base.get_mut(&name) {
            Some(existing) => {
                let prop_path = build_path(path, &["properties", &name]);
                *existing = merge_two(existing.take(), schema, &prop_path)?;
            }
            None => {
                base.insert(name, schema);
            }
        }
    }
    Ok(())
}

fn merge_required(result: &mut Map<String, Value>, overlay: Value) {
    let Value::Array(overlay) = overlay else {
        return;
    };
    let base = result
        .entry("required")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Some(base) = base.as_array_mut() else {
        return;
    };
    let mut seen: HashSet<String> = base
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();
    for name in overlay {
        if let Some(s) = name.as_str() {
            if seen.insert(s.to_string()) {
                base.push(name);
            }
        }
    }
}

/// Intersect `type`, treating `integer` as a subtype of `number`.
fn intersect_type(
    result: &mut Map<String, Value>,
    overlay: Value,
    path: &str,
) -> Result<(), GenerateError> {
    let Some(existing) = result.get("type") else {
        result.insert("type".to_string(), overlay);
        return Ok(());
    };

    let base_types = type_names(existing);
    let overlay_types = type_names(&overlay);
    if base_types.is_empty() || overlay_types.is_empty() {
        result.insert("type".to_string(), overlay);
        return Ok(());
    }

    let mut common: Vec<&str> = Vec::new();
    for &ty in &base_types {
        let shared = if overlay_types.contains(&ty) {
            Some(ty)
        } else if (ty == "number" && overlay_types.contains(&"integer"))
            || (ty == "integer" && overlay_types.contains(&"number"))
        {
            Some("integer")
        } else {
            None
        };
        if let Some(shared) = shared {
            if !common.contains(&shared) {
                common.push(shared);
            }
        }
    }
    if common.contains(&"integer") {
        common.retain(|ty| *ty != "number");
    }

    let merged = match common.as_slice() {
        [] => {
            return Err(GenerateError::Schema {
                path: path.to_string(),
                message: format!(
                    "allOf type conflict: no common type between {base_types:?} and {overlay_types:?}"
                ),
            });
        }
        [single] => Value::String((*single).to_string()),
        many => Value::Array(many.iter().map(|ty| Value::String((*ty).to_string())).collect()),
    };
    result.insert("type".to_string(), merged);
    Ok(())
}

fn type_names(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(types) => types.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Keep only `enum` values listed by both sides.
fn intersect_enum(result: &mut Map<String, Value>, overlay: Value) {
    let Value::Array(overlay) = overlay else {
        return;
    };
    let Some(Value::Array(base)) = result.get("enum") else {
        result.insert("enum".to_string(), Value::Array(overlay));
        return;
    };
    let intersection: Vec<Value> = base
        .iter()
        .filter(|v| overlay.contains(v))
        .cloned()
        .collect();
    result.insert("enum".to_string(), Value::Array(intersection));
}

/// Replace a numeric bound when the overlay compares as `keep` against it.
fn tighten(result: &mut Map<String, Value>, key: String, overlay: Value, keep: Ordering) {
    if let Some(existing) = result.get(&key) {
        if let Some(order) = compare_numbers(&overlay, existing) {
            if order == keep {
                result.insert(key, overlay);
            }
            return;
        }
    }
    result.insert(key, overlay);
}

fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    let parse = |v: &Value| {
        v.as_number()
            .and_then(|n| BigDecimal::from_str(&n.to_string()).ok())
    };
    Some(parse(a)?.cmp(&parse(b)?))
}

/// `false` wins, a schema beats `true`, two schemas merge.
fn merge_additional_properties(
    result: &mut Map<String, Value>,
    overlay: Value,
    path: &str,
) -> Result<(), GenerateError> {
    let Some(existing) = result.get_mut("additionalProperties") else {
        result.insert("additionalProperties".to_string(), overlay);
        return Ok(());
    };

    let child_path = build_path(path, &["additionalProperties"]);
    *existing = match (existing.take(), overlay) {
        (Value::Bool(false), _) | (_, Value::Bool(false)) => Value::Bool(false),
        (schema @ Value::Object(_), Value::Bool(true)) => schema,
        (base @ Value::Object(_), overlay @ Value::Object(_)) => {
            merge_two(base, overlay, &child_path)?
        }
        (_, overlay) => overlay,
    };
    Ok(())
}

fn merge_items(
    result: &mut Map<String, Value>,
    overlay: Value,
    path: &str,
) -> Result<(), GenerateError> {
    match result.get_mut("items") {
        Some(existing) if existing.is_object() && overlay.is_object() => {
            let child_path = build_path(path, &["items"]);
            *existing = merge_two(existing.take(), overlay, &child_path)?;
        }
        Some(existing) => *existing = overlay,
        None => {
            result.insert("items".to_string(), overlay);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Phase 3: cleanup
// ---------------------------------------------------------------------------

fn strip_definitions(schema: Value) -> Value {
    if has_refs_outside_defs(&schema) {
        return schema;
    }
    let Value::Object(mut obj) = schema else {
        return schema;
    };
    obj.shift_remove("$defs");
    obj.shift_remove("definitions");
    Value::Object(obj)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
