//! Array construction.
//!
//! Shapes are tried in this order: `prefixItems` tuples, legacy `items: [..]`
//! tuples, `contains`, homogeneous `items`, and finally the empty array.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{Map, Value};

use super::{Engine, ANY_SCHEMA};
use crate::config::{ArrayOption, ContainsOption, UniqueItemsOption};
use crate::recursion::RecursionTracker;
use crate::synth::usize_keyword;

/// Extra length `ArrayOption::Random` may add on top of `minItems`.
const RANDOM_LENGTH_SPAN: usize = 10;

/// Candidates drawn per requested element when `uniqueItems` is enforced.
const UNIQUE_ATTEMPTS_PER_ITEM: usize = 10;

impl<'a> Engine<'a> {
    pub(super) fn array(
        &mut self,
        obj: &'a Map<String, Value>,
        tracker: &mut RecursionTracker,
    ) -> Value {
        let min_items = usize_keyword(obj, "minItems").unwrap_or(0);

        if let Some(Value::Array(prefix)) = obj.get("prefixItems") {
            let tail = match obj.get("items") {
                Some(items) if !items.is_array() => overflow_schema(items),
                _ => obj.get("additionalItems").and_then(overflow_schema),
            };
            return Value::Array(self.positional(prefix, tail, min_items, tracker));
        }

        if let Some(Value::Array(prefix)) = obj.get("items") {
            let tail = obj.get("additionalItems").and_then(overflow_schema);
            return Value::Array(self.positional(prefix, tail, min_items, tracker));
        }

        if self.policy.contains != ContainsOption::None {
            if let Some(contains) = obj.get("contains") {
                return Value::Array(self.with_contains(obj, contains, tracker));
            }
        }

        match obj.get("items") {
            None | Some(Value::Bool(false)) => Value::Array(Vec::new()),
            Some(items) => {
                let items = overflow_schema(items).unwrap_or(items);
                Value::Array(self.homogeneous(obj, items, tracker))
            }
        }
    }

    /// One value per positional schema, then `tail` values up to `min_items`.
    fn positional(
        &mut self,
        prefix: &'a [Value],
        tail: Option<&'a Value>,
        min_items: usize,
        tracker: &mut RecursionTracker,
    ) -> Vec<Value> {
        let mut out: Vec<Value> = prefix
            .iter()
            .map(|schema| self.generate(schema, tracker))
            .collect();

        if let Some(tail) = tail {
            while out.len() < min_items {
                out.push(self.generate(tail, tracker));
            }
        }
        out
    }

    fn with_contains(
        &mut self,
        obj: &'a Map<String, Value>,
        contains: &'a Value,
        tracker: &mut RecursionTracker,
    ) -> Vec<Value> {
        let items = obj.get("items");
        let min_contains = usize_keyword(obj, "minContains").unwrap_or(1);
        let max_contains = usize_keyword(obj, "maxContains").unwrap_or(usize::MAX);
        let min_items = usize_keyword(obj, "minItems").unwrap_or(min_contains);
        let max_items = usize_keyword(obj, "maxItems").unwrap_or(usize::MAX);

        let option = self.sizing_option(items.is_some_and(is_primitive));
        let target = self.array_len(option, min_items, max_items).max(min_contains);
        let match_count = min_contains.max(1).min(max_contains).min(target);

        let mut matches: Vec<Value> = (0..match_count)
            .map(|_| self.generate(contains, tracker))
            .collect();

        let regular_schema = match items {
            None | Some(Value::Bool(false)) => None,
            Some(items) => Some(overflow_schema(items).unwrap_or(items)),
        };
        let mut regulars: Vec<Value> = match regular_schema {
            Some(schema) => (match_count..target)
                .map(|_| self.generate(schema, tracker))
                .collect(),
            None => Vec::new(),
        };

        match self.policy.contains {
            ContainsOption::Last => {
                regulars.append(&mut matches);
                regulars
            }
            ContainsOption::Random | ContainsOption::Distribute => {
                matches.append(&mut regulars);
                matches.shuffle(&mut *self.rng);
                matches
            }
            ContainsOption::None | ContainsOption::First => {
                matches.append(&mut regulars);
                matches
            }
        }
    }

    fn homogeneous(
        &mut self,
        obj: &'a Map<String, Value>,
        items: &'a Value,
        tracker: &mut RecursionTracker,
    ) -> Vec<Value> {
        let min_items = usize_keyword(obj, "minItems").unwrap_or(0);
        let max_items = usize_keyword(obj, "maxItems").unwrap_or(usize::MAX);
        let option = self.sizing_option(is_primitive(items));
        let target = self.array_len(option, min_items, max_items);

        let unique = self.policy.unique_items == UniqueItemsOption::Enforce
            && obj.get("uniqueItems").and_then(Value::as_bool) == Some(true);
        if !unique {
            return (0..target).map(|_| self.generate(items, tracker)).collect();
        }

        let mut out = Vec::with_capacity(target);
        let mut seen = HashSet::new();
        let max_attempts = target.saturating_mul(UNIQUE_ATTEMPTS_PER_ITEM);
        let mut attempts = 0;
        while out.len() < target && attempts < max_attempts {
            let value = self.generate(items, tracker);
            if seen.insert(value.to_string()) {
                out.push(value);
            }
            attempts += 1;
        }

        if out.len() < target {
            tracing::warn!(
                target_len = target,
                generated = out.len(),
                "uniqueItems: attempt budget exhausted before reaching target length"
            );
        }
        out
    }

    /// The sizing slot for an element schema: primitives use their own.
    fn sizing_option(&self, primitive: bool) -> ArrayOption {
        if primitive {
            self.policy.primitive_array.into()
        } else {
            self.policy.array
        }
    }

    fn array_len(&mut self, option: ArrayOption, min_items: usize, max_items: usize) -> usize {
        match option {
            ArrayOption::Null | ArrayOption::Empty => min_items,
            ArrayOption::One => min_items.max(1),
            ArrayOption::Random => {
                let upper = max_items.min(min_items.saturating_add(RANDOM_LENGTH_SPAN));
                let span = upper.saturating_sub(min_items);
                min_items + self.rng.gen_range(0..=span)
            }
        }
    }
}

/// Schema for overflow positions: `false` forbids them, `true` allows
/// anything, an object is used as is.
fn overflow_schema(value: &Value) -> Option<&Value> {
    match value {
        Value::Bool(true) => Some(&ANY_SCHEMA),
        Value::Object(_) => Some(value),
        _ => None,
    }
}

/// Element schemas with a single scalar `type`.
fn is_primitive(schema: &Value) -> bool {
    matches!(
        schema.get("type").and_then(Value::as_str),
        Some("string" | "number" | "integer" | "boolean" | "null")
    )
}

#[cfg(test)]
mod tests {
    use super::is_primitive;
    use crate::config::{
        ArrayOption, ContainsOption, Policy, PrimitiveArrayOption, UniqueItemsOption,
    };
    use crate::Generator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Value};

    fn run(schema: Value, policy: Policy) -> Value {
        let mut rng = StdRng::seed_from_u64(42);
        Generator::new(policy).generate_with_rng(&schema, &mut rng)
    }

    fn len(value: &Value) -> usize {
        value.as_array().unwrap().len()
    }

    // -----------------------------------------------------------------------
    // Tuples
    // -----------------------------------------------------------------------

    #[test]
    fn test_prefix_items_with_items_tail() {
        let schema = json!({
            "type": "array",
            "prefixItems": [{ "const": "a" }, { "const": 1 }],
            "items": { "const": true },
            "minItems": 4
        });
        assert_eq!(run(schema, Policy::default()), json!(["a", 1, true, true]));
    }

    #[test]
    fn test_prefix_items_additional_items_tail() {
        let schema = json!({
            "type": "array",
            "prefixItems": [{ "const": "a" }],
            "additionalItems": { "const": 0 },
            "minItems": 3
        });
        assert_eq!(run(schema, Policy::default()), json!(["a", 0, 0]));
    }

    #[test]
    fn test_prefix_items_closed_tail() {
        let schema = json!({
            "type": "array",
            "prefixItems": [{ "const": "a" }],
            "items": false,
            "minItems": 3
        });
        assert_eq!(run(schema, Policy::default()), json!(["a"]));
    }

    #[test]
    fn test_prefix_items_open_tail() {
        let schema = json!({
            "type": "array",
            "prefixItems": [{ "const": "a" }],
            "items": true,
            "minItems": 2
        });
        assert_eq!(run(schema, Policy::default()), json!(["a", {}]));
    }

    #[test]
    fn test_legacy_tuple_additional_items_false() {
        let schema = json!({
            "type": "array",
            "items": [{ "const": "a" }, { "const": "b" }],
            "additionalItems": false,
            "minItems": 5
        });
        assert_eq!(run(schema, Policy::default()), json!(["a", "b"]));
    }

    #[test]
    fn test_legacy_tuple_without_additional_items() {
        let schema = json!({
            "type": "array",
            "items": [{ "const": 1 }],
            "minItems": 3
        });
        assert_eq!(run(schema, Policy::default()), json!([1]));
    }

    #[test]
    fn test_legacy_tuple_additional_items_schema() {
        let schema = json!({
            "type": "array",
            "items": [{ "const": 1 }],
            "additionalItems": { "const": 2 },
            "minItems": 3
        });
        assert_eq!(run(schema, Policy::default()), json!([1, 2, 2]));
    }

    // -----------------------------------------------------------------------
    // contains
    // -----------------------------------------------------------------------

    #[test]
    fn test_contains_min_contains() {
        let schema = json!({
            "type": "array",
            "items": { "type": "integer", "minimum": 0, "maximum": 9 },
            "contains": { "const": 42 },
            "minContains": 2
        });
        let value = run(schema, Policy::default());
        let matches = value.as_array().unwrap().iter().filter(|v| **v == json!(42)).count();
        assert!(matches >= 2, "{value}");
        assert_eq!(&value[0], &json!(42));
        assert_eq!(&value[1], &json!(42));
    }

    #[test]
    fn test_contains_placement_last() {
        let schema = json!({
            "type": "array",
            "items": { "const": "x" },
            "contains": { "const": "hit" },
            "minItems": 3
        });
        let value = run(schema, Policy::default().with(ContainsOption::Last));
        assert_eq!(value, json!(["x", "x", "hit"]));
    }

    #[test]
    fn test_contains_placement_first() {
        let schema = json!({
            "type": "array",
            "items": { "const": "x" },
            "contains": { "const": "hit" },
            "minItems": 3
        });
        let value = run(schema, Policy::default());
        assert_eq!(value, json!(["hit", "x", "x"]));
    }

    #[test]
    fn test_contains_random_keeps_counts() {
        let schema = json!({
            "type": "array",
            "items": { "const": "x" },
            "contains": { "const": "hit" },
            "minItems": 5,
            "minContains": 2
        });
        for option in [ContainsOption::Random, ContainsOption::Distribute] {
            let value = run(schema.clone(), Policy::default().with(option));
            let items = value.as_array().unwrap();
            assert_eq!(items.len(), 5);
            assert_eq!(items.iter().filter(|v| **v == json!("hit")).count(), 2);
        }
    }

    #[test]
    fn test_contains_max_contains_caps_matches() {
        let schema = json!({
            "type": "array",
            "items": { "const": 0 },
            "contains": { "const": 1 },
            "minContains": 3,
            "maxContains": 1
        });
        let value = run(schema, Policy::default());
        let items = value.as_array().unwrap();
        assert_eq!(items.iter().filter(|v| **v == json!(1)).count(), 1);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_contains_without_items_only_matches() {
        let schema = json!({
            "type": "array",
            "contains": { "const": "hit" },
            "minItems": 4
        });
        assert_eq!(run(schema, Policy::default()), json!(["hit"]));
    }

    #[test]
    fn test_contains_none_falls_through_to_items() {
        let schema = json!({
            "type": "array",
            "items": { "const": "x" },
            "contains": { "const": "hit" },
            "minItems": 2
        });
        let value = run(schema, Policy::default().with(ContainsOption::None));
        assert_eq!(value, json!(["x", "x"]));
    }

    // -----------------------------------------------------------------------
    // Homogeneous items and sizing
    // -----------------------------------------------------------------------

    #[test]
    fn test_no_items_is_empty() {
        let schema = json!({ "type": "array", "minItems": 3 });
        assert_eq!(run(schema, Policy::default()), json!([]));
    }

    #[test]
    fn test_items_false_is_empty() {
        let schema = json!({ "type": "array", "items": false, "minItems": 3 });
        assert_eq!(run(schema, Policy::default()), json!([]));
    }

    #[test]
    fn test_sizing_options() {
        let schema = json!({ "type": "array", "items": { "type": "object" }, "minItems": 2 });
        assert_eq!(len(&run(schema.clone(), Policy::default().with(ArrayOption::Null))), 2);
        assert_eq!(len(&run(schema.clone(), Policy::default().with(ArrayOption::Empty))), 2);
        assert_eq!(len(&run(schema.clone(), Policy::default().with(ArrayOption::One))), 2);

        let unbounded = json!({ "type": "array", "items": { "type": "object" } });
        assert_eq!(len(&run(unbounded.clone(), Policy::default().with(ArrayOption::Null))), 0);
        assert_eq!(len(&run(unbounded, Policy::default().with(ArrayOption::One))), 1);
    }

    #[test]
    fn test_random_sizing_respects_bounds() {
        let schema = json!({
            "type": "array",
            "items": { "type": "integer" },
            "minItems": 2,
            "maxItems": 5
        });
        let generator = Generator::new(Policy::default().with(PrimitiveArrayOption::Random));
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let n = len(&generator.generate_with_rng(&schema, &mut rng));
            assert!((2..=5).contains(&n), "{n}");
        }

        let inverted = json!({ "type": "array", "items": { "type": "integer" }, "minItems": 4, "maxItems": 1 });
        assert_eq!(len(&run(inverted, Policy::default().with(PrimitiveArrayOption::Random))), 4);
    }

    #[test]
    fn test_primitive_and_object_slots_are_independent() {
        let strings = json!({ "type": "array", "items": { "type": "string" } });
        let objects = json!({ "type": "array", "items": { "type": "object" } });
        let policy = Policy::default()
            .with(ArrayOption::Empty)
            .with(PrimitiveArrayOption::One);

        assert_eq!(len(&run(strings, policy)), 1);
        assert_eq!(len(&run(objects, policy)), 0);
    }

    #[test]
    fn test_unique_items_enforced() {
        let schema = json!({
            "type": "array",
            "items": { "enum": ["a", "b", "c"] },
            "uniqueItems": true,
            "minItems": 3
        });
        let policy = Policy::default().with(crate::config::EnumOption::Random);
        let value = run(schema, policy);
        let mut items: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        items.sort_unstable();
        items.dedup();
        assert_eq!(items.len(), len(&value));
    }

    #[test]
    fn test_unique_items_budget_exhausted() {
        let schema = json!({
            "type": "array",
            "items": { "type": "boolean" },
            "uniqueItems": true,
            "minItems": 5
        });
        let value = run(schema.clone(), Policy::default());
        assert_eq!(value, json!([false]));

        let ignored = run(schema, Policy::default().with(UniqueItemsOption::Ignore));
        assert_eq!(ignored, json!([false, false, false, false, false]));
    }

    #[test]
    fn test_items_true_is_unconstrained() {
        let schema = json!({ "type": "array", "items": true, "minItems": 2 });
        assert_eq!(run(schema, Policy::default()), json!([{}, {}]));
    }

    #[test]
    fn test_is_primitive() {
        assert!(is_primitive(&json!({ "type": "string" })));
        assert!(is_primitive(&json!({ "type": "null" })));
        assert!(!is_primitive(&json!({ "type": "object" })));
        assert!(!is_primitive(&json!({ "type": ["string", "null"] })));
        assert!(!is_primitive(&json!({})));
    }
}
