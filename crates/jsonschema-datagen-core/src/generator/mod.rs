//! Value generation engine.
//!
//! For every schema node the engine resolves, in order, the first keyword
//! family that applies:
//!
//! 1. `const`, returned verbatim
//! 2. `default`, when the policy uses defaults
//! 3. `enum`
//! 4. `examples`, unless the policy ignores them
//! 5. `anyOf`, then `oneOf`, by generating one selected branch
//! 6. `type`, dispatching to the object/array constructors or the leaf
//!    synthesizers in [`crate::synth`]
//!
//! Local `$ref`s left in the schema (typically the recursive ones the
//! flattener keeps) are followed against the root document, and every node
//! entered is counted by a [`RecursionTracker`] so self-referential schemas
//! terminate with `null` at the configured depth.

mod array;
mod object;

use rand::{Rng, RngCore};
use serde_json::{Map, Value};

use crate::config::{
    AnyOfOption, BooleanOption, DefaultValueOption, EnumOption, ExamplesOption, OneOfOption,
    Policy, UnionTypeOption,
};
use crate::recursion::{fingerprint, RecursionTracker};
use crate::schema_utils::resolve_pointer;
use crate::source::{FakeValueSource, ValueSource};
use crate::synth;

/// Schema used where the document says `true`: anything goes.
static ANY_SCHEMA: Value = Value::Bool(true);

/// Upper bound on `$ref` → `$ref` chains followed for one node.
const MAX_REF_HOPS: usize = 64;

/// A reusable generator: a policy plus a [`ValueSource`].
///
/// Each call builds its own recursion tracker, so one `Generator` can serve
/// any number of calls, including concurrent ones when `S` is shared.
///
/// ```
/// use jsonschema_datagen_core::{Generator, Policy};
/// use rand::SeedableRng;
/// use serde_json::json;
///
/// let generator = Generator::new(Policy::default());
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let value = generator.generate_with_rng(&json!({ "const": 42 }), &mut rng);
/// assert_eq!(value, json!(42));
/// ```
#[derive(Debug, Clone)]
pub struct Generator<S = FakeValueSource> {
    policy: Policy,
    source: S,
}

impl Generator<FakeValueSource> {
    /// Generator backed by [`FakeValueSource`].
    pub fn new(policy: Policy) -> Self {
        Self::with_source(policy, FakeValueSource)
    }
}

impl Default for Generator<FakeValueSource> {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}

impl<S: ValueSource> Generator<S> {
    pub fn with_source(policy: Policy, source: S) -> Self {
        Self { policy, source }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Generate one value using the thread-local RNG.
    pub fn generate(&self, schema: &Value) -> Value {
        let mut rng = rand::thread_rng();
        self.generate_with_rng(schema, &mut rng)
    }

    /// Generate one value drawing every random choice from `rng`.
    ///
    /// With a seeded RNG the output is reproducible.
    pub fn generate_with_rng(&self, schema: &Value, rng: &mut dyn RngCore) -> Value {
        self.generate_at(schema, schema, rng)
    }

    /// Generate a value for `node`, a sub-schema of `root`.
    ///
    /// Local `$ref`s met while generating `node` are resolved against `root`,
    /// so a node taken out of a flattened document keeps its recursive
    /// references.
    pub fn generate_at(&self, root: &Value, node: &Value, rng: &mut dyn RngCore) -> Value {
        let mut tracker = RecursionTracker::new(self.policy.recursion_depth.max_depth());
        let mut engine = Engine {
            policy: &self.policy,
            source: &self.source,
            root,
            rng,
        };
        let value = engine.generate(node, &mut tracker);
        debug_assert!(tracker.is_empty());
        value
    }
}

/// Per-call generation state.
struct Engine<'a> {
    policy: &'a Policy,
    source: &'a dyn ValueSource,
    root: &'a Value,
    rng: &'a mut dyn RngCore,
}

/// Index choice shared by `enum`, `examples`, `anyOf` and `oneOf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Skip,
    First,
    Last,
    Random,
}

impl From<EnumOption> for Selection {
    fn from(option: EnumOption) -> Self {
        match option {
            EnumOption::Null => Selection::Skip,
            EnumOption::First => Selection::First,
            EnumOption::Last => Selection::Last,
            EnumOption::Random => Selection::Random,
        }
    }
}

impl From<ExamplesOption> for Selection {
    fn from(option: ExamplesOption) -> Self {
        match option {
            ExamplesOption::Ignore => Selection::Skip,
            ExamplesOption::First => Selection::First,
            ExamplesOption::Last => Selection::Last,
            ExamplesOption::Random => Selection::Random,
        }
    }
}

impl From<AnyOfOption> for Selection {
    fn from(option: AnyOfOption) -> Self {
        match option {
            AnyOfOption::Null => Selection::Skip,
            AnyOfOption::First => Selection::First,
            AnyOfOption::Last => Selection::Last,
            AnyOfOption::Random => Selection::Random,
        }
    }
}

impl From<OneOfOption> for Selection {
    fn from(option: OneOfOption) -> Self {
        match option {
            OneOfOption::Null => Selection::Skip,
            OneOfOption::First => Selection::First,
            OneOfOption::Last => Selection::Last,
            OneOfOption::Random => Selection::Random,
        }
    }
}

impl<'a> Engine<'a> {
    /// Generate a value for `node`, or `null` once the node has been
    /// re-entered more often than the recursion cap allows.
    fn generate(&mut self, node: &'a Value, tracker: &mut RecursionTracker) -> Value {
        let node = self.follow_refs(node);
        let max_depth = tracker.max_depth();
        let Some(mut scope) = tracker.enter(fingerprint(node)) else {
            tracing::debug!(max_depth, "recursion cap reached, emitting null");
            return Value::Null;
        };
        self.dispatch(node, &mut scope)
    }

    /// Follow local `$ref`s until a node without one is reached. Unresolvable
    /// references leave the node as is, so its sibling keywords still apply.
    fn follow_refs(&self, node: &'a Value) -> &'a Value {
        let mut current = node;
        for _ in 0..MAX_REF_HOPS {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return current;
            };
            match resolve_pointer(self.root, reference) {
                Some(target) => current = target,
                None => {
                    tracing::debug!(reference, "unresolved $ref, using sibling keywords");
                    return current;
                }
            }
        }
        tracing::warn!("$ref chain longer than {MAX_REF_HOPS} hops, stopping");
        current
    }

    fn dispatch(&mut self, node: &'a Value, tracker: &mut RecursionTracker) -> Value {
        let obj = match node {
            Value::Object(obj) => obj,
            Value::Bool(true) => return Value::Object(Map::new()),
            _ => return Value::Null,
        };

        if let Some(value) = obj.get("const") {
            return value.clone();
        }

        if self.policy.default_value == DefaultValueOption::Use {
            if let Some(value) = obj.get("default") {
                return value.clone();
            }
        }

        if let Some(values) = obj.get("enum") {
            return self
                .select(values, self.policy.enums.into())
                .cloned()
                .unwrap_or(Value::Null);
        }

        if self.policy.examples != ExamplesOption::Ignore {
            if let Some(values) = obj.get("examples") {
                return self
                    .select(values, self.policy.examples.into())
                    .cloned()
                    .unwrap_or(Value::Null);
            }
        }

        if let Some(branches) = obj.get("anyOf") {
            return match self.select(branches, self.policy.any_of.into()) {
                Some(branch) => self.generate(branch, tracker),
                None => Value::Null,
            };
        }

        if let Some(branches) = obj.get("oneOf") {
            return match self.select(branches, self.policy.one_of.into()) {
                Some(branch) => self.generate(branch, tracker),
                None => Value::Null,
            };
        }

        let ty = self.resolve_type(obj);
        tracing::trace!(ty, "type dispatch");
        match ty {
            "object" => self.object(obj, tracker),
            "array" => self.array(obj, tracker),
            "string" => synth::string_value(obj, self.policy, self.source, &mut *self.rng),
            "integer" => synth::integer_value(obj, self.policy, &mut *self.rng),
            "number" => synth::decimal_value(obj, self.policy, &mut *self.rng),
            "boolean" => self.boolean(),
            _ => Value::Null,
        }
    }

    /// Pick one element of a non-empty array. Anything else selects nothing.
    fn select(&mut self, list: &'a Value, selection: Selection) -> Option<&'a Value> {
        let items = list.as_array().filter(|items| !items.is_empty())?;
        match selection {
            Selection::Skip => None,
            Selection::First => items.first(),
            Selection::Last => items.last(),
            Selection::Random => items.get(self.rng.gen_range(0..items.len())),
        }
    }

    /// The single type to generate. A missing or empty `type` means object.
    fn resolve_type(&mut self, obj: &'a Map<String, Value>) -> &'a str {
        let types = match obj.get("type") {
            None => return "object",
            Some(Value::String(ty)) => return ty.as_str(),
            Some(Value::Array(types)) => types,
            Some(_) => return "",
        };

        let names: Vec<&'a str> = types.iter().filter_map(Value::as_str).collect();
        let (Some(&first), Some(&last)) = (names.first(), names.last()) else {
            return "object";
        };

        match self.policy.union_type {
            UnionTypeOption::First => first,
            UnionTypeOption::Last => last,
            UnionTypeOption::Random => names[self.rng.gen_range(0..names.len())],
            UnionTypeOption::NullFirst => {
                if names.contains(&"null") {
                    "null"
                } else {
                    first
                }
            }
            UnionTypeOption::FirstNonNull => names
                .iter()
                .copied()
                .find(|name| *name != "null")
                .unwrap_or("null"),
        }
    }

    fn boolean(&mut self) -> Value {
        match self.policy.boolean {
            BooleanOption::Null => Value::Null,
            BooleanOption::True => Value::Bool(true),
            BooleanOption::False => Value::Bool(false),
            BooleanOption::Random => Value::Bool(self.rng.gen()),
        }
    }
}
