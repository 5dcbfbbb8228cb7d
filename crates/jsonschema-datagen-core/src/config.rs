//! Generation policy: one strategy choice per schema keyword family.
//!
//! A [`Policy`] is a small `Copy` record. It is never mutated by the
//! generator, so a single value can be shared across threads and reused for
//! any number of calls. [`Policy::with`] builds a modified copy and leaves the
//! receiver untouched.
//!
//! ## Serialization Format
//!
//! Fields and variants are serialized in `kebab-case` (e.g. `any-of`,
//! `first-non-null`). Missing fields fall back to [`Policy::default`], so a
//! policy file only needs to name the families it overrides.

use serde::{Deserialize, Serialize};

/// How a value is picked from `enum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnumOption {
    /// Always emit `null`.
    Null,
    First,
    Last,
    Random,
}

/// Which `anyOf` branch is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnyOfOption {
    Null,
    First,
    Last,
    Random,
}

/// Which `oneOf` branch is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OneOfOption {
    Null,
    First,
    Last,
    Random,
}

/// How the `examples` keyword is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExamplesOption {
    /// Skip `examples` and fall through to the remaining keywords.
    Ignore,
    First,
    Last,
    Random,
}

/// Whether `default` values short-circuit generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultValueOption {
    Ignore,
    Use,
}

/// How a `type` array such as `["string", "null"]` is narrowed to one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnionTypeOption {
    First,
    Last,
    Random,
    /// `"null"` when listed, otherwise the first type.
    NullFirst,
    /// The first non-`"null"` type, or `"null"` when that is all there is.
    FirstNonNull,
}

/// Item count for arrays whose items are objects, arrays or untyped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayOption {
    Null,
    Empty,
    One,
    /// Between `minItems` and `min(maxItems, minItems + 10)`.
    Random,
}

/// Item count for arrays of strings, numbers, integers, booleans or nulls.
///
/// Same semantics as [`ArrayOption`], configured independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveArrayOption {
    Null,
    Empty,
    One,
    Random,
}

impl From<PrimitiveArrayOption> for ArrayOption {
    fn from(option: PrimitiveArrayOption) -> Self {
        match option {
            PrimitiveArrayOption::Null => ArrayOption::Null,
            PrimitiveArrayOption::Empty => ArrayOption::Empty,
            PrimitiveArrayOption::One => ArrayOption::One,
            PrimitiveArrayOption::Random => ArrayOption::Random,
        }
    }
}

/// Which declared properties are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyScopeOption {
    All,
    RequiredOnly,
}

/// How many extra properties are synthesized from `additionalProperties`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdditionalPropertiesOption {
    None,
    One,
    /// Two or three.
    Few,
}

/// How many property names are synthesized per `patternProperties` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternPropertiesOption {
    None,
    One,
    Few,
}

/// Whether `uniqueItems: true` is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UniqueItemsOption {
    Ignore,
    /// Retry candidates until unique, up to ten attempts per requested item.
    Enforce,
}

/// Where `contains`-matching items are placed in the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainsOption {
    /// Treat the array as if `contains` were absent.
    None,
    First,
    Last,
    Random,
    Distribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BooleanOption {
    Null,
    True,
    False,
    Random,
}

/// Base mode for `type: string`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringOption {
    Null,
    Empty,
    Generated,
}

/// Strategy for strings with `pattern`, `format`, or length bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormattedStringOption {
    Null,
    /// Realistic values from the [`ValueSource`](crate::source::ValueSource).
    Fake,
    Random,
}

/// Base mode for `type: integer` and `type: number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberOption {
    Null,
    Zero,
    Generated,
}

/// Strategy for numbers bounded by `minimum`/`maximum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstrainedNumberOption {
    Null,
    Minimum,
    Maximum,
    Midpoint,
    /// Uniform within the bounds, snapped to `multipleOf`.
    Fake,
    /// Ignores every bound. Useful for exercising validators.
    Random,
}

/// Re-entry cap for self-referential schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecursionDepthOption {
    None,
    Shallow,
    Moderate,
    Deep,
    VeryDeep,
}

impl RecursionDepthOption {
    /// Number of times a schema node may be re-entered on one call path.
    pub fn max_depth(self) -> usize {
        match self {
            RecursionDepthOption::None => 0,
            RecursionDepthOption::Shallow => 1,
            RecursionDepthOption::Moderate => 3,
            RecursionDepthOption::Deep => 5,
            RecursionDepthOption::VeryDeep => 10,
        }
    }
}

/// The full set of generation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Policy {
    pub enums: EnumOption,
    pub any_of: AnyOfOption,
    pub one_of: OneOfOption,
    pub examples: ExamplesOption,
    pub default_value: DefaultValueOption,
    pub union_type: UnionTypeOption,
    pub array: ArrayOption,
    pub primitive_array: PrimitiveArrayOption,
    pub property_scope: PropertyScopeOption,
    pub additional_properties: AdditionalPropertiesOption,
    pub pattern_properties: PatternPropertiesOption,
    pub unique_items: UniqueItemsOption,
    pub contains: ContainsOption,
    pub boolean: BooleanOption,
    pub string: StringOption,
    pub formatted_string: FormattedStringOption,
    pub number: NumberOption,
    pub constrained_number: ConstrainedNumberOption,
    pub recursion_depth: RecursionDepthOption,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            enums: EnumOption::First,
            any_of: AnyOfOption::First,
            one_of: OneOfOption::First,
            examples: ExamplesOption::First,
            default_value: DefaultValueOption::Use,
            union_type: UnionTypeOption::FirstNonNull,
            array: ArrayOption::One,
            primitive_array: PrimitiveArrayOption::One,
            property_scope: PropertyScopeOption::All,
            additional_properties: AdditionalPropertiesOption::None,
            pattern_properties: PatternPropertiesOption::None,
            unique_items: UniqueItemsOption::Enforce,
            contains: ContainsOption::First,
            boolean: BooleanOption::False,
            string: StringOption::Generated,
            formatted_string: FormattedStringOption::Fake,
            number: NumberOption::Generated,
            constrained_number: ConstrainedNumberOption::Fake,
            recursion_depth: RecursionDepthOption::Moderate,
        }
    }
}

impl Policy {
    /// Smallest valid document: required properties only, empty arrays, and
    /// `null` for formatted strings and bounded numbers.
    pub fn minimal() -> Self {
        Self {
            enums: EnumOption::First,
            any_of: AnyOfOption::First,
            one_of: OneOfOption::First,
            array: ArrayOption::Empty,
            primitive_array: PrimitiveArrayOption::Empty,
            boolean: BooleanOption::False,
            formatted_string: FormattedStringOption::Null,
            constrained_number: ConstrainedNumberOption::Null,
            default_value: DefaultValueOption::Use,
            property_scope: PropertyScopeOption::RequiredOnly,
            unique_items: UniqueItemsOption::Enforce,
            examples: ExamplesOption::Ignore,
            contains: ContainsOption::First,
            additional_properties: AdditionalPropertiesOption::None,
            pattern_properties: PatternPropertiesOption::None,
            recursion_depth: RecursionDepthOption::None,
            ..Self::default()
        }
    }

    /// Balanced defaults. Same as [`Policy::default`].
    pub fn normal() -> Self {
        Self::default()
    }

    /// Everything the schema allows, with random choices wherever a choice
    /// exists. Bounded numbers use [`ConstrainedNumberOption::Random`] and so
    /// ignore their bounds.
    pub fn verbose() -> Self {
        Self {
            enums: EnumOption::Random,
            any_of: AnyOfOption::Random,
            one_of: OneOfOption::Random,
            array: ArrayOption::Random,
            primitive_array: PrimitiveArrayOption::Random,
            boolean: BooleanOption::Random,
            formatted_string: FormattedStringOption::Fake,
            constrained_number: ConstrainedNumberOption::Random,
            default_value: DefaultValueOption::Use,
            property_scope: PropertyScopeOption::All,
            unique_items: UniqueItemsOption::Enforce,
            examples: ExamplesOption::Random,
            contains: ContainsOption::Random,
            additional_properties: AdditionalPropertiesOption::Few,
            pattern_properties: PatternPropertiesOption::Few,
            recursion_depth: RecursionDepthOption::Deep,
            ..Self::default()
        }
    }

    /// Document shape with `null` leaves, except where a `default` exists.
    pub fn skeleton() -> Self {
        Self {
            string: StringOption::Null,
            number: NumberOption::Null,
            boolean: BooleanOption::Null,
            enums: EnumOption::Null,
            array: ArrayOption::One,
            primitive_array: PrimitiveArrayOption::One,
            default_value: DefaultValueOption::Use,
            property_scope: PropertyScopeOption::All,
            additional_properties: AdditionalPropertiesOption::None,
            pattern_properties: PatternPropertiesOption::None,
            recursion_depth: RecursionDepthOption::Shallow,
            ..Self::default()
        }
    }

    /// Return a copy of this policy with one family replaced.
    ///
    /// ```
    /// use jsonschema_datagen_core::{EnumOption, Policy};
    ///
    /// let original = Policy::default();
    /// let modified = original.with(EnumOption::Last);
    /// assert_eq!(original.enums, EnumOption::First);
    /// assert_eq!(modified.enums, EnumOption::Last);
    /// ```
    #[must_use]
    pub fn with<S: PolicySetting>(&self, setting: S) -> Self {
        let mut next = *self;
        setting.apply(&mut next);
        next
    }
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// What the flattener does with `allOf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllOfOption {
    /// Fold all branches (and sibling keywords) into one schema.
    Merge,
    /// Leave `allOf` in place. The generator ignores it.
    Skip,
}

/// What the flattener does with a `$ref` that points back into a definition
/// it is already expanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircularRefOption {
    /// Keep the `$ref`; the generator follows it under its recursion cap.
    Resolve,
    /// Replace it with the empty schema `{}`.
    Skip,
}

/// What the flattener does with a `$ref` it cannot resolve locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingRefOption {
    /// Leave the node as it is.
    Skip,
    /// Fail with [`GenerateError::UnresolvableRef`](crate::GenerateError::UnresolvableRef).
    Fail,
}

/// Options for schema flattening.
///
/// Serialized in `kebab-case` (`all-of`, `on-circular`, `on-missing`,
/// `max-depth`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FlattenOptions {
    pub all_of: AllOfOption,
    pub on_circular: CircularRefOption,
    pub on_missing: MissingRefOption,
    /// Maximum nesting depth walked before giving up (stack overflow guard).
    pub max_depth: usize,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            all_of: AllOfOption::Merge,
            on_circular: CircularRefOption::Resolve,
            on_missing: MissingRefOption::Skip,
            max_depth: 50,
        }
    }
}

/// A strategy enum that owns exactly one [`Policy`] slot.
pub trait PolicySetting: Copy {
    fn apply(self, policy: &mut Policy);
}

impl PolicySetting for EnumOption {
    fn apply(self, policy: &mut Policy) {
        policy.enums = self;
    }
}

impl PolicySetting for AnyOfOption {
    fn apply(self, policy: &mut Policy) {
        policy.any_of = self;
    }
}

impl PolicySetting for OneOfOption {
    fn apply(self, policy: &mut Policy) {
        policy.one_of = self;
    }
}

impl PolicySetting for ExamplesOption {
    fn apply(self, policy: &mut Policy) {
        policy.examples = self;
    }
}

impl PolicySetting for DefaultValueOption {
    fn apply(self, policy: &mut Policy) {
        policy.default_value = self;
    }
}

impl PolicySetting for UnionTypeOption {
    fn apply(self, policy: &mut Policy) {
        policy.union_type = self;
    }
}

impl PolicySetting for ArrayOption {
    fn apply(self, policy: &mut Policy) {
        policy.array = self;
    }
}

impl PolicySetting for PrimitiveArrayOption {
    fn apply(self, policy: &mut Policy) {
        policy.primitive_array = self;
    }
}

impl PolicySetting for PropertyScopeOption {
    fn apply(self, policy: &mut Policy) {
        policy.property_scope = self;
    }
}

impl PolicySetting for AdditionalPropertiesOption {
    fn apply(self, policy: &mut Policy) {
        policy.additional_properties = self;
    }
}

impl PolicySetting for PatternPropertiesOption {
    fn apply(self, policy: &mut Policy) {
        policy.pattern_properties = self;
    }
}

impl PolicySetting for UniqueItemsOption {
    fn apply(self, policy: &mut Policy) {
        policy.unique_items = self;
    }
}

impl PolicySetting for ContainsOption {
    fn apply(self, policy: &mut Policy) {
        policy.contains = self;
    }
}

impl PolicySetting for BooleanOption {
    fn apply(self, policy: &mut Policy) {
        policy.boolean = self;
    }
}

impl PolicySetting for StringOption {
    fn apply(self, policy: &mut Policy) {
        policy.string = self;
    }
}

impl PolicySetting for FormattedStringOption {
    fn apply(self, policy: &mut Policy) {
        policy.formatted_string = self;
    }
}

impl PolicySetting for NumberOption {
    fn apply(self, policy: &mut Policy) {
        policy.number = self;
    }
}

impl PolicySetting for ConstrainedNumberOption {
    fn apply(self, policy: &mut Policy) {
        policy.constrained_number = self;
    }
}

impl PolicySetting for RecursionDepthOption {
    fn apply(self, policy: &mut Policy) {
        policy.recursion_depth = self;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_serde_round_trip() {
        let policy = Policy::verbose().with(UnionTypeOption::NullFirst);

        let json = serde_json::to_string(&policy).unwrap();

        // kebab-case field names and variants
        assert!(json.contains("\"any-of\":\"random\""));
        assert!(json.contains("\"union-type\":\"null-first\""));
        assert!(json.contains("\"recursion-depth\":\"deep\""));
        assert!(json.contains("\"additional-properties\":\"few\""));

        let deserialized: Policy = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, policy);
    }

    #[test]
    fn test_partial_policy_falls_back_to_defaults() {
        let policy: Policy =
            serde_json::from_str(r#"{ "enums": "last", "boolean": "true" }"#).unwrap();

        assert_eq!(policy.enums, EnumOption::Last);
        assert_eq!(policy.boolean, BooleanOption::True);
        assert_eq!(policy.union_type, UnionTypeOption::FirstNonNull);
        assert_eq!(policy.recursion_depth, RecursionDepthOption::Moderate);
    }

    #[test]
    fn test_with_leaves_original_untouched() {
        let original = Policy::default();
        let modified = original
            .with(EnumOption::Random)
            .with(ArrayOption::Random)
            .with(RecursionDepthOption::VeryDeep);

        assert_ne!(original, modified);
        assert_eq!(original, Policy::default());
        assert_eq!(modified.enums, EnumOption::Random);
        assert_eq!(modified.array, ArrayOption::Random);
        assert_eq!(modified.primitive_array, PrimitiveArrayOption::One);
        assert_eq!(modified.recursion_depth, RecursionDepthOption::VeryDeep);
    }

    #[test]
    fn test_array_slots_are_independent() {
        let policy = Policy::default().with(PrimitiveArrayOption::Empty);
        assert_eq!(policy.array, ArrayOption::One);
        assert_eq!(policy.primitive_array, PrimitiveArrayOption::Empty);
    }

    #[test]
    fn test_normal_is_default() {
        assert_eq!(Policy::normal(), Policy::default());
    }

    #[test]
    fn test_minimal_preset() {
        let expected = Policy {
            enums: EnumOption::First,
            any_of: AnyOfOption::First,
            one_of: OneOfOption::First,
            examples: ExamplesOption::Ignore,
            default_value: DefaultValueOption::Use,
            union_type: UnionTypeOption::FirstNonNull,
            array: ArrayOption::Empty,
            primitive_array: PrimitiveArrayOption::Empty,
            property_scope: PropertyScopeOption::RequiredOnly,
            additional_properties: AdditionalPropertiesOption::None,
            pattern_properties: PatternPropertiesOption::None,
            unique_items: UniqueItemsOption::Enforce,
            contains: ContainsOption::First,
            boolean: BooleanOption::False,
            string: StringOption::Generated,
            formatted_string: FormattedStringOption::Null,
            number: NumberOption::Generated,
            constrained_number: ConstrainedNumberOption::Null,
            recursion_depth: RecursionDepthOption::None,
        };
        assert_eq!(Policy::minimal(), expected);
    }

    #[test]
    fn test_verbose_preset() {
        let expected = Policy {
            enums: EnumOption::Random,
            any_of: AnyOfOption::Random,
            one_of: OneOfOption::Random,
            examples: ExamplesOption::Random,
            default_value: DefaultValueOption::Use,
            union_type: UnionTypeOption::FirstNonNull,
            array: ArrayOption::Random,
            primitive_array: PrimitiveArrayOption::Random,
            property_scope: PropertyScopeOption::All,
            additional_properties: AdditionalPropertiesOption::Few,
            pattern_properties: PatternPropertiesOption::Few,
            unique_items: UniqueItemsOption::Enforce,
            contains: ContainsOption::Random,
            boolean: BooleanOption::Random,
            string: StringOption::Generated,
            formatted_string: FormattedStringOption::Fake,
            number: NumberOption::Generated,
            constrained_number: ConstrainedNumberOption::Random,
            recursion_depth: RecursionDepthOption::Deep,
        };
        assert_eq!(Policy::verbose(), expected);
    }

    #[test]
    fn test_skeleton_preset() {
        let expected = Policy {
            enums: EnumOption::Null,
            any_of: AnyOfOption::First,
            one_of: OneOfOption::First,
            examples: ExamplesOption::First,
            default_value: DefaultValueOption::Use,
            union_type: UnionTypeOption::FirstNonNull,
            array: ArrayOption::One,
            primitive_array: PrimitiveArrayOption::One,
            property_scope: PropertyScopeOption::All,
            additional_properties: AdditionalPropertiesOption::None,
            pattern_properties: PatternPropertiesOption::None,
            unique_items: UniqueItemsOption::Enforce,
            contains: ContainsOption::First,
            boolean: BooleanOption::Null,
            string: StringOption::Null,
            formatted_string: FormattedStringOption::Fake,
            number: NumberOption::Null,
            constrained_number: ConstrainedNumberOption::Fake,
            recursion_depth: RecursionDepthOption::Shallow,
        };
        assert_eq!(Policy::skeleton(), expected);
    }

    #[test]
    fn test_recursion_depths_are_ordered() {
        let depths: Vec<usize> = [
            RecursionDepthOption::None,
            RecursionDepthOption::Shallow,
            RecursionDepthOption::Moderate,
            RecursionDepthOption::Deep,
            RecursionDepthOption::VeryDeep,
        ]
        .iter()
        .map(|d| d.max_depth())
        .collect();
        assert_eq!(depths, vec![0, 1, 3, 5, 10]);
    }

    #[test]
    fn test_flatten_options_serde_round_trip() {
        let options = FlattenOptions {
            all_of: AllOfOption::Skip,
            on_missing: MissingRefOption::Fail,
            ..FlattenOptions::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"all-of\":\"skip\""));
        assert!(json.contains("\"on-missing\":\"fail\""));
        assert!(json.contains("\"max-depth\":50"));

        let deserialized: FlattenOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, options);

        let partial: FlattenOptions = serde_json::from_str(r#"{ "on-circular": "skip" }"#).unwrap();
        assert_eq!(partial.on_circular, CircularRefOption::Skip);
        assert_eq!(partial.all_of, AllOfOption::Merge);
    }
}
