//! Sample JSON data generation from JSON Schema.
//!
//! Given a schema, produce one JSON value shaped by it. Every choice the
//! schema leaves open (which `enum` value, how many array items, which
//! `anyOf` branch, how a bounded number is picked) is decided by a
//! [`Policy`], one strategy per keyword family.
//!
//! ```
//! use jsonschema_datagen_core::{generate, Policy};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "color": { "enum": ["red", "green", "blue"] },
//!         "size": { "type": "integer", "minimum": 1, "maximum": 9 }
//!     },
//!     "required": ["color"]
//! });
//!
//! let value = generate(&schema, &Policy::minimal());
//! assert_eq!(value, json!({ "color": "red" }));
//! ```
//!
//! Raw schemas with `$ref` and `allOf` go through [`flatten`] first;
//! [`generate_from_str`] does both steps.

pub mod config;
pub mod error;
pub mod flatten;
pub mod generator;
pub mod navigate;
pub mod recursion;
pub mod schema_utils;
pub mod source;
pub mod synth;

use serde_json::Value;

pub use config::{
    AdditionalPropertiesOption, AllOfOption, AnyOfOption, ArrayOption, BooleanOption,
    CircularRefOption, ConstrainedNumberOption, ContainsOption, DefaultValueOption, EnumOption,
    ExamplesOption, FlattenOptions, FormattedStringOption, MissingRefOption, NumberOption,
    OneOfOption, PatternPropertiesOption, Policy, PolicySetting, PrimitiveArrayOption,
    PropertyScopeOption, RecursionDepthOption, StringOption, UnionTypeOption, UniqueItemsOption,
};
pub use error::GenerateError;
pub use flatten::{flatten, flatten_str};
pub use generator::Generator;
pub use navigate::SchemaNavigator;
pub use source::{FakeValueSource, ValueSource};

/// Generate one value for an already flattened schema.
///
/// Uses [`FakeValueSource`] and the thread-local RNG. Never fails: keywords
/// that cannot be honoured resolve to `null`.
pub fn generate(schema: &Value, policy: &Policy) -> Value {
    Generator::new(*policy).generate(schema)
}

/// Parse, [`flatten`] with default options, then [`generate`].
///
/// # Errors
///
/// Returns [`GenerateError::Json`] for malformed input and any flattening
/// error (for example an `allOf` type conflict).
pub fn generate_from_str(json: &str, policy: &Policy) -> Result<Value, GenerateError> {
    let schema = flatten_str(json, &FlattenOptions::default())?;
    Ok(generate(&schema, policy))
}
