//! Object construction: declared, pattern and additional properties.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{Map, Value};

use super::{Engine, ANY_SCHEMA};
use crate::config::{AdditionalPropertiesOption, PatternPropertiesOption, PropertyScopeOption};
use crate::recursion::RecursionTracker;
use crate::synth::usize_keyword;

/// How many synthesized entries to add per extra-property source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtraCount {
    None,
    One,
    Few,
}

impl From<AdditionalPropertiesOption> for ExtraCount {
    fn from(option: AdditionalPropertiesOption) -> Self {
        match option {
            AdditionalPropertiesOption::None => ExtraCount::None,
            AdditionalPropertiesOption::One => ExtraCount::One,
            AdditionalPropertiesOption::Few => ExtraCount::Few,
        }
    }
}

impl From<PatternPropertiesOption> for ExtraCount {
    fn from(option: PatternPropertiesOption) -> Self {
        match option {
            PatternPropertiesOption::None => ExtraCount::None,
            PatternPropertiesOption::One => ExtraCount::One,
            PatternPropertiesOption::Few => ExtraCount::Few,
        }
    }
}

impl<'a> Engine<'a> {
    pub(super) fn object(
        &mut self,
        obj: &'a Map<String, Value>,
        tracker: &mut RecursionTracker,
    ) -> Value {
        let mut out = Map::new();
        let max_properties = usize_keyword(obj, "maxProperties").unwrap_or(usize::MAX);

        if let Some(Value::Object(properties)) = obj.get("properties") {
            for (name, schema) in self.select_properties(obj, properties, max_properties) {
                let value = self.generate(schema, tracker);
                out.insert(name.to_string(), value);
            }
        }

        let pattern_count = ExtraCount::from(self.policy.pattern_properties);
        if pattern_count != ExtraCount::None {
            if let Some(Value::Object(patterns)) = obj.get("patternProperties") {
                let mut fallback = 0;
                'patterns: for (pattern, schema) in patterns {
                    for _ in 0..self.extra_count(pattern_count) {
                        if out.len() >= max_properties {
                            break 'patterns;
                        }
                        let name = match self.source.pattern(pattern, &mut *self.rng) {
                            Ok(name) => name,
                            Err(e) => {
                                tracing::warn!(pattern = %pattern, error = %e, "property name pattern failed, using placeholder");
                                let name = format!("pattern_prop_{fallback}");
                                fallback += 1;
                                name
                            }
                        };
                        self.insert_extra(&mut out, name, schema, tracker);
                    }
                }
            }
        }

        let additional_count = ExtraCount::from(self.policy.additional_properties);
        if additional_count != ExtraCount::None {
            let schema = match obj.get("additionalProperties") {
                None | Some(Value::Bool(false)) => None,
                Some(Value::Bool(true)) => Some(&ANY_SCHEMA),
                Some(schema) => Some(schema),
            };
            if let Some(schema) = schema {
                let name_pattern = obj
                    .get("propertyNames")
                    .and_then(|names| names.get("pattern"))
                    .and_then(Value::as_str);
                for i in 0..self.extra_count(additional_count) {
                    if out.len() >= max_properties {
                        break;
                    }
                    let name = self.additional_name(name_pattern, i);
                    self.insert_extra(&mut out, name, schema, tracker);
                }
            }
        }

        Value::Object(out)
    }

    /// Declared properties to emit, required first, then shuffled optionals.
    fn select_properties(
        &mut self,
        obj: &'a Map<String, Value>,
        properties: &'a Map<String, Value>,
        max_properties: usize,
    ) -> Vec<(&'a str, &'a Value)> {
        let required: Vec<&str> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let (mandatory, mut optional): (Vec<_>, Vec<_>) = properties
            .iter()
            .map(|(name, schema)| (name.as_str(), schema))
            .partition(|(name, _)| required.contains(name));

        let total = properties.len();
        let min_properties = usize_keyword(obj, "minProperties").unwrap_or(0);
        let upper = max_properties.min(total);

        let target = match self.policy.property_scope {
            PropertyScopeOption::RequiredOnly => mandatory.len().min(upper),
            PropertyScopeOption::All => upper.max(min_properties.max(mandatory.len())),
        };

        let mut selected = mandatory;
        selected.truncate(target);
        if self.policy.property_scope == PropertyScopeOption::All {
            optional.shuffle(&mut *self.rng);
            let room = target.saturating_sub(selected.len());
            selected.extend(optional.into_iter().take(room));
        }
        selected
    }

    fn extra_count(&mut self, count: ExtraCount) -> usize {
        match count {
            ExtraCount::None => 0,
            ExtraCount::One => 1,
            ExtraCount::Few => 2 + self.rng.gen_range(0..2),
        }
    }

    fn additional_name(&mut self, pattern: Option<&str>, index: usize) -> String {
        if let Some(pattern) = pattern {
            match self.source.pattern(pattern, &mut *self.rng) {
                Ok(name) => return name,
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "propertyNames pattern failed, using placeholder");
                }
            }
        }
        format!("additional_{index}")
    }

    /// Generated names never replace a property that is already present.
    fn insert_extra(
        &mut self,
        out: &mut Map<String, Value>,
        name: String,
        schema: &'a Value,
        tracker: &mut RecursionTracker,
    ) {
        if out.contains_key(&name) {
            tracing::trace!(name = %name, "synthesized property name collides, skipping");
            return;
        }
        let value = self.generate(schema, tracker);
        out.insert(name, value);
    }
}
