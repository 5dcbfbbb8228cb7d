//! Constrained-value synthesis for leaf schemas.
//!
//! Integers are computed in [`BigInt`] and decimals in [`BigDecimal`] so that
//! bounds such as `9007199254740993` or `0.1` are honoured exactly. Results
//! are written back as JSON numbers through their decimal text.

use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::{BigInt, RandBigInt};
use num_integer::Integer;
use num_traits::{Signed, Zero};
use rand::{Rng, RngCore};
use serde_json::{Map, Number, Value};

use crate::config::{
    ConstrainedNumberOption, FormattedStringOption, NumberOption, Policy, StringOption,
};
use crate::source::ValueSource;

/// Width of the range used when `maximum` is absent.
const DEFAULT_SPAN: i64 = 1000;

/// Scale of the shift applied to decimal exclusive bounds (`1e-4`).
const EPSILON_SCALE: i64 = 4;

/// Extra characters allowed past `minLength` when `maxLength` is absent.
const DEFAULT_LENGTH_SPAN: usize = 20;

/// Placeholder returned when a `pattern` cannot be satisfied.
pub const PATTERN_FALLBACK: &str = "pattern_value";

/// Effective numeric constraints of one schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds<T> {
    pub minimum: T,
    pub maximum: T,
    /// `None` when absent or zero.
    pub multiple_of: Option<T>,
}

// ---------------------------------------------------------------------------
// Integers
// ---------------------------------------------------------------------------

impl Bounds<BigInt> {
    /// Read `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum` and
    /// `multipleOf` from an integer schema.
    ///
    /// Fractional bounds are rounded inward. Exclusive bounds shift by one.
    pub fn integer(obj: &Map<String, Value>) -> Self {
        let mut minimum = decimal_keyword(obj, "minimum")
            .map(|d| to_integer(&d, RoundingMode::Ceiling))
            .unwrap_or_else(BigInt::zero);
        let mut maximum = decimal_keyword(obj, "maximum")
            .map(|d| to_integer(&d, RoundingMode::Floor))
            .unwrap_or_else(|| &minimum + DEFAULT_SPAN);

        match obj.get("exclusiveMinimum") {
            Some(Value::Bool(true)) => minimum += 1,
            Some(Value::Number(n)) => {
                if let Some(d) = parse_decimal(n) {
                    let exclusive = to_integer(&d, RoundingMode::Floor) + 1;
                    minimum = minimum.max(exclusive);
                }
            }
            _ => {}
        }
        match obj.get("exclusiveMaximum") {
            Some(Value::Bool(true)) => maximum -= 1,
            Some(Value::Number(n)) => {
                if let Some(d) = parse_decimal(n) {
                    let exclusive = to_integer(&d, RoundingMode::Ceiling) - 1;
                    maximum = maximum.min(exclusive);
                }
            }
            _ => {}
        }

        let multiple_of = decimal_keyword(obj, "multipleOf")
            .map(|d| to_integer(&d, RoundingMode::Down).abs())
            .filter(|step| !step.is_zero());

        Self {
            minimum,
            maximum,
            multiple_of,
        }
    }

    /// Snap `value` down onto a step boundary, then correct by one step if
    /// that left the range.
    pub fn snap(&self, value: BigInt) -> BigInt {
        let Some(step) = &self.multiple_of else {
            return value;
        };
        let mut result = &value - value.mod_floor(step);
        if result < self.minimum {
            result += step;
        }
        if result > self.maximum {
            result -= step;
        }
        result
    }
}

/// Pick an integer for `bounds` under `strategy`. `None` means emit `null`.
pub fn bounded_integer(
    bounds: &Bounds<BigInt>,
    strategy: ConstrainedNumberOption,
    rng: &mut dyn RngCore,
) -> Option<BigInt> {
    let Bounds {
        minimum, maximum, ..
    } = bounds;
    match strategy {
        ConstrainedNumberOption::Null => None,
        ConstrainedNumberOption::Minimum => Some(bounds.snap(minimum.clone())),
        ConstrainedNumberOption::Maximum => Some(bounds.snap(maximum.clone())),
        ConstrainedNumberOption::Midpoint => {
            Some(bounds.snap((minimum + maximum).div_floor(&BigInt::from(2))))
        }
        ConstrainedNumberOption::Fake => {
            if maximum < minimum {
                return Some(minimum.clone());
            }
            let upper = maximum + 1;
            let candidate = rng.gen_bigint_range(minimum, &upper);
            Some(bounds.snap(candidate))
        }
        ConstrainedNumberOption::Random => Some(BigInt::from(rng.gen::<i64>())),
    }
}

// ---------------------------------------------------------------------------
// Decimals
// ---------------------------------------------------------------------------

impl Bounds<BigDecimal> {
    /// Read the numeric keywords of a `number` schema.
    ///
    /// Exclusive bounds shift by `0.0001`, which is not a strict guarantee
    /// for bounds given at a finer precision.
    pub fn decimal(obj: &Map<String, Value>) -> Self {
        let epsilon = epsilon();
        let mut minimum = decimal_keyword(obj, "minimum").unwrap_or_else(BigDecimal::zero);
        let mut maximum =
            decimal_keyword(obj, "maximum").unwrap_or_else(|| &minimum + BigDecimal::from(DEFAULT_SPAN));

        match obj.get("exclusiveMinimum") {
            Some(Value::Bool(true)) => minimum = &minimum + &epsilon,
            Some(Value::Number(n)) => {
                if let Some(d) = parse_decimal(n) {
                    minimum = minimum.max(d + &epsilon);
                }
            }
            _ => {}
        }
        match obj.get("exclusiveMaximum") {
            Some(Value::Bool(true)) => maximum = &maximum - &epsilon,
            Some(Value::Number(n)) => {
                if let Some(d) = parse_decimal(n) {
                    maximum = maximum.min(d - &epsilon);
                }
            }
            _ => {}
        }

        let multiple_of = decimal_keyword(obj, "multipleOf")
            .map(|d| d.abs())
            .filter(|step| !step.is_zero());

        Self {
            minimum,
            maximum,
            multiple_of,
        }
    }

    /// Snap `value` down onto a step boundary, then correct by one step if
    /// that left the range.
    pub fn snap(&self, value: BigDecimal) -> BigDecimal {
        let Some(step) = &self.multiple_of else {
            return value;
        };
        let mut remainder = &value % step;
        if remainder < BigDecimal::zero() {
            remainder += step;
        }
        let mut result = value - remainder;
        if result < self.minimum {
            result += step;
        }
        if result > self.maximum {
            result -= step;
        }
        result
    }

    /// Snap to the nearest step (half up) instead of the one below.
    fn snap_nearest(&self, value: BigDecimal) -> BigDecimal {
        let Some(step) = &self.multiple_of else {
            return value;
        };
        let steps = (&value / step).with_scale_round(0, RoundingMode::HalfUp);
        let mut result = steps * step;
        if result < self.minimum {
            result += step;
        }
        if result > self.maximum {
            result -= step;
        }
        result
    }
}

/// Pick a decimal for `bounds` under `strategy`. `None` means emit `null`.
pub fn bounded_decimal(
    bounds: &Bounds<BigDecimal>,
    strategy: ConstrainedNumberOption,
    rng: &mut dyn RngCore,
) -> Option<BigDecimal> {
    let Bounds {
        minimum, maximum, ..
    } = bounds;
    match strategy {
        ConstrainedNumberOption::Null => None,
        ConstrainedNumberOption::Minimum => Some(bounds.snap(minimum.clone())),
        ConstrainedNumberOption::Maximum => Some(bounds.snap(maximum.clone())),
        ConstrainedNumberOption::Midpoint => Some(bounds.snap((minimum + maximum).half())),
        ConstrainedNumberOption::Fake => {
            if maximum < minimum {
                return Some(minimum.clone());
            }
            let candidate = minimum + (maximum - minimum) * unit_fraction(rng);
            Some(bounds.snap_nearest(candidate.normalized()))
        }
        ConstrainedNumberOption::Random => Some(unit_fraction(rng) * BigDecimal::from(DEFAULT_SPAN)),
    }
}

/// Uniform value in `[0, 1)` with nine decimal places.
fn unit_fraction(rng: &mut dyn RngCore) -> BigDecimal {
    let digits: u64 = rng.gen_range(0..1_000_000_000);
    BigDecimal::new(BigInt::from(digits), 9)
}

fn epsilon() -> BigDecimal {
    BigDecimal::new(BigInt::from(1), EPSILON_SCALE)
}

// ---------------------------------------------------------------------------
// Leaf values
// ---------------------------------------------------------------------------

/// Value for `type: integer`.
pub fn integer_value(obj: &Map<String, Value>, policy: &Policy, rng: &mut dyn RngCore) -> Value {
    match policy.number {
        NumberOption::Null => Value::Null,
        NumberOption::Zero => Value::from(0),
        NumberOption::Generated => {
            let bounds = Bounds::integer(obj);
            bounded_integer(&bounds, policy.constrained_number, rng)
                .map_or(Value::Null, |n| number(n.to_string()))
        }
    }
}

/// Value for `type: number`.
pub fn decimal_value(obj: &Map<String, Value>, policy: &Policy, rng: &mut dyn RngCore) -> Value {
    match policy.number {
        NumberOption::Null => Value::Null,
        NumberOption::Zero => Value::from(0),
        NumberOption::Generated => {
            let bounds = Bounds::decimal(obj);
            bounded_decimal(&bounds, policy.constrained_number, rng)
                .map_or(Value::Null, |d| number(d.to_string()))
        }
    }
}

/// Value for `type: string`.
///
/// `pattern` wins over `format`; both win over length bounds.
pub fn string_value(
    obj: &Map<String, Value>,
    policy: &Policy,
    source: &dyn ValueSource,
    rng: &mut dyn RngCore,
) -> Value {
    match policy.string {
        StringOption::Null => return Value::Null,
        StringOption::Empty => return Value::String(String::new()),
        StringOption::Generated => {}
    }

    let strategy = policy.formatted_string;

    if let Some(pattern) = obj.get("pattern").and_then(Value::as_str) {
        if strategy != FormattedStringOption::Null {
            return Value::String(pattern_string(pattern, source, rng));
        }
    }

    if let Some(format) = obj.get("format").and_then(Value::as_str) {
        if strategy == FormattedStringOption::Null {
            return Value::Null;
        }
        return format_string(format, source, rng).map_or(Value::Null, Value::String);
    }

    match strategy {
        FormattedStringOption::Null => Value::Null,
        FormattedStringOption::Fake | FormattedStringOption::Random => {
            let min_len = usize_keyword(obj, "minLength").unwrap_or(0);
            let max_len = usize_keyword(obj, "maxLength").unwrap_or(min_len + DEFAULT_LENGTH_SPAN);
            Value::String(source.random_string(min_len, max_len, rng))
        }
    }
}

/// A string matching `pattern`, or [`PATTERN_FALLBACK`] when the source
/// cannot produce one.
pub fn pattern_string(pattern: &str, source: &dyn ValueSource, rng: &mut dyn RngCore) -> String {
    match source.pattern(pattern, rng) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(pattern, error = %e, "pattern generation failed, using placeholder");
            PATTERN_FALLBACK.to_string()
        }
    }
}

/// Dispatch a `format` keyword to the source. Unknown formats yield `None`.
pub fn format_string(format: &str, source: &dyn ValueSource, rng: &mut dyn RngCore) -> Option<String> {
    let value = match format {
        "email" => source.email(rng),
        "uri" | "url" => source.uri(rng),
        "date" => source.date(rng),
        "date-time" => source.date_time(rng),
        "time" => source.time(rng),
        "uuid" => source.uuid(rng),
        "hostname" => source.hostname(rng),
        "ipv4" => source.ipv4(rng),
        "ipv6" => source.ipv6(rng),
        other => {
            tracing::trace!(format = other, "unknown format");
            return None;
        }
    };
    Some(value)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_decimal(n: &Number) -> Option<BigDecimal> {
    BigDecimal::from_str(&n.to_string()).ok()
}

fn decimal_keyword(obj: &Map<String, Value>, key: &str) -> Option<BigDecimal> {
    match obj.get(key)? {
        Value::Number(n) => parse_decimal(n),
        _ => None,
    }
}

pub(crate) fn usize_keyword(obj: &Map<String, Value>, key: &str) -> Option<usize> {
    obj.get(key)?.as_u64().and_then(|n| usize::try_from(n).ok())
}

fn to_integer(value: &BigDecimal, mode: RoundingMode) -> BigInt {
    value.with_scale_round(0, mode).into_bigint_and_exponent().0
}

/// Exact JSON number from its decimal text.
fn number(text: String) -> Value {
    Number::from_str(&text).map_or(Value::Null, Value::Number)
}
