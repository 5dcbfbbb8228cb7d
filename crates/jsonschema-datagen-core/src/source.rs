//! Leaf value sources.
//!
//! The generator never invents format-specific strings itself. It asks a
//! [`ValueSource`] for an email, a UUID, a string matching a regex, and so on,
//! passing the per-call RNG along. [`FakeValueSource`] is the default.

use chrono::{DateTime, Utc};
use fake::faker::internet::en::{DomainSuffix, IPv4, IPv6, SafeEmail};
use fake::faker::lorem::en::Word;
use fake::Fake;
use rand::distributions::{Alphanumeric, DistString};
use rand::{Rng, RngCore};

use crate::error::GenerateError;

/// Largest repetition count used for unbounded regex quantifiers (`*`, `+`).
const MAX_PATTERN_REPEAT: u32 = 16;

/// Bounds of the window `date`, `date-time` and `time` values are drawn from
/// (2015-01-01T00:00:00Z .. 2025-01-01T00:00:00Z).
const TIMESTAMP_WINDOW: (i64, i64) = (1_420_070_400, 1_735_689_600);

/// Supplier of format-specific and pattern-matching strings.
///
/// Implementations must be usable from several threads at once; all per-call
/// state lives in the RNG argument.
pub trait ValueSource: Send + Sync {
    fn email(&self, rng: &mut dyn RngCore) -> String;

    fn uri(&self, rng: &mut dyn RngCore) -> String;

    /// ISO-8601 calendar date, `YYYY-MM-DD`.
    fn date(&self, rng: &mut dyn RngCore) -> String;

    /// ISO-8601 date and time, `YYYY-MM-DDTHH:MM:SS`.
    fn date_time(&self, rng: &mut dyn RngCore) -> String;

    /// ISO-8601 time of day, `HH:MM:SS`.
    fn time(&self, rng: &mut dyn RngCore) -> String;

    fn uuid(&self, rng: &mut dyn RngCore) -> String;

    fn hostname(&self, rng: &mut dyn RngCore) -> String;

    fn ipv4(&self, rng: &mut dyn RngCore) -> String;

    fn ipv6(&self, rng: &mut dyn RngCore) -> String;

    /// A string whose length (in characters) lies in `min_len..=max_len`.
    fn random_string(&self, min_len: usize, max_len: usize, rng: &mut dyn RngCore) -> String;

    /// A string matching `pattern`.
    ///
    /// Returns [`GenerateError::Pattern`] when the regex cannot be compiled or
    /// uses constructs the implementation cannot satisfy.
    fn pattern(&self, pattern: &str, rng: &mut dyn RngCore) -> Result<String, GenerateError>;
}

/// [`ValueSource`] backed by the `fake`, `uuid`, `chrono` and `rand_regex`
/// crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeValueSource;

impl FakeValueSource {
    pub fn new() -> Self {
        Self
    }

    fn timestamp(rng: &mut dyn RngCore) -> DateTime<Utc> {
        let (start, end) = TIMESTAMP_WINDOW;
        let secs = rng.gen_range(start..end);
        DateTime::from_timestamp(secs, 0).unwrap_or_default()
    }
}

impl ValueSource for FakeValueSource {
    fn email(&self, rng: &mut dyn RngCore) -> String {
        let mut rng = rng;
        SafeEmail().fake_with_rng(&mut rng)
    }

    fn uri(&self, rng: &mut dyn RngCore) -> String {
        let host = self.hostname(rng);
        let mut rng = rng;
        let segment: String = Word().fake_with_rng(&mut rng);
        format!("https://{host}/{segment}")
    }

    fn date(&self, rng: &mut dyn RngCore) -> String {
        Self::timestamp(rng).format("%Y-%m-%d").to_string()
    }

    fn date_time(&self, rng: &mut dyn RngCore) -> String {
        Self::timestamp(rng).format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    fn time(&self, rng: &mut dyn RngCore) -> String {
        Self::timestamp(rng).format("%H:%M:%S").to_string()
    }

    fn uuid(&self, rng: &mut dyn RngCore) -> String {
        let bytes: [u8; 16] = rng.gen();
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string()
    }

    fn hostname(&self, rng: &mut dyn RngCore) -> String {
        let mut rng = rng;
        let label: String = Word().fake_with_rng(&mut rng);
        let suffix: String = DomainSuffix().fake_with_rng(&mut rng);
        format!("{}.{}", label.to_lowercase(), suffix)
    }

    fn ipv4(&self, rng: &mut dyn RngCore) -> String {
        let mut rng = rng;
        IPv4().fake_with_rng(&mut rng)
    }

    fn ipv6(&self, rng: &mut dyn RngCore) -> String {
        let mut rng = rng;
        IPv6().fake_with_rng(&mut rng)
    }

    fn random_string(&self, min_len: usize, max_len: usize, rng: &mut dyn RngCore) -> String {
        let len = if max_len <= min_len {
            min_len
        } else {
            rng.gen_range(min_len..=max_len)
        };
        let mut rng = rng;
        Alphanumeric.sample_string(&mut rng, len)
    }

    fn pattern(&self, pattern: &str, rng: &mut dyn RngCore) -> Result<String, GenerateError> {
        let regex = rand_regex::Regex::compile(strip_anchors(pattern), MAX_PATTERN_REPEAT)
            .map_err(|e| GenerateError::Pattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        Ok(rng.sample::<String, _>(&regex))
    }
}

/// Drop a leading `^` and an unescaped trailing `$`.
///
/// JSON Schema patterns are unanchored searches, so a generated match of the
/// body alone also matches the anchored form.
fn strip_anchors(pattern: &str) -> &str {
    let body = pattern.strip_prefix('^').unwrap_or(pattern);
    match body.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => body,
    }
}
