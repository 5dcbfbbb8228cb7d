//! Recursion guard for self-referential schemas.
//!
//! Every schema node entered by the generator is reduced to a [`fingerprint`]
//! and counted in a [`RecursionTracker`]. Re-entering a node whose count
//! already exceeds the cap yields `null` instead of another level of nesting.
//!
//! Counts are scoped: [`RecursionTracker::enter`] returns a [`RecursionScope`]
//! that restores the previous count when it is dropped, so the tracker only
//! reflects the current call path and never sibling branches.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use serde_json::Value;

/// Structural key for a schema node.
///
/// Built from `type`, the names of `properties` (in declaration order),
/// `title` and `$id`. Distinct nodes sharing all four attributes share a key.
pub fn fingerprint(node: &Value) -> String {
    let mut key = String::new();
    let Some(obj) = node.as_object() else {
        return key;
    };

    if let Some(ty) = obj.get("type") {
        match ty {
            Value::Array(types) => {
                key.push_str("type:[");
                for t in types {
                    key.push_str(&text(t));
                    key.push(',');
                }
                key.push(']');
            }
            other => {
                key.push_str("type:");
                key.push_str(&text(other));
            }
        }
    }

    if let Some(props) = obj.get("properties") {
        key.push_str("|props:");
        if let Some(props) = props.as_object() {
            for name in props.keys() {
                key.push_str(name);
            }
        }
    }

    if let Some(title) = obj.get("title") {
        key.push_str("|title:");
        key.push_str(&text(title));
    }

    if let Some(id) = obj.get("$id") {
        key.push_str("|$id:");
        key.push_str(&text(id));
    }

    key
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Per-call map from fingerprint to the number of times that node is open on
/// the current path.
#[derive(Debug, Default)]
pub struct RecursionTracker {
    counts: HashMap<String, usize>,
    max_depth: usize,
}

impl RecursionTracker {
    pub fn new(max_depth: usize) -> Self {
        Self {
            counts: HashMap::new(),
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Current open count for a fingerprint (0 when never entered).
    pub fn depth(&self, fingerprint: &str) -> usize {
        self.counts.get(fingerprint).copied().unwrap_or(0)
    }

    /// True when no node is open.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Open a node. Returns `None` when the count for `fingerprint` already
    /// exceeds the cap; the caller should emit `null` for that subtree.
    ///
    /// A cap of `n` lets a node be open `n + 1` times on one path; with a cap
    /// of 0 it is entered once and cut on the first re-entry.
    pub fn enter(&mut self, fingerprint: String) -> Option<RecursionScope<'_>> {
        let previous = self.depth(&fingerprint);
        if previous > self.max_depth {
            return None;
        }
        self.counts.insert(fingerprint.clone(), previous + 1);
        Some(RecursionScope {
            tracker: self,
            fingerprint,
            previous,
        })
    }

    fn restore(&mut self, fingerprint: &str, previous: usize) {
        if previous == 0 {
            self.counts.remove(fingerprint);
        } else if let Some(count) = self.counts.get_mut(fingerprint) {
            *count = previous;
        }
    }
}

/// An open node. Dereferences to the tracker so nested nodes can be entered
/// through it; dropping it restores the count it replaced.
#[derive(Debug)]
pub struct RecursionScope<'t> {
    tracker: &'t mut RecursionTracker,
    fingerprint: String,
    previous: usize,
}

impl RecursionScope<'_> {
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl Deref for RecursionScope<'_> {
    type Target = RecursionTracker;

    fn deref(&self) -> &RecursionTracker {
        self.tracker
    }
}

impl DerefMut for RecursionScope<'_> {
    fn deref_mut(&mut self) -> &mut RecursionTracker {
        self.tracker
    }
}

impl Drop for RecursionScope<'_> {
    fn drop(&mut self) {
        self.tracker.restore(&self.fingerprint, self.previous);
    }
}
