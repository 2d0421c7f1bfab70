//! Dependency snapshots for change detection.
//!
//! The host passes the values a fetch depends on at every activation.
//! They are captured as an ordered list of [`Value`]s and compared
//! structurally against the previous activation's list: order matters,
//! nested arrays and objects are compared deeply, object key order does
//! not matter.

use crate::error::FetchError;
use serde::Serialize;
use serde_json::Value;

/// Ordered list of dependency values
///
/// ```
/// use composable_fetch_core::{DependencySnapshot, deps};
///
/// let before = deps![1, "en"];
/// assert_eq!(before, deps![1, "en"]);
/// assert_ne!(before, deps!["en", 1]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencySnapshot(Vec<Value>);

impl DependencySnapshot {
    /// Snapshot of an already-converted list
    #[must_use]
    pub const fn from_values(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// An empty list (a fetch with no dependencies)
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Capture any serializable value
    ///
    /// Sequences (arrays, tuples, `Vec`s) become one entry per element;
    /// any other value becomes a single-entry list.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decode`] if the value cannot be serialized
    /// (for example a map with non-string keys).
    pub fn capture(dependencies: &impl Serialize) -> Result<Self, FetchError> {
        match serde_json::to_value(dependencies)? {
            Value::Array(values) => Ok(Self(values)),
            value => Ok(Self(vec![value])),
        }
    }

    /// The captured values, in order
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Number of captured values
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no dependencies
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `other` differs from this snapshot
    #[must_use]
    pub fn changed(&self, other: &Self) -> bool {
        self != other
    }
}

impl From<Vec<Value>> for DependencySnapshot {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for DependencySnapshot {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Convert one dependency for [`deps!`](crate::deps)
///
/// A value that cannot be serialized is recorded as `null` and logged.
#[doc(hidden)]
pub fn dependency_value(value: &impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or_else(|error| {
        tracing::warn!(error = %error, "Dependency value is not serializable; recorded as null");
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equal_lists_are_unchanged() {
        let previous = DependencySnapshot::from_values(vec![json!(1)]);
        let current = DependencySnapshot::from_values(vec![json!(1)]);
        assert!(!previous.changed(&current));
    }

    #[test]
    fn comparison_is_deep() {
        let previous = DependencySnapshot::from_values(vec![json!({ "id": 1, "tags": ["a"] })]);
        let same = DependencySnapshot::from_values(vec![json!({ "tags": ["a"], "id": 1 })]);
        let nested_change = DependencySnapshot::from_values(vec![json!({ "id": 1, "tags": ["b"] })]);

        assert!(!previous.changed(&same));
        assert!(previous.changed(&nested_change));
    }

    #[test]
    fn comparison_is_order_sensitive() {
        let previous = DependencySnapshot::from_values(vec![json!(1), json!(2)]);
        let swapped = DependencySnapshot::from_values(vec![json!(2), json!(1)]);
        assert!(previous.changed(&swapped));
    }

    #[test]
    fn length_change_is_a_change() {
        let previous = DependencySnapshot::from_values(vec![json!(1)]);
        let longer = DependencySnapshot::from_values(vec![json!(1), json!(null)]);
        assert!(previous.changed(&longer));
        assert!(DependencySnapshot::empty().changed(&previous));
    }

    #[test]
    fn capture_splits_sequences() {
        let Ok(snapshot) = DependencySnapshot::capture(&(7, "x")) else {
            unreachable!("tuples of primitives always serialize");
        };
        assert_eq!(snapshot.values(), &[json!(7), json!("x")]);

        let Ok(single) = DependencySnapshot::capture(&"user-1") else {
            unreachable!("strings always serialize");
        };
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn capture_rejects_unserializable_maps() {
        let mut map = std::collections::HashMap::new();
        map.insert((1, 2), "pair keys");
        assert!(matches!(
            DependencySnapshot::capture(&map),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn deps_macro_builds_snapshot() {
        let user_id = 5_u64;
        let filter = Some("active");
        let snapshot = crate::deps![user_id, filter, ["a", "b"]];
        assert_eq!(
            snapshot.values(),
            &[json!(5), json!("active"), json!(["a", "b"])]
        );
        assert!(crate::deps![].is_empty());
    }
}
