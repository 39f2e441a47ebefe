//! Annotations attached to nodes and edges.
//!
//! Provides the [Annotations] struct, an insertion-ordered key-value store
//! holding [AnnotationValue]s (`f64`, `i64`, or `String`). Newick readers
//! fill them from `[&key=value,...]` comments and writers emit them back in
//! the same order.

use std::fmt;

// =#========================================================================#=
// ANNOTATIONS
// =#========================================================================#=
/// Key-value annotations of a single node or edge.
///
/// Keys are unique; [set](Self::set) replaces an existing value in place,
/// keeping the key's original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    entries: Vec<(String, AnnotationValue)>,
}

impl Annotations {
    /// Creates an empty set of annotations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, if set.
    pub fn get(&self, key: &str) -> Option<&AnnotationValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Sets `key` to `value`, replacing any previous value.
    ///
    /// # Arguments
    /// * `key` - Annotation name (e.g. "rate", "pop_size")
    /// * `value` - Anything convertible into an [AnnotationValue]
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AnnotationValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Removes and returns the value for `key`.
    pub fn remove(&mut self, key: &str) -> Option<AnnotationValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Whether an annotation for `key` exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of annotations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no annotations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates key-value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnnotationValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// =#========================================================================#=
// ANNOTATION VALUE
// =#========================================================================#=
/// Enum to encapsulate a parsed annotation value.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// For floating point values
    Float(f64),
    /// For integer values
    Int(i64),
    /// For strings
    String(String),
}

impl AnnotationValue {
    /// Parses a raw annotation value, preferring integer, then float,
    /// then falling back to a string.
    pub fn parse(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            AnnotationValue::Int(v)
        } else if let Ok(v) = raw.parse::<f64>() {
            AnnotationValue::Float(v)
        } else {
            AnnotationValue::String(raw.to_string())
        }
    }

    /// Numeric value as `f64`, if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AnnotationValue::Float(v) => Some(*v),
            AnnotationValue::Int(v) => Some(*v as f64),
            AnnotationValue::String(_) => None,
        }
    }

    /// Integer value, if this is an [AnnotationValue::Int].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AnnotationValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// String value, if this is an [AnnotationValue::String].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Float(v) => write!(f, "{v}"),
            AnnotationValue::Int(v) => write!(f, "{v}"),
            AnnotationValue::String(s) => f.write_str(s),
        }
    }
}

impl From<f64> for AnnotationValue {
    fn from(v: f64) -> Self {
        AnnotationValue::Float(v)
    }
}

impl From<f32> for AnnotationValue {
    fn from(v: f32) -> Self {
        AnnotationValue::Float(v as f64)
    }
}

impl From<i64> for AnnotationValue {
    fn from(v: i64) -> Self {
        AnnotationValue::Int(v)
    }
}

impl From<i32> for AnnotationValue {
    fn from(v: i32) -> Self {
        AnnotationValue::Int(v as i64)
    }
}

impl From<usize> for AnnotationValue {
    fn from(v: usize) -> Self {
        AnnotationValue::Int(v as i64)
    }
}

impl From<String> for AnnotationValue {
    fn from(v: String) -> Self {
        AnnotationValue::String(v)
    }
}

impl From<&str> for AnnotationValue {
    fn from(v: &str) -> Self {
        AnnotationValue::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut annotations = Annotations::new();
        annotations.set("rate", 0.5);
        annotations.set("color", "blue");
        annotations.set("rate", 2);
        let keys: Vec<&str> = annotations.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["rate", "color"]);
        assert_eq!(annotations.get("rate"), Some(&AnnotationValue::Int(2)));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(AnnotationValue::parse("3"), AnnotationValue::Int(3));
        assert_eq!(AnnotationValue::parse("0.25"), AnnotationValue::Float(0.25));
        assert_eq!(
            AnnotationValue::parse("blue"),
            AnnotationValue::String("blue".to_string())
        );
    }
}
