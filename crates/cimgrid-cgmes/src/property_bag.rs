//! Flat key/value records read from the input document.
//!
//! Every CGMES object arrives as one [`PropertyBag`]. Values may be JSON
//! strings, numbers or booleans; the accessors accept any of them so that
//! `"1.5"` and `1.5` read the same. Missing numeric values read as NaN.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(Map<String, Value>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used mostly by tests and fixtures
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Raw value as text, numbers and booleans included
    pub fn string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Identifier value: namespace prefix up to `#` and one leading `_` removed.
    pub fn id(&self, key: &str) -> Option<String> {
        let raw = self.string(key)?;
        let local = raw.rsplit('#').next().unwrap_or(&raw);
        let local = local.strip_prefix('_').unwrap_or(local);
        if local.is_empty() {
            None
        } else {
            Some(local.to_string())
        }
    }

    /// Local name of an enumeration or class value, e.g. `symmetrical`
    /// for `...#PhaseTapChangerKind.symmetrical`.
    pub fn local(&self, key: &str) -> Option<String> {
        let raw = self.string(key)?;
        let local = raw.rsplit('#').next().unwrap_or(&raw);
        Some(local.rsplit('.').next().unwrap_or(local).to_string())
    }

    pub fn as_f64(&self, key: &str) -> f64 {
        match self.get(key) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    /// Numeric value, `default` when absent or not a number
    pub fn as_f64_or(&self, key: &str, default: f64) -> f64 {
        let value = self.as_f64(key);
        if value.is_nan() {
            default
        } else {
            value
        }
    }

    /// Integer value; fractional numbers are rounded
    pub fn as_i32(&self, key: &str) -> Option<i32> {
        let value = self.as_f64(key);
        if value.is_finite() {
            Some(value.round() as i32)
        } else {
            None
        }
    }

    pub fn as_i32_or(&self, key: &str, default: i32) -> i32 {
        self.as_i32(key).unwrap_or(default)
    }

    pub fn as_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            _ => None,
        }
    }

    pub fn as_bool_or(&self, key: &str, default: bool) -> bool {
        self.as_bool(key).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_from_strings_and_numbers() {
        let bag = PropertyBag::new()
            .with("r", 0.5)
            .with("x", "5.0")
            .with("bch", "not a number");
        assert_eq!(bag.as_f64("r"), 0.5);
        assert_eq!(bag.as_f64("x"), 5.0);
        assert!(bag.as_f64("bch").is_nan());
        assert!(bag.as_f64("gch").is_nan());
        assert_eq!(bag.as_f64_or("gch", 0.0), 0.0);
    }

    #[test]
    fn test_identifiers_strip_namespace() {
        let bag = PropertyBag::new()
            .with("Terminal", "http://example.eu/eq#_T1")
            .with("ConductingEquipment", "_L1")
            .with("TopologicalNode", "TN1")
            .with("empty", "#_");
        assert_eq!(bag.id("Terminal").as_deref(), Some("T1"));
        assert_eq!(bag.id("ConductingEquipment").as_deref(), Some("L1"));
        assert_eq!(bag.id("TopologicalNode").as_deref(), Some("TN1"));
        assert_eq!(bag.id("empty"), None);
        assert_eq!(bag.id("absent"), None);
    }

    #[test]
    fn test_local_names() {
        let bag = PropertyBag::new()
            .with("phaseTapChangerType", "http://iec.ch/TC57/CIM100#PhaseTapChangerKind.asymmetrical")
            .with("type", "Breaker");
        assert_eq!(bag.local("phaseTapChangerType").as_deref(), Some("asymmetrical"));
        assert_eq!(bag.local("type").as_deref(), Some("Breaker"));
    }

    #[test]
    fn test_integers_and_booleans() {
        let bag = PropertyBag::new()
            .with("SVtapStep", 3.6)
            .with("connected", "false")
            .with("ltcFlag", true)
            .with("open", 1);
        assert_eq!(bag.as_i32("SVtapStep"), Some(4));
        assert_eq!(bag.as_i32_or("normalStep", 2), 2);
        assert_eq!(bag.as_bool("connected"), Some(false));
        assert!(bag.as_bool_or("ltcFlag", false));
        assert!(bag.as_bool_or("open", false));
        assert!(bag.as_bool_or("retained", true));
    }

    #[test]
    fn test_null_values_are_absent() {
        let bag: PropertyBag = serde_json::from_str(r#"{"p": null, "q": 1.0}"#).unwrap();
        assert!(!bag.contains_key("p"));
        assert!(bag.contains_key("q"));
    }
}
