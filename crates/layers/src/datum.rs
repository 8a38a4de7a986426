use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EngineError, json_kind};

/// One dataset entry: a JSON object with arbitrary semantic fields.
///
/// `null` fields read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Datum(Map<String, Value>);

impl Datum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns `None` unless `value` is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn str(&self, field: &str) -> Option<&str> {
        self.get(field)?.as_str()
    }

    /// Numeric field; numeric strings are accepted too.
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Fills fields that are missing (or `null`) from `other`. Set fields
    /// are never overwritten.
    pub fn defaults_from(&mut self, other: &Datum) {
        for (field, value) in &other.0 {
            if self.get(field).is_none() {
                self.0.insert(field.clone(), value.clone());
            }
        }
    }

    /// Lifts the fields of a nested `options` object to the top level (set
    /// fields win) and drops `options`. Running it twice changes nothing.
    pub fn flatten_options(&mut self) -> bool {
        let Some(Value::Object(nested)) = self.0.remove("options") else {
            return false;
        };
        self.defaults_from(&Datum(nested));
        true
    }
}

/// Stable identity of a dataset entry across reconciliations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Digest of the datum's JSON text; object keys serialize in sorted
    /// order and integral floats as integers, so structurally equal datums
    /// share a key.
    pub fn structural(datum: &Datum) -> Self {
        let text = canonical(&datum.to_value()).to_string();
        Self(blake3::hash(text.as_bytes()).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// `5.0` and `5` are the same number to a JSON producer.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 => Value::from(f as i64),
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), canonical(v))).collect()),
        _ => value.clone(),
    }
}

/// Key function applied to every entry of a dataset.
#[derive(Clone)]
pub struct KeyFn(Rc<dyn Fn(&Datum) -> Key>);

impl KeyFn {
    pub fn new(f: impl Fn(&Datum) -> Key + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn structural() -> Self {
        Self::new(Key::structural)
    }

    /// Keys by a field's value; entries without the field fall back to
    /// structural identity.
    pub fn field(name: &str) -> Self {
        let name = name.to_string();
        Self::new(move |datum| match datum.get(&name) {
            Some(Value::String(s)) => Key::new(format!("{name}:{s}")),
            Some(other) => Key::new(format!("{name}:{other}")),
            None => Key::structural(datum),
        })
    }

    pub fn key(&self, datum: &Datum) -> Key {
        (self.0)(datum)
    }
}

impl Default for KeyFn {
    fn default() -> Self {
        Self::structural()
    }
}

impl fmt::Debug for KeyFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyFn(..)")
    }
}

/// Validates a marker or connector dataset: a JSON array of objects.
pub fn dataset_from_value(layer: &str, value: Value) -> Result<Vec<Datum>, EngineError> {
    let Value::Array(items) = value else {
        return Err(EngineError::InputShape {
            layer: layer.to_string(),
            expected: "an array of objects",
            found: json_kind(&value).to_string(),
        });
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(Datum::from_map(map)),
            other => Err(EngineError::InputShape {
                layer: layer.to_string(),
                expected: "an array of objects",
                found: format!("an array containing {}", json_kind(&other)),
            }),
        })
        .collect()
}
