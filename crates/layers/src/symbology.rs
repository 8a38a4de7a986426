use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use scene::RegionFeature;

use crate::datum::Datum;

pub const DEFAULT_FILL: &str = "#ABDDA4";

/// What a computed style sees: the datum, plus the region when the
/// primitive draws one.
#[derive(Debug, Clone, Copy)]
pub struct StyleContext<'a> {
    pub datum: &'a Datum,
    pub geography: Option<&'a RegionFeature>,
}

impl<'a> StyleContext<'a> {
    pub fn new(datum: &'a Datum) -> Self {
        Self {
            datum,
            geography: None,
        }
    }

    pub fn with_geography(datum: &'a Datum, geography: &'a RegionFeature) -> Self {
        Self {
            datum,
            geography: Some(geography),
        }
    }
}

/// A style value: fixed, or computed per primitive at render time.
pub enum Style<T> {
    Fixed(T),
    Computed(Rc<dyn Fn(&StyleContext<'_>) -> T>),
}

impl<T: Clone> Style<T> {
    pub fn computed(f: impl Fn(&StyleContext<'_>) -> T + 'static) -> Self {
        Style::Computed(Rc::new(f))
    }

    pub fn evaluate(&self, cx: &StyleContext<'_>) -> T {
        match self {
            Style::Fixed(value) => value.clone(),
            Style::Computed(f) => f(cx),
        }
    }
}

impl<T: Clone> Clone for Style<T> {
    fn clone(&self) -> Self {
        match self {
            Style::Fixed(value) => Style::Fixed(value.clone()),
            Style::Computed(f) => Style::Computed(Rc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Style<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Style::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<T> From<T> for Style<T> {
    fn from(value: T) -> Self {
        Style::Fixed(value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Style<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Style::Fixed)
    }
}

/// Per-datum value if present, else the option value; computed styles are
/// evaluated against `cx`. `None` only when both are absent.
pub fn resolve<T: Clone>(
    datum_value: Option<&Style<T>>,
    option_value: Option<&Style<T>>,
    cx: &StyleContext<'_>,
) -> Option<T> {
    datum_value.or(option_value).map(|style| style.evaluate(cx))
}

/// [`resolve`] with the per-datum value read from `field` of the context's
/// datum. Fields that do not parse as `T` count as absent.
pub fn resolve_field<T: Clone + DeserializeOwned>(
    field: &str,
    option_value: Option<&Style<T>>,
    cx: &StyleContext<'_>,
) -> Option<T> {
    let from_datum = cx
        .datum
        .get(field)
        .and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
        .map(Style::Fixed);
    resolve(from_datum.as_ref(), option_value, cx)
}

/// Named fill colors; `defaultFill` is the fallback for everything.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Fills(BTreeMap<String, String>);

impl Fills {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, color: &str) -> Self {
        self.0.insert(key.to_string(), color.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn default_fill(&self) -> &str {
        self.get("defaultFill").unwrap_or(DEFAULT_FILL)
    }

    /// Missing entries (including `defaultFill`) are taken from `defaults`.
    pub fn merged_over(&self, defaults: &Fills) -> Fills {
        let mut out = defaults.0.clone();
        out.extend(self.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Fills(out)
    }
}

impl Default for Fills {
    fn default() -> Self {
        let mut fills = BTreeMap::new();
        fills.insert("defaultFill".to_string(), DEFAULT_FILL.to_string());
        Self(fills)
    }
}
