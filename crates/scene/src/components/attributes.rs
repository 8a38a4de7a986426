use std::collections::BTreeMap;
use std::fmt;

use super::color::Rgba;
use super::path::PathData;

/// Visual attribute of a primitive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attr {
    D,
    Cx,
    Cy,
    R,
    X,
    Y,
    X1,
    Y1,
    X2,
    Y2,
    Fill,
    FillOpacity,
    Stroke,
    StrokeWidth,
    StrokeOpacity,
    StrokeLinecap,
    StrokeDasharray,
    StrokeDashoffset,
    Opacity,
    Filter,
    FontSize,
    FontFamily,
    Text,
}

impl Attr {
    /// SVG attribute or style property name.
    pub fn name(self) -> &'static str {
        match self {
            Attr::D => "d",
            Attr::Cx => "cx",
            Attr::Cy => "cy",
            Attr::R => "r",
            Attr::X => "x",
            Attr::Y => "y",
            Attr::X1 => "x1",
            Attr::Y1 => "y1",
            Attr::X2 => "x2",
            Attr::Y2 => "y2",
            Attr::Fill => "fill",
            Attr::FillOpacity => "fill-opacity",
            Attr::Stroke => "stroke",
            Attr::StrokeWidth => "stroke-width",
            Attr::StrokeOpacity => "stroke-opacity",
            Attr::StrokeLinecap => "stroke-linecap",
            Attr::StrokeDasharray => "stroke-dasharray",
            Attr::StrokeDashoffset => "stroke-dashoffset",
            Attr::Opacity => "opacity",
            Attr::Filter => "filter",
            Attr::FontSize => "font-size",
            Attr::FontFamily => "font-family",
            Attr::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Number(f64),
    Text(String),
    Path(PathData),
}

impl AttrValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Text(s) => s.trim().trim_end_matches("px").parse().ok(),
            AttrValue::Path(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&PathData> {
        match self {
            AttrValue::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Value at eased progress `t` of a transition from `self` to `to`.
    ///
    /// Numbers, colors and structurally equal paths interpolate; anything
    /// else holds `self` until completion. `t >= 1` always yields `to`.
    pub fn interpolate(&self, to: &AttrValue, t: f64) -> AttrValue {
        if t >= 1.0 {
            return to.clone();
        }
        match (self, to) {
            (AttrValue::Number(a), AttrValue::Number(b)) => AttrValue::Number(a + (b - a) * t),
            (AttrValue::Text(a), AttrValue::Text(b)) => match (Rgba::parse(a), Rgba::parse(b)) {
                (Some(ca), Some(cb)) => AttrValue::Text(ca.lerp(cb, t).to_string()),
                _ => self.clone(),
            },
            (AttrValue::Path(a), AttrValue::Path(b)) => a
                .interpolate(b, t)
                .map(AttrValue::Path)
                .unwrap_or_else(|| self.clone()),
            _ => match (self.as_number(), to.as_number()) {
                (Some(a), Some(b)) => AttrValue::Number(a + (b - a) * t),
                _ => self.clone(),
            },
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Number(n) => write!(f, "{n}"),
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Path(p) => write!(f, "{p}"),
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Number(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl From<PathData> for AttrValue {
    fn from(v: PathData) -> Self {
        AttrValue::Path(v)
    }
}

/// Ordered batch of attribute writes. A `None` value clears the attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrSet {
    values: BTreeMap<Attr, Option<AttrValue>>,
}

impl AttrSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attr: Attr, value: impl Into<AttrValue>) -> Self {
        self.set(attr, value);
        self
    }

    pub fn set(&mut self, attr: Attr, value: impl Into<AttrValue>) {
        self.values.insert(attr, Some(value.into()));
    }

    pub fn set_opt(&mut self, attr: Attr, value: Option<AttrValue>) {
        self.values.insert(attr, value);
    }

    pub fn remove(&mut self, attr: Attr) -> Option<Option<AttrValue>> {
        self.values.remove(&attr)
    }

    pub fn get(&self, attr: Attr) -> Option<&AttrValue> {
        self.values.get(&attr).and_then(|v| v.as_ref())
    }

    pub fn contains(&self, attr: Attr) -> bool {
        self.values.contains_key(&attr)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attr, Option<&AttrValue>)> + '_ {
        self.values.iter().map(|(k, v)| (*k, v.as_ref()))
    }

    /// Splits off the attributes named in `attrs`, returning them as a new set.
    pub fn split_off(&mut self, attrs: &[Attr]) -> AttrSet {
        let mut out = AttrSet::new();
        for attr in attrs {
            if let Some(v) = self.values.remove(attr) {
                out.values.insert(*attr, v);
            }
        }
        out
    }
}

impl IntoIterator for AttrSet {
    type Item = (Attr, Option<AttrValue>);
    type IntoIter = std::collections::btree_map::IntoIter<Attr, Option<AttrValue>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
