use crate::entity::LayerId;

use super::attributes::{Attr, AttrSet, AttrValue};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    RegionPath,
    Circle,
    ConnectorPath,
    Text,
    Line,
}

/// Pre-highlight attribute values of one primitive.
///
/// Exists only while a hover highlight is active; restoring writes every
/// captured value back verbatim, including "was unset".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoverSnapshot {
    values: Vec<(Attr, Option<AttrValue>)>,
}

impl HoverSnapshot {
    pub fn capture(attrs: &AttrSet, which: &[Attr]) -> Self {
        Self {
            values: which
                .iter()
                .map(|attr| (*attr, attrs.get(*attr).cloned()))
                .collect(),
        }
    }

    pub fn contains(&self, attr: Attr) -> bool {
        self.values.iter().any(|(a, _)| *a == attr)
    }

    pub fn get(&self, attr: Attr) -> Option<&AttrValue> {
        self.values
            .iter()
            .find(|(a, _)| *a == attr)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Replaces the captured value for `attr`. Returns `false` when `attr`
    /// was not captured.
    pub fn replace(&mut self, attr: Attr, value: Option<AttrValue>) -> bool {
        match self.values.iter_mut().find(|(a, _)| *a == attr) {
            Some(slot) => {
                slot.1 = value;
                true
            }
            None => false,
        }
    }

    pub fn into_values(self) -> Vec<(Attr, Option<AttrValue>)> {
        self.values
    }
}

/// One rendered shape and its current attribute values.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub layer: LayerId,
    pub key: String,
    pub(crate) attrs: AttrSet,
    pub(crate) snapshot: Option<HoverSnapshot>,
}

impl Primitive {
    pub fn new(kind: PrimitiveKind, layer: LayerId, key: impl Into<String>) -> Self {
        Self {
            kind,
            layer,
            key: key.into(),
            attrs: AttrSet::new(),
            snapshot: None,
        }
    }

    pub fn attr(&self, attr: Attr) -> Option<&AttrValue> {
        self.attrs.get(attr)
    }

    pub fn attrs(&self) -> &AttrSet {
        &self.attrs
    }

    pub fn snapshot(&self) -> Option<&HoverSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_highlighted(&self) -> bool {
        self.snapshot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::HoverSnapshot;
    use crate::components::{Attr, AttrSet, AttrValue};

    #[test]
    fn snapshot_captures_unset_values() {
        let attrs = AttrSet::new().with(Attr::Fill, "#abc");
        let mut snap = HoverSnapshot::capture(&attrs, &[Attr::Fill, Attr::FillOpacity]);
        assert_eq!(snap.get(Attr::Fill), Some(&AttrValue::from("#abc")));
        assert!(snap.contains(Attr::FillOpacity));
        assert_eq!(snap.get(Attr::FillOpacity), None);

        assert!(snap.replace(Attr::Fill, Some(AttrValue::from("#def"))));
        assert!(!snap.replace(Attr::R, None));
        assert_eq!(
            snap.into_values(),
            vec![
                (Attr::Fill, Some(AttrValue::from("#def"))),
                (Attr::FillOpacity, None)
            ]
        );
    }
}
