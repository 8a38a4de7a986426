use std::collections::BTreeMap;

use scene::components::{AttrSet, PrimitiveKind};
use scene::entity::{LayerId, PrimitiveId};
use tracing::{debug, warn};

use crate::datum::{Datum, Key};
use crate::interaction::HoverBinding;
use crate::stage::Stage;

/// Counts of one reconciliation pass.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    /// Entries whose geometry could not be resolved.
    pub skipped: usize,
}

/// Layer-specific half of reconciliation: identity, attributes and the
/// enter/update/exit actions for one kind of dataset entry.
pub trait PrimitiveFactory {
    type Item;

    fn key(&self, item: &Self::Item) -> Key;

    fn kind(&self, item: &Self::Item) -> PrimitiveKind;

    /// Full attribute set (geometry and style), or `None` when the entry
    /// cannot be placed.
    fn attributes(&self, item: &Self::Item) -> Option<AttrSet>;

    fn enter(&self, stage: &mut Stage, id: PrimitiveId, _item: &Self::Item, attrs: AttrSet) {
        stage.set_all(id, attrs);
    }

    fn update(&self, stage: &mut Stage, id: PrimitiveId, _item: &Self::Item, attrs: AttrSet) {
        stage.set_all(id, attrs);
    }

    fn exit(&self, stage: &mut Stage, id: PrimitiveId) {
        stage.detach(id);
    }

    /// Data record stored on the primitive for popups and style lookups.
    fn info(&self, _item: &Self::Item) -> Option<Datum> {
        None
    }

    fn binding(&self, _item: &Self::Item) -> Option<HoverBinding> {
        None
    }
}

/// Keyed enter/update/exit of `items` against the primitives of `layer`.
///
/// When several entries share a key the last one wins. Entries that cannot
/// be placed are skipped without disturbing the rest; an existing
/// primitive for such an entry is left as it is. A primitive still running
/// its exit transition is revived if its key comes back.
pub fn reconcile<F: PrimitiveFactory>(
    stage: &mut Stage,
    layer: LayerId,
    items: &[F::Item],
    factory: &F,
) -> ReconcileSummary {
    let mut order: Vec<Key> = Vec::new();
    let mut latest: BTreeMap<Key, &F::Item> = BTreeMap::new();
    for item in items {
        let key = factory.key(item);
        if latest.insert(key.clone(), item).is_none() {
            order.push(key);
        }
    }

    let mut summary = ReconcileSummary::default();
    for (key, id) in stage.entries(layer) {
        if !latest.contains_key(&key) && !stage.is_exiting(id) {
            factory.exit(stage, id);
            summary.removed += 1;
        }
    }

    for key in order {
        let Some(item) = latest.get(&key).copied() else {
            continue;
        };
        let Some(attrs) = factory.attributes(item) else {
            warn!(layer = layer.0, key = %key, "unresolvable geometry; entry skipped");
            summary.skipped += 1;
            continue;
        };
        let id = match stage.lookup(layer, &key) {
            Some(id) => {
                stage.revive(id);
                factory.update(stage, id, item, attrs);
                summary.updated += 1;
                id
            }
            None => {
                let Some(id) = stage.spawn(layer, factory.kind(item), &key) else {
                    summary.skipped += 1;
                    continue;
                };
                factory.enter(stage, id, item, attrs);
                summary.created += 1;
                id
            }
        };
        if let Some(info) = factory.info(item) {
            stage.set_info(id, info);
        }
        match factory.binding(item) {
            Some(binding) => stage.bind_hover(id, binding),
            None => {
                stage.unbind_hover(id);
            }
        }
    }

    debug!(
        layer = layer.0,
        created = summary.created,
        updated = summary.updated,
        removed = summary.removed,
        skipped = summary.skipped,
        "reconciled layer"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::{PrimitiveFactory, ReconcileSummary, reconcile};
    use crate::datum::{Datum, Key};
    use crate::stage::Stage;
    use foundation::time::Time;
    use runtime::Timing;
    use scene::components::{Attr, AttrSet, AttrValue, PrimitiveKind};
    use scene::entity::{LayerId, PrimitiveId};
    use scene::{LayerPlacement, World};
    use serde_json::json;

    /// Keys by `id`; places entries that carry `x`.
    struct Dots {
        fade: bool,
    }

    impl PrimitiveFactory for Dots {
        type Item = Datum;

        fn key(&self, item: &Datum) -> Key {
            Key::new(item.str("id").unwrap_or_default())
        }

        fn kind(&self, _item: &Datum) -> PrimitiveKind {
            PrimitiveKind::Circle
        }

        fn attributes(&self, item: &Datum) -> Option<AttrSet> {
            Some(AttrSet::new().with(Attr::Cx, item.number("x")?))
        }

        fn exit(&self, stage: &mut Stage, id: PrimitiveId) {
            if self.fade {
                stage.exit(id, AttrSet::new().with(Attr::Opacity, 0.0), Timing::default());
            } else {
                stage.detach(id);
            }
        }
    }

    fn items(v: serde_json::Value) -> Vec<Datum> {
        crate::datum::dataset_from_value("dots", v).unwrap()
    }

    fn setup() -> (Stage, LayerId) {
        let mut stage = Stage::new(World::headless());
        let layer = stage.add_layer("dots", LayerPlacement::Top);
        (stage, layer)
    }

    fn summary(created: usize, updated: usize, removed: usize, skipped: usize) -> ReconcileSummary {
        ReconcileSummary {
            created,
            updated,
            removed,
            skipped,
        }
    }

    fn cx(stage: &Stage, layer: LayerId, key: &str) -> Option<f64> {
        let id = stage.lookup(layer, &Key::from(key))?;
        stage.attr(id, Attr::Cx).and_then(AttrValue::as_number)
    }

    #[test]
    fn fresh_layer_creates_every_entry() {
        let (mut stage, layer) = setup();
        let data = items(json!([{"id": "a", "x": 1}, {"id": "b", "x": 2}, {"id": "c", "x": 3}]));
        let s = reconcile(&mut stage, layer, &data, &Dots { fade: false });
        assert_eq!(s, summary(3, 0, 0, 0));
        assert_eq!(stage.members(layer).len(), 3);
    }

    #[test]
    fn reapplying_same_data_only_updates() {
        let (mut stage, layer) = setup();
        let data = items(json!([{"id": "a", "x": 1}, {"id": "b", "x": 2}]));
        reconcile(&mut stage, layer, &data, &Dots { fade: false });
        let before = stage.members(layer).to_vec();
        let s = reconcile(&mut stage, layer, &data, &Dots { fade: false });
        assert_eq!(s, summary(0, 2, 0, 0));
        assert_eq!(stage.members(layer), before.as_slice());
    }

    #[test]
    fn subset_removes_missing_keys() {
        let (mut stage, layer) = setup();
        let all = items(json!([{"id": "a", "x": 1}, {"id": "b", "x": 2}, {"id": "c", "x": 3}]));
        reconcile(&mut stage, layer, &all, &Dots { fade: false });
        let subset = items(json!([{"id": "b", "x": 2}]));
        let s = reconcile(&mut stage, layer, &subset, &Dots { fade: false });
        assert_eq!(s, summary(0, 1, 2, 0));
        assert!(stage.lookup(layer, &Key::from("a")).is_none());
        assert!(stage.lookup(layer, &Key::from("c")).is_none());
        assert_eq!(cx(&stage, layer, "b"), Some(2.0));
    }

    #[test]
    fn duplicate_keys_last_entry_wins() {
        let (mut stage, layer) = setup();
        let data = items(json!([{"id": "a", "x": 1}, {"id": "a", "x": 9}]));
        let s = reconcile(&mut stage, layer, &data, &Dots { fade: false });
        assert_eq!(s, summary(1, 0, 0, 0));
        assert_eq!(cx(&stage, layer, "a"), Some(9.0));
    }

    #[test]
    fn unplaceable_entries_are_skipped_in_isolation() {
        let (mut stage, layer) = setup();
        let data = items(json!([{"id": "a"}, {"id": "b", "x": 2}]));
        let s = reconcile(&mut stage, layer, &data, &Dots { fade: false });
        assert_eq!(s, summary(1, 0, 0, 1));

        let moved = items(json!([{"id": "b"}]));
        let s = reconcile(&mut stage, layer, &moved, &Dots { fade: false });
        assert_eq!(s, summary(0, 0, 0, 1));
        assert_eq!(cx(&stage, layer, "b"), Some(2.0));
    }

    #[test]
    fn returning_key_revives_exiting_primitive() {
        let (mut stage, layer) = setup();
        let data = items(json!([{"id": "a", "x": 1}]));
        reconcile(&mut stage, layer, &data, &Dots { fade: true });
        let id = stage.lookup(layer, &Key::from("a")).unwrap();

        let s = reconcile(&mut stage, layer, &[], &Dots { fade: true });
        assert_eq!(s, summary(0, 0, 1, 0));
        assert!(stage.is_exiting(id));
        // A second empty pass does not exit it twice.
        assert_eq!(reconcile(&mut stage, layer, &[], &Dots { fade: true }), summary(0, 0, 0, 0));

        let s = reconcile(&mut stage, layer, &data, &Dots { fade: true });
        assert_eq!(s, summary(0, 1, 0, 0));
        stage.advance(Time(10_000.0));
        assert!(stage.contains(id));
        assert!(!stage.is_exiting(id));
    }

    #[test]
    fn exit_finishes_and_frees_key() {
        let (mut stage, layer) = setup();
        reconcile(&mut stage, layer, &items(json!([{"id": "a", "x": 1}])), &Dots { fade: true });
        reconcile(&mut stage, layer, &[], &Dots { fade: true });
        stage.advance(Time(0.0));
        stage.advance(Time(250.0));
        assert!(stage.lookup(layer, &Key::from("a")).is_none());
        assert!(stage.members(layer).is_empty());
    }
}
