use std::collections::{BTreeMap, BTreeSet};

use foundation::time::Time;
use runtime::{Scheduler, Timing};
use scene::components::{Attr, AttrSet, AttrValue, PrimitiveKind};
use scene::entity::{LayerId, PrimitiveId};
use scene::{LayerPlacement, World};

use crate::datum::{Datum, Key};
use crate::interaction::{HoverBinding, Tooltip};

/// What a scheduled transition drives on a primitive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    Attr(Attr),
    Detach,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    /// `from` is read when the transition starts, after its delay.
    Tween {
        from: Option<AttrValue>,
        to: Option<AttrValue>,
    },
    Detach,
}

/// Live scene state shared by every layer: the primitive store, the
/// per-layer key index, running transitions, hover bindings and the
/// tooltip.
///
/// Attribute writes to a highlighted primitive land in its hover snapshot
/// when the attribute was captured, so the highlight stays visible and
/// hover-exit restores the latest underlying value.
#[derive(Debug)]
pub struct Stage {
    pub(crate) world: World,
    scheduler: Scheduler<(PrimitiveId, Channel), Motion>,
    now: Time,
    keyed: BTreeMap<LayerId, BTreeMap<Key, PrimitiveId>>,
    exiting: BTreeSet<PrimitiveId>,
    info: BTreeMap<PrimitiveId, Datum>,
    pub(crate) bindings: BTreeMap<PrimitiveId, HoverBinding>,
    pub(crate) tooltip: Tooltip,
}

impl Stage {
    /// Engine time starts at zero: transitions scheduled before the first
    /// [`advance`](Self::advance) are timed from zero, so hosts should feed
    /// frame-relative time (as [`runtime::Frame`] does) or use
    /// [`starting_at`](Self::starting_at).
    pub fn new(world: World) -> Self {
        Self::starting_at(world, Time::ZERO)
    }

    /// A stage whose clock starts at `start`, for hosts driving it with an
    /// absolute timebase.
    pub fn starting_at(world: World, start: Time) -> Self {
        Self {
            world,
            scheduler: Scheduler::new(),
            now: start,
            keyed: BTreeMap::new(),
            exiting: BTreeSet::new(),
            info: BTreeMap::new(),
            bindings: BTreeMap::new(),
            tooltip: Tooltip::default(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn now(&self) -> Time {
        self.now
    }

    pub fn tooltip(&self) -> &Tooltip {
        &self.tooltip
    }

    pub fn add_layer(&mut self, class: &str, placement: LayerPlacement) -> LayerId {
        let id = self.world.add_layer(class, placement);
        self.keyed.insert(id, BTreeMap::new());
        id
    }

    pub fn move_layer_below(&mut self, layer: LayerId, other: LayerId) -> bool {
        self.world.move_layer_below(layer, other)
    }

    pub fn scale_layers(&mut self, scale: f64) -> usize {
        self.world.scale_layers(scale)
    }

    pub fn members(&self, layer: LayerId) -> &[PrimitiveId] {
        self.world.members(layer)
    }

    /// Primitive currently bound to `key`, including one that is exiting.
    pub fn lookup(&self, layer: LayerId, key: &Key) -> Option<PrimitiveId> {
        self.keyed.get(&layer)?.get(key).copied()
    }

    pub fn entries(&self, layer: LayerId) -> Vec<(Key, PrimitiveId)> {
        self.keyed
            .get(&layer)
            .map(|index| index.iter().map(|(k, id)| (k.clone(), *id)).collect())
            .unwrap_or_default()
    }

    pub fn spawn(&mut self, layer: LayerId, kind: PrimitiveKind, key: &Key) -> Option<PrimitiveId> {
        let id = self.world.spawn(layer, kind, key.as_str())?;
        self.keyed.entry(layer).or_default().insert(key.clone(), id);
        Some(id)
    }

    pub fn contains(&self, id: PrimitiveId) -> bool {
        self.world.contains(id)
    }

    /// Live (displayed) attribute value.
    pub fn attr(&self, id: PrimitiveId, attr: Attr) -> Option<&AttrValue> {
        self.world.attr(id, attr)
    }

    /// Attribute value as the data model sees it: the snapshotted value
    /// while highlighted, the live value otherwise.
    pub fn underlying_attr(&self, id: PrimitiveId, attr: Attr) -> Option<&AttrValue> {
        underlying(&self.world, id, attr)
    }

    /// Instant write; cancels any transition running on the same attribute.
    pub fn set(&mut self, id: PrimitiveId, attr: Attr, value: Option<AttrValue>) -> bool {
        self.scheduler.cancel(&(id, Channel::Attr(attr)));
        self.write(id, attr, value)
    }

    pub fn set_all(&mut self, id: PrimitiveId, attrs: AttrSet) {
        for (attr, value) in attrs {
            self.set(id, attr, value);
        }
    }

    /// Schedules a transition to `to`, superseding one already running on
    /// the same attribute.
    pub fn animate(
        &mut self,
        id: PrimitiveId,
        attr: Attr,
        to: Option<AttrValue>,
        timing: Timing,
    ) -> bool {
        if !self.world.contains(id) {
            return false;
        }
        self.scheduler.schedule(
            self.now,
            (id, Channel::Attr(attr)),
            timing,
            Motion::Tween { from: None, to },
        );
        true
    }

    pub fn animate_all(&mut self, id: PrimitiveId, attrs: AttrSet, timing: Timing) {
        for (attr, value) in attrs {
            self.animate(id, attr, value, timing);
        }
    }

    pub fn is_animating(&self, id: PrimitiveId, attr: Attr) -> bool {
        self.scheduler.is_scheduled(&(id, Channel::Attr(attr)))
    }

    pub fn pending_transitions(&self) -> usize {
        self.scheduler.len()
    }

    /// Hides the stroke behind a dash as long as the path, then animates the
    /// dash offset to zero so the stroke draws in.
    pub fn reveal(&mut self, id: PrimitiveId, timing: Timing) -> bool {
        let Some(length) = self.world.path_length(id) else {
            return false;
        };
        self.set(
            id,
            Attr::StrokeDasharray,
            Some(AttrValue::Text(format!("{length} {length}"))),
        );
        self.set(id, Attr::StrokeDashoffset, Some(AttrValue::Number(length)));
        self.animate(
            id,
            Attr::StrokeDashoffset,
            Some(AttrValue::Number(0.0)),
            timing,
        )
    }

    /// Runs the exit transition, then detaches. Pending enter and update
    /// transitions on the primitive are cancelled.
    pub fn exit(&mut self, id: PrimitiveId, attrs: AttrSet, timing: Timing) -> bool {
        if !self.world.contains(id) || self.exiting.contains(&id) {
            return false;
        }
        self.scheduler.cancel_where(|(pid, _)| *pid == id);
        if attrs.is_empty() && timing.end_ms() <= 0.0 {
            return self.detach(id);
        }
        self.exiting.insert(id);
        self.animate_all(id, attrs, timing);
        self.scheduler.schedule(
            self.now,
            (id, Channel::Detach),
            Timing::immediate().with_delay(timing.end_ms()),
            Motion::Detach,
        );
        true
    }

    pub fn is_exiting(&self, id: PrimitiveId) -> bool {
        self.exiting.contains(&id)
    }

    /// Cancels a pending exit so the primitive can be reused.
    pub fn revive(&mut self, id: PrimitiveId) -> bool {
        if !self.exiting.remove(&id) {
            return false;
        }
        self.scheduler.cancel_where(|(pid, _)| *pid == id);
        true
    }

    /// Removes a primitive and everything attached to it. Detaching an
    /// already removed primitive is a no-op.
    pub fn detach(&mut self, id: PrimitiveId) -> bool {
        let Some(primitive) = self.world.primitive(id) else {
            return false;
        };
        let layer = primitive.layer;
        let key = Key::new(primitive.key.as_str());
        if let Some(index) = self.keyed.get_mut(&layer)
            && index.get(&key) == Some(&id)
        {
            index.remove(&key);
        }
        self.scheduler.cancel_where(|(pid, _)| *pid == id);
        self.exiting.remove(&id);
        self.info.remove(&id);
        self.bindings.remove(&id);
        if self.tooltip.owner == Some(id) {
            self.tooltip.hide();
        }
        self.world.despawn(id)
    }

    pub fn raise(&mut self, id: PrimitiveId) -> bool {
        self.world.raise(id)
    }

    /// Data record bound to a primitive (what popups display).
    pub fn info(&self, id: PrimitiveId) -> Option<&Datum> {
        self.info.get(&id)
    }

    pub fn set_info(&mut self, id: PrimitiveId, info: Datum) {
        if self.world.contains(id) {
            self.info.insert(id, info);
        }
    }

    pub fn binding(&self, id: PrimitiveId) -> Option<&HoverBinding> {
        self.bindings.get(&id)
    }

    pub fn bind_hover(&mut self, id: PrimitiveId, binding: HoverBinding) {
        if self.world.contains(id) {
            self.bindings.insert(id, binding);
        }
    }

    pub fn unbind_hover(&mut self, id: PrimitiveId) -> Option<HoverBinding> {
        self.bindings.remove(&id)
    }

    /// Drives every due transition to `now`. Returns how many were reported.
    pub fn advance(&mut self, now: Time) -> usize {
        if now.0 > self.now.0 {
            self.now = now;
        }
        let mut writes: Vec<(PrimitiveId, Attr, Option<AttrValue>)> = Vec::new();
        let mut detaches: Vec<PrimitiveId> = Vec::new();
        let world = &self.world;
        let reported = self.scheduler.advance(self.now, |(id, channel), motion, progress| {
            match (channel, motion) {
                (Channel::Attr(attr), Motion::Tween { from, to }) => {
                    if progress.started {
                        *from = underlying(world, *id, *attr).cloned();
                    }
                    if progress.finished {
                        writes.push((*id, *attr, to.clone()));
                    } else if let (Some(from), Some(to)) = (from.as_ref(), to.as_ref()) {
                        writes.push((*id, *attr, Some(from.interpolate(to, progress.t))));
                    }
                }
                _ => {
                    if progress.finished {
                        detaches.push(*id);
                    }
                }
            }
        });
        for (id, attr, value) in writes {
            self.write(id, attr, value);
        }
        for id in detaches {
            self.detach(id);
        }
        reported
    }

    fn write(&mut self, id: PrimitiveId, attr: Attr, value: Option<AttrValue>) -> bool {
        if let Some(snapshot) = self.world.snapshot_mut(id)
            && snapshot.contains(attr)
        {
            return snapshot.replace(attr, value);
        }
        self.world.set_attr(id, attr, value)
    }
}

fn underlying(world: &World, id: PrimitiveId, attr: Attr) -> Option<&AttrValue> {
    match world.primitive(id)?.snapshot() {
        Some(snapshot) if snapshot.contains(attr) => snapshot.get(attr),
        _ => world.attr(id, attr),
    }
}
