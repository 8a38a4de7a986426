use crate::backend::{DrawingBackend, LayerPlacement, NullBackend};
use crate::components::{Attr, AttrValue, HoverSnapshot, Primitive, PrimitiveKind};
use crate::entity::{LayerId, PrimitiveId};
use foundation::handles::Handle;

/// A layer and its members in paint order (last is drawn on top).
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInfo {
    pub id: LayerId,
    pub class: String,
    members: Vec<PrimitiveId>,
}

impl LayerInfo {
    pub fn members(&self) -> &[PrimitiveId] {
        &self.members
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    primitive: Option<Primitive>,
}

/// Authoritative store of live primitives, grouped into ordered layers.
///
/// Every mutation is mirrored to the drawing backend. Primitive ids are
/// generational: a despawned id never resolves again.
pub struct World {
    backend: Box<dyn DrawingBackend>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    layers: Vec<LayerInfo>,
    next_layer: u64,
    live: usize,
}

impl World {
    pub fn new(backend: Box<dyn DrawingBackend>) -> Self {
        Self {
            backend,
            slots: Vec::new(),
            free: Vec::new(),
            layers: Vec::new(),
            next_layer: 0,
            live: 0,
        }
    }

    pub fn headless() -> Self {
        Self::new(Box::new(NullBackend))
    }

    pub fn add_layer(&mut self, class: &str, placement: LayerPlacement) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        let info = LayerInfo {
            id,
            class: class.to_string(),
            members: Vec::new(),
        };
        let at = match placement {
            LayerPlacement::Top => self.layers.len(),
            LayerPlacement::Bottom => 0,
            LayerPlacement::Below(other) => {
                self.layer_position(other).unwrap_or(self.layers.len())
            }
        };
        self.layers.insert(at, info);
        self.backend.create_layer(id, class, placement);
        id
    }

    /// Moves `layer` directly below `other` in paint order.
    pub fn move_layer_below(&mut self, layer: LayerId, other: LayerId) -> bool {
        if layer == other {
            return false;
        }
        let Some(from) = self.layer_position(layer) else {
            return false;
        };
        if self.layer_position(other).is_none() {
            return false;
        }
        let info = self.layers.remove(from);
        let to = self.layer_position(other).unwrap_or(self.layers.len());
        self.layers.insert(to, info);
        self.backend.move_layer_below(layer, other);
        true
    }

    /// Scales every existing layer by `scale`. Layers added later are
    /// drawn unscaled.
    pub fn scale_layers(&mut self, scale: f64) -> usize {
        for layer in &self.layers {
            self.backend.set_layer_transform(layer.id, scale);
        }
        self.layers.len()
    }

    /// Layers bottom to top.
    pub fn layers(&self) -> &[LayerInfo] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&LayerInfo> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn members(&self, layer: LayerId) -> &[PrimitiveId] {
        self.layer(layer).map(LayerInfo::members).unwrap_or(&[])
    }

    /// Creates a primitive on top of `layer`. Returns `None` for unknown layers.
    pub fn spawn(
        &mut self,
        layer: LayerId,
        kind: PrimitiveKind,
        key: impl Into<String>,
    ) -> Option<PrimitiveId> {
        let pos = self.layer_position(layer)?;
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.primitive = Some(Primitive::new(kind, layer, key));
        let id = PrimitiveId(Handle::new(index, slot.generation));
        self.layers[pos].members.push(id);
        self.live += 1;
        self.backend.create(id, layer, kind);
        Some(id)
    }

    /// Removes a primitive. Removing a stale or unknown id is a no-op.
    pub fn despawn(&mut self, id: PrimitiveId) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        let Some(primitive) = slot.primitive.take() else {
            return false;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.live -= 1;
        if let Some(pos) = self.layer_position(primitive.layer) {
            self.layers[pos].members.retain(|m| *m != id);
        }
        self.backend.remove(id);
        true
    }

    pub fn contains(&self, id: PrimitiveId) -> bool {
        self.primitive(id).is_some()
    }

    pub fn primitive(&self, id: PrimitiveId) -> Option<&Primitive> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.primitive.as_ref()
    }

    pub fn attr(&self, id: PrimitiveId, attr: Attr) -> Option<&AttrValue> {
        self.primitive(id)?.attr(attr)
    }

    /// Writes a live attribute value; `None` removes the attribute.
    pub fn set_attr(&mut self, id: PrimitiveId, attr: Attr, value: Option<AttrValue>) -> bool {
        let Some(primitive) = self.primitive_mut(id) else {
            return false;
        };
        let unchanged = match &value {
            Some(v) => primitive.attrs.get(attr) == Some(v),
            None => !primitive.attrs.contains(attr),
        };
        if unchanged {
            return true;
        }
        match &value {
            Some(v) => primitive.attrs.set(attr, v.clone()),
            None => {
                primitive.attrs.remove(attr);
            }
        }
        self.backend.set_attr(id, attr, value.as_ref());
        true
    }

    /// Moves a primitive to the top of its layer.
    pub fn raise(&mut self, id: PrimitiveId) -> bool {
        let Some(layer) = self.primitive(id).map(|p| p.layer) else {
            return false;
        };
        let Some(pos) = self.layer_position(layer) else {
            return false;
        };
        let members = &mut self.layers[pos].members;
        members.retain(|m| *m != id);
        members.push(id);
        self.backend.raise(id);
        true
    }

    /// Stroke length of the primitive's `d` attribute, as the backend measures it.
    pub fn path_length(&self, id: PrimitiveId) -> Option<f64> {
        let path = self.attr(id, Attr::D)?.as_path()?;
        Some(self.backend.measure_path_length(path))
    }

    pub fn set_snapshot(&mut self, id: PrimitiveId, snapshot: HoverSnapshot) -> bool {
        match self.primitive_mut(id) {
            Some(primitive) => {
                primitive.snapshot = Some(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn take_snapshot(&mut self, id: PrimitiveId) -> Option<HoverSnapshot> {
        self.primitive_mut(id)?.snapshot.take()
    }

    pub fn snapshot_mut(&mut self, id: PrimitiveId) -> Option<&mut HoverSnapshot> {
        self.primitive_mut(id)?.snapshot.as_mut()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn layer_position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    fn slot_mut(&mut self, id: PrimitiveId) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        (slot.generation == id.generation()).then_some(slot)
    }

    fn primitive_mut(&mut self, id: PrimitiveId) -> Option<&mut Primitive> {
        self.slot_mut(id)?.primitive.as_mut()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::headless()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("layers", &self.layers)
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}
