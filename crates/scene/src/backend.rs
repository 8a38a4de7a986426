use std::cell::RefCell;
use std::rc::Rc;

use crate::components::{Attr, AttrValue, PathData, PrimitiveKind};
use crate::entity::{LayerId, PrimitiveId};

/// Where a new layer lands in paint order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayerPlacement {
    /// Painted above every existing layer.
    Top,
    /// Painted below every existing layer.
    Bottom,
    /// Painted directly below the given layer.
    Below(LayerId),
}

/// Drawing surface capability.
///
/// The [`World`](crate::World) owns the authoritative primitive records and
/// mirrors every change through this trait; implementations only need to
/// reflect the calls onto their surface (SVG DOM, canvas, ...).
pub trait DrawingBackend {
    fn create_layer(&mut self, layer: LayerId, class: &str, placement: LayerPlacement);
    fn move_layer_below(&mut self, layer: LayerId, other: LayerId);
    fn create(&mut self, id: PrimitiveId, layer: LayerId, kind: PrimitiveKind);
    fn remove(&mut self, id: PrimitiveId);
    fn set_attr(&mut self, id: PrimitiveId, attr: Attr, value: Option<&AttrValue>);
    /// Moves a primitive to the top of its layer's paint order.
    fn raise(&mut self, id: PrimitiveId);
    /// Uniform scale applied to everything drawn in `layer`.
    fn set_layer_transform(&mut self, layer: LayerId, scale: f64);

    fn measure_path_length(&self, path: &PathData) -> f64 {
        path.length()
    }
}

/// Backend that discards every operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl DrawingBackend for NullBackend {
    fn create_layer(&mut self, _layer: LayerId, _class: &str, _placement: LayerPlacement) {}
    fn move_layer_below(&mut self, _layer: LayerId, _other: LayerId) {}
    fn create(&mut self, _id: PrimitiveId, _layer: LayerId, _kind: PrimitiveKind) {}
    fn remove(&mut self, _id: PrimitiveId) {}
    fn set_attr(&mut self, _id: PrimitiveId, _attr: Attr, _value: Option<&AttrValue>) {}
    fn raise(&mut self, _id: PrimitiveId) {}
    fn set_layer_transform(&mut self, _layer: LayerId, _scale: f64) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendOp {
    CreateLayer {
        layer: LayerId,
        class: String,
        placement: LayerPlacement,
    },
    MoveLayerBelow {
        layer: LayerId,
        other: LayerId,
    },
    Create {
        id: PrimitiveId,
        layer: LayerId,
        kind: PrimitiveKind,
    },
    Remove {
        id: PrimitiveId,
    },
    SetAttr {
        id: PrimitiveId,
        attr: Attr,
        value: Option<AttrValue>,
    },
    Raise {
        id: PrimitiveId,
    },
    SetLayerTransform {
        layer: LayerId,
        scale: f64,
    },
}

pub type OpLog = Rc<RefCell<Vec<BackendOp>>>;

/// Backend that records every operation into a shared log.
#[derive(Debug, Default, Clone)]
pub struct RecordingBackend {
    log: OpLog,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the operation log; stays valid after the backend
    /// has been moved into a `World`.
    pub fn log(&self) -> OpLog {
        Rc::clone(&self.log)
    }

    fn push(&self, op: BackendOp) {
        self.log.borrow_mut().push(op);
    }
}

impl DrawingBackend for RecordingBackend {
    fn create_layer(&mut self, layer: LayerId, class: &str, placement: LayerPlacement) {
        self.push(BackendOp::CreateLayer {
            layer,
            class: class.to_string(),
            placement,
        });
    }

    fn move_layer_below(&mut self, layer: LayerId, other: LayerId) {
        self.push(BackendOp::MoveLayerBelow { layer, other });
    }

    fn create(&mut self, id: PrimitiveId, layer: LayerId, kind: PrimitiveKind) {
        self.push(BackendOp::Create { id, layer, kind });
    }

    fn remove(&mut self, id: PrimitiveId) {
        self.push(BackendOp::Remove { id });
    }

    fn set_attr(&mut self, id: PrimitiveId, attr: Attr, value: Option<&AttrValue>) {
        self.push(BackendOp::SetAttr {
            id,
            attr,
            value: value.cloned(),
        });
    }

    fn raise(&mut self, id: PrimitiveId) {
        self.push(BackendOp::Raise { id });
    }

    fn set_layer_transform(&mut self, layer: LayerId, scale: f64) {
        self.push(BackendOp::SetLayerTransform { layer, scale });
    }
}
