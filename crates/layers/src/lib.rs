pub mod arcs;
pub mod bubbles;
pub mod datum;
pub mod error;
pub mod geometry;
pub mod graticule;
pub mod interaction;
pub mod labels;
pub mod map;
pub mod options;
pub mod reconcile;
pub mod regions;
pub mod registry;
pub mod stage;
pub mod symbology;

pub use datum::{Datum, Key, KeyFn};
pub use error::*;
pub use interaction::{HoverConfig, PopupTemplate, Tooltip};
pub use map::*;
pub use options::*;
pub use registry::*;
pub use stage::Stage;
