pub mod attributes;
pub mod color;
pub mod path;
pub mod primitive;
pub mod properties;

pub use attributes::*;
pub use color::*;
pub use path::*;
pub use primitive::*;
pub use properties::*;
