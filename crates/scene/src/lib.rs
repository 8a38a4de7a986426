pub mod backend;
pub mod components;
pub mod entity;
pub mod geography;
pub mod projection;
pub mod world;

pub use backend::*;
pub use geography::*;
pub use projection::*;
pub use world::*;
