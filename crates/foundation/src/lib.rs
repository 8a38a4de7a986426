pub mod handles;
pub mod math;
pub mod time;

// Dependency-free primitives shared by the engine crates.
pub use handles::*;
pub use time::*;
