pub mod ease;
pub mod frame;
pub mod scheduler;

pub use ease::*;
pub use frame::*;
pub use scheduler::*;
