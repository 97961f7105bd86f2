//! Domain models for the pestlog system.

mod appointment;
mod area;
mod chemical;
mod visit;

pub use appointment::*;
pub use area::*;
pub use chemical::*;
pub use visit::*;
