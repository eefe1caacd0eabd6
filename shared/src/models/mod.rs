//! Domain models for the Ant Defoliation Monitor

mod aggregate;
mod boundary;
mod observation;
mod recommendation;

pub use aggregate::*;
pub use boundary::*;
pub use observation::*;
pub use recommendation::*;
