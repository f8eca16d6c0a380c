//! Error types for the AutoFlow protocol layer.

mod probe;
mod reasoning;
mod sink;
mod step;

pub use probe::*;
pub use reasoning::*;
pub use sink::*;
pub use step::*;
