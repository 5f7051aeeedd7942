//! Domain models for the hospice-ops system.

mod audit;
mod invoice;
mod qa;
mod status;

pub use audit::*;
pub use invoice::*;
pub use qa::*;
pub use status::*;
