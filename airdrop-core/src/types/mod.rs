//! Campaign data model

mod campaign;
mod participant;

pub use campaign::*;
pub use participant::*;
