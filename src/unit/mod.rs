pub mod participant;
pub use participant::*;

pub mod roster;
pub use roster::*;
