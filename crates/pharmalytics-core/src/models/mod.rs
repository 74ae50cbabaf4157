//! Domain models for pharmalytics.

mod check;
mod drug;

pub use check::*;
pub use drug::*;
