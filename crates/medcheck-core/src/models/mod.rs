//! Domain models for the medcheck pipeline.

mod interaction;
mod patient;
mod report;
mod resolution;

pub use interaction::*;
pub use patient::*;
pub use report::*;
pub use resolution::*;
