//! Fork once, and have each side of the fork say which side it is on.

pub mod probe;

pub use probe::{Duplicate, DuplicationResult, Probe, Report, SystemFork};
