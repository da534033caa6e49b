//! World simulation engine.
//!
//! This module implements the double-buffered grid where prey, predators and
//! apex predators age, breed, hunt and die one step at a time.

pub mod field;
pub mod agent;
pub mod simulation;
pub mod record;

pub use field::{Field, FieldBuffers};
pub use agent::{ActOutcome, Agent, Census, StepContext};
pub use simulation::{Simulator, StepReport};
pub use record::Record;
