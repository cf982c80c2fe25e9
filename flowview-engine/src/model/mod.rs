// Step Model Module
// Externally owned workflow steps consumed as immutable snapshots

pub mod step;

pub use step::{ProjectStatus, Step, StepSnapshot, StepStatus};
