//! Pipeline module.
//!
//! This module provides the benchmark runner and its control surfaces.

mod builder;
pub mod gate;
pub mod progress;
mod runner;

pub use builder::{BenchmarkRunner, BenchmarkRunnerBuilder};
pub use gate::{AutoAdvance, GateDecision, ScenarioGate, StdinGate};
pub use progress::{
    BenchmarkStage, CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
