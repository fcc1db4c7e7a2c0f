//! Pipeline module.
//!
//! Runs the base table builder and the three aggregators in order and
//! reports progress along the way.

mod builder;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{ClosureProgressReporter, ProgressReporter, ProgressUpdate, ReportStage};
