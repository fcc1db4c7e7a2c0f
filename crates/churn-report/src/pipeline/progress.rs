//! Progress reporting for a report run.
//!
//! # Example
//!
//! ```rust,ignore
//! use churn_report::Pipeline;
//!
//! let report = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(raw)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of a report run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStage {
    /// Validating the raw table
    Initializing,
    /// Dropping the identifier, injecting and imputing missing values
    BaseTable,
    /// Average credit score per segment
    CreditScore,
    /// Age and salary per segment and exit flag
    AgeExit,
    /// Exit flag against the salary threshold
    SalaryCorrelation,
    /// Run completed successfully
    Complete,
    /// Run failed with an error
    Failed,
}

impl ReportStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::BaseTable => "Building Base Table",
            Self::CreditScore => "Credit Score",
            Self::AgeExit => "Age and Exit",
            Self::SalaryCorrelation => "Salary Correlation",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run spent in this stage.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.05,
            Self::BaseTable => 0.45,
            Self::CreditScore => 0.15,
            Self::AgeExit => 0.15,
            Self::SalaryCorrelation => 0.20,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    ///
    /// Summed from the preceding weights so that a stage finishing at
    /// `stage_progress = 1.0` lands exactly on the next stage's start.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Failed => 0.0,
            stage => Self::RUN_ORDER
                .iter()
                .take_while(|s| *s != stage)
                .fold(0.0, |acc, s| acc + s.weight()),
        }
    }

    /// Working stages in execution order.
    pub const RUN_ORDER: [ReportStage; 5] = [
        Self::Initializing,
        Self::BaseTable,
        Self::CreditScore,
        Self::AgeExit,
        Self::SalaryCorrelation,
    ];
}

/// A single progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: ReportStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: ReportStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: ReportStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: ReportStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receives progress updates while a report is built.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
