use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImputationMethod {
    Mode,
    Mean,
    Median,
}

impl ImputationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImputationMethod::Mode => "mode",
            ImputationMethod::Mean => "mean",
            ImputationMethod::Median => "median",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

/// What a single imputation step filled a column with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationRecord {
    pub column: String,
    pub method: ImputationMethod,
    pub fill_value: FillValue,
    pub filled_count: usize,
}

/// The cleaned table plus what was done to produce it.
#[derive(Debug, Clone)]
pub struct BaseTable {
    pub data: DataFrame,
    /// Row positions that were blanked before imputation, ascending.
    pub injected_positions: Vec<usize>,
    pub imputations: Vec<ImputationRecord>,
    pub processing_steps: Vec<String>,
}

/// Output of the salary correlation step.
#[derive(Debug, Clone)]
pub struct SalaryCorrelation {
    /// Minimum per-(geography, gender) mean salary, rounded to a whole number.
    pub threshold: f64,
    /// One row per input row: exited, is_greater, correlation.
    pub table: DataFrame,
}

/// The three derived tables of one run.
#[derive(Debug, Clone)]
pub struct ChurnReport {
    pub base: BaseTable,
    pub credit_score: DataFrame,
    pub exited_age: DataFrame,
    pub salary: SalaryCorrelation,
}

/// Serializable summary of a run, used for `--json` and `--emit-report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub source: String,
    pub rows_loaded: usize,
    pub rows_cleaned: usize,
    pub injected_rows: usize,
    pub seed: Option<u64>,
    pub imputations: Vec<ImputationRecord>,
    pub salary_threshold: f64,
    pub credit_score_groups: usize,
    pub exited_age_groups: usize,
    pub salary_rows: usize,
    /// Share of rows whose exit flag agrees with the salary label.
    pub salary_agreement_rate: f64,
    pub processing_steps: Vec<String>,
    pub written_files: Vec<String>,
}
