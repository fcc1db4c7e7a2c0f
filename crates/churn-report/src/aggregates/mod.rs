//! Summary tables derived from the cleaned base table.
//!
//! Every aggregator takes the base table by reference and returns a new
//! `DataFrame`; none of them modifies its input.

mod age_exit;
mod credit_score;
mod salary;

pub use age_exit::exited_age_correlation;
pub use credit_score::credit_score_by_segment;
pub use salary::{exited_salary_correlation, label_above_threshold, salary_threshold};
