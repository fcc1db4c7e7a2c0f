//! The report pipeline and its builder.

use crate::aggregates::{credit_score_by_segment, exited_age_correlation, exited_salary_correlation};
use crate::cleaner::BaseTableBuilder;
use crate::config::{ConfigValidationError, ReportConfig};
use crate::error::{Result, ResultExt};
use crate::pipeline::progress::{
    ClosureProgressReporter, ProgressReporter, ProgressUpdate, ReportStage,
};
use crate::types::ChurnReport;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Runs the base table builder and the three aggregators over one raw table.
///
/// # Example
///
/// ```rust,ignore
/// use churn_report::{Pipeline, ReportConfig};
///
/// let report = Pipeline::builder()
///     .config(ReportConfig::builder().seed(7).build()?)
///     .build()?
///     .process(raw)?;
///
/// println!("{}", report.credit_score);
/// ```
pub struct Pipeline {
    config: ReportConfig,
    builder: BaseTableBuilder,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Build the report with the RNG described by the configuration:
    /// seeded when `seed` is set, OS entropy otherwise.
    pub fn process(&self, raw: DataFrame) -> Result<ChurnReport> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.process_with_rng(raw, &mut rng)
    }

    /// Build the report drawing injection positions from `rng`.
    pub fn process_with_rng<R: Rng + ?Sized>(
        &self,
        raw: DataFrame,
        rng: &mut R,
    ) -> Result<ChurnReport> {
        match self.process_internal(raw, rng) {
            Ok(report) => {
                self.report_progress(ProgressUpdate::complete("Report completed successfully"));
                Ok(report)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Report failed: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal<R: Rng + ?Sized>(
        &self,
        raw: DataFrame,
        rng: &mut R,
    ) -> Result<ChurnReport> {
        let start_time = Instant::now();

        info!("Starting churn report on '{}'...", self.config.table);
        self.report_progress(ProgressUpdate::new(
            ReportStage::Initializing,
            0.0,
            format!("Received {} rows x {} columns", raw.height(), raw.width()),
        ));

        self.report_progress(ProgressUpdate::new(
            ReportStage::BaseTable,
            0.0,
            "Building base table...",
        ));
        let base = self.builder.build(raw, rng).context("Building base table")?;
        self.report_progress(ProgressUpdate::new(
            ReportStage::BaseTable,
            1.0,
            format!(
                "Base table ready: {} rows, {} blanked and imputed",
                base.data.height(),
                base.injected_positions.len()
            ),
        ));

        self.report_progress(ProgressUpdate::new(
            ReportStage::CreditScore,
            0.0,
            "Aggregating credit score...",
        ));
        let credit_score =
            credit_score_by_segment(&base.data).context("Credit score aggregation")?;
        self.report_progress(ProgressUpdate::new(
            ReportStage::CreditScore,
            1.0,
            format!("{} segments", credit_score.height()),
        ));

        self.report_progress(ProgressUpdate::new(
            ReportStage::AgeExit,
            0.0,
            "Aggregating age and exit flag...",
        ));
        let exited_age = exited_age_correlation(&base.data).context("Age/exit aggregation")?;
        self.report_progress(ProgressUpdate::new(
            ReportStage::AgeExit,
            1.0,
            format!("{} groups", exited_age.height()),
        ));

        self.report_progress(ProgressUpdate::new(
            ReportStage::SalaryCorrelation,
            0.0,
            "Correlating exit flag with salary...",
        ));
        let salary = exited_salary_correlation(&base.data).context("Salary correlation")?;
        self.report_progress(ProgressUpdate::new(
            ReportStage::SalaryCorrelation,
            1.0,
            format!("Salary threshold {}", salary.threshold),
        ));

        info!(
            "Churn report finished in {} ms",
            start_time.elapsed().as_millis()
        );

        Ok(ChurnReport {
            base,
            credit_score,
            exited_age,
            salary,
        })
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<ReportConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl PipelineBuilder {
    pub fn config(mut self, config: ReportConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline. Fails if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            builder: BaseTableBuilder::from_config(&config),
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NullInjection;
    use std::sync::Mutex;

    fn raw_table() -> DataFrame {
        df![
            "rownumber" => [1i64, 2, 3, 4, 5, 6],
            "geography" => ["France", "Spain", "France", "Germany", "Spain", "France"],
            "gender" => ["Female", "Male", "Male", "Female", "Female", "Male"],
            "age" => [42i64, 41, 39, 43, 50, 29],
            "balance" => [0.0, 83807.86, 159660.8, 125510.82, 0.0, 113755.78],
            "creditscore" => [619i64, 608, 502, 699, 850, 645],
            "estimatedsalary" => [101348.88, 112542.58, 113931.57, 93826.63, 79084.1, 149756.71],
            "exited" => [1i64, 0, 1, 0, 0, 1],
        ]
        .unwrap()
    }

    fn two_blanks() -> NullInjection {
        NullInjection {
            enabled: true,
            rows: 2,
            window: 10_000,
        }
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().table, "churn_modelling");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ReportConfig::default();
        config.table = "churn; drop".to_string();
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_process_produces_all_tables() {
        let config = ReportConfig::builder()
            .null_injection(NullInjection::disabled())
            .build()
            .unwrap();
        let report = Pipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .process(raw_table())
            .unwrap();

        assert_eq!(report.base.data.height(), 6);
        assert!(report.base.data.column("rownumber").is_err());
        assert_eq!(report.credit_score.height(), 5);
        assert_eq!(report.salary.table.height(), 6);
        assert!(report.exited_age.height() >= report.credit_score.height());
    }

    #[test]
    fn test_progress_stages_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();

        let config = ReportConfig::builder()
            .seed(3)
            .null_injection(two_blanks())
            .build()
            .unwrap();
        Pipeline::builder()
            .config(config)
            .on_progress(move |update| sink.lock().unwrap().push(update.stage))
            .build()
            .unwrap()
            .process(raw_table())
            .unwrap();

        let mut seen = stages.lock().unwrap().clone();
        seen.dedup();
        assert_eq!(
            seen,
            vec![
                ReportStage::Initializing,
                ReportStage::BaseTable,
                ReportStage::CreditScore,
                ReportStage::AgeExit,
                ReportStage::SalaryCorrelation,
                ReportStage::Complete,
            ]
        );
    }

    #[test]
    fn test_each_stage_reports_start_and_finish() {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();

        let config = ReportConfig::builder()
            .seed(5)
            .null_injection(two_blanks())
            .build()
            .unwrap();
        Pipeline::builder()
            .config(config)
            .on_progress(move |update| sink.lock().unwrap().push(update))
            .build()
            .unwrap()
            .process(raw_table())
            .unwrap();

        let updates = updates.lock().unwrap();
        for stage in [
            ReportStage::BaseTable,
            ReportStage::CreditScore,
            ReportStage::AgeExit,
            ReportStage::SalaryCorrelation,
        ] {
            let fractions: Vec<f32> = updates
                .iter()
                .filter(|u| u.stage == stage)
                .map(|u| u.stage_progress)
                .collect();
            assert_eq!(fractions, vec![0.0, 1.0], "{:?}", stage);
        }

        let ready = updates
            .iter()
            .find(|u| u.stage == ReportStage::BaseTable && u.stage_progress == 1.0)
            .unwrap();
        assert!((ready.progress - ReportStage::CreditScore.base_progress()).abs() < 1e-6);
        assert!(ready.message.contains("2 blanked"));
        assert!(updates.windows(2).all(|w| w[0].progress <= w[1].progress));
    }

    #[test]
    fn test_failure_reported() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();

        let raw = raw_table().drop("geography").unwrap();
        let err = Pipeline::builder()
            .on_progress(move |update| sink.lock().unwrap().push(update.stage))
            .build()
            .unwrap()
            .process(raw)
            .unwrap_err();

        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert_eq!(stages.lock().unwrap().last(), Some(&ReportStage::Failed));
    }

    #[test]
    fn test_same_seed_same_report() {
        let config = ReportConfig::builder()
            .seed(99)
            .null_injection(two_blanks())
            .build()
            .unwrap();
        let pipeline = Pipeline::builder().config(config).build().unwrap();

        let a = pipeline.process(raw_table()).unwrap();
        let b = pipeline.process(raw_table()).unwrap();

        assert_eq!(a.base.injected_positions, b.base.injected_positions);
        assert!(a.credit_score.equals(&b.credit_score));
    }
}
