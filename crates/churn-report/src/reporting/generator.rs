use crate::config::{OutputFormat, ReportConfig};
use crate::error::{Result, ResultExt};
use crate::schema::CORRELATION;
use crate::types::{ChurnReport, RunSummary, SalaryCorrelation};
use chrono::Local;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File stem of the credit score table.
pub const CREDIT_SCORE_FILE: &str = "avg_credit_score";
/// File stem of the age/exit table.
pub const EXITED_AGE_FILE: &str = "exited_age_correlation";
/// File stem of the salary correlation table.
pub const SALARY_FILE: &str = "exited_salary_correlation";
/// Name of the JSON run summary.
pub const SUMMARY_FILE: &str = "churn_report.json";

/// Writes the aggregate tables and the run summary to an output directory.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
    format: OutputFormat,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new(PathBuf::from("output"), OutputFormat::Csv)
    }
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf, format: OutputFormat) -> Self {
        Self { output_dir, format }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(config.output_dir.clone(), config.output_format)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the three aggregate tables. Returns the written paths in
    /// credit score, age/exit, salary order.
    pub fn write_tables(&self, report: &ChurnReport) -> Result<Vec<PathBuf>> {
        info!(
            "Writing aggregate tables to {} as {}",
            self.output_dir.display(),
            self.format.extension()
        );

        Ok(vec![
            self.write_table(CREDIT_SCORE_FILE, &report.credit_score)?,
            self.write_table(EXITED_AGE_FILE, &report.exited_age)?,
            self.write_table(SALARY_FILE, &report.salary.table)?,
        ])
    }

    /// Write one table as `<stem>.<ext>` in the output directory.
    pub fn write_table(&self, stem: &str, df: &DataFrame) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let path = self
            .output_dir
            .join(format!("{}.{}", stem, self.format.extension()));
        let mut file = File::create(&path)?;
        let mut df = df.clone();

        match self.format {
            OutputFormat::Csv => {
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .with_separator(b',')
                    .finish(&mut df)
                    .context(format!("Writing {}", path.display()))?;
            }
            OutputFormat::Parquet => {
                ParquetWriter::new(&mut file)
                    .finish(&mut df)
                    .context(format!("Writing {}", path.display()))?;
            }
        }

        info!("Table saved: {}", path.display());
        Ok(path)
    }

    /// Summarize a finished run.
    pub fn build_summary(
        source: &str,
        rows_loaded: usize,
        seed: Option<u64>,
        report: &ChurnReport,
        written_files: &[PathBuf],
    ) -> Result<RunSummary> {
        let salary_agreement_rate = agreement_rate(&report.salary)?;
        debug!("Salary agreement rate: {:.4}", salary_agreement_rate);

        Ok(RunSummary {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            source: source.to_string(),
            rows_loaded,
            rows_cleaned: report.base.data.height(),
            injected_rows: report.base.injected_positions.len(),
            seed,
            imputations: report.base.imputations.clone(),
            salary_threshold: report.salary.threshold,
            credit_score_groups: report.credit_score.height(),
            exited_age_groups: report.exited_age.height(),
            salary_rows: report.salary.table.height(),
            salary_agreement_rate,
            processing_steps: report.base.processing_steps.clone(),
            written_files: written_files
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        })
    }

    /// Write the summary as pretty JSON to `churn_report.json`.
    pub fn write_summary(&self, summary: &RunSummary) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join(SUMMARY_FILE);
        let mut file = File::create(&path)?;
        file.write_all(serde_json::to_string_pretty(summary)?.as_bytes())?;

        info!("Report saved: {}", path.display());
        Ok(path)
    }
}

/// Share of rows whose exit flag matches the salary label. 0 for an empty table.
pub fn agreement_rate(salary: &SalaryCorrelation) -> Result<f64> {
    let rows = salary.table.height();
    if rows == 0 {
        return Ok(0.0);
    }

    let agreeing = salary
        .table
        .column(CORRELATION)?
        .as_materialized_series()
        .i32()?
        .into_iter()
        .flatten()
        .filter(|&v| v == 1)
        .count();

    Ok(agreeing as f64 / rows as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BaseTable, FillValue, ImputationMethod, ImputationRecord};
    use polars::io::csv::read::CsvReadOptions;
    use pretty_assertions::assert_eq;

    fn report() -> ChurnReport {
        let data = df![
            "geography" => ["France", "Spain", "France", "Spain"],
            "gender" => ["Male", "Female", "Male", "Female"],
            "exited" => [1i32, 0, 0, 1],
        ]
        .unwrap();

        ChurnReport {
            base: BaseTable {
                data,
                injected_positions: vec![1, 3],
                imputations: vec![ImputationRecord {
                    column: "geography".to_string(),
                    method: ImputationMethod::Mode,
                    fill_value: FillValue::Text("France".to_string()),
                    filled_count: 2,
                }],
                processing_steps: vec!["Dropped identifier column 'rownumber'".to_string()],
            },
            credit_score: df![
                "geography" => ["Spain", "France"],
                "gender" => ["Female", "Male"],
                "avg_credit_score" => [600.0, 650.5],
                "total_exited" => [1i64, 1],
            ]
            .unwrap(),
            exited_age: df![
                "geography" => ["France"],
                "gender" => ["Male"],
                "exited" => [1i32],
                "avg_age" => [40.0],
                "avg_salary" => [1000.5],
                "number_of_exited_or_not" => [4i64],
            ]
            .unwrap(),
            salary: SalaryCorrelation {
                threshold: 1000.0,
                table: df![
                    "exited" => [1i32, 0, 0, 1],
                    "is_greater" => [1i32, 1, 0, 0],
                    "correlation" => [1i32, 0, 1, 0],
                ]
                .unwrap(),
            },
        }
    }

    #[test]
    fn test_agreement_rate() {
        assert_eq!(agreement_rate(&report().salary).unwrap(), 0.5);
    }

    #[test]
    fn test_write_csv_tables() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let generator = ReportGenerator::new(out.clone(), OutputFormat::Csv);

        let paths = generator.write_tables(&report()).unwrap();

        assert_eq!(
            paths,
            vec![
                out.join("avg_credit_score.csv"),
                out.join("exited_age_correlation.csv"),
                out.join("exited_salary_correlation.csv"),
            ]
        );

        let back = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(paths[0].clone()))
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(back.height(), 2);
        assert_eq!(
            back.get_column_names()
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>(),
            vec!["geography", "gender", "avg_credit_score", "total_exited"]
        );
    }

    #[test]
    fn test_write_parquet_table() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path().to_path_buf(), OutputFormat::Parquet);

        let path = generator
            .write_table(SALARY_FILE, &report().salary.table)
            .unwrap();

        assert_eq!(path, dir.path().join("exited_salary_correlation.parquet"));
        let back = ParquetReader::new(File::open(&path).unwrap())
            .finish()
            .unwrap();
        assert!(back.equals(&report().salary.table));
    }

    #[test]
    fn test_summary_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path().to_path_buf(), OutputFormat::Csv);
        let report = report();

        let summary =
            ReportGenerator::build_summary("churn_modelling", 6, Some(42), &report, &[]).unwrap();
        assert_eq!(summary.rows_loaded, 6);
        assert_eq!(summary.rows_cleaned, 4);
        assert_eq!(summary.injected_rows, 2);
        assert_eq!(summary.credit_score_groups, 2);
        assert_eq!(summary.exited_age_groups, 1);
        assert_eq!(summary.salary_rows, 4);
        assert_eq!(summary.salary_threshold, 1000.0);

        let path = generator.write_summary(&summary).unwrap();
        assert_eq!(path.file_name().unwrap(), "churn_report.json");

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["seed"], 42);
        assert_eq!(json["imputations"][0]["method"], "mode");
        assert_eq!(json["imputations"][0]["fill_value"], "France");
        assert_eq!(json["salary_agreement_rate"], 0.5);
    }
}
