//! Configuration types for the churn report.
//!
//! [`DatabaseSettings`] carries the connection parameters read from the
//! environment; [`ReportConfig`] carries everything else and is built with
//! a fluent builder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Name of the table the report is built from.
pub const DEFAULT_TABLE: &str = "churn_modelling";

/// Identifier column dropped before cleaning.
pub const DEFAULT_ID_COLUMN: &str = "rownumber";

/// Environment variable names, in the order they are resolved.
pub const ENV_HOST: &str = "postgres_host";
pub const ENV_DATABASE: &str = "postgres_database";
pub const ENV_USER: &str = "postgres_user";
pub const ENV_PASSWORD: &str = "postgres_password";
pub const ENV_PORT: &str = "postgres_port";

/// Connection parameters for the Postgres source.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: u16,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("port", &self.port)
            .finish()
    }
}

impl DatabaseSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup function.
    ///
    /// Each variable is looked up under its lower-case name first and then
    /// upper-case, so `postgres_host` and `POSTGRES_HOST` both work.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Result<String, ConfigValidationError> {
            lookup(key)
                .or_else(|| lookup(key.to_ascii_uppercase().as_str()))
                .ok_or_else(|| ConfigValidationError::MissingVariable(key.to_string()))
        };

        let host = get(ENV_HOST)?;
        let database = get(ENV_DATABASE)?;
        let user = get(ENV_USER)?;
        let password = get(ENV_PASSWORD)?;
        let raw_port = get(ENV_PORT)?;

        let port = raw_port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigValidationError::InvalidPort(raw_port.clone()))?;

        let settings = Self {
            host,
            database,
            user,
            password,
            port,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            (ENV_HOST, &self.host),
            (ENV_DATABASE, &self.database),
            (ENV_USER, &self.user),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyVariable(field.to_string()));
            }
        }
        if self.port == 0 {
            return Err(ConfigValidationError::InvalidPort("0".to_string()));
        }
        Ok(())
    }
}

/// How synthetic missing values are injected into the base table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullInjection {
    /// Whether to inject at all.
    /// Default: true
    pub enabled: bool,

    /// Number of row positions to blank out.
    /// Default: 30
    pub rows: usize,

    /// Positions are drawn from the first `window` rows.
    /// Default: 10_000
    pub window: usize,
}

impl Default for NullInjection {
    fn default() -> Self {
        Self {
            enabled: true,
            rows: 30,
            window: 10_000,
        }
    }
}

impl NullInjection {
    /// Injection turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// File format for the aggregate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Configuration for a report run.
///
/// Use [`ReportConfig::builder()`] for a fluent setup.
///
/// # Example
///
/// ```rust,ignore
/// use churn_report::config::{ReportConfig, OutputFormat};
///
/// let config = ReportConfig::builder()
///     .seed(42)
///     .output_format(OutputFormat::Parquet)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Source table name.
    /// Default: "churn_modelling"
    pub table: String,

    /// Identifier column removed from the base table.
    /// Default: "rownumber"
    pub id_column: String,

    /// Missing-value injection settings.
    pub null_injection: NullInjection,

    /// Seed for the injection RNG. `None` draws from OS entropy.
    /// Default: None
    pub seed: Option<u64>,

    /// Output directory for the aggregate tables and report.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// File format of the aggregate tables.
    /// Default: Csv
    pub output_format: OutputFormat,

    /// Whether to write the aggregate tables to disk.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            null_injection: NullInjection::default(),
            seed: None,
            output_dir: PathBuf::from("output"),
            output_format: OutputFormat::default(),
            save_to_disk: true,
        }
    }
}

impl ReportConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !is_plain_identifier(&self.table) {
            return Err(ConfigValidationError::InvalidTableName(self.table.clone()));
        }

        if self.null_injection.enabled {
            if self.null_injection.rows == 0 {
                return Err(ConfigValidationError::InvalidInjection(
                    "rows must be at least 1".to_string(),
                ));
            }
            if self.null_injection.window == 0 {
                return Err(ConfigValidationError::InvalidInjection(
                    "window must be at least 1".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// A table name that can be spliced into `SELECT * FROM {table}` as-is.
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Environment variable '{0}' is not set")]
    MissingVariable(String),

    #[error("Environment variable '{0}' is empty")]
    EmptyVariable(String),

    #[error("Invalid port '{0}' (must be an integer between 1 and 65535)")]
    InvalidPort(String),

    #[error("Invalid table name '{0}' (letters, digits and underscores only)")]
    InvalidTableName(String),

    #[error("Invalid null injection settings: {0}")]
    InvalidInjection(String),
}

/// Builder for [`ReportConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ReportConfigBuilder {
    table: Option<String>,
    id_column: Option<String>,
    null_injection: Option<NullInjection>,
    seed: Option<u64>,
    output_dir: Option<PathBuf>,
    output_format: Option<OutputFormat>,
    save_to_disk: Option<bool>,
}

impl ReportConfigBuilder {
    /// Set the source table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the identifier column to drop.
    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    /// Set the missing-value injection settings.
    pub fn null_injection(mut self, injection: NullInjection) -> Self {
        self.null_injection = Some(injection);
        self
    }

    /// Seed the injection RNG for a reproducible run.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the output directory.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the file format for the aggregate tables.
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Enable or disable writing the aggregate tables to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ReportConfig` or an error if validation fails.
    pub fn build(self) -> Result<ReportConfig, ConfigValidationError> {
        let config = ReportConfig {
            table: self.table.unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            id_column: self
                .id_column
                .unwrap_or_else(|| DEFAULT_ID_COLUMN.to_string()),
            null_injection: self.null_injection.unwrap_or_default(),
            seed: self.seed,
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("output")),
            output_format: self.output_format.unwrap_or_default(),
            save_to_disk: self.save_to_disk.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
