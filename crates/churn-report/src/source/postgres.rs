//! Postgres source backed by a single sqlx connection.
//!
//! The connection lives only as long as one fetch: [`fetch_table`] opens it,
//! runs the query and closes it again on every path.

use crate::config::DatabaseSettings;
use crate::error::{ReportError, Result};
use polars::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column as _, Connection, Row, TypeInfo};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Build the query for a validated table name.
pub fn select_all_query(table: &str) -> String {
    format!("SELECT * FROM {}", table)
}

/// Open a connection, fetch `table` and close the connection.
pub async fn fetch_table(settings: &DatabaseSettings, table: &str) -> Result<DataFrame> {
    let mut source = PostgresSource::connect(settings).await?;
    let result = source.fetch_table(table).await;

    if let Err(e) = source.close().await {
        warn!("Postgres connection did not close cleanly: {}", e);
    }

    result
}

/// An open connection to the churn database.
pub struct PostgresSource {
    conn: PgConnection,
}

impl PostgresSource {
    /// Connect using the given settings.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        info!(
            "Connecting to Postgres at {}:{}/{} as {}",
            settings.host, settings.port, settings.database, settings.user
        );

        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database);

        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| ReportError::Connection(e.to_string()))?;

        info!("Postgres server connection is successful");
        Ok(Self { conn })
    }

    /// Run `SELECT * FROM <table>` and convert the rows to a DataFrame.
    pub async fn fetch_table(&mut self, table: &str) -> Result<DataFrame> {
        let query = select_all_query(table);
        let start = Instant::now();
        debug!("Executing: {}", query);

        let rows = sqlx::query(&query)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| ReportError::Query(e.to_string()))?;

        info!(
            "Fetched {} rows from '{}' in {} ms",
            rows.len(),
            table,
            start.elapsed().as_millis()
        );

        rows_to_dataframe(table, &rows)
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| ReportError::Connection(e.to_string()))
    }
}

/// Postgres column types the table builder can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgKind {
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    /// `NUMERIC(p, s)`, held as Float64
    Numeric,
    Bool,
    Text,
}

impl PgKind {
    /// Map a Postgres type name (as reported by the result metadata).
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "INT2" | "SMALLINT" => Some(PgKind::Int2),
            "INT4" | "INT" | "INTEGER" => Some(PgKind::Int4),
            "INT8" | "BIGINT" => Some(PgKind::Int8),
            "FLOAT4" | "REAL" => Some(PgKind::Float4),
            "FLOAT8" | "DOUBLE PRECISION" => Some(PgKind::Float8),
            "NUMERIC" | "DECIMAL" => Some(PgKind::Numeric),
            "BOOL" | "BOOLEAN" => Some(PgKind::Bool),
            "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => Some(PgKind::Text),
            _ => None,
        }
    }
}

/// Typed values of one result column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnBuffer {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

impl ColumnBuffer {
    fn for_kind(kind: PgKind, capacity: usize) -> Self {
        match kind {
            PgKind::Int2 | PgKind::Int4 | PgKind::Int8 => {
                ColumnBuffer::Int(Vec::with_capacity(capacity))
            }
            PgKind::Float4 | PgKind::Float8 | PgKind::Numeric => {
                ColumnBuffer::Float(Vec::with_capacity(capacity))
            }
            PgKind::Bool => ColumnBuffer::Bool(Vec::with_capacity(capacity)),
            PgKind::Text => ColumnBuffer::Text(Vec::with_capacity(capacity)),
        }
    }

    fn push_from(&mut self, kind: PgKind, row: &PgRow, idx: usize) -> Result<()> {
        match (self, kind) {
            (ColumnBuffer::Int(v), PgKind::Int2) => {
                v.push(row.try_get::<Option<i16>, _>(idx)?.map(i64::from))
            }
            (ColumnBuffer::Int(v), PgKind::Int4) => {
                v.push(row.try_get::<Option<i32>, _>(idx)?.map(i64::from))
            }
            (ColumnBuffer::Int(v), PgKind::Int8) => v.push(row.try_get::<Option<i64>, _>(idx)?),
            (ColumnBuffer::Float(v), PgKind::Float4) => {
                v.push(row.try_get::<Option<f32>, _>(idx)?.map(f64::from))
            }
            (ColumnBuffer::Float(v), PgKind::Float8) => {
                v.push(row.try_get::<Option<f64>, _>(idx)?)
            }
            (ColumnBuffer::Float(v), PgKind::Numeric) => {
                let value = row.try_get::<Option<Decimal>, _>(idx)?;
                v.push(value.map(|d| decimal_to_f64(d, idx)).transpose()?)
            }
            (ColumnBuffer::Bool(v), PgKind::Bool) => v.push(row.try_get::<Option<bool>, _>(idx)?),
            (ColumnBuffer::Text(v), PgKind::Text) => {
                v.push(row.try_get::<Option<String>, _>(idx)?)
            }
            (_, kind) => {
                return Err(ReportError::Decode(format!(
                    "column {} decoded with mismatched kind {:?}",
                    idx, kind
                )));
            }
        }
        Ok(())
    }

    /// Turn the buffered values into a named Series.
    pub fn into_series(self, name: &str) -> Series {
        match self {
            ColumnBuffer::Int(v) => Series::new(name.into(), v),
            ColumnBuffer::Float(v) => Series::new(name.into(), v),
            ColumnBuffer::Bool(v) => Series::new(name.into(), v),
            ColumnBuffer::Text(v) => Series::new(name.into(), v),
        }
    }
}

/// Widen a `NUMERIC` value to f64 for the Float64 column.
pub fn decimal_to_f64(value: Decimal, idx: usize) -> Result<f64> {
    value.to_f64().ok_or_else(|| {
        ReportError::Decode(format!("column {}: {} does not fit in f64", idx, value))
    })
}

/// Convert fetched rows into a DataFrame using the result column metadata.
fn rows_to_dataframe(table: &str, rows: &[PgRow]) -> Result<DataFrame> {
    let Some(first) = rows.first() else {
        return Err(ReportError::EmptyTable(table.to_string()));
    };

    let mut layout: Vec<(String, PgKind, ColumnBuffer)> = Vec::with_capacity(first.len());
    for column in first.columns() {
        let type_name = column.type_info().name();
        let kind =
            PgKind::from_type_name(type_name).ok_or_else(|| ReportError::UnsupportedColumnType {
                column: column.name().to_string(),
                type_name: type_name.to_string(),
            })?;
        layout.push((
            column.name().to_string(),
            kind,
            ColumnBuffer::for_kind(kind, rows.len()),
        ));
    }

    for row in rows {
        for (idx, (_, kind, buffer)) in layout.iter_mut().enumerate() {
            buffer.push_from(*kind, row, idx)?;
        }
    }

    let columns: Vec<polars::prelude::Column> = layout
        .into_iter()
        .map(|(name, _, buffer)| buffer.into_series(&name).into_column())
        .collect();

    let df = DataFrame::new(columns)?;
    debug!("Result set converted to DataFrame {:?}", df.shape());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_query() {
        assert_eq!(
            select_all_query("churn_modelling"),
            "SELECT * FROM churn_modelling"
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(PgKind::from_type_name("INT4"), Some(PgKind::Int4));
        assert_eq!(PgKind::from_type_name("int8"), Some(PgKind::Int8));
        assert_eq!(PgKind::from_type_name("FLOAT8"), Some(PgKind::Float8));
        assert_eq!(PgKind::from_type_name("VARCHAR"), Some(PgKind::Text));
        assert_eq!(PgKind::from_type_name("BOOL"), Some(PgKind::Bool));
        assert_eq!(PgKind::from_type_name("NUMERIC"), Some(PgKind::Numeric));
        assert_eq!(PgKind::from_type_name("numeric"), Some(PgKind::Numeric));
        assert_eq!(PgKind::from_type_name("MONEY"), None);
        assert_eq!(PgKind::from_type_name("JSONB"), None);
    }

    #[test]
    fn test_buffers_become_typed_series() {
        let ints = ColumnBuffer::Int(vec![Some(619), None]).into_series("creditscore");
        assert_eq!(ints.dtype(), &DataType::Int64);
        assert_eq!(ints.null_count(), 1);
        assert_eq!(ints.name().as_str(), "creditscore");

        let text = ColumnBuffer::Text(vec![Some("France".to_string())]).into_series("geography");
        assert_eq!(text.dtype(), &DataType::String);

        let flags = ColumnBuffer::Bool(vec![Some(true), Some(false)]).into_series("exited");
        assert_eq!(flags.dtype(), &DataType::Boolean);

        let floats = ColumnBuffer::Float(vec![Some(0.0)]).into_series("balance");
        assert_eq!(floats.dtype(), &DataType::Float64);
    }

    #[test]
    fn test_buffer_capacity_follows_kind() {
        assert!(matches!(
            ColumnBuffer::for_kind(PgKind::Int2, 4),
            ColumnBuffer::Int(_)
        ));
        assert!(matches!(
            ColumnBuffer::for_kind(PgKind::Float4, 4),
            ColumnBuffer::Float(_)
        ));
    }

    #[test]
    fn test_numeric_column_becomes_float64() {
        let mut buffer = ColumnBuffer::for_kind(PgKind::Numeric, 3);
        let ColumnBuffer::Float(values) = &mut buffer else {
            panic!("NUMERIC should buffer as floats");
        };

        let balance = Decimal::new(8_380_786, 2);
        values.push(Some(decimal_to_f64(balance, 0).unwrap()));
        values.push(None);
        values.push(Some(decimal_to_f64(Decimal::ZERO, 0).unwrap()));

        let series = buffer.into_series("balance");
        assert_eq!(series.dtype(), &DataType::Float64);
        assert_eq!(series.null_count(), 1);
        let got = series.f64().unwrap().get(0).unwrap();
        assert!((got - 83807.86).abs() < 1e-9);
    }

    #[test]
    fn test_no_rows_is_empty_table() {
        let err = rows_to_dataframe("churn_modelling", &[]).unwrap_err();
        assert!(matches!(err, ReportError::EmptyTable(ref t) if t == "churn_modelling"));
    }
}
