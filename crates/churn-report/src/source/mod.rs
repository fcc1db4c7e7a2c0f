//! Data source adapters.
//!
//! Both adapters hand the core a raw `DataFrame` whose column names are the
//! result-set column names:
//! - [`postgres`]: runs `SELECT * FROM <table>` against Postgres
//! - [`csv`]: loads an exported copy of the table for offline runs

pub mod csv;
pub mod postgres;

pub use self::csv::load_csv;
pub use self::postgres::{PostgresSource, fetch_table, select_all_query};
