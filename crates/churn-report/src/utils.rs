//! Shared helpers for the table builder and the aggregators.

use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Most frequent non-null value of a string Series.
///
/// Ties go to the value seen first, so the result only depends on the
/// input order.
pub fn string_mode(series: &Series) -> Option<String> {
    let str_series = series.cast(&DataType::String).ok()?;
    let str_chunked = str_series.str().ok()?;

    let mut order: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for val in str_chunked.into_iter().flatten() {
        match index.get(val) {
            Some(&pos) => order[pos].1 += 1,
            None => {
                index.insert(val, order.len());
                order.push((val, 1));
            }
        }
    }

    // `max_by_key` keeps the last maximum, so walk the candidates in reverse
    order
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(val, _)| val.to_string())
}

/// Round half away from zero to `decimals` places.
pub fn round_half_away(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Round half to even to `decimals` places.
pub fn round_half_even(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Cast a Series to Float64, keeping its name.
pub fn to_f64_series(series: &Series) -> PolarsResult<Series> {
    series.cast(&DataType::Float64)
}

/// Fill null values in a numeric Series with a specific value.
///
/// The result is always Float64.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let as_f64 = to_f64_series(series)?;
    let filled: Float64Chunked = as_f64
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();

    Ok(filled.with_name(series.name().clone()).into_series())
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let as_str = series.cast(&DataType::String)?;
    let filled: StringChunked = as_str
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();

    Ok(filled.with_name(series.name().clone()).into_series())
}

/// Set the given row positions of a Series to null.
///
/// Numeric columns come back as Float64 and everything else as String,
/// matching what the imputers expect.
pub fn null_out_positions(series: &Series, positions: &[usize]) -> PolarsResult<Series> {
    let mut mask = vec![false; series.len()];
    for &pos in positions {
        if let Some(slot) = mask.get_mut(pos) {
            *slot = true;
        }
    }

    if is_numeric_dtype(series.dtype()) {
        let as_f64 = to_f64_series(series)?;
        let blanked: Float64Chunked = as_f64
            .f64()?
            .into_iter()
            .zip(mask.iter())
            .map(|(v, &hit)| if hit { None } else { v })
            .collect();
        Ok(blanked.with_name(series.name().clone()).into_series())
    } else {
        let as_str = series.cast(&DataType::String)?;
        let blanked: StringChunked = as_str
            .str()?
            .into_iter()
            .zip(mask.iter())
            .map(|(v, &hit)| if hit { None } else { v })
            .collect();
        Ok(blanked.with_name(series.name().clone()).into_series())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_string_mode() {
        let series = Series::new("test".into(), &["a", "b", "a", "c", "a"]);
        assert_eq!(string_mode(&series), Some("a".to_string()));
    }

    #[test]
    fn test_string_mode_tie_goes_to_first_seen() {
        let series = Series::new("test".into(), &["Spain", "France", "France", "Spain"]);
        assert_eq!(string_mode(&series), Some("Spain".to_string()));

        let series = Series::new("test".into(), &["France", "Spain", "Spain", "France"]);
        assert_eq!(string_mode(&series), Some("France".to_string()));
    }

    #[test]
    fn test_string_mode_ignores_nulls() {
        let series = Series::new("test".into(), &[None, None, None, Some("Germany")]);
        assert_eq!(string_mode(&series), Some("Germany".to_string()));

        let empty = Series::new("test".into(), &[Option::<&str>::None, None]);
        assert_eq!(string_mode(&empty), None);
    }

    #[test]
    fn test_rounding_conventions() {
        assert_eq!(round_half_away(2.5, 0), 3.0);
        assert_eq!(round_half_even(2.5, 0), 2.0);
        assert_eq!(round_half_even(3.5, 0), 4.0);
        assert_eq!(round_half_away(-2.5, 0), -3.0);
        assert!((round_half_away(100_090.456, 1) - 100_090.5).abs() < 1e-9);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1.0), None, Some(3.0)]);
        let filled = fill_numeric_nulls(&series, 0.0).unwrap();

        assert_eq!(filled.get(0).unwrap().try_extract::<f64>().unwrap(), 1.0);
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 0.0);
        assert_eq!(filled.get(2).unwrap().try_extract::<f64>().unwrap(), 3.0);
    }

    #[test]
    fn test_fill_numeric_nulls_int_input_becomes_float() {
        let series = Series::new("score".into(), &[Some(600i64), None]);
        let filled = fill_numeric_nulls(&series, 650.5).unwrap();

        assert_eq!(filled.dtype(), &DataType::Float64);
        assert_eq!(filled.name().as_str(), "score");
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 650.5);
    }

    #[test]
    fn test_fill_string_nulls_keeps_values_unquoted() {
        let series = Series::new("geo".into(), &[Some("Spain"), None]);
        let filled = fill_string_nulls(&series, "France").unwrap();
        let values: Vec<Option<&str>> = filled.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("Spain"), Some("France")]);
    }

    #[test]
    fn test_null_out_positions() {
        let numbers = Series::new("balance".into(), &[1i64, 2, 3, 4]);
        let blanked = null_out_positions(&numbers, &[1, 3, 99]).unwrap();
        assert_eq!(blanked.null_count(), 2);
        assert_eq!(blanked.dtype(), &DataType::Float64);

        let words = Series::new("geography".into(), &["a", "b", "c"]);
        let blanked = null_out_positions(&words, &[0]).unwrap();
        assert_eq!(blanked.null_count(), 1);
        assert_eq!(blanked.str().unwrap().get(1), Some("b"));
    }
}
