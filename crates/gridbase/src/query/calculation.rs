//! Column aggregates.

use gridbase_api::{CalculationType, Field, Row};

use crate::codec;

/// Compute one aggregate over a column. Returns the formatted value as
/// stored in the view; the empty string means "nothing to show".
pub fn calculate(calculation_type: CalculationType, field: &Field, rows: &[Row]) -> String {
    match calculation_type {
        CalculationType::Count => rows.len().to_string(),
        CalculationType::CountEmpty => rows
            .iter()
            .filter(|row| is_cell_empty(row, &field.id))
            .count()
            .to_string(),
        CalculationType::CountNonEmpty => rows
            .iter()
            .filter(|row| !is_cell_empty(row, &field.id))
            .count()
            .to_string(),
        CalculationType::Sum => numeric_aggregate(field, rows, |values| values.iter().sum()),
        CalculationType::Average => numeric_aggregate(field, rows, |values| {
            values.iter().sum::<f64>() / values.len() as f64
        }),
        CalculationType::Min => {
            numeric_aggregate(field, rows, |values| values.iter().copied().fold(f64::INFINITY, f64::min))
        }
        CalculationType::Max => numeric_aggregate(field, rows, |values| {
            values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        }),
        CalculationType::Median => numeric_aggregate(field, rows, median),
    }
}

fn is_cell_empty(row: &Row, field_id: &str) -> bool {
    row.cell(field_id).map(|c| c.data.is_empty()).unwrap_or(true)
}

fn numeric_aggregate<F>(field: &Field, rows: &[Row], f: F) -> String
where
    F: FnOnce(&[f64]) -> f64,
{
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.cell(&field.id))
        .filter_map(codec::number_text)
        .filter_map(|raw| raw.parse::<f64>().ok())
        .collect();
    if values.is_empty() {
        return String::new();
    }
    format_number(f(&values))
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
