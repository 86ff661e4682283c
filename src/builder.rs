//! Chart configuration builder.

use crate::dataset::SeriesTable;
use crate::options::ChartOptions;
use crate::spec::{ChartSpec, DisplaySeries, ReferenceLine, SeriesKind, ValueAxis};
use crate::stats::column_means;
use thiserror::Error;

/// Key of the derived multi-source average series.
pub const AGGREGATE_KEY: &str = "average";

#[derive(Debug, Error, PartialEq)]
pub enum InvalidInput {
    #[error("years must not be empty")]
    EmptyYears,
    #[error("years must be strictly increasing, but {prev} is followed by {next}")]
    UnorderedYears { prev: i32, next: i32 },
    #[error("series {key:?} has {found} values for {expected} years")]
    LengthMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
}

/// Build the chart specification for a table of deviation series.
///
/// Source series keep the table's insertion order and their values verbatim,
/// except that non-finite values become missing values. The multi-source
/// average is appended last.
///
/// # Errors
/// Returns [`InvalidInput`] if `years` is empty or not strictly increasing,
/// or if any series length differs from the number of years.
pub fn build_chart_spec(
    years: &[i32],
    table: &SeriesTable,
    opts: &ChartOptions,
) -> Result<ChartSpec, InvalidInput> {
    validate_years(years)?;

    let mut series = Vec::with_capacity(table.n_sources() + 1);
    for (idx, (key, values)) in table.sources().enumerate() {
        if values.len() != years.len() {
            return Err(InvalidInput::LengthMismatch {
                key: key.to_string(),
                expected: years.len(),
                found: values.len(),
            });
        }
        series.push(DisplaySeries {
            key: key.to_string(),
            name: opts.name_of(key),
            color: opts.color_of(key, idx),
            kind: SeriesKind::Source,
            values: values.iter().map(|&val| sanitize(val)).collect(),
        });
    }

    let average = column_means(years.len(), series.iter().map(|s| s.values.as_slice()));
    series.push(DisplaySeries {
        key: AGGREGATE_KEY.to_string(),
        name: opts.average_name.clone(),
        color: opts.average_color.clone(),
        kind: SeriesKind::Aggregate,
        values: average,
    });

    Ok(ChartSpec {
        years: years.to_vec(),
        y_axis: ValueAxis {
            name: opts.y_axis.name.clone(),
            min: opts.y_axis.min,
            max: opts.y_axis.max,
            interval: opts.y_axis.interval,
        },
        series,
        annotations: vec![ReferenceLine {
            value: opts.threshold.value,
            label: opts.threshold.label.clone(),
            color: opts.threshold.color.clone(),
        }],
        baseline_note: opts.baseline_note.clone(),
        animation_ms: opts.animation_ms,
    })
}

fn validate_years(years: &[i32]) -> Result<(), InvalidInput> {
    if years.is_empty() {
        return Err(InvalidInput::EmptyYears);
    }
    for pair in years.windows(2) {
        if pair[0] >= pair[1] {
            return Err(InvalidInput::UnorderedYears {
                prev: pair[0],
                next: pair[1],
            });
        }
    }
    Ok(())
}

fn sanitize(val: Option<f64>) -> Option<f64> {
    val.filter(|v| v.is_finite())
}
