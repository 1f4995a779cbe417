use serde_json::Value;

use crate::{
    models::{Metric, MetricDefinition, MetricValue, QueryResult, Series},
    template,
    window::{TimeWindow, NANOS_PER_MILLI},
    DwhExportError, Result,
};

/// Maps every series of `result` to a [`Metric`]. A single malformed series
/// fails the whole metric definition.
pub fn map_result(result: &QueryResult, metric: &MetricDefinition, window: &TimeWindow) -> Result<Vec<Metric>> {
    result
        .series
        .iter()
        .map(|series| map_series(series, metric, window))
        .collect()
}

fn map_series(series: &Series, metric: &MetricDefinition, window: &TimeWindow) -> Result<Metric> {
    if series.columns.len() != 2 {
        return Err(DwhExportError::UnexpectedShape(format!(
            "expected a time and a single value column, got {} columns {:?}",
            series.columns.len(),
            series.columns
        )));
    }

    let time_index = series
        .columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case("time"))
        .ok_or_else(|| {
            DwhExportError::UnexpectedShape(format!("no time column in {:?}", series.columns))
        })?;
    let value_index = (time_index + 1) % 2;

    let metric_values = series
        .values
        .iter()
        .filter_map(|row| {
            let start_in_millis = as_i64(row.get(time_index)?)? / NANOS_PER_MILLI;
            let value = as_f64(row.get(value_index)?)?;
            Some(MetricValue {
                start_in_millis,
                value,
            })
        })
        .filter(|v| window.contains(v.start_in_millis))
        .collect();

    Ok(Metric {
        metric_path: template::render_metric_path(&metric.name, series),
        metric_values,
    })
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
