use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A configured export query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Metric path template, may reference series tags as `${tag}`.
    pub name: String,
    /// Database (InfluxDB v2: bucket). Blank means derive or let the database decide.
    #[serde(default)]
    pub database: String,
    /// InfluxQL query, may reference `${interval}` and `${timeFilter}`.
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub metric_path: String,
    pub metric_values: Vec<MetricValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    pub start_in_millis: i64,
    pub value: f64,
}

/// Everything a query returned, with the series of all statements flattened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl Series {
    /// Case-insensitive tag lookup.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metric_serializes_camel_case() {
        let metric = Metric {
            metric_path: "cpu.a".to_string(),
            metric_values: vec![MetricValue {
                start_in_millis: 60_000,
                value: 1.5,
            }],
        };

        assert_eq!(
            serde_json::to_value(&metric).unwrap(),
            json!({
                "metricPath": "cpu.a",
                "metricValues": [{ "startInMillis": 60000, "value": 1.5 }]
            })
        );
    }

    #[test]
    fn test_series_tag_lookup_ignores_case() {
        let series = Series {
            tags: HashMap::from([("Host".to_string(), "a".to_string())]),
            ..Default::default()
        };
        assert_eq!(series.tag("host"), Some("a"));
        assert_eq!(series.tag("HOST"), Some("a"));
        assert_eq!(series.tag("region"), None);
    }
}
